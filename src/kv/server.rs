use crate::backoff::BackoffConfig;
use crate::error::LogError;
use crate::kv::state_machine::{Command, KvStore, Op};
use crate::kv::{GetArgs, GetReply, PutArgs, PutReply};
use crate::paxos::{Paxos, PeerId, Slot};
use crate::replicator::{ReplicatedLog, RequestId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub me: PeerId,
    pub min: Slot,
    pub max: Option<Slot>,
    pub applied: Slot,
    pub cached_results: usize,
    pub dead: bool,
}

pub struct KvServer {
    log: ReplicatedLog<KvStore>,
}

impl KvServer {
    pub fn new(paxos: Arc<Paxos<Op>>, backoff: BackoffConfig) -> Self {
        info!(peer = paxos.me(), "kv server started");
        Self {
            log: ReplicatedLog::new(paxos, KvStore::new(), backoff),
        }
    }

    pub async fn get(&self, args: GetArgs) -> Result<GetReply, LogError> {
        let op = Op {
            request_id: args.request_id,
            command: Command::Get { key: args.key },
        };
        let value = self.submit(op, args.done_id).await?;
        Ok(GetReply { value })
    }

    pub async fn put(&self, args: PutArgs) -> Result<PutReply, LogError> {
        let op = Op {
            request_id: args.request_id,
            command: Command::Put {
                key: args.key,
                value: args.value,
                hash: args.hash,
            },
        };
        let previous = self.submit(op, args.done_id).await?;
        Ok(PutReply { previous })
    }

    async fn submit(&self, op: Op, done_id: RequestId) -> Result<String, LogError> {
        debug!(peer = self.paxos().me(), request_id = op.request_id, "request received");
        let output = self.log.execute(op).await?;
        if done_id != 0 {
            self.log.forget(done_id).await;
        }
        Ok(output)
    }

    pub async fn status(&self) -> ServerStatus {
        let paxos = self.paxos();
        ServerStatus {
            me: paxos.me(),
            min: paxos.min(),
            max: paxos.max(),
            applied: self.log.applied().await,
            cached_results: self.log.cached().await,
            dead: paxos.is_dead(),
        }
    }

    pub fn kill(&self) {
        self.paxos().kill();
    }

    pub fn is_dead(&self) -> bool {
        self.paxos().is_dead()
    }

    pub fn paxos(&self) -> &Arc<Paxos<Op>> {
        self.log.paxos()
    }

    pub fn log(&self) -> &ReplicatedLog<KvStore> {
        &self.log
    }
}
