use crate::backoff::BackoffConfig;
use crate::error::LogError;
use crate::paxos::{Fate, Paxos, Slot};
use crate::replicator::{LogEntry, RequestId, StateMachine};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

struct LogState<M: StateMachine> {
    machine: M,
    results: HashMap<RequestId, M::Output>,
    applied: Slot,
}

impl<M: StateMachine> LogState<M> {
    fn apply(&mut self, slot: Slot, entry: &M::Entry) -> M::Output {
        let id = entry.request_id();
        let output = match self.results.get(&id) {
            Some(output) => {
                debug!(slot, request_id = id, "request already applied, skipping");
                output.clone()
            }
            None => {
                let output = self.machine.apply(entry);
                self.results.insert(id, output.clone());
                output
            }
        };
        self.applied = slot + 1;
        trace!(slot, request_id = id, "slot applied");
        output
    }
}

/// The state lock is held for a whole [`execute`](Self::execute) call, so
/// requests at one host are serialised.
pub struct ReplicatedLog<M: StateMachine> {
    paxos: Arc<Paxos<M::Entry>>,
    state: Mutex<LogState<M>>,
    backoff: BackoffConfig,
}

impl<M: StateMachine> ReplicatedLog<M> {
    pub fn new(paxos: Arc<Paxos<M::Entry>>, machine: M, backoff: BackoffConfig) -> Self {
        Self {
            paxos,
            state: Mutex::new(LogState {
                machine,
                results: HashMap::new(),
                applied: 0,
            }),
            backoff,
        }
    }

    pub async fn execute(&self, entry: M::Entry) -> Result<M::Output, LogError> {
        let id = entry.request_id();
        let mut state = self.state.lock().await;

        if let Some(output) = state.results.get(&id) {
            debug!(request_id = id, "duplicate request answered from cache");
            return Ok(output.clone());
        }

        let mut backoff = self.backoff.iter();
        loop {
            if self.paxos.is_dead() {
                return Err(LogError::Shutdown);
            }

            let slot = state.applied;
            match self.paxos.status(slot) {
                Fate::Decided(decided) => {
                    let output = state.apply(slot, &decided);
                    self.paxos.done(slot);
                    backoff.reset();
                    if decided.request_id() == id {
                        return Ok(output);
                    }
                }
                Fate::Pending => {
                    self.paxos.start(slot, entry.clone());
                    backoff.sleep().await;
                }
                Fate::Forgotten => {
                    warn!(slot, "slot forgotten before being applied");
                    return Err(LogError::Forgotten(slot));
                }
            }
        }
    }

    pub async fn catch_up(&self) -> Slot {
        let mut state = self.state.lock().await;
        loop {
            let slot = state.applied;
            match self.paxos.status(slot) {
                Fate::Decided(decided) => {
                    state.apply(slot, &decided);
                    self.paxos.done(slot);
                }
                Fate::Pending | Fate::Forgotten => return slot,
            }
        }
    }

    pub async fn forget(&self, id: RequestId) {
        if self.state.lock().await.results.remove(&id).is_some() {
            trace!(request_id = id, "evicted acknowledged request");
        }
    }

    pub async fn applied(&self) -> Slot {
        self.state.lock().await.applied
    }

    pub async fn cached(&self) -> usize {
        self.state.lock().await.results.len()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.state.lock().await.machine)
    }

    pub fn paxos(&self) -> &Arc<Paxos<M::Entry>> {
        &self.paxos
    }
}
