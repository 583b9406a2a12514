use crate::backoff::BackoffConfig;
use crate::error::RpcError;
use crate::paxos::messages::*;
use crate::paxos::peer::Paxos;
use crate::paxos::transport::PeerTransport;
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

pub struct LocalNetwork<V: Value> {
    peers: RwLock<Vec<Weak<Paxos<V>>>>,
    reachable: RwLock<Vec<Vec<bool>>>,
    unreliable: AtomicBool,
    rpc_counts: Vec<AtomicUsize>,
}

impl<V: Value> LocalNetwork<V> {
    pub fn new(size: usize) -> Arc<Self> {
        Arc::new(Self {
            peers: RwLock::new(vec![Weak::new(); size]),
            reachable: RwLock::new(vec![vec![true; size]; size]),
            unreliable: AtomicBool::new(false),
            rpc_counts: (0..size).map(|_| AtomicUsize::new(0)).collect(),
        })
    }

    pub fn cluster(size: usize, retry: BackoffConfig) -> (Arc<Self>, Vec<Arc<Paxos<V>>>) {
        let net = Self::new(size);
        let peers = (0..size)
            .map(|me| {
                let px = Paxos::new(me, size, net.transport(me), retry.clone());
                net.register(&px);
                px
            })
            .collect();
        (net, peers)
    }

    pub fn transport(self: &Arc<Self>, me: PeerId) -> Arc<dyn PeerTransport<V>> {
        Arc::new(LocalTransport {
            me,
            net: self.clone(),
        })
    }

    pub fn register(&self, px: &Arc<Paxos<V>>) {
        let mut peers = self.peers.write();
        if let Some(slot) = peers.get_mut(px.me()) {
            *slot = Arc::downgrade(px);
        }
    }

    pub fn size(&self) -> usize {
        self.rpc_counts.len()
    }

    pub fn partition(&self, groups: &[&[PeerId]]) {
        let size = self.size();
        let mut reachable = vec![vec![false; size]; size];
        for group in groups {
            for &a in group.iter() {
                for &b in group.iter() {
                    if a < size && b < size {
                        reachable[a][b] = true;
                    }
                }
            }
        }
        for (i, row) in reachable.iter_mut().enumerate() {
            row[i] = true;
        }
        *self.reachable.write() = reachable;
        debug!(?groups, "network partitioned");
    }

    pub fn heal(&self) {
        let size = self.size();
        *self.reachable.write() = vec![vec![true; size]; size];
        debug!("network healed");
    }

    pub fn set_unreliable(&self, unreliable: bool) {
        self.unreliable.store(unreliable, Ordering::SeqCst);
    }

    pub fn rpc_count(&self, peer: PeerId) -> usize {
        self.rpc_counts
            .get(peer)
            .map_or(0, |count| count.load(Ordering::SeqCst))
    }

    pub fn total_rpc_count(&self) -> usize {
        self.rpc_counts.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    fn route(&self, from: PeerId, to: PeerId) -> Result<Arc<Paxos<V>>, RpcError> {
        let reachable = self
            .reachable
            .read()
            .get(from)
            .and_then(|row| row.get(to).copied())
            .unwrap_or(false);
        if !reachable {
            return Err(RpcError::Unreachable(format!("#{}", to)));
        }

        let target = self
            .peers
            .read()
            .get(to)
            .and_then(Weak::upgrade)
            .ok_or_else(|| RpcError::Unreachable(format!("#{}", to)))?;
        if target.is_dead() {
            return Err(RpcError::Unreachable(format!("#{}", to)));
        }

        if self.unreliable.load(Ordering::SeqCst) && rand::thread_rng().gen_range(0..1000) < 100 {
            return Err(RpcError::Dropped);
        }

        if let Some(count) = self.rpc_counts.get(to) {
            count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(target)
    }

    fn lose_reply(&self) -> bool {
        self.unreliable.load(Ordering::SeqCst) && rand::thread_rng().gen_range(0..1000) < 100
    }

    fn deliver<Req, Resp>(
        &self,
        from: PeerId,
        to: PeerId,
        req: &Req,
        handler: impl FnOnce(&Paxos<V>, &Req) -> Result<Resp, RpcError>,
    ) -> Result<Resp, RpcError>
    where
        Req: Serialize + DeserializeOwned,
        Resp: Serialize + DeserializeOwned,
    {
        let target = self.route(from, to)?;
        let req: Req = bincode::deserialize(&bincode::serialize(req)?)?;
        let resp = handler(target.as_ref(), &req)?;
        if self.lose_reply() {
            return Err(RpcError::Dropped);
        }
        Ok(bincode::deserialize(&bincode::serialize(&resp)?)?)
    }
}

struct LocalTransport<V: Value> {
    me: PeerId,
    net: Arc<LocalNetwork<V>>,
}

#[async_trait]
impl<V: Value> PeerTransport<V> for LocalTransport<V> {
    async fn prepare(&self, to: PeerId, args: PrepareArgs) -> Result<PrepareReply<V>, RpcError> {
        tokio::task::yield_now().await;
        self.net
            .deliver(self.me, to, &args, |px, args| px.handle_prepare(args))
    }

    async fn accept(&self, to: PeerId, args: AcceptArgs<V>) -> Result<AcceptReply, RpcError> {
        tokio::task::yield_now().await;
        self.net
            .deliver(self.me, to, &args, |px, args| px.handle_accept(args))
    }

    async fn decide(&self, to: PeerId, args: DecideArgs<V>) -> Result<DecideReply, RpcError> {
        tokio::task::yield_now().await;
        self.net
            .deliver(self.me, to, &args, |px, args| px.handle_decide(args))
    }
}
