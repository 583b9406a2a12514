use crate::backoff::BackoffConfig;
use crate::error::RpcError;
use crate::paxos::acceptor::AcceptorStore;
use crate::paxos::messages::*;
use crate::paxos::proposer;
use crate::paxos::transport::PeerTransport;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Paxos<V: Value> {
    me: PeerId,
    peers: usize,
    store: Mutex<AcceptorStore<V>>,
    dead: AtomicBool,
    transport: Arc<dyn PeerTransport<V>>,
    retry: BackoffConfig,
}

impl<V: Value> Paxos<V> {
    pub fn new(
        me: PeerId,
        peers: usize,
        transport: Arc<dyn PeerTransport<V>>,
        retry: BackoffConfig,
    ) -> Arc<Self> {
        info!(peer = me, peers, "paxos peer created");
        Arc::new(Self {
            me,
            peers,
            store: Mutex::new(AcceptorStore::new(me, peers)),
            dead: AtomicBool::new(false),
            transport,
            retry,
        })
    }

    /// Starts agreement on `slot` with `value` as this peer's preference and
    /// returns immediately. Must be called from within a tokio runtime.
    ///
    /// Does nothing if the slot is already decided or forgotten, or a local
    /// proposer for it is still running.
    pub fn start(self: &Arc<Self>, slot: Slot, value: V) {
        if self.is_dead() {
            return;
        }
        if !self.store.lock().begin_proposal(slot) {
            debug!(peer = self.me, slot, "proposal not started");
            return;
        }

        let px = self.clone();
        tokio::spawn(async move {
            proposer::run(px.clone(), slot, value).await;
            px.store.lock().end_proposal(slot);
        });
    }

    pub fn status(&self, slot: Slot) -> Fate<V> {
        self.store.lock().status(slot)
    }

    pub fn done(&self, slot: Slot) {
        self.store.lock().mark_done(slot);
    }

    pub fn min(&self) -> Slot {
        self.store.lock().min()
    }

    pub fn max(&self) -> Option<Slot> {
        self.store.lock().max()
    }

    pub fn kill(&self) {
        info!(peer = self.me, "paxos peer killed");
        self.dead.store(true, Ordering::SeqCst);
    }

    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    pub fn me(&self) -> PeerId {
        self.me
    }

    pub fn peers(&self) -> usize {
        self.peers
    }

    pub fn handle_prepare(&self, args: &PrepareArgs) -> Result<PrepareReply<V>, RpcError> {
        self.check_alive()?;
        Ok(self.store.lock().prepare(args))
    }

    pub fn handle_accept(&self, args: &AcceptArgs<V>) -> Result<AcceptReply, RpcError> {
        self.check_alive()?;
        Ok(self.store.lock().accept(args))
    }

    pub fn handle_decide(&self, args: &DecideArgs<V>) -> Result<DecideReply, RpcError> {
        self.check_alive()?;
        Ok(self.store.lock().decide(args))
    }

    pub fn retained(&self) -> usize {
        self.store.lock().len()
    }

    pub(crate) fn own_done(&self) -> Option<Slot> {
        self.store.lock().own_done()
    }

    pub(crate) fn transport(&self) -> &Arc<dyn PeerTransport<V>> {
        &self.transport
    }

    pub(crate) fn retry(&self) -> &BackoffConfig {
        &self.retry
    }

    fn check_alive(&self) -> Result<(), RpcError> {
        if self.is_dead() {
            Err(RpcError::Shutdown)
        } else {
            Ok(())
        }
    }
}
