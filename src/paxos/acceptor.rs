use crate::paxos::gc::DoneVector;
use crate::paxos::messages::*;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Instance<V> {
    pub promised: Option<Round>,
    pub accepted: Option<(Round, V)>,
    pub decided: Option<V>,
}

impl<V> Default for Instance<V> {
    fn default() -> Self {
        Self {
            promised: None,
            accepted: None,
            decided: None,
        }
    }
}

#[derive(Debug)]
pub struct AcceptorStore<V> {
    me: PeerId,
    instances: BTreeMap<Slot, Instance<V>>,
    done: DoneVector,
    proposing: HashSet<Slot>,
}

impl<V: Value> AcceptorStore<V> {
    pub fn new(me: PeerId, peers: usize) -> Self {
        Self {
            me,
            instances: BTreeMap::new(),
            done: DoneVector::new(peers),
            proposing: HashSet::new(),
        }
    }

    pub fn prepare(&mut self, args: &PrepareArgs) -> PrepareReply<V> {
        self.observe_done(args.sender, args.done);

        if args.slot < self.min() {
            return PrepareReply {
                ok: false,
                promised: None,
                accepted: None,
            };
        }

        let instance = self.instances.entry(args.slot).or_default();
        let ok = Some(args.round) > instance.promised;
        if ok {
            instance.promised = Some(args.round);
        }

        PrepareReply {
            ok,
            promised: instance.promised,
            accepted: instance.accepted.clone(),
        }
    }

    pub fn accept(&mut self, args: &AcceptArgs<V>) -> AcceptReply {
        self.observe_done(args.sender, args.done);

        if args.slot < self.min() {
            return AcceptReply {
                ok: false,
                promised: None,
            };
        }

        let instance = self.instances.entry(args.slot).or_default();
        let ok = Some(args.round) >= instance.promised;
        if ok {
            instance.promised = Some(args.round);
            instance.accepted = Some((args.round, args.value.clone()));
        }

        AcceptReply {
            ok,
            promised: instance.promised,
        }
    }

    pub fn decide(&mut self, args: &DecideArgs<V>) -> DecideReply {
        self.observe_done(args.sender, args.done);

        if args.slot < self.min() {
            return DecideReply { ok: true };
        }

        let instance = self.instances.entry(args.slot).or_default();
        if instance.decided.is_some() {
            return DecideReply { ok: true };
        }

        instance.decided = Some(args.value.clone());
        if instance.accepted.as_ref().map_or(true, |(n_a, _)| *n_a <= args.round) {
            instance.accepted = Some((args.round, args.value.clone()));
        }
        if instance.promised < Some(args.round) {
            instance.promised = Some(args.round);
        }

        debug!(peer = self.me, slot = args.slot, round = %args.round, "slot decided");
        DecideReply { ok: true }
    }

    pub fn status(&self, slot: Slot) -> Fate<V> {
        if slot < self.min() {
            return Fate::Forgotten;
        }
        match self.instances.get(&slot).and_then(|i| i.decided.clone()) {
            Some(value) => Fate::Decided(value),
            None => Fate::Pending,
        }
    }

    pub fn instance(&self, slot: Slot) -> Option<&Instance<V>> {
        self.instances.get(&slot)
    }

    pub fn touch(&mut self, slot: Slot) {
        if slot >= self.min() {
            self.instances.entry(slot).or_default();
        }
    }

    pub fn begin_proposal(&mut self, slot: Slot) -> bool {
        if slot < self.min() || self.status(slot).is_decided() {
            return false;
        }
        self.touch(slot);
        self.proposing.insert(slot)
    }

    pub fn end_proposal(&mut self, slot: Slot) {
        self.proposing.remove(&slot);
    }

    pub fn mark_done(&mut self, slot: Slot) {
        let me = self.me;
        self.observe_done(me, Some(slot));
    }

    pub fn own_done(&self) -> Option<Slot> {
        self.done.get(self.me)
    }

    pub fn min(&self) -> Slot {
        self.done.min()
    }

    pub fn max(&self) -> Option<Slot> {
        self.instances.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn observe_done(&mut self, peer: PeerId, done: Option<Slot>) {
        if !self.done.merge(peer, done) {
            return;
        }
        let min = self.done.min();
        let first = self.instances.keys().next().copied();
        if first.map_or(false, |slot| slot < min) {
            let kept = self.instances.split_off(&min);
            let purged = std::mem::replace(&mut self.instances, kept);
            for (slot, instance) in &purged {
                if instance.decided.is_none() {
                    warn!(peer = self.me, slot, "forgetting undecided slot below min");
                }
            }
            debug!(peer = self.me, min, purged = purged.len(), "collected old slots");
            self.proposing.retain(|slot| *slot >= min);
        }
    }
}
