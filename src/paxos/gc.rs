use crate::paxos::messages::{PeerId, Slot};

#[derive(Debug, Clone)]
pub struct DoneVector {
    entries: Vec<Option<Slot>>,
}

impl DoneVector {
    pub fn new(peers: usize) -> Self {
        Self {
            entries: vec![None; peers],
        }
    }

    pub fn merge(&mut self, peer: PeerId, done: Option<Slot>) -> bool {
        let Some(entry) = self.entries.get_mut(peer) else {
            return false;
        };
        if done > *entry {
            *entry = done;
            true
        } else {
            false
        }
    }

    pub fn get(&self, peer: PeerId) -> Option<Slot> {
        self.entries.get(peer).copied().flatten()
    }

    /// One more than the smallest watermark across all peers. A peer that
    /// has reported nothing holds this at zero.
    pub fn min(&self) -> Slot {
        self.entries
            .iter()
            .map(|done| done.map_or(0, |slot| slot + 1))
            .min()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
