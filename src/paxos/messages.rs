use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub type PeerId = usize;
pub type Slot = u64;

pub trait Value:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Value for T where
    T: Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Proposal number. Ordered by `number` first, then by proposing peer, so two
/// peers can never produce the same round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Round {
    pub number: u64,
    pub peer: PeerId,
}

impl Round {
    pub fn initial(peer: PeerId) -> Self {
        Self { number: 1, peer }
    }

    pub fn next_above(self, seen: Option<Round>) -> Self {
        let floor = seen.map_or(self.number, |r| r.number.max(self.number));
        Self {
            number: floor + 1,
            peer: self.peer,
        }
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.number, self.peer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareArgs {
    pub slot: Slot,
    pub round: Round,
    pub sender: PeerId,
    pub done: Option<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: DeserializeOwned"))]
pub struct PrepareReply<V> {
    pub ok: bool,
    pub promised: Option<Round>,
    pub accepted: Option<(Round, V)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: DeserializeOwned"))]
pub struct AcceptArgs<V> {
    pub slot: Slot,
    pub round: Round,
    pub value: V,
    pub sender: PeerId,
    pub done: Option<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptReply {
    pub ok: bool,
    pub promised: Option<Round>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: DeserializeOwned"))]
pub struct DecideArgs<V> {
    pub slot: Slot,
    pub round: Round,
    pub value: V,
    pub sender: PeerId,
    pub done: Option<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideReply {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fate<V> {
    Decided(V),
    Pending,
    Forgotten,
}

impl<V> Fate<V> {
    pub fn is_decided(&self) -> bool {
        matches!(self, Fate::Decided(_))
    }

    pub fn decided(self) -> Option<V> {
        match self {
            Fate::Decided(v) => Some(v),
            _ => None,
        }
    }
}

pub fn quorum(peers: usize) -> usize {
    peers / 2 + 1
}
