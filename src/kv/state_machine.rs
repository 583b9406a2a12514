use crate::replicator::{LogEntry, RequestId, StateMachine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Get { key: String },
    Put { key: String, value: String, hash: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Op {
    pub request_id: RequestId,
    pub command: Command,
}

impl LogEntry for Op {
    fn request_id(&self) -> RequestId {
        self.request_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvStore {
    data: HashMap<String, String>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl StateMachine for KvStore {
    type Entry = Op;
    type Output = String;

    fn apply(&mut self, op: &Op) -> String {
        match &op.command {
            Command::Get { key } => self.data.get(key).cloned().unwrap_or_default(),
            Command::Put { key, value, hash } => {
                let previous = self.data.get(key).cloned().unwrap_or_default();
                let stored = if *hash {
                    fnv1a32(format!("{}{}", previous, value).as_bytes()).to_string()
                } else {
                    value.clone()
                };
                self.data.insert(key.clone(), stored);
                previous
            }
        }
    }
}

pub fn fnv1a32(bytes: &[u8]) -> u32 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u32::from(*b)).wrapping_mul(PRIME))
}
