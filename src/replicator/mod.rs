mod driver;

pub use driver::*;

use crate::paxos::Value;

pub type RequestId = u64;

pub trait LogEntry: Value {
    fn request_id(&self) -> RequestId;
}

pub trait StateMachine: Send + 'static {
    type Entry: LogEntry;
    type Output: Clone + std::fmt::Debug + Send + Sync + 'static;

    fn apply(&mut self, entry: &Self::Entry) -> Self::Output;
}
