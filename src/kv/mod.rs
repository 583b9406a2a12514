pub mod client;
mod server;
pub mod state_machine;

pub use client::{Clerk, HttpKvEndpoint, KvEndpoint};
pub use server::*;
pub use state_machine::*;

use crate::replicator::RequestId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetArgs {
    pub key: String,
    pub request_id: RequestId,
    pub done_id: RequestId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetReply {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutArgs {
    pub key: String,
    pub value: String,
    pub hash: bool,
    pub request_id: RequestId,
    pub done_id: RequestId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutReply {
    pub previous: String,
}
