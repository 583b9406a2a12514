use crate::paxos::Slot;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("peer {0} is unreachable")]
    Unreachable(String),
    #[error("message dropped")]
    Dropped,
    #[error("request timed out")]
    Timeout,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("peer answered with status {0}")]
    Status(u16),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("peer is shut down")]
    Shutdown,
    #[error("replica failed: {0}")]
    Replica(LogError),
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("paxos peer is shut down")]
    Shutdown,
    #[error("slot {0} was forgotten before it could be applied")]
    Forgotten(Slot),
}

impl From<LogError> for RpcError {
    fn from(e: LogError) -> Self {
        match e {
            LogError::Shutdown => RpcError::Shutdown,
            other => RpcError::Replica(other),
        }
    }
}
