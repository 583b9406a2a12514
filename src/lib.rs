pub mod api;
pub mod backoff;
pub mod config;
pub mod daemon;
pub mod error;
pub mod kv;
pub mod paxos;
pub mod paxos_api;
pub mod replicator;

pub use api::create_router;
pub use backoff::BackoffConfig;
pub use config::NodeConfig;
pub use daemon::KvDaemon;
pub use error::{LogError, RpcError};
pub use kv::{Clerk, KvServer, KvStore};
pub use paxos::{Fate, LocalNetwork, Paxos};
pub use paxos_api::create_paxos_router;
pub use replicator::{ReplicatedLog, StateMachine};
