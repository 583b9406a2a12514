mod acceptor;
mod gc;
pub mod local;
mod messages;
mod peer;
mod proposer;
mod transport;

pub use acceptor::*;
pub use gc::*;
pub use local::LocalNetwork;
pub use messages::*;
pub use peer::*;
pub use transport::*;
