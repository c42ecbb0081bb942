//! Service layer: the gateway and its interactive lock.

mod gateway;
mod lock;


pub use gateway::CommandGateway;
pub use lock::InteractiveLock;
