//! Domain Layer - session values and policies

pub mod errors;
pub mod policy;
pub mod session;

pub use errors::SessionError;
pub use policy::RetryPolicy;
pub use session::{ElevationOutcome, Session, SessionStatus};
