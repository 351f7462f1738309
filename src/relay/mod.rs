//! Player registry and broadcast relay

pub mod identity;
pub mod registry;
pub mod service;

pub use identity::{IdGenerator, PlayerId, PALETTE};
pub use registry::{PlayerRecord, PlayerRegistry};
pub use service::{Outbound, Relay, RelayError, RelayHandle};
