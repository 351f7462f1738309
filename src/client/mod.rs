//! Relay client: mirrors other players and keeps the connection alive

pub mod roster;
pub mod session;

pub use roster::Roster;
pub use session::{run_with_reconnect, ClientError, RelayClient, RECONNECT_DELAY};
