//! Night Drive relay server
//!
//! Serves the browser client bundle and relays each car's last reported
//! state to every other connected player over a WebSocket.

pub mod app;
pub mod client;
pub mod config;
pub mod http;
pub mod relay;
pub mod util;
pub mod ws;
