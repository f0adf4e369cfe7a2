//! # Push-Channel Transport
//!
//! The "front door" of the notification layer. It keeps one WebSocket
//! connection to the push channel alive, retries lost connections a bounded
//! number of times, and publishes its state so consumers can fall back to a
//! "disconnected" indicator instead of waiting for live updates forever.
//!
//! ## Contained Modules:
//! - **`machine`**: the socket-free reconnect state machine and the
//!   `ConnectionStatus` snapshot it produces.
//! - **`manager`**: the tokio task that drives a real
//!   `tokio-tungstenite` connection through the machine (feature `transport`).

#![forbid(unsafe_code)]

/// Reconnect policy and connection state.
pub mod machine;
/// WebSocket connection task and its owner.
#[cfg(feature = "transport")]
pub mod manager;

pub use machine::{ConnectionStatus, Directive, LinkState, ReconnectMachine, TransportEvent};
#[cfg(feature = "transport")]
pub use manager::{TransportConfig, TransportManager};
