//! # lib_notify
//!
//! Real-time notification delivery for the applicant-tracking dashboard.
//!
//! ```text
//! TransportManager ──WireMessage──▶ pipeline::run ──Event──▶ NotificationCenter
//!        │                                                   (DedupFilter inside)
//!        └──────────── ConnectionStatus (watch) ─────────────────────▲
//! ```
//!
//! One manager and one center per session; both are plain owned values so
//! tests can build isolated instances.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod clock;
pub mod error;
pub mod notifications;
pub mod pipeline;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TransportError;
pub use notifications::{
    ConnectionFlags, DedupFilter, Event, EventKind, FilterConfig, Notification,
    NotificationCenter, WireMessage,
};
pub use transport::{ConnectionStatus, LinkState};
#[cfg(feature = "transport")]
pub use transport::{TransportConfig, TransportManager};
