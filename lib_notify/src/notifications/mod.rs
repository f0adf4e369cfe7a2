//! # Notifications Module
//!
//! Everything between a parsed push frame and the UI:
//!
//! - **`model`**: wire payload, normalized `Event`, accepted `Notification`.
//! - **`identity`**: identity tokens, similarity keys, message templates.
//! - **`filter`**: the deduplication and retention filter that owns the
//!   retained log, identity cache and burst map.
//! - **`center`**: the subscriber surface UI code reads from and mutates.

#![forbid(unsafe_code)]

pub mod center;
pub mod filter;
pub mod identity;
pub mod model;

pub use center::{ConnectionFlags, NotificationCenter};
pub use filter::{DedupFilter, FilterConfig};
pub use model::{Event, EventKind, Notification, WireMessage};
