//! Error types for the notification layer.
//!
//! Only caller mistakes surface as errors. Connection loss, malformed frames
//! and duplicate events are handled inside the layer and show up as state.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No push-channel URL configured")]
    MissingUrl,

    #[error("Invalid push-channel URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported push-channel scheme '{0}' (expected ws or wss)")]
    UnsupportedScheme(String),
}
