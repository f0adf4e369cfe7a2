//! # Notification Data Model
//!
//! Three layers of the same fact:
//!
//! - **`WireMessage`**: the untrusted JSON payload exactly as the push channel
//!   delivers it (camelCase keys, every field optional except `type`).
//! - **`Event`**: the normalized inbound event. Empty strings are folded into
//!   `None` and identifiers are text regardless of their JSON type.
//! - **`Notification`**: an accepted `Event` stamped with its receipt time,
//!   resolved identity and display message. Immutable and shared by `Arc`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Wire tag for a freshly submitted application.
pub const KIND_NEW_APPLICANT: &str = "NEW_APPLICANT";
/// Wire tag for a finished resume analysis.
pub const KIND_ANALYSIS_COMPLETE: &str = "ANALYSIS_COMPLETE";

/// The raw payload of one push-channel frame.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub r#type: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub applicant_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub job_title: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub job_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub applicant_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message_id: Option<String>,
}

impl WireMessage {
    /// Parses one text frame.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Accepts a JSON string or number and renders it as text. `null`, empty
/// strings and non-scalar values become `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Kind of an inbound event. Unknown wire tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewApplicant,
    AnalysisComplete,
    Other(String),
}

impl EventKind {
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            KIND_NEW_APPLICANT => EventKind::NewApplicant,
            KIND_ANALYSIS_COMPLETE => EventKind::AnalysisComplete,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            EventKind::NewApplicant => KIND_NEW_APPLICANT,
            EventKind::AnalysisComplete => KIND_ANALYSIS_COMPLETE,
            EventKind::Other(tag) => tag,
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

/// # Event
///
/// A normalized inbound event, created by the transport on receipt and
/// handed straight to the filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub kind: EventKind,
    pub message: Option<String>,
    pub applicant_name: Option<String>,
    pub job_title: Option<String>,
    pub score: Option<f64>,
    pub job_id: Option<String>,
    pub applicant_id: Option<String>,
    /// Source-of-truth timestamp, as text, when the sender supplied one.
    pub timestamp: Option<String>,
    /// Externally supplied identity token.
    pub message_id: Option<String>,
}

impl Event {
    /// An event of `kind` with every optional field empty.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            message: None,
            applicant_name: None,
            job_title: None,
            score: None,
            job_id: None,
            applicant_id: None,
            timestamp: None,
            message_id: None,
        }
    }

    /// The applicant reference: identifier first, name as fallback.
    pub fn applicant_ref(&self) -> Option<&str> {
        self.applicant_id
            .as_deref()
            .or(self.applicant_name.as_deref())
    }

    /// The job reference: identifier first, title as fallback.
    pub fn job_ref(&self) -> Option<&str> {
        self.job_id.as_deref().or(self.job_title.as_deref())
    }
}

impl From<WireMessage> for Event {
    fn from(wire: WireMessage) -> Self {
        Self {
            kind: EventKind::from_wire(&wire.r#type),
            message: wire.message,
            applicant_name: wire.applicant_name,
            job_title: wire.job_title,
            score: wire.score,
            job_id: wire.job_id,
            applicant_id: wire.applicant_id,
            timestamp: wire.timestamp,
            message_id: wire.message_id,
        }
    }
}

/// # Notification
///
/// An accepted event. Owned by the filter's retained log; readers hold
/// `Arc` clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Permanent identity (external token or derived key).
    pub id: String,
    /// Display message, supplied or synthesized.
    pub message: String,
    /// Receipt time in milliseconds from the filter's clock.
    pub received_at: u64,
    pub event: Event,
}
