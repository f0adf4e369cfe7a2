//! Identity, similarity keys and display messages for inbound events.

use super::model::{Event, EventKind};

/// Separator between key components.
pub const KEY_SEPARATOR: &str = "-";

fn join_present<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Resolves the permanent identity of `event`.
///
/// The external token wins when present. Otherwise the identity is derived
/// from kind, subject references and a timestamp; the source timestamp is
/// used when the sender supplied one, else `now_ms`. A redelivery without a
/// source timestamp therefore gets a new identity.
pub fn resolve_identity(event: &Event, now_ms: u64) -> String {
    if let Some(token) = event.message_id.as_deref().filter(|t| !t.is_empty()) {
        return token.to_string();
    }

    let receipt = now_ms.to_string();
    let timestamp = event.timestamp.as_deref().unwrap_or(&receipt);
    join_present([
        Some(event.kind.as_wire()),
        event.applicant_ref(),
        event.job_ref(),
        Some(timestamp),
    ])
}

/// Coarse grouping key for burst suppression: kind plus subject references.
pub fn similarity_key(event: &Event) -> String {
    join_present([Some(event.kind.as_wire()), event.applicant_ref(), event.job_ref()])
}

/// The event's own message, or one synthesized from the per-kind template.
pub fn render_message(event: &Event) -> String {
    if let Some(message) = event.message.as_deref().filter(|m| !m.is_empty()) {
        return message.to_string();
    }

    let name = event.applicant_name.as_deref().unwrap_or("an applicant");
    match &event.kind {
        EventKind::NewApplicant => {
            let job = event.job_title.as_deref().unwrap_or("a position");
            format!("New application received from {} for {}", name, job)
        }
        EventKind::AnalysisComplete => {
            let score = event
                .score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            match event.job_title.as_deref() {
                Some(job) => format!("Analysis complete for {} for {}: score {}", name, job, score),
                None => format!("Analysis complete for {}: score {}", name, score),
            }
        }
        EventKind::Other(tag) => format!("New {} notification", tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applicant(id: Option<&str>, name: Option<&str>) -> Event {
        let mut event = Event::new(EventKind::NewApplicant);
        event.applicant_id = id.map(str::to_string);
        event.applicant_name = name.map(str::to_string);
        event.job_id = Some("j1".into());
        event.job_title = Some("Engineer".into());
        event
    }

    #[test]
    fn test_external_token_used_verbatim() {
        let mut event = applicant(Some("a1"), None);
        event.message_id = Some("m1".into());
        assert_eq!(resolve_identity(&event, 123), "m1");
    }

    #[test]
    fn test_derived_identity_prefers_source_timestamp() {
        let mut event = applicant(Some("a1"), Some("Jane Doe"));
        event.timestamp = Some("1700000000000".into());
        assert_eq!(
            resolve_identity(&event, 5),
            "NEW_APPLICANT-a1-j1-1700000000000"
        );
        // Replays with the same source timestamp collapse onto one identity.
        assert_eq!(resolve_identity(&event, 9), resolve_identity(&event, 5));
    }

    #[test]
    fn test_derived_identity_falls_back_to_receipt_time() {
        let event = applicant(None, Some("Jane Doe"));
        assert_eq!(resolve_identity(&event, 42), "NEW_APPLICANT-Jane Doe-j1-42");
        assert_ne!(resolve_identity(&event, 42), resolve_identity(&event, 43));
    }

    #[test]
    fn test_missing_components_are_skipped() {
        let event = Event::new(EventKind::Other("PING".into()));
        assert_eq!(resolve_identity(&event, 7), "PING-7");
        assert_eq!(similarity_key(&event), "PING");
    }

    #[test]
    fn test_similarity_key_ignores_time() {
        let mut first = applicant(Some("a1"), None);
        first.timestamp = Some("1".into());
        let mut second = first.clone();
        second.timestamp = Some("2".into());
        assert_eq!(similarity_key(&first), "NEW_APPLICANT-a1-j1");
        assert_eq!(similarity_key(&first), similarity_key(&second));
    }

    #[test]
    fn test_templates() {
        let event = applicant(Some("a1"), Some("Jane Doe"));
        assert_eq!(
            render_message(&event),
            "New application received from Jane Doe for Engineer"
        );

        let mut analysis = Event::new(EventKind::AnalysisComplete);
        analysis.applicant_name = Some("Jane Doe".into());
        analysis.score = Some(87.0);
        assert_eq!(render_message(&analysis), "Analysis complete for Jane Doe: score 87");

        analysis.job_title = Some("Engineer".into());
        assert_eq!(
            render_message(&analysis),
            "Analysis complete for Jane Doe for Engineer: score 87"
        );

        analysis.applicant_name = None;
        analysis.score = None;
        assert_eq!(
            render_message(&analysis),
            "Analysis complete for an applicant for Engineer: score n/a"
        );

        assert_eq!(
            render_message(&Event::new(EventKind::Other("INTERVIEW_BOOKED".into()))),
            "New INTERVIEW_BOOKED notification"
        );
    }

    #[test]
    fn test_supplied_message_wins() {
        let mut event = applicant(None, None);
        event.message = Some("Custom text".into());
        assert_eq!(render_message(&event), "Custom text");
    }
}
