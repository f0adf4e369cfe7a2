//! # Notification Pipeline
//!
//! The single consumer of the transport's frame channel. Frames are handled
//! one at a time in arrival order; each is normalized into an `Event` and
//! offered to the `NotificationCenter`. The loop ends when every sender of
//! the channel is gone (the transport manager was dropped or shut down).

use tokio::sync::mpsc;

use crate::notifications::center::NotificationCenter;
use crate::notifications::model::{Event, WireMessage};

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub received: u64,
    pub accepted: u64,
}

impl PipelineStats {
    /// Frames dropped as duplicates or bursts.
    pub fn suppressed(&self) -> u64 {
        self.received - self.accepted
    }
}

/// Drains `frames` into `center` until the channel closes.
pub async fn run(
    mut frames: mpsc::UnboundedReceiver<WireMessage>,
    center: NotificationCenter,
) -> PipelineStats {
    let mut stats = PipelineStats::default();

    while let Some(frame) = frames.recv().await {
        stats.received += 1;
        if let Some(notification) = center.ingest(Event::from(frame)) {
            stats.accepted += 1;
            log::info!("Notification: {}", notification.message);
        }
    }

    log::info!(
        "Notification pipeline stopped ({} received, {} accepted, {} suppressed).",
        stats.received,
        stats.accepted,
        stats.suppressed()
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::filter::DedupFilter;

    fn frame(json: &str) -> WireMessage {
        WireMessage::parse(json).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_filters_in_arrival_order() {
        let center = NotificationCenter::detached(DedupFilter::new());
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(frame(r#"{"type":"NEW_APPLICANT","applicantId":"a1","messageId":"m1"}"#)).unwrap();
        tx.send(frame(r#"{"type":"NEW_APPLICANT","applicantId":"a1","messageId":"m1"}"#)).unwrap();
        tx.send(frame(r#"{"type":"ANALYSIS_COMPLETE","applicantId":"a1","messageId":"m2","score":77}"#))
            .unwrap();
        drop(tx);

        let stats = run(rx, center.clone()).await;
        assert_eq!(stats, PipelineStats { received: 3, accepted: 2 });
        assert_eq!(stats.suppressed(), 1);

        let ids: Vec<String> = center.all().iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);
    }
}
