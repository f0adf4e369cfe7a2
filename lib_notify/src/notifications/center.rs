//! # Notification Center
//!
//! The subscriber surface handed to UI code. It reads and mutates the
//! retained log only through `DedupFilter`'s own operations and projects the
//! transport status down to the two flags the UI shows.
//!
//! Cloning a `NotificationCenter` is cheap: clones share the same filter,
//! status feed and broadcast channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};

use super::filter::DedupFilter;
use super::model::{Event, Notification};
use crate::transport::machine::ConnectionStatus;

/// Capacity of the accepted-notification broadcast channel.
const BROADCAST_CAPACITY: usize = 64;

/// Connectivity as the UI sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionFlags {
    pub connected: bool,
    pub fallback: bool,
}

impl From<ConnectionStatus> for ConnectionFlags {
    fn from(status: ConnectionStatus) -> Self {
        Self {
            connected: status.is_connected(),
            fallback: status.is_fallback(),
        }
    }
}

#[derive(Clone)]
pub struct NotificationCenter {
    filter: Arc<Mutex<DedupFilter>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    accepted_tx: broadcast::Sender<Arc<Notification>>,
}

impl NotificationCenter {
    /// Wraps `filter` and follows the transport status on `status_rx`.
    pub fn new(filter: DedupFilter, status_rx: watch::Receiver<ConnectionStatus>) -> Self {
        let (accepted_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            filter: Arc::new(Mutex::new(filter)),
            status_rx,
            accepted_tx,
        }
    }

    /// A center with no transport attached; it always reports disconnected.
    pub fn detached(filter: DedupFilter) -> Self {
        let (_, status_rx) = watch::channel(ConnectionStatus::default());
        Self::new(filter, status_rx)
    }

    fn filter(&self) -> MutexGuard<'_, DedupFilter> {
        self.filter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `event` through the filter and broadcasts it when accepted.
    pub fn ingest(&self, event: Event) -> Option<Arc<Notification>> {
        let accepted = self.filter().accept(event)?;
        // No subscribers is fine; readers can still poll `latest`/`all`.
        let _ = self.accepted_tx.send(Arc::clone(&accepted));
        Some(accepted)
    }

    /// The most recently accepted notification this session.
    pub fn latest(&self) -> Option<Arc<Notification>> {
        self.filter().latest()
    }

    /// Snapshot of the retained log, newest first.
    pub fn all(&self) -> Vec<Arc<Notification>> {
        self.filter().all()
    }

    pub fn len(&self) -> usize {
        self.filter().len()
    }

    pub fn is_empty(&self) -> bool {
        self.filter().is_empty()
    }

    /// Empties the retained log. Already-seen events stay suppressed.
    pub fn clear_all(&self) {
        self.filter().clear_all();
    }

    /// Removes the notification at `index`. Out-of-range indices are ignored,
    /// since the UI may act on a snapshot that is already stale.
    pub fn dismiss(&self, index: usize) {
        self.filter().dismiss(index);
    }

    pub fn connection_state(&self) -> ConnectionFlags {
        ConnectionFlags::from(*self.status_rx.borrow())
    }

    /// Full transport status, including retry counters.
    pub fn connection_status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// A feed of notifications as they are accepted.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.accepted_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notifications::filter::FilterConfig;
    use crate::notifications::model::WireMessage;
    use crate::transport::machine::LinkState;

    fn center() -> (NotificationCenter, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        let filter = DedupFilter::with_clock(FilterConfig::default(), Arc::new(clock.clone()));
        (NotificationCenter::detached(filter), clock)
    }

    fn wire(json: &str) -> Event {
        Event::from(WireMessage::parse(json).unwrap())
    }

    const JANE: &str = r#"{"type":"NEW_APPLICANT","applicantName":"Jane Doe","jobTitle":"Engineer",
        "applicantId":"a1","jobId":"j1","messageId":"m1"}"#;

    #[test]
    fn test_jane_doe_scenario() {
        let (center, clock) = center();

        let first = center.ingest(wire(JANE)).expect("accepted");
        assert_eq!(first.message, "New application received from Jane Doe for Engineer");
        assert_eq!(center.len(), 1);
        assert_eq!(center.latest().unwrap().id, "m1");

        clock.advance(1_000);
        assert!(center.ingest(wire(JANE)).is_none());
        assert_eq!(center.len(), 1);
    }

    #[test]
    fn test_snapshot_is_restartable_until_mutated() {
        let (center, clock) = center();
        for n in 0..3 {
            center.ingest(wire(&format!(r#"{{"type":"NEW_APPLICANT","applicantId":"a{n}","messageId":"m{n}"}}"#)));
            clock.advance(10);
        }

        let ids = |c: &NotificationCenter| c.all().iter().map(|n| n.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&center), ids(&center));
        assert_eq!(ids(&center), vec!["m2", "m1", "m0"]);

        center.dismiss(0);
        assert_eq!(ids(&center), vec!["m1", "m0"]);

        center.dismiss(2);
        center.dismiss(usize::MAX);
        assert_eq!(ids(&center), vec!["m1", "m0"]);
    }

    #[test]
    fn test_clear_all_keeps_suppression_and_latest() {
        let (center, clock) = center();
        center.ingest(wire(JANE));
        center.clear_all();
        assert!(center.is_empty());
        assert!(center.all().is_empty());

        clock.advance(60_000);
        assert!(center.ingest(wire(JANE)).is_none());
        assert_eq!(center.latest().unwrap().id, "m1");
    }

    #[test]
    fn test_clones_share_state() {
        let (center, _clock) = center();
        let view = center.clone();
        center.ingest(wire(JANE));
        assert_eq!(view.len(), 1);
        view.clear_all();
        assert!(center.is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_receives_accepted_only() {
        let (center, _clock) = center();
        let mut feed = center.subscribe();

        center.ingest(wire(JANE));
        center.ingest(wire(JANE));

        let got = feed.recv().await.unwrap();
        assert_eq!(got.id, "m1");
        assert!(matches!(
            feed.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn test_connection_flags_follow_status() {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let center = NotificationCenter::new(DedupFilter::new(), status_rx);
        assert_eq!(center.connection_state(), ConnectionFlags::default());

        status_tx.send_replace(ConnectionStatus {
            state: LinkState::Connected,
            retries: 0,
            attempts: 1,
        });
        assert_eq!(
            center.connection_state(),
            ConnectionFlags { connected: true, fallback: false }
        );

        status_tx.send_replace(ConnectionStatus {
            state: LinkState::Fallback,
            retries: 3,
            attempts: 4,
        });
        assert_eq!(
            center.connection_state(),
            ConnectionFlags { connected: false, fallback: true }
        );
        assert_eq!(center.connection_status().attempts, 4);
    }
}
