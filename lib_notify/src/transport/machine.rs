//! # Reconnect State Machine
//!
//! The socket-free half of the transport. The connection task feeds every
//! lifecycle observation into `ReconnectMachine::on_event`, reports each
//! connection end to `on_close` and obeys the returned `Directive`, so the
//! retry policy can be exercised without a network.
//!
//! ```text
//! Disconnected ─connect─▶ Connecting ─open─▶ Connected
//!      ▲                      │                  │
//!      └── abnormal close, failures < max ◀──────┘
//!                             │
//!          abnormal close, failures == max ─▶ Fallback (terminal)
//! ```

use std::time::Duration;

/// WebSocket close code for a normal, intentional closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Connectivity of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Attempt budget spent or no usable URL. No automatic reconnects follow.
    Fallback,
}

/// Snapshot published by the transport on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    pub state: LinkState,
    /// Consecutive abnormal closes since the last successful open.
    pub retries: u32,
    /// Connection attempts made since the last `connect`.
    pub attempts: u64,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn is_fallback(&self) -> bool {
        self.state == LinkState::Fallback
    }
}

/// Lifecycle observations from the connection task, other than the close.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A connection attempt is starting.
    Connecting,
    Opened,
    Errored(String),
}

/// What the connection task should do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Sleep for the delay, then open a new connection.
    Reconnect(Duration),
    /// Clean close; stop without entering fallback.
    Stop,
    /// Attempt budget spent; enter fallback and stop.
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    status: ConnectionStatus,
    max_attempts: u32,
    delay: Duration,
}

impl ReconnectMachine {
    /// `max_attempts` bounds consecutive failed connections, the first one
    /// included. The close that ends the last of them enters `Fallback`.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            status: ConnectionStatus::default(),
            max_attempts,
            delay,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Enters the terminal state directly (used when there is no URL).
    pub fn fail(&mut self) {
        self.status.state = LinkState::Fallback;
    }

    /// Applies a lifecycle observation. Ignored once in `Fallback`.
    pub fn on_event(&mut self, event: &TransportEvent) {
        if self.status.is_fallback() {
            return;
        }

        match event {
            TransportEvent::Connecting => {
                self.status.state = LinkState::Connecting;
                self.status.attempts += 1;
            }
            TransportEvent::Opened => {
                self.status.state = LinkState::Connected;
                self.status.retries = 0;
            }
            // The close that follows an error decides about retries.
            TransportEvent::Errored(_) => self.status.state = LinkState::Disconnected,
        }
    }

    /// Applies the end of a connection. `code` is `None` when no close frame
    /// was received.
    pub fn on_close(&mut self, code: Option<u16>) -> Directive {
        if self.status.is_fallback() {
            return Directive::GiveUp;
        }

        self.status.state = LinkState::Disconnected;
        if code == Some(NORMAL_CLOSURE) {
            return Directive::Stop;
        }

        self.status.retries += 1;
        if self.status.retries < self.max_attempts {
            Directive::Reconnect(self.delay)
        } else {
            self.status.state = LinkState::Fallback;
            Directive::GiveUp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(3);

    #[test]
    fn test_open_resets_retries() {
        let mut machine = ReconnectMachine::new(3, DELAY);
        machine.on_event(&TransportEvent::Connecting);
        assert_eq!(machine.on_close(None), Directive::Reconnect(DELAY));
        assert_eq!(machine.status().retries, 1);

        machine.on_event(&TransportEvent::Connecting);
        machine.on_event(&TransportEvent::Opened);
        assert!(machine.status().is_connected());
        assert_eq!(machine.status().retries, 0);
        assert_eq!(machine.status().attempts, 2);
    }

    #[test]
    fn test_third_abnormal_close_enters_fallback() {
        let mut machine = ReconnectMachine::new(3, DELAY);
        let mut directives = Vec::new();
        for _ in 0..3 {
            machine.on_event(&TransportEvent::Connecting);
            directives.push(machine.on_close(Some(1006)));
        }

        assert_eq!(
            directives,
            vec![
                Directive::Reconnect(DELAY),
                Directive::Reconnect(DELAY),
                Directive::GiveUp
            ]
        );
        let status = machine.status();
        assert!(status.is_fallback());
        assert_eq!(status.attempts, 3);
        assert_eq!(status.retries, 3);

        // Terminal: no fourth attempt is recorded and nothing leaves fallback.
        machine.on_event(&TransportEvent::Connecting);
        machine.on_event(&TransportEvent::Opened);
        assert_eq!(machine.on_close(None), Directive::GiveUp);
        assert_eq!(machine.status().attempts, 3);
        assert!(machine.status().is_fallback());
    }

    #[test]
    fn test_budget_counts_failures_after_last_open() {
        let mut machine = ReconnectMachine::new(3, DELAY);
        machine.on_event(&TransportEvent::Connecting);
        machine.on_close(None);
        machine.on_event(&TransportEvent::Connecting);
        machine.on_close(None);
        machine.on_event(&TransportEvent::Connecting);
        machine.on_event(&TransportEvent::Opened);

        // A fresh budget of three after the open.
        assert_eq!(machine.on_close(None), Directive::Reconnect(DELAY));
        machine.on_event(&TransportEvent::Connecting);
        assert_eq!(machine.on_close(None), Directive::Reconnect(DELAY));
        machine.on_event(&TransportEvent::Connecting);
        assert_eq!(machine.on_close(None), Directive::GiveUp);
        assert_eq!(machine.status().attempts, 5);
    }

    #[test]
    fn test_normal_closure_does_not_retry() {
        let mut machine = ReconnectMachine::new(3, DELAY);
        machine.on_event(&TransportEvent::Connecting);
        machine.on_event(&TransportEvent::Opened);
        assert_eq!(machine.on_close(Some(NORMAL_CLOSURE)), Directive::Stop);
        let status = machine.status();
        assert_eq!(status.state, LinkState::Disconnected);
        assert_eq!(status.retries, 0);
        assert!(!status.is_fallback());
    }

    #[test]
    fn test_error_alone_schedules_nothing() {
        let mut machine = ReconnectMachine::new(3, DELAY);
        machine.on_event(&TransportEvent::Connecting);
        machine.on_event(&TransportEvent::Opened);
        machine.on_event(&TransportEvent::Errored("reset".into()));
        assert_eq!(machine.status().state, LinkState::Disconnected);
        assert_eq!(machine.status().retries, 0);
    }

    #[test]
    fn test_fail_is_immediate() {
        let mut machine = ReconnectMachine::new(3, DELAY);
        machine.fail();
        assert!(machine.status().is_fallback());
        assert_eq!(machine.status().attempts, 0);
    }
}
