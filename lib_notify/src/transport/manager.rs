//! # Push-Channel Transport Manager
//!
//! Owns at most one WebSocket connection to the notification push channel.
//!
//! ## Behaviour:
//! - **Validation**: `connect` rejects an empty, unparseable or non-`ws(s)`
//!   URL without touching the network and moves straight to `Fallback`.
//! - **Reading**: text frames (and binary frames holding UTF-8) are parsed
//!   as `WireMessage` and pushed, in arrival order, onto a single-consumer
//!   channel. Malformed frames are logged and dropped.
//! - **Recovery**: every connection end goes through `ReconnectMachine`.
//!   Abnormal closes are retried after a fixed delay until
//!   `max_reconnect_attempts` consecutive connections have failed; a normal
//!   closure (1000) stops quietly.
//! - **Teardown**: `disconnect`/`shutdown` cancel the connection task,
//!   including any pending reconnect sleep, and wait for it to finish.
//!   Dropping the manager cancels the task as well.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::machine::{ConnectionStatus, Directive, LinkState, ReconnectMachine, TransportEvent};
use crate::error::TransportError;
use crate::notifications::model::WireMessage;

type PushSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Retry policy for the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Fixed wait before each reconnect.
    pub reconnect_delay: Duration,
    /// Consecutive failed connections, the first one included, before
    /// entering fallback. Reset by every successful open.
    pub max_reconnect_attempts: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_attempts: 3,
        }
    }
}

/// A running connection task and the token that stops it.
struct ActiveLink {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct TransportManager {
    config: TransportConfig,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    frames_tx: mpsc::UnboundedSender<WireMessage>,
    active: Option<ActiveLink>,
}

impl TransportManager {
    /// Creates an idle manager and the receiving end of its frame channel.
    pub fn new(config: TransportConfig) -> (Self, mpsc::UnboundedReceiver<WireMessage>) {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(ConnectionStatus::default());
        let manager = Self {
            config,
            status_tx: Arc::new(status_tx),
            frames_tx,
            active: None,
        };
        (manager, frames_rx)
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// A receiver that observes every status change.
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Opens the push channel, replacing any live connection.
    ///
    /// # Errors
    /// Returns a `TransportError` when `url` is unusable. No connection attempt
    /// is made in that case and the status is already `Fallback`.
    pub async fn connect(&mut self, url: &str) -> Result<(), TransportError> {
        self.disconnect().await;

        let url = match validate_url(url) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Push channel disabled: {}", e);
                let mut machine = self.machine();
                machine.fail();
                self.status_tx.send_replace(machine.status());
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let link = Link {
            url: url.to_string(),
            machine: self.machine(),
            status_tx: Arc::clone(&self.status_tx),
            frames_tx: self.frames_tx.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(link.run());
        self.active = Some(ActiveLink { cancel, task });
        Ok(())
    }

    /// Closes the live connection (if any) and cancels pending reconnects.
    /// Returns once the connection task has finished.
    pub async fn disconnect(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();
        if let Err(e) = active.task.await {
            log::error!("Push channel task ended abnormally: {}", e);
        }

        self.status_tx.send_modify(|status| {
            if status.state != LinkState::Fallback {
                status.state = LinkState::Disconnected;
            }
        });
    }

    /// Tears the manager down. The frame channel closes once the manager is
    /// dropped, which ends any consumer loop.
    pub async fn shutdown(mut self) {
        self.disconnect().await;
        log::info!("Push channel manager shut down.");
    }

    fn machine(&self) -> ReconnectMachine {
        ReconnectMachine::new(
            self.config.max_reconnect_attempts,
            self.config.reconnect_delay,
        )
    }
}

impl Drop for TransportManager {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

fn validate_url(raw: &str) -> Result<Url, TransportError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TransportError::MissingUrl);
    }
    let url = Url::parse(trimmed).map_err(|e| TransportError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TransportError::UnsupportedScheme(other.to_string())),
    }
}

/// How one connection ended.
enum Ending {
    Closed(Option<u16>),
    Cancelled,
}

/// State owned by the connection task.
struct Link {
    url: String,
    machine: ReconnectMachine,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    frames_tx: mpsc::UnboundedSender<WireMessage>,
    cancel: CancellationToken,
}

impl Link {
    async fn run(mut self) {
        loop {
            self.observe(TransportEvent::Connecting);
            log::info!("Connecting to push channel: {}", self.url);

            let attempt = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                res = connect_async(self.url.as_str()) => res,
            };

            let code = match attempt {
                Ok((socket, _)) => {
                    self.observe(TransportEvent::Opened);
                    log::info!("Push channel connected.");
                    match self.pump(socket).await {
                        Ending::Closed(code) => code,
                        Ending::Cancelled => return,
                    }
                }
                Err(e) => {
                    log::error!("Failed to connect to push channel: {}", e);
                    self.observe(TransportEvent::Errored(e.to_string()));
                    None
                }
            };

            match self.observe_close(code) {
                Directive::Reconnect(delay) => {
                    log::warn!(
                        "Push channel closed (code {:?}). Failure {}/{}, reconnecting in {} ms...",
                        code,
                        self.machine.status().retries,
                        self.machine.max_attempts(),
                        delay.as_millis()
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Directive::Stop => {
                    log::info!("Push channel closed normally.");
                    return;
                }
                Directive::GiveUp => {
                    log::error!("Push channel attempts exhausted. Entering fallback mode.");
                    return;
                }
            }
        }
    }

    /// Reads frames until the connection ends or the task is cancelled.
    async fn pump(&mut self, mut socket: PushSocket) -> Ending {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client teardown".into(),
                    };
                    let _ = tokio::time::timeout(Duration::from_secs(1), socket.close(Some(frame))).await;
                    return Ending::Cancelled;
                }
                msg = socket.next() => msg,
            };

            match next {
                Some(Ok(Message::Text(text))) => self.deliver(text.as_str()),
                Some(Ok(Message::Binary(bin))) => match std::str::from_utf8(&bin) {
                    Ok(text) => self.deliver(text),
                    Err(_) => log::warn!("Discarding non-UTF-8 binary frame ({} bytes)", bin.len()),
                },
                Some(Ok(Message::Close(frame))) => {
                    return Ending::Closed(frame.map(|f| u16::from(f.code)));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::error!("Push channel read error: {}", e);
                    self.observe(TransportEvent::Errored(e.to_string()));
                    return Ending::Closed(None);
                }
                None => {
                    log::warn!("Push channel stream closed by remote host.");
                    return Ending::Closed(None);
                }
            }
        }
    }

    fn deliver(&self, text: &str) {
        match WireMessage::parse(text) {
            Ok(message) => {
                log::trace!("Received push frame: {}", text);
                if self.frames_tx.send(message).is_err() {
                    log::debug!("No consumer attached; push frame dropped.");
                }
            }
            Err(e) => log::warn!("Discarding malformed push frame: {}", e),
        }
    }

    /// Feeds the machine and publishes the resulting status. Nothing is
    /// published once the task has been cancelled.
    fn observe(&mut self, event: TransportEvent) {
        self.machine.on_event(&event);
        self.publish();
    }

    fn observe_close(&mut self, code: Option<u16>) -> Directive {
        let directive = self.machine.on_close(code);
        self.publish();
        directive
    }

    fn publish(&self) {
        if !self.cancel.is_cancelled() {
            self.status_tx.send_replace(self.machine.status());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert_eq!(validate_url(""), Err(TransportError::MissingUrl));
        assert_eq!(validate_url("   "), Err(TransportError::MissingUrl));
        assert!(matches!(
            validate_url("not a url"),
            Err(TransportError::InvalidUrl { .. })
        ));
        assert_eq!(
            validate_url("https://api.example.com/ws"),
            Err(TransportError::UnsupportedScheme("https".to_string()))
        );
        assert!(validate_url("wss://api.example.com/notifications").is_ok());
        assert!(validate_url(" ws://127.0.0.1:9000 ").is_ok());
    }

    #[tokio::test]
    async fn test_empty_url_enters_fallback_without_attempt() {
        let (mut manager, _rx) = TransportManager::new(TransportConfig::default());
        let mut watch = manager.watch();

        let result = manager.connect("").await;
        assert_eq!(result, Err(TransportError::MissingUrl));

        let status = manager.status();
        assert!(status.is_fallback());
        assert_eq!(status.attempts, 0);
        assert!(watch.has_changed().unwrap());
        assert!(watch.borrow_and_update().is_fallback());
    }
}
