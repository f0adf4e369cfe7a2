use lib_notify::notifications::{ConnectionFlags, Notification, NotificationCenter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;

/// Prints accepted notifications as JSON lines on stdout and reports the
/// connection state every `status_interval` until shutdown.
pub async fn run(status_interval: Duration, center: NotificationCenter, mut shutdown: broadcast::Receiver<()>) {
    let mut check_interval = interval(status_interval);
    let mut feed = center.subscribe();
    let mut last_flags: Option<ConnectionFlags> = None;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Monitor service received shutdown signal.");
                break;
            }
            received = feed.recv() => {
                match received {
                    Ok(notification) => print_notification(&notification),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Monitor fell behind; {} notifications not printed.", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = check_interval.tick() => {
                let flags = center.connection_state();
                if last_flags != Some(flags) {
                    if flags.fallback {
                        log::warn!("Push channel in fallback mode. Live updates are unavailable.");
                    } else if flags.connected {
                        log::info!("Push channel connected.");
                    } else {
                        log::info!("Push channel disconnected.");
                    }
                    last_flags = Some(flags);
                }
                log::debug!("{} notifications retained.", center.len());
            }
        }
    }
}

fn print_notification(notification: &Arc<Notification>) {
    match serde_json::to_string(notification.as_ref()) {
        Ok(line) => println!("{}", line),
        Err(e) => log::error!("Failed to serialize notification '{}': {}", notification.id, e),
    }
}
