//! # Notification Listener
//!
//! Connects to the applicant-tracking push channel, runs every frame through
//! the deduplication filter and prints accepted notifications as JSON lines.
//! When no URL is configured, or the retry budget runs out, it keeps running
//! in fallback mode and reports that instead of exiting.

use anyhow::Result;
use tokio::signal;

use lib_notify::notifications::{DedupFilter, NotificationCenter};
use lib_notify::{pipeline, TransportManager};

mod notify_logic;
use notify_logic::{config, logger, monitor};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let loaded = config::load_config();
    let settings = &loaded.settings;
    logger::setup_logging(&settings.log_dir, &settings.log_level)?;
    loaded.log_notes();

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    let (mut manager, frames) = TransportManager::new(settings.transport_config());
    let center = NotificationCenter::new(DedupFilter::new(), manager.watch());

    let pipeline_handle = tokio::spawn(pipeline::run(frames, center.clone()));
    let monitor_handle = tokio::spawn(monitor::run(
        settings.status_interval,
        center.clone(),
        shutdown_tx.subscribe(),
    ));

    if let Err(e) = manager.connect(&settings.ws_url).await {
        log::warn!("Running in fallback mode: {}", e);
    }

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("SIGTERM handler unavailable: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());
    manager.shutdown().await;

    // Wait for components to shut down
    let (stats, _) = tokio::try_join!(pipeline_handle, monitor_handle)?;
    log::info!(
        "Shutdown complete. {} notifications accepted this session.",
        stats.accepted
    );
    Ok(())
}
