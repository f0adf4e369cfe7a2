use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lib_notify::TransportConfig;

const DEFAULT_CONFIG_FILE: &str = "server_notify.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Headless listener for applicant-tracking push notifications", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "NOTIFY_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "NOTIFY_WS_URL", help = "Push-channel WebSocket URL (ws:// or wss://).")]
    pub ws_url: Option<String>,

    #[clap(long, env = "NOTIFY_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "NOTIFY_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "NOTIFY_RECONNECT_DELAY_MS", help = "Fixed delay in milliseconds before each reconnect.")]
    pub reconnect_delay_ms: Option<u64>,

    #[clap(long, env = "NOTIFY_MAX_RECONNECT_ATTEMPTS", help = "Consecutive failed connections, the first included, before fallback mode.")]
    pub max_reconnect_attempts: Option<u32>,

    #[clap(long, env = "NOTIFY_STATUS_INTERVAL_SECONDS", help = "Interval in seconds between status reports.")]
    pub status_interval_seconds: Option<u64>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            ws_url: other.ws_url.or(self.ws_url),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            reconnect_delay_ms: other.reconnect_delay_ms.or(self.reconnect_delay_ms),
            max_reconnect_attempts: other.max_reconnect_attempts.or(self.max_reconnect_attempts),
            status_interval_seconds: other.status_interval_seconds.or(self.status_interval_seconds),
        }
    }

    fn defaults() -> Config {
        Config {
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            reconnect_delay_ms: Some(3000),
            max_reconnect_attempts: Some(3),
            status_interval_seconds: Some(30),
            ..Default::default()
        }
    }

    fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// May be empty; the transport then starts in fallback mode.
    pub ws_url: String,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub status_interval: Duration,
}

impl Settings {
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            reconnect_delay: self.reconnect_delay,
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }
}

impl From<Config> for Settings {
    fn from(config: Config) -> Self {
        let fallback = Config::defaults();
        let config = fallback.merge(config);
        Settings {
            ws_url: config.ws_url.unwrap_or_default(),
            log_dir: config.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: config.log_level.unwrap_or_else(|| "info".to_string()),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms.unwrap_or(3000)),
            max_reconnect_attempts: config.max_reconnect_attempts.unwrap_or(3),
            // A zero interval would make tokio's interval panic.
            status_interval: Duration::from_secs(config.status_interval_seconds.unwrap_or(30).max(1)),
        }
    }
}

/// Settings plus the messages produced while resolving them. Resolution
/// runs before the logger exists, so the messages are held until
/// `log_notes` is called.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub settings: Settings,
    pub notes: Vec<(log::Level, String)>,
}

impl Loaded {
    pub fn log_notes(&self) {
        for (level, note) in &self.notes {
            log::log!(*level, "{}", note);
        }
    }
}

/// Resolves settings from defaults, the config file and `cli` (which already
/// carries environment variables), in increasing order of precedence.
pub fn resolve(cli: Config) -> Loaded {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    let mut notes = Vec::new();

    if config_file_path.exists() {
        match Config::from_file(&config_file_path) {
            Ok(file_config) => {
                current_config = current_config.merge(file_config);
                notes.push((
                    log::Level::Info,
                    format!("Loaded config file {}", config_file_path.display()),
                ));
            }
            Err(e) => notes.push((
                log::Level::Warn,
                format!("{:#}. Falling back to other sources.", e),
            )),
        }
    } else {
        notes.push((
            log::Level::Info,
            format!(
                "Config file not found at {}. Using defaults and environment/CLI variables.",
                config_file_path.display()
            ),
        ));
    }

    Loaded {
        settings: Settings::from(current_config.merge(cli)),
        notes,
    }
}

pub fn load_config() -> Loaded {
    resolve(Config::parse())
}
