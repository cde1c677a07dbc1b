use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::services::agent::PrintMode;

/// Queue server configuration, read from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0:5000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Shared secret agents send in `X-API-Key`. Unset or empty leaves the
    /// queue endpoints open.
    #[serde(default)]
    pub print_agent_api_key: Option<String>,

    /// When false, uploaded labels are stored but never queued.
    #[serde(default = "default_true")]
    pub remote_printing: bool,

    /// Directory rendered labels are written to before being queued.
    #[serde(default = "default_labels_dir")]
    pub labels_dir: PathBuf,

    /// Seconds between purge sweeps; 0 disables the background purge.
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,

    /// Terminal jobs older than this many seconds are purged.
    #[serde(default = "default_purge_max_age")]
    pub purge_max_age_secs: u64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            print_agent_api_key: None,
            remote_printing: true,
            labels_dir: default_labels_dir(),
            purge_interval_secs: default_purge_interval(),
            purge_max_age_secs: default_purge_max_age(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// The configured shared secret, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.print_agent_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
    }

    /// Purge tick, or `None` when the background purge is disabled.
    pub fn purge_interval(&self) -> Option<Duration> {
        (self.purge_interval_secs > 0)
            .then(|| Duration::from_secs(self.purge_interval_secs.min(MAX_DURATION_SECS)))
    }

    /// Age after which terminal jobs are purged, capped at ten years.
    pub fn purge_max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.purge_max_age_secs.min(MAX_DURATION_SECS) as i64)
    }
}

/// Upper bound for any configured duration (ten years).
const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 3600;

/// Shortest request timeout the agent will use.
const MIN_REQUEST_TIMEOUT_SECS: u64 = 1;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Print agent configuration, read from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Queue server base URL.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Local printer name, also reported to the server on completion.
    #[serde(default = "default_printer_name")]
    pub printer_name: String,

    /// Seconds between polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    #[serde(default)]
    pub print_agent_api_key: Option<String>,

    /// Root of the local labels tree.
    #[serde(default = "default_labels_dir")]
    pub labels_root: PathBuf,

    /// Port for the local operator interface; 0 disables it.
    #[serde(default = "default_local_port")]
    pub local_port: u16,

    #[serde(default = "default_print_mode")]
    pub print_mode: PrintMode,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// `;`-separated `lp -o` options.
    #[serde(default = "default_print_options")]
    pub print_options: String,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// HTTP timeout for listing calls, clamped to 1..=600 seconds.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .clamp(MIN_REQUEST_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Time between polls, at least one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval.clamp(1, MAX_DURATION_SECS))
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_labels_dir() -> PathBuf {
    PathBuf::from("labels")
}

fn default_purge_interval() -> u64 {
    3600
}

fn default_purge_max_age() -> u64 {
    24 * 3600
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_printer_name() -> String {
    "Brother_DCP_L2530DW_series".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_local_port() -> u16 {
    8765
}

fn default_print_mode() -> PrintMode {
    PrintMode::Save
}

fn default_request_timeout() -> u64 {
    30
}

fn default_print_options() -> String {
    "media=Custom.120x220mm,labels;InputSlot=manual".to_string()
}
