//! Runtime configuration for the ledger client.
//!
//! Everything the client would otherwise hard-code lives here with a
//! documented default:
//!
//! - where the ledger service is (`server_url`),
//! - how often the sync loop polls it (`poll_interval`),
//! - the score below which a user is shown as banned (`ban_threshold`),
//! - where the trace log is written (`log_dir`).

use std::{
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
/// A score strictly below this value marks the user as banned.
pub const DEFAULT_BAN_THRESHOLD: i64 = -1;
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Display policy for the score ranking.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RenderPolicy {
    pub ban_threshold: i64,
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            ban_threshold: DEFAULT_BAN_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base URL of the ledger service, without a trailing slash.
    pub server_url: String,
    pub poll_interval: Duration,
    pub render: RenderPolicy,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            render: RenderPolicy::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}
