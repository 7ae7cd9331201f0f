use clap::Parser;
use color_eyre::eyre::Result;
use oldguard_client::{
    client,
    config::{
        AppConfig,
        DEFAULT_BAN_THRESHOLD,
        DEFAULT_LOG_DIR,
        DEFAULT_POLL_INTERVAL,
        DEFAULT_SERVER_URL,
        RenderPolicy,
    },
};
use std::{
    path::PathBuf,
    time::Duration,
};
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

#[derive(Parser, Debug)]
#[command(name = "oldguard", about = "Terminal client for the OldGuard ledger")]
struct Args {
    /// Base URL of the ledger service
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// How often to poll the chain, in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    poll_interval_ms: u64,

    /// Scores strictly below this are shown as banned
    #[arg(long, default_value_t = DEFAULT_BAN_THRESHOLD, allow_negative_numbers = true)]
    ban_threshold: i64,

    /// Directory for the daily rolling log file
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        AppConfig {
            server_url: args.server_url,
            poll_interval: Duration::from_millis(args.poll_interval_ms.max(1)),
            render: RenderPolicy {
                ban_threshold: args.ban_threshold,
            },
            log_dir: args.log_dir,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = AppConfig::from(Args::parse());

    // The terminal belongs to the UI, so traces go to a file.
    let file_appender = rolling::daily(&config.log_dir, "oldguard.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    client::run_app(config).await
}
