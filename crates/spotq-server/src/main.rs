//! spotq-server: runs the spot allocation service over HTTP.
//!
//! ```sh
//! spotq-server --spots 4 --announce-url https://hooks.example.com/T000/B000
//! ```
//!
//! Chat integrations post `{"user": ..., "text": ...}` to `/commands`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use spotq::transport::{ServerConfig, serve};
use spotq::{AnnouncerConfig, ChatAnnouncer, SpotConfig, SpotService, VersionInfo};

#[derive(Parser, Debug)]
#[command(name = "spotq-server", version)]
#[command(about = "First-come spot allocation bot with a waiting queue")]
struct Args {
    /// Bind address for the HTTP server.
    #[arg(long, default_value = "0.0.0.0", env = "SPOTQ_HOST")]
    host: String,

    /// HTTP port to listen on.
    #[arg(short, long, default_value_t = 3000, env = "SPOTQ_PORT")]
    port: u16,

    /// Number of spots in the pool.
    #[arg(short, long, default_value_t = spotq::config::DEFAULT_NUM_SPOTS, env = "SPOTQ_NUM_SPOTS")]
    spots: usize,

    /// Seconds a spot may be held before CHECK warns about it.
    #[arg(long, default_value_t = 3 * 60 * 60, env = "SPOTQ_OVERDUE_SECS")]
    overdue_secs: u64,

    /// Incoming-webhook URL that outcome lines and announcements are posted to.
    #[arg(long, env = "SPOTQ_ANNOUNCE_URL")]
    announce_url: Option<String>,

    /// Bearer token for the announce URL.
    #[arg(long, env = "SPOTQ_ANNOUNCE_TOKEN", hide_env_values = true)]
    announce_token: Option<String>,

    /// Chat channel named in announcements.
    #[arg(long, default_value = "#parking", env = "SPOTQ_CHANNEL")]
    channel: String,

    /// Ignore SIGTERM; stop only on SIGINT or POST /shutdown.
    #[arg(long, env = "SPOTQ_AWAIT_EXPLICIT_SHUTDOWN")]
    await_explicit_shutdown: bool,

    /// Build identifier reported by /health-check.
    #[arg(long, env = "SPOTQ_BUILD")]
    build: Option<String>,
}

/// Initialize tracing with SPOTQ_LOG and LOG_FORMAT support.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("SPOTQ_LOG").as_deref() {
            Ok("debug") => "debug",
            Ok("trace") => "trace",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("spotq={level},spotq_server={level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    info!("spotq {}", spotq::SPOTQ_VERSION);

    let config = SpotConfig::new(args.spots, Duration::from_secs(args.overdue_secs))
        .context("invalid pool configuration")?;

    let mut version = VersionInfo::new();
    if let Some(build) = args.build {
        version = version.with_build(build);
    }

    let mut service = SpotService::new(config).with_version(version);

    match args.announce_url {
        Some(url) => {
            let announcer = ChatAnnouncer::new(
                url,
                AnnouncerConfig {
                    channel: args.channel,
                    token: args.announce_token,
                    ..Default::default()
                },
            )
            .context("failed to create chat announcer")?;
            info!(url = %announcer.url(), channel = %announcer.channel(), "Chat announcer enabled");
            service = service.with_announcer(Arc::new(announcer));
        }
        None => info!("No announce URL configured, replying over HTTP only"),
    }

    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
        await_explicit_shutdown: args.await_explicit_shutdown,
    };

    serve(server_config, Arc::new(service)).await
}
