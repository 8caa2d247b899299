//! Opsgenie Alerts Manager
//!
//! Daemon entry point: parse environment-backed configuration, initialize
//! logging, bind the metrics listener, and hand control to the scheduler's
//! polling loop until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opsgenie_alerts_manager::error::Result;
use opsgenie_alerts_manager::job::RunJob;
use opsgenie_alerts_manager::metrics::RunMetrics;
use opsgenie_alerts_manager::opsgenie::{OpsgenieClient, OpsgenieConfig};
use opsgenie_alerts_manager::scheduler::{DailySchedule, Scheduler};
use opsgenie_alerts_manager::server::MetricsServer;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Opsgenie Alerts Manager - closes matching alerts once a day
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local time of day (HH:MM, 24-hour) at which the daily run fires
    #[arg(long, env = "SCHEDULER_TIME", default_value = "17:00")]
    scheduler_time: String,

    /// Opsgenie API key
    #[arg(long, env = "OPSGENIE_API_KEY", default_value = "", hide_env_values = true)]
    opsgenie_api_key: String,

    /// Opsgenie alert search query
    #[arg(long, env = "OPSGENIE_QUERY", default_value = "")]
    opsgenie_query: String,

    /// Maximum number of alerts listed per run
    #[arg(
        long,
        env = "OPSGENIE_QUERY_LIMIT",
        default_value = "100",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    opsgenie_query_limit: u32,

    /// Opsgenie API base URL
    #[arg(long, env = "OPSGENIE_API_URL", default_value = "https://api.opsgenie.com")]
    opsgenie_api_url: String,

    /// Timeout in seconds for Opsgenie requests; unset means no timeout
    #[arg(long, env = "OPSGENIE_TIMEOUT_SECONDS")]
    opsgenie_timeout_seconds: Option<u64>,

    /// Seconds between scheduler polls
    #[arg(
        long,
        env = "MAIN_LOOP_SLEEP_INTERVAL",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    main_loop_sleep_interval: u64,

    /// TCP port the metrics endpoint listens on
    #[arg(long, env = "LISTEN_PORT", default_value = "9647")]
    listen_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Opsgenie Alerts Manager");
    info!("  Scheduler time: {}", args.scheduler_time);
    info!("  Query: {:?}", args.opsgenie_query);
    info!("  Query limit: {}", args.opsgenie_query_limit);
    info!("  Poll interval: {}s", args.main_loop_sleep_interval);
    info!("  Listen port: {}", args.listen_port);

    if args.opsgenie_api_key.is_empty() {
        warn!("OPSGENIE_API_KEY is empty; alert listing will be rejected");
    }
    if args.opsgenie_query.is_empty() {
        warn!("OPSGENIE_QUERY is empty; the listing is unfiltered");
    }

    let fire_at = DailySchedule::parse_time(&args.scheduler_time)?;

    let metrics = RunMetrics::new()?;

    let client = OpsgenieClient::new(OpsgenieConfig {
        api_url: args.opsgenie_api_url.clone(),
        api_key: args.opsgenie_api_key.clone(),
        query: args.opsgenie_query.clone(),
        query_limit: args.opsgenie_query_limit,
        timeout: args.opsgenie_timeout_seconds.map(Duration::from_secs),
    })?;

    // Bind before the loop starts so a bad port fails the process instead of
    // a background task.
    let addr = SocketAddr::from(([0, 0, 0, 0], args.listen_port));
    let server = MetricsServer::bind(addr, metrics.clone()).await?;
    tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            error!("Metrics server error: {}", e);
        }
    });

    let job = RunJob::new(Arc::new(client), metrics);
    let schedule = DailySchedule::new(fire_at, Local::now().naive_local());
    let scheduler = Scheduler::new(
        schedule,
        Duration::from_secs(args.main_loop_sleep_interval),
        job,
    );

    scheduler.run().await;

    info!("Shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
