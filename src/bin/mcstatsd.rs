//! mcstatsd - memcached stats polling daemon.
//!
//! Polls a memcached server's `stats` command at a fixed interval and emits
//! the published metrics either as log lines or as JSON lines on stdout.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use mcstats::collector::{StatsClient, TcpConnector};
use mcstats::config::{Config, LogConfig, MIN_INTERVAL_SECS};
use mcstats::logging::{TracingSink, init_logging};
use mcstats::registry::Registry;
use mcstats::snapshot::{Snapshot, StatValue};

/// memcached stats polling daemon.
#[derive(Parser)]
#[command(name = "mcstatsd", about = "memcached stats polling daemon", version)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<String>,

    /// memcached host (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// memcached port (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Poll interval in seconds (overrides the config file).
    #[arg(short, long)]
    interval: Option<u64>,

    /// Poll once and exit; the exit status reports success.
    #[arg(long)]
    once: bool,

    /// Print each snapshot as one JSON line on stdout.
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// One JSON output record.
#[derive(Serialize)]
struct Record<'a> {
    timestamp: i64,
    host: &'a str,
    port: u16,
    stats: &'a Snapshot,
}

/// Applies command-line overrides on top of the file configuration.
fn merge_args(mut config: Config, args: &Args) -> Config {
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(interval) = args.interval {
        config.interval_secs = interval;
    }

    let level = if args.quiet {
        Some("ERROR")
    } else {
        match args.verbose {
            0 => None,
            1 => Some("DEBUG"),
            _ => Some("TRACE"),
        }
    };
    if let Some(level) = level {
        config.log.get_or_insert_with(LogConfig::default).level = level.to_string();
    }
    config
}

/// Formats the published metrics of a snapshot as `name=value unit` pairs.
fn describe_snapshot(snapshot: &Snapshot, registry: &Registry) -> String {
    snapshot
        .published(registry)
        .map(|(def, value)| match value {
            StatValue::Number(n) => format!("{}={:.4}{}", def.name, n, def.unit),
            StatValue::Text(t) => format!("{}={}{}", def.name, t, def.unit),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn emit(snapshot: &Snapshot, config: &Config, registry: &Registry, json: bool) {
    if !json {
        info!("{}", describe_snapshot(snapshot, registry));
        return;
    }
    let record = Record {
        timestamp: Utc::now().timestamp(),
        host: &config.host,
        port: config.port,
        stats: snapshot,
    };
    match serde_json::to_string(&record) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Failed to serialize snapshot: {}", e),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Logging is not up yet, so a bad config file is reported after init.
    let (file_config, load_error) = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
        None => (Config::default(), None),
    };
    let config = merge_args(file_config, &args);

    let _guard = init_logging(config.log.as_ref());
    if let Some(e) = load_error {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    info!("mcstatsd {} starting", env!("CARGO_PKG_VERSION"));
    if config.interval_secs < MIN_INTERVAL_SECS {
        warn!(
            "interval_secs = {} is too short, using {}s",
            config.interval_secs, MIN_INTERVAL_SECS
        );
    }
    info!(
        "Config: target={}:{}, interval={}s, timeout={:?}",
        config.host,
        config.port,
        config.interval().as_secs(),
        config.timeout_secs
    );

    let connector = TcpConnector::new().with_timeout(config.timeout());
    let mut client = StatsClient::new(connector, TracingSink);
    let registry = client.registry();

    if args.once {
        return match client.poll(&config.host, config.port) {
            Ok(snapshot) => {
                emit(&snapshot, &config, registry, args.json);
                ExitCode::SUCCESS
            }
            Err(_) => ExitCode::FAILURE,
        };
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let interval = config.interval();
    let mut poll_count: u64 = 0;
    info!("Starting poll loop");

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        poll_count += 1;

        // Failures are already logged by the client; this poll has no data.
        if let Ok(snapshot) = client.poll(&config.host, config.port) {
            debug!("Poll #{}: {} stats", poll_count, snapshot.len());
            emit(&snapshot, &config, registry, args.json);
        }

        // Sleep in short steps so Ctrl-C is noticed promptly.
        while running.load(Ordering::SeqCst) && started.elapsed() < interval {
            let remaining = interval.saturating_sub(started.elapsed());
            std::thread::sleep(remaining.min(Duration::from_millis(200)));
        }
    }

    info!("mcstatsd stopped after {} polls", poll_count);
    ExitCode::SUCCESS
}
