use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use aqmon_service::config::ServiceConfig;
use aqmon_service::ingest::{offset_from_hours, Fetcher, FileFetcher, HttpFetcher};
use aqmon_service::logging::init_logging;
use aqmon_service::notify::{FanoutNotifier, LogNotifier, Notifier, WebhookNotifier};
use aqmon_service::pipeline::Pipeline;
use aqmon_service::store::open_stores;
use aqmon_service::verify;

#[derive(Parser, Debug)]
#[command(name = "aqmon")]
#[command(about = "Air-quality sensor ingestion and health monitoring")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "aqmon.toml")]
    config: PathBuf,

    /// Run a single cycle and exit (default when no interval is given)
    #[arg(long, conflicts_with = "interval_minutes")]
    once: bool,

    /// Run a cycle every N minutes until killed
    #[arg(short, long)]
    interval_minutes: Option<u64>,

    /// Fetch every channel once, print a verification report and exit
    #[arg(long)]
    verify: bool,

    /// Read channel payloads from saved files under this directory instead of HTTP
    #[arg(long)]
    replay_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also append log output to this file
    #[arg(long)]
    log_file: Option<String>,
}

fn build_fetcher(
    config: &ServiceConfig,
    replay_dir: Option<PathBuf>,
) -> Result<Arc<dyn Fetcher>, Box<dyn std::error::Error>> {
    match replay_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "replaying saved payloads");
            let offset = offset_from_hours(config.source.utc_offset_hours)?;
            Ok(Arc::new(FileFetcher::new(Some(dir), offset)))
        }
        None => Ok(Arc::new(HttpFetcher::new(&config.source)?)),
    }
}

fn build_notifier(config: &ServiceConfig) -> Result<Arc<dyn Notifier>, Box<dyn std::error::Error>> {
    match &config.notify.webhook_url {
        Some(url) => {
            tracing::info!("webhook notifications enabled");
            Ok(Arc::new(FanoutNotifier::new(vec![
                Box::new(LogNotifier),
                Box::new(WebhookNotifier::new(url.clone())?),
            ])))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}

/// Sleep between cycles; at least one minute, saturating on absurd values.
fn cycle_interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.max(1).saturating_mul(60))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let config = ServiceConfig::load(&args.config)?;
    tracing::info!(
        config = %args.config.display(),
        channels = config.channels.len(),
        "configuration loaded"
    );

    let fetcher = build_fetcher(&config, args.replay_dir)?;

    if args.verify {
        let report = verify::run_verification(
            fetcher.as_ref(),
            &config.channels,
            &config.pipeline.staleness(),
        );
        verify::print_summary(&report);
        return Ok(());
    }

    let (store, warnings) = open_stores(&config.storage)?;
    let notifier = build_notifier(&config)?;
    let pipeline = Pipeline::new(fetcher, store, warnings, notifier, config.pipeline.clone());

    match args.interval_minutes {
        Some(minutes) if !args.once => {
            let interval = cycle_interval(minutes);
            tracing::info!(interval_secs = interval.as_secs(), "starting monitoring loop");
            loop {
                pipeline.run_cycle(&config.channels);
                std::thread::sleep(interval);
            }
        }
        _ => {
            let report = pipeline.run_cycle(&config.channels);
            if report.failed() == report.results.len() && !report.results.is_empty() {
                return Err("every channel failed".into());
            }
            Ok(())
        }
    }
}
