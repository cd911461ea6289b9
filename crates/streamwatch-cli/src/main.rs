//! Streamwatch - periodic health checks for network video streams
//!
//! The `streamwatch` command probes every stream in the inventory with
//! ffmpeg and reports one status line per stream.
//!
//! ## Commands
//!
//! - `watch`: run a health-check cycle every interval until Ctrl-C
//! - `check`: run a single cycle; exit code 2 if any stream is unhealthy
//! - `classify`: show which category a piece of probe output falls into

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};

use streamwatch_core::{
    classify_failure, JsonLinesSink, LineSink, ResultSink, RunCoordinator, RunReport, Scheduler,
    WatchConfig,
};
use streamwatch_inventory::{InventoryProvider, JsonFileInventory, PostgresInventory, Stream};

/// Exit code of `check` when at least one stream is not healthy.
const EXIT_UNHEALTHY: u8 = 2;

#[derive(Parser)]
#[command(name = "streamwatch")]
#[command(author = "Streamwatch Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Health checks for RTSP camera streams", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "STREAMWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the inventory every interval until interrupted
    Watch {
        /// Seconds between the start of consecutive cycles
        #[arg(long)]
        interval_secs: Option<u64>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Probe the inventory once and exit
    Check {
        /// Probe these streams instead of the inventory (`name=url`, repeatable)
        #[arg(long = "stream", value_name = "NAME=URL", value_parser = parse_stream_arg)]
        streams: Vec<(String, String)>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the category assigned to probe failure output
    Classify {
        /// Failure text (read from stdin when omitted)
        #[arg(long)]
        text: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Maximum number of probes running at once
    #[arg(long)]
    pool_size: Option<usize>,

    /// Per-probe deadline in milliseconds
    #[arg(long)]
    probe_timeout_ms: Option<u64>,

    /// Read streams from a JSON file instead of PostgreSQL
    #[arg(long)]
    inventory_file: Option<PathBuf>,

    /// Result format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Append the first diagnostic line to unhealthy results
    #[arg(long)]
    details: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    streamwatch_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Watch { interval_secs, run } => {
            let mut config = load_config(cli.config.as_deref(), &run)?;
            if let Some(secs) = interval_secs {
                config.schedule.interval_secs = secs;
            }
            config.validate().context("Invalid configuration")?;
            cmd_watch(config, &run).await
        }
        Commands::Check { streams, run } => {
            let config = load_config(cli.config.as_deref(), &run)?;
            config.validate().context("Invalid configuration")?;
            cmd_check(config, &run, streams).await
        }
        Commands::Classify { text } => cmd_classify(text),
    }
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(path: Option<&Path>, run: &RunArgs) -> Result<WatchConfig> {
    let mut config = match path {
        Some(path) => WatchConfig::from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => WatchConfig::default(),
    };

    if let Some(size) = run.pool_size {
        config.pool.capacity = size;
    }
    if let Some(deadline_ms) = run.probe_timeout_ms {
        config.probe.deadline_ms = deadline_ms;
        if config.probe.connect_timeout_ms >= deadline_ms {
            config.probe.connect_timeout_ms = deadline_ms / 2;
        }
    }
    if let Some(file) = &run.inventory_file {
        config.inventory.file = Some(file.clone());
    }
    Ok(config)
}

fn build_inventory(config: &WatchConfig) -> Result<Arc<dyn InventoryProvider>> {
    match &config.inventory.file {
        Some(path) => Ok(Arc::new(JsonFileInventory::new(path))),
        None => {
            let inventory = PostgresInventory::from_env(config.inventory.table.clone())
                .context("Failed to configure PostgreSQL inventory")?;
            Ok(Arc::new(inventory))
        }
    }
}

fn build_sink(run: &RunArgs) -> Arc<dyn ResultSink> {
    match run.output {
        OutputFormat::Text => Arc::new(LineSink::stdout().with_detail(run.details)),
        OutputFormat::Json => Arc::new(JsonLinesSink::stdout()),
    }
}

async fn cmd_watch(config: WatchConfig, run: &RunArgs) -> Result<ExitCode> {
    let inventory = build_inventory(&config)?;
    let interval = config.schedule.interval();
    let coordinator = Arc::new(RunCoordinator::with_ffmpeg(config)?);
    let scheduler = Scheduler::new(coordinator, Arc::clone(&inventory), build_sink(run), interval);

    info!(
        inventory = %inventory.describe(),
        interval_secs = interval.as_secs(),
        "watching streams; press Ctrl-C to stop"
    );
    let cycles = scheduler.run_until(shutdown_signal()).await;
    info!(cycles, "stopped");
    Ok(ExitCode::SUCCESS)
}

async fn cmd_check(
    config: WatchConfig,
    run: &RunArgs,
    streams: Vec<(String, String)>,
) -> Result<ExitCode> {
    let sink = build_sink(run);

    let report = if streams.is_empty() {
        let inventory = build_inventory(&config)?;
        let interval = config.schedule.interval();
        let coordinator = Arc::new(RunCoordinator::with_ffmpeg(config)?);
        Scheduler::new(coordinator, inventory, sink, interval)
            .run_cycle()
            .await
            .context("Health check cycle failed")?
    } else {
        let coordinator = RunCoordinator::with_ffmpeg(config)?;
        let report = coordinator.run(numbered_streams(streams)).await;
        sink.deliver(&report).context("Failed to write results")?;
        report
    };

    Ok(ExitCode::from(check_exit_status(&report)))
}

fn cmd_classify(text: Option<String>) -> Result<ExitCode> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read failure text from stdin")?;
            buf
        }
    };
    println!("{}", classify_failure(&text));
    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested; finishing current cycle");
}

fn check_exit_status(report: &RunReport) -> u8 {
    if report.unhealthy_count() > 0 {
        EXIT_UNHEALTHY
    } else {
        0
    }
}

/// Ad hoc streams are numbered from 1 in the order given.
fn numbered_streams(pairs: Vec<(String, String)>) -> Vec<Stream> {
    pairs
        .into_iter()
        .zip(1..)
        .map(|((name, url), id)| Stream::new(id, name, url))
        .collect()
}

fn parse_stream_arg(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=URL, got {raw:?}"))?;
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() || url.is_empty() {
        return Err(format!("expected NAME=URL, got {raw:?}"));
    }
    Ok((name.to_string(), url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clap::CommandFactory;
    use streamwatch_core::{HealthResult, HealthStatus};

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_stream_arg() {
        assert_eq!(
            parse_stream_arg("Gate=rtsp://10.0.0.2/live?a=b").unwrap(),
            ("Gate".to_string(), "rtsp://10.0.0.2/live?a=b".to_string())
        );
        assert!(parse_stream_arg("no-separator").is_err());
        assert!(parse_stream_arg("=rtsp://x").is_err());
        assert!(parse_stream_arg("name=").is_err());
    }

    #[test]
    fn test_check_accepts_repeated_streams() {
        let cli = Cli::try_parse_from([
            "streamwatch",
            "check",
            "--stream",
            "Gate=rtsp://gate",
            "--stream",
            "Dock=rtsp://dock",
            "--output",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Check { streams, run } => {
                assert_eq!(streams.len(), 2);
                assert_eq!(run.output, OutputFormat::Json);
                let numbered = numbered_streams(streams);
                assert_eq!(numbered[0].id, 1);
                assert_eq!(numbered[1].name, "Dock");
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamwatch.toml");
        std::fs::write(&path, "[pool]\ncapacity = 4\n[probe]\nconnect_timeout_ms = 8000\n").unwrap();

        let run = RunArgs {
            probe_timeout_ms: Some(5_000),
            inventory_file: Some(PathBuf::from("streams.json")),
            ..RunArgs::default()
        };
        let config = load_config(Some(&path), &run).unwrap();

        assert_eq!(config.pool.capacity, 4);
        assert_eq!(config.probe.deadline_ms, 5_000);
        assert_eq!(config.probe.connect_timeout_ms, 2_500);
        assert_eq!(config.inventory.file, Some(PathBuf::from("streams.json")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/streamwatch.toml")), &RunArgs::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load config"));
    }

    #[test]
    fn test_exit_code_reflects_unhealthy_streams() {
        let stream = Stream::new(1, "Gate", "rtsp://gate");
        let mut report = RunReport {
            run_id: uuid::Uuid::nil(),
            started_at: Utc::now(),
            duration_ms: 1,
            submitted: 1,
            results: vec![HealthResult::healthy(&stream)],
        };
        assert_eq!(check_exit_status(&report), 0);

        report.results = vec![HealthResult::failed(&stream, HealthStatus::TimedOut, "killed")];
        assert_eq!(check_exit_status(&report), EXIT_UNHEALTHY);
    }
}
