// LogScope - main.rs
//
// Console driver entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading and validation
// 3. Logging initialisation (debug mode support)
// 4. File feed + engine wiring and the event pump

use clap::Parser;
use logscope::app::engine::{EngineConfig, LogEngine, SnapshotState};
use logscope::app::file_feed::{FeedConfig, FileFeed, FileFeedHandle};
use logscope::app::observers::{BatchObserver, CountObserver};
use logscope::app::transport::TransportEvent;
use logscope::core::export::{self, ExportFormat};
use logscope::core::model::LogEntry;
use logscope::platform;
use logscope::util;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long `--once` waits for the initial snapshot before giving up.
const ONCE_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// LogScope - live log-stream aggregation for the console.
///
/// Point LogScope at a log file to follow it through the aggregation
/// engine: records are normalised, ordered, bounded, and printed as they
/// arrive, with running error/warning tallies.
#[derive(Parser, Debug)]
#[command(name = "LogScope", version, about)]
struct Cli {
    /// Log file to follow.
    file: PathBuf,

    /// Load one snapshot, print it, and exit (no tailing).
    #[arg(long)]
    once: bool,

    /// Export the loaded snapshot to this path (requires --once).
    #[arg(long, requires = "once")]
    export: Option<PathBuf>,

    /// Export format: csv, json, or text.
    #[arg(long, default_value = "text")]
    format: String,

    /// Maximum entries retained in the window (overrides config).
    #[arg(long)]
    max_entries: Option<usize>,

    /// Records requested per snapshot pull (overrides config).
    #[arg(long)]
    limit: Option<usize>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

// =============================================================================
// Console observers
// =============================================================================

/// Batch observer that prints every entry in display form to stdout.
struct ConsolePrinter;

impl ConsolePrinter {
    fn print_entry(entry: &LogEntry) {
        let ts = chrono::DateTime::from_timestamp_millis(entry.ts)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            .unwrap_or_default();
        println!(
            "{ts} {} {}: {}",
            entry.severity.map(|s| s.short_label()).unwrap_or("  -  "),
            entry.source.as_deref().unwrap_or("-"),
            entry.message
        );
    }
}

impl BatchObserver for ConsolePrinter {
    fn on_batch(&self, entries: &[LogEntry], _size_hint: Option<u64>) {
        for entry in entries {
            Self::print_entry(entry);
        }
    }
}

/// Count observer that reports tally changes on stderr, keeping stdout
/// clean for the timeline itself.
struct TallyPrinter {
    label: &'static str,
}

impl CountObserver for TallyPrinter {
    fn on_count(&self, value: usize) {
        eprintln!("-- {}: {value}", self.label);
    }
}

// =============================================================================
// Entry point
// =============================================================================

fn main() {
    let cli = Cli::parse();

    // Resolve paths and load config first so the configured log level can
    // feed the logging init below.
    let paths = platform::config::PlatformPaths::resolve();
    let (config, config_warnings) = platform::config::load_config(&paths.config_dir);

    util::logging::init(cli.debug, config.log_level.as_deref());

    tracing::info!(
        version = util::constants::APP_VERSION,
        file = %cli.file.display(),
        debug = cli.debug,
        "LogScope starting"
    );

    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    let engine_config = EngineConfig {
        max_entries: cli.max_entries.unwrap_or(config.max_entries),
        fetch_limit: cli.limit.unwrap_or(config.fetch_limit),
        count_errors: config.count_errors,
        count_warnings: config.count_warnings,
    };
    let feed_config = FeedConfig {
        poll_interval_ms: config.poll_interval_ms,
    };

    // The file path doubles as the host identity for the file feed.
    let host = cli.file.display().to_string();

    let (handle, events) = FileFeed::spawn(cli.file.clone(), feed_config);
    let mut engine = LogEngine::new(handle, engine_config);

    if cli.once {
        run_once(engine, events, &host, &cli);
    } else {
        run_tail(&mut engine, events, &host);
    }
}

/// Follow mode: subscribe console observers and pump transport events
/// into the engine until the feed ends.
fn run_tail(
    engine: &mut LogEngine<FileFeedHandle>,
    events: mpsc::Receiver<TransportEvent>,
    host: &str,
) {
    engine.subscribe_batches(Arc::new(ConsolePrinter));
    engine.subscribe_error_count(Arc::new(TallyPrinter { label: "errors" }));
    engine.subscribe_warning_count(Arc::new(TallyPrinter { label: "warnings" }));

    engine.set_active_host(host);

    for event in events {
        match event {
            TransportEvent::Connectivity(connected) => engine.on_connectivity_change(connected),
            TransportEvent::Record { record, size_hint } => {
                engine.on_raw_record(record, size_hint)
            }
            TransportEvent::Snapshot { host, result } => {
                engine.on_snapshot_result(&host, result)
            }
        }
    }

    tracing::info!("Feed ended");
}

/// One-shot mode: load a single snapshot, print it, optionally export it.
fn run_once(
    mut engine: LogEngine<FileFeedHandle>,
    events: mpsc::Receiver<TransportEvent>,
    host: &str,
    cli: &Cli,
) {
    engine.set_active_host(host);

    // Pump events until the snapshot for our host lands (or time out).
    let deadline = Instant::now() + ONCE_SNAPSHOT_TIMEOUT;
    while !engine.is_initialized() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            eprintln!("Error: timed out waiting for the initial snapshot");
            std::process::exit(1);
        }
        match events.recv_timeout(remaining) {
            Ok(TransportEvent::Connectivity(connected)) => {
                engine.on_connectivity_change(connected)
            }
            Ok(TransportEvent::Record { record, size_hint }) => {
                engine.on_raw_record(record, size_hint)
            }
            Ok(TransportEvent::Snapshot { host, result }) => {
                let failed = result.is_err();
                engine.on_snapshot_result(&host, result);
                if failed {
                    eprintln!("Error: snapshot pull failed — see log for details");
                    std::process::exit(1);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                eprintln!("Error: feed terminated before the snapshot arrived");
                std::process::exit(1);
            }
        }
    }

    let SnapshotState::Ready { entries, .. } = engine.snapshot(false) else {
        eprintln!("Error: snapshot did not initialise the window");
        std::process::exit(1);
    };

    for entry in &entries {
        ConsolePrinter::print_entry(entry);
    }
    tracing::info!(
        entries = entries.len(),
        errors = engine.error_total(),
        warnings = engine.warning_total(),
        "Snapshot loaded"
    );

    if let Some(export_path) = &cli.export {
        let format = parse_format(&cli.format);
        if let Err(e) = export_entries(&entries, export_path, format) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        tracing::info!(path = %export_path.display(), format = %cli.format, "Snapshot exported");
    }
}

fn parse_format(format: &str) -> ExportFormat {
    match format {
        "csv" => ExportFormat::Csv,
        "json" => ExportFormat::Json,
        "text" => ExportFormat::Text,
        other => {
            eprintln!("Error: unknown export format '{other}' (expected csv, json, or text)");
            std::process::exit(1);
        }
    }
}

fn export_entries(
    entries: &[LogEntry],
    path: &PathBuf,
    format: ExportFormat,
) -> Result<usize, util::error::LogScopeError> {
    let file = std::fs::File::create(path).map_err(|source| {
        util::error::LogScopeError::Export(util::error::ExportError::Io {
            path: path.clone(),
            source,
        })
    })?;

    let count = match format {
        ExportFormat::Csv => export::export_csv(entries, file, path)?,
        ExportFormat::Json => export::export_json(entries, file, path)?,
        ExportFormat::Text => export::export_text(entries, file, path)?,
    };
    Ok(count)
}
