//! Pulse CLI - Command-line interface for Inbox Pulse
//!
//! Commands:
//! - scan: Read a chat export and write a score snapshot
//! - report: Turn a score snapshot into a CSV report
//! - run: Scan and report in one go, keeping the snapshot
//! - inspect: Summarize a score snapshot

use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use inbox_pulse::pipeline::DEFAULT_INCREMENT;
use inbox_pulse::smoothing::DEFAULT_SMOOTHING_WINDOW;
use inbox_pulse::{
    CsvReportWriter, Increment, NamePool, PulseError, PulseProcessor, ReportOptions,
    ScoreMatrix, ScoreSnapshot, PULSE_VERSION,
};

/// Pulse - activity time series from exported chat archives
#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = PULSE_VERSION)]
#[command(about = "Turn chat exports into smoothed per-conversation activity reports", long_about = None)]
struct Cli {
    /// Log debug detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a chat export and write a score snapshot
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Snapshot output path
        #[arg(short, long, default_value = "scores.json")]
        output: PathBuf,
    },

    /// Turn a score snapshot into a CSV report
    Report {
        /// Snapshot to read
        #[arg(short, long, default_value = "scores.json")]
        scores: PathBuf,

        /// CSV output path (use - for stdout)
        #[arg(short, long, default_value = "scores.csv")]
        output: PathBuf,

        /// Number of windows in the moving average
        #[arg(
            long,
            default_value_t = DEFAULT_SMOOTHING_WINDOW,
            value_parser = smoothing_window_parser()
        )]
        smoothing_window: usize,
    },

    /// Scan an export and write both the snapshot and the CSV report
    Run {
        #[command(flatten)]
        scan: ScanArgs,

        /// Snapshot output path
        #[arg(long, default_value = "scores.json")]
        scores: PathBuf,

        /// CSV output path (use - for stdout)
        #[arg(short, long, default_value = "scores.csv")]
        output: PathBuf,

        /// Number of windows in the moving average
        #[arg(
            long,
            default_value_t = DEFAULT_SMOOTHING_WINDOW,
            value_parser = smoothing_window_parser()
        )]
        smoothing_window: usize,
    },

    /// Summarize a score snapshot
    Inspect {
        /// Snapshot to read
        #[arg(short, long, default_value = "scores.json")]
        scores: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Export root containing messages/inbox
    #[arg(long)]
    base_dir: PathBuf,

    /// Your display name in the export
    #[arg(long)]
    name: String,

    /// Window width: integer followed by h (hours), d (days) or m (months)
    #[arg(long, default_value = DEFAULT_INCREMENT)]
    increment: String,

    /// Replace names with names from this file (one per line)
    #[arg(long)]
    random_names: Option<PathBuf>,
}

/// Smoothing windows start at 1; zero is rejected while parsing arguments
fn smoothing_window_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), PulseCliError> {
    match cli.command {
        Commands::Scan { scan, output } => {
            let snapshot = scan_processor(&scan)?.scan(&scan.base_dir)?;
            snapshot.save(&output)?;
            tracing::info!(path = %output.display(), "Wrote score snapshot");
            Ok(())
        }

        Commands::Report {
            scores,
            output,
            smoothing_window,
        } => {
            let options = report_options(smoothing_window)?;
            let snapshot = ScoreSnapshot::load(&scores)?;
            let matrix = inbox_pulse::report_snapshot(&snapshot, &options)?;
            write_report(&matrix, &output)
        }

        Commands::Run {
            scan,
            scores,
            output,
            smoothing_window,
        } => {
            // Every option is checked before the scan starts
            let options = report_options(smoothing_window)?;
            let mut processor = scan_processor(&scan)?.with_report_options(options);

            let snapshot = processor.scan(&scan.base_dir)?;
            snapshot.save(&scores)?;
            tracing::info!(path = %scores.display(), "Wrote score snapshot");

            // Re-read so the report is built from exactly what was persisted
            let snapshot = ScoreSnapshot::load(&scores)?;
            let matrix = processor.report(&snapshot)?;
            write_report(&matrix, &output)
        }

        Commands::Inspect { scores, json } => cmd_inspect(&scores, json),
    }
}

fn report_options(smoothing_window: usize) -> Result<ReportOptions, PulseCliError> {
    let options = ReportOptions::default().with_smoothing_window(smoothing_window);
    options.validate()?;
    Ok(options)
}

fn scan_processor(args: &ScanArgs) -> Result<PulseProcessor, PulseCliError> {
    let increment: Increment = args.increment.parse()?;

    let mut processor = PulseProcessor::new(args.name.clone(), increment);
    if let Some(path) = &args.random_names {
        processor = processor.with_name_pool(NamePool::from_file(path)?);
    }
    Ok(processor)
}

fn write_report(matrix: &ScoreMatrix, output: &Path) -> Result<(), PulseCliError> {
    let writer = CsvReportWriter::new();
    if output.to_string_lossy() == "-" {
        writer.write(matrix, io::stdout().lock())?;
        return Ok(());
    }

    writer.write(matrix, BufWriter::new(File::create(output)?))?;
    tracing::info!(
        path = %output.display(),
        rows = matrix.rows.len(),
        "Wrote CSV report"
    );
    Ok(())
}

fn cmd_inspect(scores: &Path, json: bool) -> Result<(), PulseCliError> {
    let snapshot = ScoreSnapshot::load(scores)?;
    let windows = snapshot.windows();

    let mut rows: Vec<RowSummary> = snapshot
        .rows
        .iter()
        .map(|r| RowSummary {
            name: r.name.clone(),
            total_messages: r.total(),
            active_windows: r.counts.iter().filter(|&&c| c > 0).count(),
        })
        .collect();
    rows.sort_by(|a, b| b.total_messages.cmp(&a.total_messages));

    let report = InspectReport {
        producer: snapshot.producer.name.clone(),
        version: snapshot.producer.version.clone(),
        run_id: snapshot.producer.run_id.clone(),
        computed_at: snapshot.computed_at.to_rfc3339(),
        start: snapshot.start.to_string(),
        end: snapshot.end.to_string(),
        increment: snapshot.increment.to_string(),
        windows: windows.len(),
        conversations: rows,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        writeln!(out, "Score Snapshot")?;
        writeln!(out, "==============")?;
        writeln!(out, "Producer:      {} {}", report.producer, report.version)?;
        writeln!(out, "Run:           {}", report.run_id)?;
        writeln!(out, "Computed at:   {}", report.computed_at)?;
        writeln!(out, "Span:          {} .. {}", report.start, report.end)?;
        writeln!(out, "Increment:     {}", report.increment)?;
        writeln!(out, "Windows:       {}", report.windows)?;
        writeln!(out, "Conversations: {}", report.conversations.len())?;

        if !report.conversations.is_empty() {
            writeln!(out, "\nBy total messages:")?;
            for row in &report.conversations {
                writeln!(
                    out,
                    "  {:>8}  {:>6} windows  {}",
                    row.total_messages, row.active_windows, row.name
                )?;
            }
        }
    }

    Ok(())
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Pulse(PulseError),
    Json(serde_json::Error),
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<PulseError> for PulseCliError {
    fn from(e: PulseError) -> Self {
        PulseCliError::Pulse(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PulseCliError::Pulse(e) => {
                let (code, hint) = match &e {
                    PulseError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
                    PulseError::JsonError(_) => {
                        ("JSON_ERROR", Some("Is this a snapshot written by 'pulse scan'?"))
                    }
                    PulseError::ArchiveParse { .. } | PulseError::MissingMessageFile(_) => {
                        ("ARCHIVE_ERROR", Some("Check the export directory layout"))
                    }
                    PulseError::MissingInbox(_) => (
                        "MISSING_INBOX",
                        Some("--base-dir must contain messages/inbox"),
                    ),
                    PulseError::InvalidIncrement(_) => {
                        ("INVALID_INCREMENT", Some("Use e.g. 12h, 1d, 7d or 1m"))
                    }
                    PulseError::InvalidConfig(_) => ("INVALID_CONFIG", None),
                    PulseError::EmptyNamePool(_) | PulseError::NamePoolExhausted { .. } => (
                        "NAME_POOL",
                        Some("Provide at least one name per conversation"),
                    ),
                    PulseError::NoConversations(_) => (
                        "NO_CONVERSATIONS",
                        Some("--name must match your display name in the export exactly"),
                    ),
                    PulseError::MisalignedSeries { .. } => (
                        "MISALIGNED_SERIES",
                        Some("Re-run 'pulse scan' to regenerate the snapshot"),
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    producer: String,
    version: String,
    run_id: String,
    computed_at: String,
    start: String,
    end: String,
    increment: String,
    windows: usize,
    conversations: Vec<RowSummary>,
}

#[derive(serde::Serialize)]
struct RowSummary {
    name: String,
    total_messages: u64,
    active_windows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_zero_smoothing_window_fails_before_scanning() {
        let err = Cli::try_parse_from([
            "pulse",
            "run",
            "--base-dir",
            "/nonexistent/export",
            "--name",
            "Me",
            "--smoothing-window",
            "0",
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = Cli::try_parse_from(["pulse", "report", "--smoothing-window", "0"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_smoothing_window_defaults() {
        let cli = Cli::try_parse_from(["pulse", "report"]).unwrap();
        match cli.command {
            Commands::Report {
                smoothing_window, ..
            } => assert_eq!(smoothing_window, DEFAULT_SMOOTHING_WINDOW),
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn test_run_rejects_bad_options_without_writing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let scores = dir.path().join("scores.json");
        let cli = Cli {
            verbose: false,
            quiet: true,
            command: Commands::Run {
                scan: ScanArgs {
                    base_dir: dir.path().join("export"),
                    name: "Me".to_string(),
                    increment: "1x".to_string(),
                    random_names: None,
                },
                scores: scores.clone(),
                output: dir.path().join("scores.csv"),
                smoothing_window: 0,
            },
        };

        let err = CliError::from(run(cli).unwrap_err());
        assert_eq!(err.code, "INVALID_CONFIG");
        assert!(!scores.exists());
    }
}
