use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use eko_harmonogram::{
    CollectionEvent, ColumnAnchors, PipelineOptions, RedFilter, ResolveWarning, ScheduleError,
    Stage, WorkDir, default_recognizer, process_pdf, records_to_json, resolve_schedule_csv,
    scan_pdf, write_calendars,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "harmonogram",
    version,
    about = "Turn scanned waste-collection schedules into calendar files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan a schedule PDF (or page image) into a reviewable CSV and, unless
    /// --csv-only is given, straight on to calendar files.
    Scan(ScanArgs),
    /// Resolve a reviewed schedule CSV into calendar files.
    Resolve(ResolveArgs),
}

#[derive(Debug, Args)]
struct ScanArgs {
    /// Input PDF or image path.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for intermediate images and CSV files.
    #[arg(short, long, default_value = "harmonogram-work")]
    work_dir: PathBuf,

    /// Directory for calendar files.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Stop after writing the schedule CSV for review.
    #[arg(long)]
    csv_only: bool,

    /// Schedule year; detected from the PDF title when omitted.
    #[arg(long)]
    year: Option<i32>,

    /// Directory with cached OCR models.
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// OCR language code.
    #[arg(long, default_value = "pol")]
    lang: String,

    /// Render resolution for PDF input.
    #[arg(long, default_value_t = 300.0)]
    dpi: f32,

    /// Red mark removal sensitivity, 0.1 to 1.0.
    #[arg(long, default_value = "0.5")]
    red_sensitivity: String,

    /// Baseline gap (px) still counted as the same row.
    #[arg(long, default_value_t = 25.0)]
    row_tolerance: f32,

    /// Horizontal gap (px) splitting column clusters.
    #[arg(long, default_value_t = 60.0)]
    column_tolerance: f32,

    /// Vertical gap (px) still merged into one cell line.
    #[arg(long, default_value_t = 20.0)]
    merge_tolerance: f32,

    /// Fixed column centers in pixels, e.g. 120,480,900.
    #[arg(long)]
    columns: Option<String>,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// Reviewed schedule CSV.
    #[arg(short, long)]
    input: PathBuf,

    /// Schedule year.
    #[arg(long)]
    year: i32,

    /// Directory for calendar files.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write the resolved events as JSON.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Schedule CSV delimiter.
    #[arg(long, default_value = ";")]
    delimiter: char,

    /// Word joining day numbers in cells.
    #[arg(long, default_value = "i")]
    connector: String,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_scan_options(args: &ScanArgs) -> Result<PipelineOptions> {
    let red_filter = RedFilter::from_str(&args.red_sensitivity)
        .map_err(|error| anyhow!("invalid red sensitivity: {error}"))
        .context("failed to parse --red-sensitivity")?;
    let column_anchors = args
        .columns
        .as_deref()
        .map(ColumnAnchors::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid column anchors: {error}"))
        .context("failed to parse --columns")?;

    Ok(PipelineOptions {
        dpi: args.dpi,
        red_filter,
        row_tolerance: args.row_tolerance,
        column_tolerance: args.column_tolerance,
        merge_tolerance: args.merge_tolerance,
        column_anchors,
        ..PipelineOptions::default()
    })
}

fn parse_resolve_options(args: &ResolveArgs) -> Result<PipelineOptions> {
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }
    Ok(PipelineOptions {
        schedule_delimiter: args.delimiter as u8,
        connector: args.connector.clone(),
        ..PipelineOptions::default()
    })
}

fn log_warnings(warnings: &[ResolveWarning], verbose: bool) {
    if warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} entries skipped", warnings.len());
    if verbose {
        for warning in warnings {
            eprintln!(
                "  - {:?} row={:?} column={:?}: {}",
                warning.code, warning.row, warning.column, warning.message
            );
        }
    }
}

/// Points the reviewer at the file to fix when a failure can be corrected by hand.
fn review_hint(error: &anyhow::Error) -> Option<String> {
    let schedule_error = error.downcast_ref::<ScheduleError>()?;
    match schedule_error {
        ScheduleError::Stage {
            stage: Stage::Resolve,
            path,
            ..
        } if schedule_error.is_structural() => Some(format!(
            "correct '{}' and run `harmonogram resolve` again",
            path.display()
        )),
        _ => None,
    }
}

fn report_error(error: &anyhow::Error) -> ExitCode {
    eprintln!("error: {error:#}");
    if let Some(hint) = review_hint(error) {
        eprintln!("hint: {hint}");
    }
    ExitCode::from(1)
}

fn write_json(path: &Path, events: &[CollectionEvent]) -> Result<()> {
    let json = records_to_json(events)?;
    std::fs::write(path, json).with_context(|| format!("failed to write '{}'", path.display()))
}

fn run_scan(args: &ScanArgs) -> Result<usize> {
    let options = parse_scan_options(args)?;
    let work_dir = WorkDir::create(&args.work_dir)
        .with_context(|| format!("failed to prepare '{}'", args.work_dir.display()))?;
    let mut recognizer = default_recognizer(args.tessdata.as_deref(), &args.lang, args.dpi)
        .context("failed to start OCR engine")?;

    if args.csv_only {
        let report = scan_pdf(&args.input, args.year, &work_dir, recognizer.as_mut(), &options)
            .with_context(|| format!("failed to scan '{}'", args.input.display()))?;
        log_warnings(&report.warnings, args.verbose);
        eprintln!(
            "review {} and run `harmonogram resolve --year {}`",
            report.artifacts.schedule_csv.display(),
            report.year
        );
        return Ok(report.body_rows);
    }

    let report = process_pdf(
        &args.input,
        args.year,
        &work_dir,
        &args.output_dir,
        recognizer.as_mut(),
        &options,
    )
    .with_context(|| format!("failed to process '{}'", args.input.display()))?;
    log_warnings(&report.resolution.warnings, args.verbose);
    for path in &report.calendars {
        eprintln!("wrote {}", path.display());
    }
    Ok(report.events.len())
}

fn run_resolve(args: &ResolveArgs) -> Result<usize> {
    let options = parse_resolve_options(args)?;
    let (events, report) = resolve_schedule_csv(&args.input, args.year, &options)
        .with_context(|| format!("failed to resolve '{}'", args.input.display()))?;
    log_warnings(&report.warnings, args.verbose);

    if let Some(path) = &args.json {
        write_json(path, &events)?;
    }
    for path in write_calendars(&args.output_dir, &events)
        .with_context(|| format!("failed to write calendars to '{}'", args.output_dir.display()))?
    {
        eprintln!("wrote {}", path.display());
    }
    Ok(events.len())
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("eko_harmonogram=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    let outcome = match &cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Resolve(args) => run_resolve(args),
    };

    match outcome {
        Ok(0) => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => report_error(&error),
    }
}
