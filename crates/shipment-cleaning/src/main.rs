//! CLI entry point for the shipment cleaning pipeline.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use serde::Serialize;
use shipment_cleaning::{
    CleaningConfig, CleaningSummary, CsvSource, JsonLinesSink, LoadReport, Loader, Pipeline,
    ShipmentSource, write_csv,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Clean and impute a weekly logistics shipments extract",
    long_about = "Reads a raw shipments extract, canonicalizes columns, nulls missing tokens \
                  and invalid measures, imputes delivery dates and costs, deduplicates, \
                  and writes the cleaned batch.\n\n\
                  EXAMPLES:\n  \
                  # Clean an extract\n  \
                  shipment-cleaning -i shipments.csv -o cleaned.csv\n\n  \
                  # Also emit index documents (one bulk line per shipment)\n  \
                  shipment-cleaning -i shipments.csv --documents docs.jsonl\n\n  \
                  # Day-first dates, machine-readable summary\n  \
                  shipment-cleaning -i shipments.csv --date-format %d/%m/%Y --json"
)]
struct Args {
    /// Path to the raw CSV extract
    #[arg(short, long)]
    input: String,

    /// Path for the cleaned CSV
    ///
    /// Defaults to <input_name>_cleaned.csv in the current directory
    #[arg(short, long)]
    output: Option<String>,

    /// Write index documents as JSON lines to this path
    #[arg(long)]
    documents: Option<String>,

    /// JSON file with cleaning configuration
    #[arg(short, long)]
    config: Option<String>,

    /// Expected date format, overrides the config file
    #[arg(long)]
    date_format: Option<String>,

    /// Target index name, overrides the config file
    #[arg(long)]
    index: Option<String>,

    /// Null delivery dates earlier than their shipment date and re-estimate them
    #[arg(long)]
    null_inverted_dates: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,
}

/// Machine-readable run report for `--json`.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    input_file: &'a str,
    output_file: &'a str,
    documents_file: Option<&'a str>,
    summary: &'a CleaningSummary,
    load: Option<LoadReport>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, quiet))
        .with_target(false)
        .init();
}

/// `RUST_LOG` when set, otherwise the command-line level (`warn` if quiet).
fn log_filter(level: &str, quiet: bool) -> EnvFilter {
    let effective_level = if quiet { "warn" } else { level };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load .env before logging so a RUST_LOG set there reaches the filter
    dotenv().ok();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = load_config(&args)?;
    let pipeline = build_pipeline(config, args.quiet || args.json)?;

    info!("Loading extract from: {}", args.input);
    let data = CsvSource::new(&args.input).extract()?;
    info!("Extract loaded: {:?}", data.shape());

    let result = pipeline.process(data).map_err(|e| {
        error!("Pipeline failed: {}", e);
        anyhow!("Pipeline failed [{}]: {}", e.error_code(), e)
    })?;

    // Outputs are only written once the whole run has succeeded.
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| format!("{}_cleaned.csv", extract_file_stem(&args.input)));
    let file = File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path))?;
    write_csv(&result.batch, BufWriter::new(file))?;
    info!("Cleaned batch written to: {}", output_path);

    let load = match &args.documents {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Failed to create {}", path))?;
            let mut sink = JsonLinesSink::new(BufWriter::new(file));
            let loader = Loader::new(&pipeline.config().index_name);
            let report = loader.load(&result.batch, &mut sink)?;
            info!("Documents for '{}' written to: {}", loader.index_name(), path);
            Some(report)
        }
        None => None,
    };

    if args.json {
        let report = RunReport {
            input_file: &args.input,
            output_file: &output_path,
            documents_file: args.documents.as_deref(),
            summary: &result.summary,
            load,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&args, &output_path, &result.summary, load.as_ref());
    Ok(())
}

/// Config file (if any), then command-line overrides, then validation.
fn load_config(args: &Args) -> Result<CleaningConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path))?;
            serde_json::from_str::<CleaningConfig>(&text)
                .with_context(|| format!("Invalid config {}", path))?
        }
        None => CleaningConfig::default(),
    };

    if let Some(format) = &args.date_format {
        config.date_format = format.clone();
    }
    if let Some(index) = &args.index {
        config.index_name = index.clone();
    }
    if args.null_inverted_dates {
        config.null_inverted_delivery_dates = true;
    }

    config.validate()?;
    Ok(config)
}

/// Build the pipeline, logging stage progress unless quiet.
fn build_pipeline(config: CleaningConfig, quiet: bool) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the cleaning run.
///
/// Uses `println!` on purpose: this is the command's primary output and must
/// show regardless of log level.
fn print_human_readable_summary(
    args: &Args,
    output_path: &str,
    summary: &CleaningSummary,
    load: Option<&LoadReport>,
) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input, summary.rows_before, summary.columns
    );
    println!("Output: {} ({} rows)", output_path, summary.rows_after);
    if let (Some(path), Some(load)) = (&args.documents, load) {
        println!(
            "Documents: {} ({} indexed, {} skipped)",
            path, load.indexed, load.skipped
        );
    }
    println!();

    println!("Cleaning Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!("  Columns renamed: {}", summary.columns_renamed);
    println!("  Missing tokens nulled: {}", summary.tokens_nullified);
    println!(
        "  Unparseable values: {} dates, {} numbers",
        summary.dates_unparsed, summary.numbers_unparsed
    );
    println!("  Negative measures nulled: {}", summary.negatives_nullified);
    if summary.inverted_dates_nullified > 0 {
        println!(
            "  Inverted delivery dates nulled: {}",
            summary.inverted_dates_nullified
        );
    }
    println!("  Delivery dates imputed: {}", summary.delivery_dates_imputed);
    println!(
        "  Costs imputed: {} ({} unresolved, {} carrier rates)",
        summary.costs_imputed, summary.costs_unresolved, summary.carriers_with_rate
    );
    println!(
        "  Duplicates removed: {} exact, {} by shipment id",
        summary.exact_duplicates_removed, summary.id_collisions_collapsed
    );
    println!();

    if !summary.actions.is_empty() {
        println!("Actions Taken:");
        for action in summary.actions.iter().take(10) {
            println!(
                "  - [{}] {}: {}",
                action.action_type.display_name(),
                action.target,
                action.description
            );
        }
        if summary.actions.len() > 10 {
            println!("  ... and {} more actions", summary.actions.len() - 10);
        }
        println!();
    }

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
