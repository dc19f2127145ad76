//! Data quality reporting tool.
//!
//! This binary loads a validation run bundle, detects and classifies
//! quality issues, renders a quality report and optionally distributes it
//! to the destinations named in a reporter configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use dqwatch::{ReportRequest, load_config, run_report};
use dqwatch_core::{ReportFormat, logging::init_logging, report::destinations::DeliveryStatus};

#[derive(Parser)]
#[command(name = "dqwatch")]
#[command(about = "Data quality issue detection and reporting")]
#[command(version)]
#[command(long_about = "
dqwatch - Data quality issue detection and reporting

Turns a validation run (results, summary, score and context) into tracked
quality issues and a quality report, then exports and distributes it.

OUTPUT FORMATS:
- json, html, csv, markdown, pdf

DESTINATIONS (from --config):
- cloud_storage: written below --store-dir
- bigquery, notification: require an embedding service with clients

EXAMPLES:
  dqwatch report --results run.json --format html
  dqwatch report --results run.json --config dqwatch.json --distribute
  dqwatch check-config --config dqwatch.json
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate, export and optionally distribute a quality report
    Report(ReportArgs),
    /// List supported report formats
    Formats,
    /// Validate a reporter configuration file
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct ReportArgs {
    /// Validation run bundle
    #[arg(
        long,
        env = "DQWATCH_RESULTS",
        value_name = "FILE",
        help = "Validation run bundle (JSON)"
    )]
    pub results: PathBuf,

    /// Reporter configuration
    #[arg(
        long,
        env = "DQWATCH_CONFIG",
        value_name = "FILE",
        help = "Reporter configuration (JSON)"
    )]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        short,
        long,
        help = "Report format: json, html, csv, markdown, pdf (unknown names fall back to json)"
    )]
    pub format: Option<String>,

    /// Output file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Export path (default: <dataset>_<table>_quality_report.<ext>)"
    )]
    pub output: Option<PathBuf>,

    /// Distribute to configured destinations
    #[arg(long, help = "Send the report to every configured destination")]
    pub distribute: bool,

    /// Object store root
    #[arg(
        long,
        env = "DQWATCH_STORE_DIR",
        default_value = "dqwatch-store",
        value_name = "DIR",
        help = "Local directory backing cloud_storage destinations"
    )]
    pub store_dir: PathBuf,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Reporter configuration
    #[arg(
        long,
        env = "DQWATCH_CONFIG",
        value_name = "FILE",
        help = "Reporter configuration (JSON)"
    )]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Command::Report(args) => generate_report(args).await,
        Command::Formats => {
            list_formats();
            Ok(())
        }
        Command::CheckConfig(args) => check_config(&args.config),
    }
}

/// Runs one bundle through the reporter and prints a summary.
async fn generate_report(args: &ReportArgs) -> Result<()> {
    let request = ReportRequest {
        results: args.results.clone(),
        config: args.config.clone(),
        format: args.format.clone(),
        output: args.output.clone(),
        distribute: args.distribute,
        store_dir: args.store_dir.clone(),
    };
    let run = run_report(&request).await?;

    println!("Report: {}", run.report.metadata.report_id);
    println!("Output: {}", run.output.display());
    println!(
        "Results: {} ({} failed, {} warning)",
        run.summary.total_rules, run.summary.failed_rules, run.summary.warning_rules
    );
    println!("Issues: {}", run.report.issues.len());
    if let Some(score) = run.report.overall_score() {
        println!("Overall score: {score:.2}");
    }

    for outcome in &run.outcomes {
        match &outcome.status {
            DeliveryStatus::Delivered => println!("Delivered: {}", outcome.destination),
            DeliveryStatus::Failed(message) => {
                println!("Failed: {} ({message})", outcome.destination);
            }
            DeliveryStatus::TimedOut => println!("Timed out: {}", outcome.destination),
        }
    }
    if !run.all_delivered() {
        bail!("Report could not be delivered to every destination");
    }

    Ok(())
}

fn list_formats() {
    println!("Supported report formats:");
    for format in ReportFormat::ALL {
        println!(
            "  {:<10} .{:<5} {}",
            format.as_str(),
            format.extension(),
            format.content_type()
        );
    }
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;

    println!("Configuration is valid: {}", path.display());
    println!("Severity threshold: {}", config.detector.severity_threshold);
    println!("Default format: {}", config.default_format);
    println!("Destination timeout: {}s", config.destination_timeout_secs);
    println!("Publish metrics: {}", config.publish_metrics);
    println!("Destinations: {}", config.destinations.len());
    for destination in &config.destinations {
        println!("  - {} ({})", destination.display_name(), destination.destination_type);
    }

    Ok(())
}
