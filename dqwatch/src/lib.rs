//! Library module for the dqwatch CLI.
//!
//! Holds run-bundle loading, configuration loading and the `report` flow so
//! they can be tested without spawning the binary. Argument parsing and
//! console output live in main.rs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use dqwatch_core::report::destinations::{
    DeliveryOutcome, DestinationClients, FilesystemObjectStore,
};
use dqwatch_core::{
    DetectionContext, QualityReport, QualityReporter, QualityScore, ReportFormat, ReporterConfig,
    ValidationResult, ValidationSummary,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One validation run as handed over by the validation and scoring engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunBundle {
    /// Results of every evaluated rule
    pub validation_results: Vec<ValidationResult>,
    /// Summary snapshot, if the validation engine produced one
    #[serde(default)]
    pub validation_summary: Option<ValidationSummary>,
    /// Score snapshot, if the scoring engine produced one
    #[serde(default)]
    pub quality_score: Option<QualityScore>,
    /// Data asset and rule metadata for the run
    pub context: DetectionContext,
}

impl RunBundle {
    /// Parses a bundle from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or names no data asset.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let bundle: Self = serde_json::from_str(json).context("Invalid run bundle")?;
        let context = &bundle.context;
        if context.dataset_name.trim().is_empty() || context.table_name.trim().is_empty() {
            bail!("Run bundle context must name a dataset and a table");
        }
        Ok(bundle)
    }

    /// Loads a bundle from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run bundle {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Summary to report: the supplied one, else one derived from the results.
    pub fn effective_summary(&self) -> ValidationSummary {
        self.validation_summary
            .clone()
            .unwrap_or_else(|| ValidationSummary::from_results(&self.validation_results))
    }
}

/// Output path for a report: the explicit path, else
/// `{dataset}_{table}_quality_report.{ext}` in the working directory.
pub fn output_path(
    explicit: Option<&Path>,
    context: &DetectionContext,
    format: ReportFormat,
) -> PathBuf {
    explicit.map_or_else(
        || {
            PathBuf::from(format!(
                "{}_{}_quality_report.{}",
                context.dataset_name,
                context.table_name,
                format.extension()
            ))
        },
        Path::to_path_buf,
    )
}

/// Loads a reporter configuration, or the defaults when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_config(path: Option<&Path>) -> Result<ReporterConfig> {
    match path {
        Some(path) => {
            let config = ReporterConfig::from_json_file(path)
                .with_context(|| format!("Invalid configuration {}", path.display()))?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        None => Ok(ReporterConfig::default()),
    }
}

/// Inputs of one `report` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Validation run bundle
    pub results: PathBuf,
    /// Reporter configuration, defaults when absent
    pub config: Option<PathBuf>,
    /// Format name; unknown names fall back to json
    pub format: Option<String>,
    /// Export path, derived from the asset when absent
    pub output: Option<PathBuf>,
    /// Send to every configured destination
    pub distribute: bool,
    /// Directory backing `cloud_storage` destinations
    pub store_dir: PathBuf,
}

/// What a `report` run produced.
#[derive(Debug)]
pub struct ReportRun {
    /// The generated report
    pub report: QualityReport,
    /// Summary of the validation results
    pub summary: ValidationSummary,
    /// Format the report was exported and distributed in
    pub format: ReportFormat,
    /// Path the report was exported to
    pub output: PathBuf,
    /// Metric publication result; `None` when not attempted
    pub metrics_published: Option<bool>,
    /// One outcome per destination; empty unless distribution was requested
    pub outcomes: Vec<DeliveryOutcome>,
}

impl ReportRun {
    /// True when every attempted destination delivered.
    pub fn all_delivered(&self) -> bool {
        self.outcomes.iter().all(DeliveryOutcome::is_delivered)
    }
}

/// Runs one bundle through the reporter: detect, export, publish metrics
/// and optionally distribute.
///
/// Only `cloud_storage` destinations have a client here, backed by
/// `store_dir`. Other destination types are logged and skipped.
///
/// # Errors
///
/// Returns an error if the bundle or configuration cannot be loaded, or
/// if the export fails. Delivery failures are reported in the outcomes.
pub async fn run_report(request: &ReportRequest) -> Result<ReportRun> {
    let bundle = RunBundle::load(&request.results)?;
    let config = load_config(request.config.as_deref())?;
    if request.distribute && config.destinations.is_empty() {
        warn!("--distribute given but no destinations are configured");
    }

    let clients = DestinationClients::new()
        .with_object_store(Arc::new(FilesystemObjectStore::new(&request.store_dir)));
    let reporter = QualityReporter::from_config(&config, &clients).await?;

    let format = request
        .format
        .as_deref()
        .map_or(reporter.default_format(), ReportFormat::parse_lenient);

    info!(
        "Generating report for {}.{} from {} validation result(s)",
        bundle.context.dataset_name,
        bundle.context.table_name,
        bundle.validation_results.len()
    );
    let summary = bundle.effective_summary();
    let report = reporter.generate_quality_report(
        &bundle.validation_results,
        Some(&summary),
        bundle.quality_score.as_ref(),
        &bundle.context,
    );

    let output = output_path(request.output.as_deref(), &bundle.context, format);
    if !reporter.export_report(&report, &output, format).await {
        bail!("Failed to export report to {}", output.display());
    }

    let metrics_published = match &bundle.quality_score {
        Some(score) if config.publish_metrics => {
            let published = reporter.publish_metrics(score, &bundle.context).await;
            if !published {
                warn!("Some quality metrics could not be published");
            }
            Some(published)
        }
        _ => None,
    };

    let outcomes = if request.distribute {
        reporter.distribute_report_detailed(&report, format).await
    } else {
        Vec::new()
    };

    Ok(ReportRun {
        report,
        summary,
        format,
        output,
        metrics_published,
        outcomes,
    })
}
