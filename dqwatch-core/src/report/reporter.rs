//! Quality reporter: report generation, distribution and history.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::destinations::{
    DeliveryOutcome, DeliveryStatus, DestinationClients, ReportDestination, create_destinations,
};
use super::format::{ReportFormat, ReportGenerator};
use super::history::{QualityTrends, ReportFilter, ReportHistory};
use super::metrics::{FacadeMetricsEmitter, MetricsEmitter, quality_gauges};
use super::models::QualityReport;
use crate::config::ReporterConfig;
use crate::error::{DqWatchError, Result};
use crate::issues::IssueDetector;
use crate::models::{DetectionContext, QualityScore, ValidationResult, ValidationSummary};

/// Time budget for a destination without its own override.
pub const DEFAULT_DESTINATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrates issue detection, report assembly, distribution, metric
/// publication and history queries.
///
/// The reporter is shareable across tasks: the detector and the history
/// are internally synchronized and every operation takes `&self`.
pub struct QualityReporter {
    detector: Arc<IssueDetector>,
    destinations: Vec<Box<dyn ReportDestination>>,
    metrics: Option<Arc<dyn MetricsEmitter>>,
    history: ReportHistory,
    generator: ReportGenerator,
    destination_timeout: Duration,
    default_format: ReportFormat,
}

impl QualityReporter {
    /// Creates a reporter with no destinations that publishes metrics
    /// through the `metrics` facade.
    pub fn new(detector: Arc<IssueDetector>) -> Self {
        Self {
            detector,
            destinations: Vec::new(),
            metrics: Some(Arc::new(FacadeMetricsEmitter::new())),
            history: ReportHistory::new(),
            generator: ReportGenerator::default(),
            destination_timeout: DEFAULT_DESTINATION_TIMEOUT,
            default_format: ReportFormat::default(),
        }
    }

    /// Builds a reporter from configuration.
    ///
    /// Destinations that are unknown, invalid or lack a client are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration itself is invalid.
    pub async fn from_config(
        config: &ReporterConfig,
        clients: &DestinationClients,
    ) -> Result<Self> {
        config.validate()?;

        let detector = Arc::new(IssueDetector::new(config.detector.clone()));
        let mut reporter = Self::new(detector)
            .with_destination_timeout(config.destination_timeout())
            .with_default_format(config.default_format);
        if !config.publish_metrics {
            reporter = reporter.without_metrics();
        }

        reporter.destinations = create_destinations(&config.destinations, clients).await;
        info!(
            "Quality reporter initialized with {} of {} configured destination(s)",
            reporter.destinations.len(),
            config.destinations.len()
        );

        Ok(reporter)
    }

    /// Builder method to add a destination.
    pub fn with_destination(mut self, destination: Box<dyn ReportDestination>) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Builder method to replace the metrics emitter.
    pub fn with_metrics_emitter(mut self, emitter: Arc<dyn MetricsEmitter>) -> Self {
        self.metrics = Some(emitter);
        self
    }

    /// Builder method to disable metric publication.
    pub fn without_metrics(mut self) -> Self {
        self.metrics = None;
        self
    }

    /// Builder method to set the default destination time budget.
    pub fn with_destination_timeout(mut self, timeout: Duration) -> Self {
        self.destination_timeout = timeout;
        self
    }

    /// Builder method to set the report generator used for exports.
    pub fn with_generator(mut self, generator: ReportGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Builder method to set the default output format.
    pub fn with_default_format(mut self, format: ReportFormat) -> Self {
        self.default_format = format;
        self
    }

    /// Shared issue detector.
    pub fn detector(&self) -> &Arc<IssueDetector> {
        &self.detector
    }

    /// Report history.
    pub fn history(&self) -> &ReportHistory {
        &self.history
    }

    /// Default output format.
    pub fn default_format(&self) -> ReportFormat {
        self.default_format
    }

    /// Names of the active destinations, in configuration order.
    pub fn destination_names(&self) -> Vec<String> {
        self.destinations
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    /// Detects issues, assembles a report and records it in history.
    ///
    /// A missing score or summary yields `null` fields in the report.
    pub fn generate_quality_report(
        &self,
        validation_results: &[ValidationResult],
        validation_summary: Option<&ValidationSummary>,
        quality_score: Option<&QualityScore>,
        context: &DetectionContext,
    ) -> QualityReport {
        let issues = self.detector.detect_issues(validation_results, context);
        let report = QualityReport::assemble(
            validation_results,
            validation_summary,
            quality_score,
            issues,
            context,
        );

        info!(
            "Generated quality report {} for {}.{}: {} result(s), {} issue(s)",
            report.metadata.report_id,
            context.dataset_name,
            context.table_name,
            report.validation_results.len(),
            report.issues.len()
        );

        self.history.record(report.clone());
        report
    }

    /// Sends a report to every destination.
    ///
    /// Returns true only if every destination delivered. A failing or slow
    /// destination never stops the others from being attempted.
    pub async fn distribute_report(&self, report: &QualityReport, format: ReportFormat) -> bool {
        let outcomes = self.distribute_report_detailed(report, format).await;
        let delivered = outcomes.iter().filter(|o| o.is_delivered()).count();

        if delivered == outcomes.len() {
            info!(
                "Report {} delivered to {} destination(s)",
                report.metadata.report_id, delivered
            );
            true
        } else {
            warn!(
                "Report {} delivered to {} of {} destination(s)",
                report.metadata.report_id,
                delivered,
                outcomes.len()
            );
            false
        }
    }

    /// Sends a report to every destination concurrently, each under its own
    /// time budget, and returns one outcome per destination in
    /// configuration order.
    pub async fn distribute_report_detailed(
        &self,
        report: &QualityReport,
        format: ReportFormat,
    ) -> Vec<DeliveryOutcome> {
        let deliveries = self.destinations.iter().map(|destination| async move {
            let budget = destination.timeout().unwrap_or(self.destination_timeout);
            let name = destination.name().to_string();

            let delivery = destination.send_report(report, format);
            let status = match tokio::time::timeout(budget, delivery).await {
                Ok(Ok(())) => {
                    debug!("Destination '{}' delivered report {}", name, report.metadata.report_id);
                    DeliveryStatus::Delivered
                }
                Ok(Err(e)) => {
                    warn!(
                        "Destination '{}' failed to deliver report {}: {}",
                        name, report.metadata.report_id, e
                    );
                    DeliveryStatus::Failed(e.to_string())
                }
                Err(_) => {
                    let timeout = DqWatchError::Timeout {
                        destination: name.clone(),
                        seconds: budget.as_secs(),
                    };
                    warn!("{} while delivering report {}", timeout, report.metadata.report_id);
                    DeliveryStatus::TimedOut
                }
            };

            DeliveryOutcome {
                destination: name,
                status,
            }
        });

        join_all(deliveries).await
    }

    /// Publishes the overall score, each dimension score and the success
    /// rate as gauges labeled with the context's dataset and table.
    ///
    /// Returns false if metrics are disabled or any emission fails. Every
    /// gauge is attempted.
    pub async fn publish_metrics(
        &self,
        quality_score: &QualityScore,
        context: &DetectionContext,
    ) -> bool {
        let Some(emitter) = &self.metrics else {
            debug!("Metric publication is disabled");
            return false;
        };

        let mut all_published = true;
        for sample in quality_gauges(quality_score, context) {
            if let Err(e) = emitter
                .emit_gauge(sample.name, sample.value, &sample.labels)
                .await
            {
                warn!("Failed to publish metric '{}': {}", sample.name, e);
                all_published = false;
            }
        }

        if all_published {
            debug!(
                "Published quality metrics for {}.{}",
                context.dataset_name, context.table_name
            );
        }
        all_published
    }

    /// Returns retained reports matching the filter, oldest first.
    pub fn get_report_history(&self, filter: Option<&ReportFilter>) -> Vec<QualityReport> {
        self.history.reports(filter)
    }

    /// Looks up a retained report by id.
    pub fn get_report(&self, report_id: Uuid) -> Option<QualityReport> {
        self.history.get(report_id)
    }

    /// Overall-score series for an asset over the trailing `days`.
    pub fn get_quality_trends(
        &self,
        dataset_name: &str,
        table_name: &str,
        days: u32,
    ) -> QualityTrends {
        self.history.trends(dataset_name, table_name, days)
    }

    /// Removes reports older than `days`, returning the count removed.
    pub fn clear_report_history(&self, days: u32) -> usize {
        let removed = self.history.clear_older_than(days);
        info!("Cleared {} report(s) older than {} day(s)", removed, days);
        removed
    }

    /// Renders a report and writes it to `file_path`, creating parent
    /// directories. Returns false after logging on any failure.
    pub async fn export_report(
        &self,
        report: &QualityReport,
        file_path: &Path,
        format: ReportFormat,
    ) -> bool {
        match self.write_report(report, file_path, format).await {
            Ok(()) => {
                info!(
                    "Exported report {} to {} as {}",
                    report.metadata.report_id,
                    file_path.display(),
                    format
                );
                true
            }
            Err(e) => {
                error!("Failed to export report {}: {}", report.metadata.report_id, e);
                false
            }
        }
    }

    async fn write_report(
        &self,
        report: &QualityReport,
        file_path: &Path,
        format: ReportFormat,
    ) -> Result<()> {
        let rendered = self.generator.render(report, format)?;

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DqWatchError::io(format!("Failed to create directory {}", parent.display()), e)
            })?;
        }

        tokio::fs::write(file_path, rendered.as_bytes())
            .await
            .map_err(|e| DqWatchError::io(format!("Failed to write {}", file_path.display()), e))
    }
}

impl std::fmt::Debug for QualityReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityReporter")
            .field("destinations", &self.destination_names())
            .field("metrics", &self.metrics.is_some())
            .field("history", &self.history.len())
            .field("destination_timeout", &self.destination_timeout)
            .field("default_format", &self.default_format)
            .finish_non_exhaustive()
    }
}
