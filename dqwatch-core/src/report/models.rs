//! Quality report models.
//!
//! A `QualityReport` is assembled once per run and never changed afterwards.
//! It serializes to the report object shape shared by every output format
//! and destination: `metadata`, `quality_score`, `validation_summary`,
//! `validation_results`, `issues`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DqWatchError, Result};
use crate::issues::{IssueSeverity, IssueSummary, QualityIssue};
use crate::models::{
    DetectionContext, QualityScore, ValidationResult, ValidationStatus, ValidationSummary,
};

/// Identity and provenance of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Random report identifier
    pub report_id: Uuid,
    /// Generation time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Dataset the report covers
    pub dataset_name: String,
    /// Table the report covers
    pub table_name: String,
}

impl ReportMetadata {
    /// Creates metadata with a fresh id and the current time.
    pub fn new(dataset_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            dataset_name: dataset_name.into(),
            table_name: table_name.into(),
        }
    }

    /// Overrides the generation time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A complete quality report for one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Report identity
    pub metadata: ReportMetadata,
    /// Score snapshot (`null` when not supplied)
    pub quality_score: Option<QualityScore>,
    /// Validation summary snapshot (`null` when not supplied)
    pub validation_summary: Option<ValidationSummary>,
    /// Every raw validation result
    pub validation_results: Vec<ValidationResult>,
    /// Issues detected during this run
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    /// Assembles a report with fresh metadata for the context's asset.
    pub fn assemble(
        validation_results: &[ValidationResult],
        validation_summary: Option<&ValidationSummary>,
        quality_score: Option<&QualityScore>,
        issues: Vec<QualityIssue>,
        context: &DetectionContext,
    ) -> Self {
        Self {
            metadata: ReportMetadata::new(&context.dataset_name, &context.table_name),
            quality_score: quality_score.cloned(),
            validation_summary: validation_summary.cloned(),
            validation_results: validation_results.to_vec(),
            issues,
        }
    }

    /// Report identifier.
    pub fn report_id(&self) -> Uuid {
        self.metadata.report_id
    }

    /// Generation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.timestamp
    }

    /// Overall score, if a score snapshot is present.
    pub fn overall_score(&self) -> Option<f64> {
        self.quality_score.as_ref().map(|s| s.overall_score)
    }

    /// Serializes the report to a plain JSON object.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| DqWatchError::serialization("Failed to serialize quality report", e))
    }
}

/// Condensed view of a report used by templates and notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Report identifier
    pub report_id: Uuid,
    /// Generation time
    pub timestamp: DateTime<Utc>,
    /// Dataset name
    pub dataset_name: String,
    /// Table name
    pub table_name: String,
    /// Overall score, if known
    pub overall_score: Option<f64>,
    /// Success rate from the score or summary, if known
    pub success_rate: Option<f64>,
    /// Number of validation results
    pub total_results: usize,
    /// Passed results
    pub passed_results: usize,
    /// Failed results
    pub failed_results: usize,
    /// Warning results
    pub warning_results: usize,
    /// Issue counts by severity
    pub issues: IssueSummary,
}

impl ReportSummary {
    /// Summarizes a report.
    pub fn from_report(report: &QualityReport) -> Self {
        let count = |status: ValidationStatus| {
            report
                .validation_results
                .iter()
                .filter(|r| r.status == status)
                .count()
        };

        let success_rate = report
            .quality_score
            .as_ref()
            .map(|s| s.success_rate)
            .or_else(|| report.validation_summary.as_ref().map(|s| s.success_rate));

        Self {
            report_id: report.metadata.report_id,
            timestamp: report.metadata.timestamp,
            dataset_name: report.metadata.dataset_name.clone(),
            table_name: report.metadata.table_name.clone(),
            overall_score: report.overall_score(),
            success_rate,
            total_results: report.validation_results.len(),
            passed_results: count(ValidationStatus::Passed),
            failed_results: count(ValidationStatus::Failed),
            warning_results: count(ValidationStatus::Warning),
            issues: IssueSummary::from_issues(&report.issues),
        }
    }

    /// Highest severity among the report's issues.
    pub fn worst_severity(&self) -> Option<IssueSeverity> {
        if self.issues.critical_issues > 0 {
            Some(IssueSeverity::Critical)
        } else if self.issues.high_issues > 0 {
            Some(IssueSeverity::High)
        } else if self.issues.medium_issues > 0 {
            Some(IssueSeverity::Medium)
        } else if self.issues.low_issues > 0 {
            Some(IssueSeverity::Low)
        } else {
            None
        }
    }
}
