//! Quality issue models.
//!
//! A `QualityIssue` has an immutable identity (id, originating rule,
//! severity, detection time, data asset) and a single piece of mutable
//! state: its resolution time. `resolved` is derived from that time, so the
//! two can never disagree in memory; the serialized record is checked for
//! the same invariant when it is read back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{DqWatchError, Result};
use crate::models::{DetectionContext, QualityDimension, RuleType, ValidationResult};

string_enum! {
    /// Issue severity, ordered `Low < Medium < High < Critical`.
    pub enum IssueSeverity {
        /// Cosmetic or informational
        Low => "low",
        /// Degrades downstream use
        Medium => "medium",
        /// Structurally dangerous
        High => "high",
        /// Blocks downstream use
        Critical => "critical",
    }
    parse_error = DqWatchError::invalid_severity;
}

impl Default for IssueSeverity {
    fn default() -> Self {
        Self::Medium
    }
}

/// A classified, tracked data quality issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "IssueRecord", try_from = "IssueRecord")]
pub struct QualityIssue {
    issue_id: Uuid,
    rule_type: RuleType,
    dimension: QualityDimension,
    rule_id: String,
    failure_details: Value,
    severity: IssueSeverity,
    detection_time: DateTime<Utc>,
    resolution_time: Option<DateTime<Utc>>,
    dataset_name: String,
    table_name: String,
    context: Map<String, Value>,
}

impl QualityIssue {
    /// Creates an unresolved issue from a validation result.
    ///
    /// A fresh id and detection time are assigned here and never change.
    pub fn new(
        result: &ValidationResult,
        severity: IssueSeverity,
        context: &DetectionContext,
    ) -> Self {
        Self {
            issue_id: Uuid::new_v4(),
            rule_type: result.rule_type,
            dimension: result.dimension,
            rule_id: result.rule_id.clone(),
            failure_details: result.details.clone(),
            severity,
            detection_time: Utc::now(),
            resolution_time: None,
            dataset_name: context.dataset_name.clone(),
            table_name: context.table_name.clone(),
            context: context.attributes.clone(),
        }
    }

    /// Unique issue identifier.
    pub fn issue_id(&self) -> Uuid {
        self.issue_id
    }

    /// Category of the originating rule.
    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// Dimension checked by the originating rule.
    pub fn dimension(&self) -> QualityDimension {
        self.dimension
    }

    /// Identifier of the originating rule.
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// Failure payload copied from the validation result.
    pub fn failure_details(&self) -> &Value {
        &self.failure_details
    }

    /// Severity assigned at detection.
    pub fn severity(&self) -> IssueSeverity {
        self.severity
    }

    /// Whether the issue has been resolved.
    pub fn resolved(&self) -> bool {
        self.resolution_time.is_some()
    }

    /// When the issue was detected.
    pub fn detection_time(&self) -> DateTime<Utc> {
        self.detection_time
    }

    /// When the issue was resolved, if it has been.
    pub fn resolution_time(&self) -> Option<DateTime<Utc>> {
        self.resolution_time
    }

    /// Dataset the issue concerns.
    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    /// Table the issue concerns.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Extra diagnostic metadata supplied with the run.
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Marks the issue resolved now.
    ///
    /// Resolving an already resolved issue keeps the original resolution
    /// time.
    pub fn mark_resolved(&mut self) {
        self.mark_resolved_at(Utc::now());
    }

    /// Marks the issue resolved at a specific time.
    ///
    /// Used when a resolution is recorded after the fact. Has no effect on
    /// an issue that is already resolved.
    pub fn mark_resolved_at(&mut self, at: DateTime<Utc>) {
        if self.resolution_time.is_none() {
            self.resolution_time = Some(at);
        }
    }

    /// Reopens a resolved issue.
    pub fn reopen(&mut self) {
        self.resolution_time = None;
    }

    /// Serializes the issue to a plain JSON object.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| DqWatchError::serialization("Failed to serialize quality issue", e))
    }

    /// Reconstructs an issue from a plain JSON object.
    ///
    /// # Errors
    /// Fails if fields are missing or `resolved` disagrees with
    /// `resolution_time`.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| DqWatchError::serialization("Failed to deserialize quality issue", e))
    }
}

/// Serialized shape of a `QualityIssue`.
#[derive(Serialize, Deserialize)]
struct IssueRecord {
    issue_id: Uuid,
    rule_type: RuleType,
    dimension: QualityDimension,
    rule_id: String,
    #[serde(default)]
    failure_details: Value,
    severity: IssueSeverity,
    resolved: bool,
    detection_time: DateTime<Utc>,
    resolution_time: Option<DateTime<Utc>>,
    dataset_name: String,
    table_name: String,
    #[serde(default)]
    context: Map<String, Value>,
}

impl From<QualityIssue> for IssueRecord {
    fn from(issue: QualityIssue) -> Self {
        Self {
            resolved: issue.resolved(),
            issue_id: issue.issue_id,
            rule_type: issue.rule_type,
            dimension: issue.dimension,
            rule_id: issue.rule_id,
            failure_details: issue.failure_details,
            severity: issue.severity,
            detection_time: issue.detection_time,
            resolution_time: issue.resolution_time,
            dataset_name: issue.dataset_name,
            table_name: issue.table_name,
            context: issue.context,
        }
    }
}

impl TryFrom<IssueRecord> for QualityIssue {
    type Error = DqWatchError;

    fn try_from(record: IssueRecord) -> Result<Self> {
        if record.resolved != record.resolution_time.is_some() {
            return Err(DqWatchError::invalid_issue_record(format!(
                "issue {} has resolved={} but resolution_time={:?}",
                record.issue_id, record.resolved, record.resolution_time
            )));
        }

        Ok(Self {
            issue_id: record.issue_id,
            rule_type: record.rule_type,
            dimension: record.dimension,
            rule_id: record.rule_id,
            failure_details: record.failure_details,
            severity: record.severity,
            detection_time: record.detection_time,
            resolution_time: record.resolution_time,
            dataset_name: record.dataset_name,
            table_name: record.table_name,
            context: record.context,
        })
    }
}

/// A set of related issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueGroup {
    /// Freshly generated group identifier
    pub group_id: Uuid,
    /// Member issues
    pub issue_ids: Vec<Uuid>,
}

/// Per-severity issue counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    /// All issues counted
    pub total_issues: usize,
    /// Critical issues
    pub critical_issues: usize,
    /// High severity issues
    pub high_issues: usize,
    /// Medium severity issues
    pub medium_issues: usize,
    /// Low severity issues
    pub low_issues: usize,
}

impl IssueSummary {
    /// Counts issues by severity.
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a QualityIssue>) -> Self {
        let mut summary = Self::default();
        for issue in issues {
            summary.total_issues += 1;
            match issue.severity() {
                IssueSeverity::Critical => summary.critical_issues += 1,
                IssueSeverity::High => summary.high_issues += 1,
                IssueSeverity::Medium => summary.medium_issues += 1,
                IssueSeverity::Low => summary.low_issues += 1,
            }
        }
        summary
    }
}

/// Issue report: severity summary plus full issue details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    /// Counts by severity
    pub summary: IssueSummary,
    /// Every counted issue
    pub details: Vec<QualityIssue>,
}
