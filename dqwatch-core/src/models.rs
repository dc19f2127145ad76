//! Input models produced by the validation and scoring engines.
//!
//! These types are consumed, never mutated, by issue detection and report
//! assembly. Enum values serialize as stable lowercase strings so that
//! anything downstream (healing payloads, report rows, CSV cells) sees the
//! same representation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DqWatchError;
use crate::issues::IssueSeverity;

string_enum! {
    /// Outcome of evaluating a single validation rule.
    pub enum ValidationStatus {
        /// Rule held for the data asset
        Passed => "passed",
        /// Rule was violated
        Failed => "failed",
        /// Rule was violated below its failure threshold
        Warning => "warning",
    }
    parse_error = |value: &str| DqWatchError::configuration(
        format!("Unknown validation status '{}'", value)
    );
}

impl ValidationStatus {
    /// Returns true for statuses that produce a quality issue.
    pub const fn is_actionable(&self) -> bool {
        matches!(self, Self::Failed | Self::Warning)
    }
}

string_enum! {
    /// Category of the rule that produced a validation result.
    pub enum RuleType {
        /// Structural rules: columns, types, nullability
        Schema => "schema",
        /// Value-level content rules
        Content => "content",
        /// Cross-table and referential rules
        Relationship => "relationship",
        /// Distribution and statistical rules
        Statistical => "statistical",
        /// User-defined rules
        Custom => "custom",
    }
    parse_error = |value: &str| DqWatchError::configuration(
        format!("Unknown rule type '{}'", value)
    );
}

string_enum! {
    /// Data quality dimension a rule checks.
    pub enum QualityDimension {
        /// Missing or null values
        Completeness => "completeness",
        /// Values matching reality or a reference
        Accuracy => "accuracy",
        /// Agreement across fields and tables
        Consistency => "consistency",
        /// Conformance to format and domain
        Validity => "validity",
        /// Absence of duplicates
        Uniqueness => "uniqueness",
        /// Freshness of the data
        Timeliness => "timeliness",
    }
    parse_error = |value: &str| DqWatchError::configuration(
        format!("Unknown quality dimension '{}'", value)
    );
}

/// Result of evaluating one rule against one data asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Identifier of the evaluated rule
    pub rule_id: String,
    /// Category of the rule
    pub rule_type: RuleType,
    /// Quality dimension the rule checks
    pub dimension: QualityDimension,
    /// Pass/fail/warning outcome
    pub status: ValidationStatus,
    /// Failure payload (column names, thresholds, observed values)
    #[serde(default)]
    pub details: Value,
}

impl ValidationResult {
    /// Creates a validation result with an empty details payload.
    pub fn new(
        rule_id: impl Into<String>,
        rule_type: RuleType,
        dimension: QualityDimension,
        status: ValidationStatus,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_type,
            dimension,
            status,
            details: Value::Null,
        }
    }

    /// Sets the failure details payload.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// Aggregate counts over one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of rules evaluated
    pub total_rules: usize,
    /// Rules that passed
    pub passed_rules: usize,
    /// Rules that failed
    pub failed_rules: usize,
    /// Rules that produced a warning
    pub warning_rules: usize,
    /// Passed rules over total rules (0.0-1.0)
    pub success_rate: f64,
    /// Wall-clock time of the run, if reported by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl ValidationSummary {
    /// Derives a summary from a batch of results.
    ///
    /// An empty batch has a success rate of 1.0.
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let mut passed_rules = 0usize;
        let mut failed_rules = 0usize;
        let mut warning_rules = 0usize;

        for result in results {
            match result.status {
                ValidationStatus::Passed => passed_rules += 1,
                ValidationStatus::Failed => failed_rules += 1,
                ValidationStatus::Warning => warning_rules += 1,
            }
        }

        let total_rules = results.len();
        let success_rate = if total_rules == 0 {
            1.0
        } else {
            passed_rules as f64 / total_rules as f64
        };

        Self {
            total_rules,
            passed_rules,
            failed_rules,
            warning_rules,
            success_rate,
            execution_time_ms: None,
        }
    }

    /// Sets the reported execution time.
    pub fn with_execution_time_ms(mut self, millis: u64) -> Self {
        self.execution_time_ms = Some(millis);
        self
    }
}

/// Quality score snapshot produced by the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Overall score for the data asset
    pub overall_score: f64,
    /// Per-dimension scores
    #[serde(default)]
    pub dimension_scores: BTreeMap<QualityDimension, f64>,
    /// Overall validation success rate (0.0-1.0)
    pub success_rate: f64,
}

impl QualityScore {
    /// Creates a score with no dimension breakdown.
    pub fn new(overall_score: f64, success_rate: f64) -> Self {
        Self {
            overall_score,
            dimension_scores: BTreeMap::new(),
            success_rate,
        }
    }

    /// Adds or replaces one dimension score.
    pub fn with_dimension(mut self, dimension: QualityDimension, score: f64) -> Self {
        self.dimension_scores.insert(dimension, score);
        self
    }
}

/// Per-rule metadata supplied by the caller alongside a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleMetadata {
    /// Explicit severity; overrides classification when present
    #[serde(default)]
    pub severity: Option<IssueSeverity>,
    /// Human readable rule description
    #[serde(default)]
    pub description: Option<String>,
    /// Owning team or person
    #[serde(default)]
    pub owner: Option<String>,
}

impl RuleMetadata {
    /// Creates metadata carrying an explicit severity.
    pub fn with_severity(severity: IssueSeverity) -> Self {
        Self {
            severity: Some(severity),
            ..Self::default()
        }
    }
}

/// Execution context for one detection / report run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionContext {
    /// Dataset containing the validated table
    pub dataset_name: String,
    /// Validated table
    pub table_name: String,
    /// Rule metadata keyed by rule id
    #[serde(default)]
    pub rule_metadata: HashMap<String, RuleMetadata>,
    /// Free-form diagnostic attributes copied onto every issue
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl DetectionContext {
    /// Creates a context for a dataset/table pair.
    pub fn new(dataset_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            table_name: table_name.into(),
            rule_metadata: HashMap::new(),
            attributes: Map::new(),
        }
    }

    /// Registers metadata for a rule.
    pub fn with_rule_metadata(
        mut self,
        rule_id: impl Into<String>,
        metadata: RuleMetadata,
    ) -> Self {
        self.rule_metadata.insert(rule_id.into(), metadata);
        self
    }

    /// Adds a diagnostic attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Looks up metadata for a rule.
    pub fn metadata_for(&self, rule_id: &str) -> Option<&RuleMetadata> {
        self.rule_metadata.get(rule_id)
    }
}
