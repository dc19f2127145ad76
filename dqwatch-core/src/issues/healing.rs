//! Hand-off payload for the self-healing system.
//!
//! The self-healing consumer reads this shape structurally. Field names are
//! fixed and enum values travel as their lowercase string form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::models::QualityIssue;

/// Issue as consumed by the self-healing system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingPayload {
    /// Issue identifier (hyphenated UUID)
    pub issue_id: String,
    /// Rule category string value
    pub rule_type: String,
    /// Quality dimension string value
    pub dimension: String,
    /// Failure payload from the validation result
    pub failure_details: Value,
    /// Dataset name
    pub dataset_name: String,
    /// Table name
    pub table_name: String,
    /// Diagnostic context
    pub context: Map<String, Value>,
}

/// Formats one issue for the self-healing system.
pub fn format_issue_for_healing(issue: &QualityIssue) -> HealingPayload {
    HealingPayload {
        issue_id: issue.issue_id().to_string(),
        rule_type: issue.rule_type().as_str().to_string(),
        dimension: issue.dimension().as_str().to_string(),
        failure_details: issue.failure_details().clone(),
        dataset_name: issue.dataset_name().to_string(),
        table_name: issue.table_name().to_string(),
        context: issue.context().clone(),
    }
}
