//! Typed issue filters.

use serde::{Deserialize, Serialize};

use super::models::{IssueSeverity, QualityIssue};
use crate::models::{QualityDimension, RuleType};

/// Predicate over tracked issues.
///
/// Every populated field must match; an empty filter matches every issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueFilter {
    /// Exact severity
    pub severity: Option<IssueSeverity>,
    /// Severity floor (inclusive)
    pub min_severity: Option<IssueSeverity>,
    /// Resolution state
    pub resolved: Option<bool>,
    /// Originating rule category
    pub rule_type: Option<RuleType>,
    /// Quality dimension
    pub dimension: Option<QualityDimension>,
    /// Originating rule id
    pub rule_id: Option<String>,
    /// Dataset name
    pub dataset_name: Option<String>,
    /// Table name
    pub table_name: Option<String>,
}

impl IssueFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches issues at or above a severity.
    pub fn at_or_above(threshold: IssueSeverity) -> Self {
        Self::new().with_min_severity(threshold)
    }

    /// Builder method to match one severity.
    pub fn with_severity(mut self, severity: IssueSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Builder method to set a severity floor.
    pub fn with_min_severity(mut self, severity: IssueSeverity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// Builder method to match resolution state.
    pub fn with_resolved(mut self, resolved: bool) -> Self {
        self.resolved = Some(resolved);
        self
    }

    /// Builder method to match a rule category.
    pub fn with_rule_type(mut self, rule_type: RuleType) -> Self {
        self.rule_type = Some(rule_type);
        self
    }

    /// Builder method to match a dimension.
    pub fn with_dimension(mut self, dimension: QualityDimension) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// Builder method to match a rule id.
    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Builder method to match a data asset.
    pub fn with_asset(
        mut self,
        dataset_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        self.dataset_name = Some(dataset_name.into());
        self.table_name = Some(table_name.into());
        self
    }

    /// Returns true if no matcher is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Tests an issue against every populated matcher.
    pub fn matches(&self, issue: &QualityIssue) -> bool {
        self.severity.is_none_or(|s| issue.severity() == s)
            && self.min_severity.is_none_or(|s| issue.severity() >= s)
            && self.resolved.is_none_or(|r| issue.resolved() == r)
            && self.rule_type.is_none_or(|t| issue.rule_type() == t)
            && self.dimension.is_none_or(|d| issue.dimension() == d)
            && self
                .rule_id
                .as_deref()
                .is_none_or(|id| issue.rule_id() == id)
            && self
                .dataset_name
                .as_deref()
                .is_none_or(|name| issue.dataset_name() == name)
            && self
                .table_name
                .as_deref()
                .is_none_or(|name| issue.table_name() == name)
    }
}
