//! Issue detector configuration.

use serde::{Deserialize, Serialize};

use super::models::IssueSeverity;

/// Issue detector configuration.
///
/// The severity threshold is advisory: detection records every failing or
/// warning result regardless of it. Callers narrow output with
/// `IssueFilter::at_or_above(threshold)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Severity floor for summaries (default: medium)
    #[serde(default)]
    pub severity_threshold: IssueSeverity,
}

impl DetectorConfig {
    /// Creates a new detector config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the severity threshold.
    pub fn with_severity_threshold(mut self, threshold: IssueSeverity) -> Self {
        self.severity_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.severity_threshold, IssueSeverity::Medium);
    }

    #[test]
    fn test_detector_config_builder() {
        let config = DetectorConfig::new().with_severity_threshold(IssueSeverity::High);
        assert_eq!(config.severity_threshold, IssueSeverity::High);
    }

    #[test]
    fn test_detector_config_deserializes_missing_threshold() {
        let config: DetectorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.severity_threshold, IssueSeverity::Medium);

        let config: DetectorConfig =
            serde_json::from_str(r#"{"severity_threshold": "critical"}"#).unwrap();
        assert_eq!(config.severity_threshold, IssueSeverity::Critical);
    }
}
