//! Reporter configuration.
//!
//! One JSON document configures the whole pipeline: the detector threshold,
//! the destination list, the default output format, the destination time
//! budget and whether metrics are published.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DqWatchError, Result};
use crate::issues::DetectorConfig;
use crate::report::ReportFormat;
use crate::report::destinations::DestinationConfig;

/// Smallest accepted destination time budget, in seconds.
pub const MIN_DESTINATION_TIMEOUT_SECS: u64 = 1;
/// Largest accepted destination time budget, in seconds.
pub const MAX_DESTINATION_TIMEOUT_SECS: u64 = 600;

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Issue detector settings
    pub detector: DetectorConfig,
    /// Report destinations, in delivery order
    pub destinations: Vec<DestinationConfig>,
    /// Format used when the caller does not pick one
    pub default_format: ReportFormat,
    /// Default per-destination time budget in seconds
    pub destination_timeout_secs: u64,
    /// Publish gauges for each scored report
    pub publish_metrics: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            destinations: Vec::new(),
            default_format: ReportFormat::Json,
            destination_timeout_secs: 30,
            publish_metrics: true,
        }
    }
}

impl ReporterConfig {
    /// Creates a new reporter config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the detector settings.
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Builder method to append a destination.
    pub fn with_destination(mut self, destination: DestinationConfig) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Builder method to set the default output format.
    pub fn with_default_format(mut self, format: ReportFormat) -> Self {
        self.default_format = format;
        self
    }

    /// Builder method to set the destination time budget.
    pub fn with_destination_timeout_secs(mut self, seconds: u64) -> Self {
        self.destination_timeout_secs = seconds;
        self
    }

    /// Builder method to enable or disable metric publication.
    pub fn with_publish_metrics(mut self, enabled: bool) -> Self {
        self.publish_metrics = enabled;
        self
    }

    /// Default destination time budget.
    pub fn destination_timeout(&self) -> Duration {
        Duration::from_secs(self.destination_timeout_secs)
    }

    /// Validates the configuration.
    ///
    /// Individual destination entries are not checked here; unusable
    /// entries are skipped when the reporter is built.
    ///
    /// # Errors
    ///
    /// Returns an error if a time budget is outside 1..=600 seconds.
    pub fn validate(&self) -> Result<()> {
        let range = MIN_DESTINATION_TIMEOUT_SECS..=MAX_DESTINATION_TIMEOUT_SECS;

        if !range.contains(&self.destination_timeout_secs) {
            return Err(DqWatchError::configuration(format!(
                "destination_timeout_secs must be between {MIN_DESTINATION_TIMEOUT_SECS} and \
                 {MAX_DESTINATION_TIMEOUT_SECS}, got {}",
                self.destination_timeout_secs
            )));
        }

        for destination in &self.destinations {
            if let Some(seconds) = destination.timeout_secs
                && !range.contains(&seconds)
            {
                return Err(DqWatchError::configuration(format!(
                    "timeout_secs for destination '{}' must be between \
                     {MIN_DESTINATION_TIMEOUT_SECS} and {MAX_DESTINATION_TIMEOUT_SECS}, \
                     got {seconds}",
                    destination.display_name()
                )));
            }
        }

        Ok(())
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or does not validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DqWatchError::serialization("Failed to parse reporter configuration", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or does
    /// not validate.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            DqWatchError::io(format!("Failed to read configuration {}", path.display()), e)
        })?;
        Self::from_json_str(&json)
    }
}
