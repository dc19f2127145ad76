//! BigQuery audit-row destination.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{DestinationConfig, ReportDestination, WarehouseClient};
use crate::error::{DqWatchError, Result};
use crate::report::format::ReportFormat;
use crate::report::models::QualityReport;

/// One column of the report table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    /// Column name
    pub name: &'static str,
    /// BigQuery column type
    pub field_type: &'static str,
    /// `REQUIRED` or `NULLABLE`
    pub mode: &'static str,
}

/// Fixed schema of the report table.
pub const REPORT_TABLE_SCHEMA: &[SchemaField] = &[
    SchemaField {
        name: "timestamp",
        field_type: "TIMESTAMP",
        mode: "REQUIRED",
    },
    SchemaField {
        name: "report_id",
        field_type: "STRING",
        mode: "REQUIRED",
    },
    SchemaField {
        name: "quality_score",
        field_type: "FLOAT",
        mode: "NULLABLE",
    },
    SchemaField {
        name: "details",
        field_type: "STRING",
        mode: "REQUIRED",
    },
];

/// Writes one row per report to a warehouse table.
pub struct BigQueryDestination {
    name: String,
    dataset: String,
    table: String,
    timeout: Option<Duration>,
    client: Arc<dyn WarehouseClient>,
}

impl BigQueryDestination {
    /// Creates an unvalidated destination.
    pub fn new(config: &DestinationConfig, client: Arc<dyn WarehouseClient>) -> Self {
        Self {
            name: config.display_name(),
            dataset: config.dataset.clone().unwrap_or_default(),
            table: config.table.clone().unwrap_or_default(),
            timeout: config.timeout(),
            client,
        }
    }

    /// Creates, validates and ensures the dataset and table exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the table cannot be
    /// ensured.
    pub async fn connect(
        config: &DestinationConfig,
        client: Arc<dyn WarehouseClient>,
    ) -> Result<Self> {
        let destination = Self::new(config, client);
        destination.validate_config()?;
        destination.ensure_table().await?;
        info!(
            "BigQuery destination '{}' writing to {}.{}",
            destination.name, destination.dataset, destination.table
        );
        Ok(destination)
    }

    async fn ensure_table(&self) -> Result<()> {
        self.client.create_dataset(&self.dataset).await?;
        self.client
            .create_table(&self.dataset, &self.table, REPORT_TABLE_SCHEMA)
            .await
    }

    /// Builds the row written for a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized.
    pub fn report_row(report: &QualityReport) -> Result<Value> {
        let details = serde_json::to_string(report)
            .map_err(|e| DqWatchError::serialization("Failed to encode report row", e))?;

        Ok(json!({
            "timestamp": report.metadata.timestamp.to_rfc3339(),
            "report_id": report.metadata.report_id.to_string(),
            "quality_score": report.overall_score(),
            "details": details,
        }))
    }
}

#[async_trait]
impl ReportDestination for BigQueryDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate_config(&self) -> Result<()> {
        if self.dataset.trim().is_empty() {
            return Err(DqWatchError::configuration(format!(
                "BigQuery destination '{}' requires a dataset",
                self.name
            )));
        }
        if self.table.trim().is_empty() {
            return Err(DqWatchError::configuration(format!(
                "BigQuery destination '{}' requires a table",
                self.name
            )));
        }
        Ok(())
    }

    async fn send_report(&self, report: &QualityReport, _format: ReportFormat) -> Result<()> {
        let row = Self::report_row(report)?;
        self.client
            .insert_rows(&self.dataset, &self.table, vec![row])
            .await?;
        debug!(
            "Inserted report {} into {}.{}",
            report.metadata.report_id, self.dataset, self.table
        );
        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
