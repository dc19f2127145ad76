//! Report destinations.
//!
//! A destination is a sink a finished report is pushed to. Each concrete
//! destination wraps an external collaborator client behind a trait so the
//! transport can be swapped (cloud SDK, local directory, test double):
//!
//! - [`BigQueryDestination`]: one audit row per report, via [`WarehouseClient`]
//! - [`CloudStorageDestination`]: one rendered object per report, via [`ObjectStoreClient`]
//! - [`NotificationDestination`]: an email or Teams message, via [`NotificationSender`]
//!
//! Destinations are built from [`DestinationConfig`] entries by
//! [`create_destinations`]. Entries that are unknown, invalid, or lack a
//! client are logged and skipped.

mod bigquery;
mod filesystem;
mod notification;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::format::ReportFormat;
use super::models::QualityReport;
use crate::error::{DqWatchError, Result};

pub use bigquery::{BigQueryDestination, REPORT_TABLE_SCHEMA, SchemaField};
pub use filesystem::FilesystemObjectStore;
pub use notification::{NotificationChannel, NotificationDestination, NotificationMessage};
pub use storage::{CloudStorageDestination, DEFAULT_PREFIX};

/// A sink for finished reports.
#[async_trait]
pub trait ReportDestination: Send + Sync {
    /// Name used in logs and delivery outcomes.
    fn name(&self) -> &str;

    /// Checks that the destination has everything it needs to deliver.
    fn validate_config(&self) -> Result<()>;

    /// Delivers one report in the requested format.
    async fn send_report(&self, report: &QualityReport, format: ReportFormat) -> Result<()>;

    /// Per-destination time budget, overriding the reporter default.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Data warehouse collaborator (BigQuery-like).
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Creates the dataset if it does not exist.
    async fn create_dataset(&self, dataset: &str) -> Result<()>;

    /// Creates the table if it does not exist.
    async fn create_table(&self, dataset: &str, table: &str, schema: &[SchemaField]) -> Result<()>;

    /// Appends rows to a table.
    async fn insert_rows(&self, dataset: &str, table: &str, rows: Vec<Value>) -> Result<()>;
}

/// Object storage collaborator (Cloud-Storage-like).
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Creates the bucket if it does not exist.
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Writes an object, replacing any existing object with the same name.
    async fn upload_object(
        &self,
        bucket: &str,
        object_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;
}

/// Email or Teams collaborator.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends a message to every recipient.
    async fn send(&self, message: &NotificationMessage, recipients: &[String]) -> Result<()>;
}

/// Collaborator clients available to destination construction.
#[derive(Clone, Default)]
pub struct DestinationClients {
    /// Client for `bigquery` destinations
    pub warehouse: Option<Arc<dyn WarehouseClient>>,
    /// Client for `cloud_storage` destinations
    pub object_store: Option<Arc<dyn ObjectStoreClient>>,
    /// Sender for `email` notifications
    pub email: Option<Arc<dyn NotificationSender>>,
    /// Sender for `teams` notifications
    pub teams: Option<Arc<dyn NotificationSender>>,
}

impl std::fmt::Debug for DestinationClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationClients")
            .field("warehouse", &self.warehouse.is_some())
            .field("object_store", &self.object_store.is_some())
            .field("email", &self.email.is_some())
            .field("teams", &self.teams.is_some())
            .finish()
    }
}

impl DestinationClients {
    /// Creates an empty client set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the warehouse client.
    pub fn with_warehouse(mut self, client: Arc<dyn WarehouseClient>) -> Self {
        self.warehouse = Some(client);
        self
    }

    /// Builder method to set the object store client.
    pub fn with_object_store(mut self, client: Arc<dyn ObjectStoreClient>) -> Self {
        self.object_store = Some(client);
        self
    }

    /// Builder method to set the email sender.
    pub fn with_email(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.email = Some(sender);
        self
    }

    /// Builder method to set the Teams sender.
    pub fn with_teams(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.teams = Some(sender);
        self
    }
}

/// One entry of the `destinations` configuration list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// `bigquery`, `cloud_storage` (alias `gcs`) or `notification`
    #[serde(rename = "type")]
    pub destination_type: String,
    /// Display name (defaults to the type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// BigQuery dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    /// BigQuery table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Storage bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Storage object prefix (default `quality-reports`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// `email` or `teams`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    /// Notification recipients
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    /// Time budget override in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl DestinationConfig {
    /// BigQuery destination config.
    pub fn bigquery(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            destination_type: "bigquery".to_string(),
            dataset: Some(dataset.into()),
            table: Some(table.into()),
            ..Self::default()
        }
    }

    /// Cloud Storage destination config.
    pub fn cloud_storage(bucket: impl Into<String>) -> Self {
        Self {
            destination_type: "cloud_storage".to_string(),
            bucket: Some(bucket.into()),
            ..Self::default()
        }
    }

    /// Notification destination config.
    pub fn notification(notification_type: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            destination_type: "notification".to_string(),
            notification_type: Some(notification_type.into()),
            recipients,
            ..Self::default()
        }
    }

    /// Builder method to set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to set the storage prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Builder method to override the time budget.
    pub fn with_timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = Some(seconds);
        self
    }

    /// Name used in logs: the configured name, else the type.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.destination_type.clone())
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Per-destination result of a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// The destination accepted the report
    Delivered,
    /// The destination returned an error
    Failed(String),
    /// The destination did not answer within its time budget
    TimedOut,
}

/// Outcome of sending one report to one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Destination name
    pub destination: String,
    /// Delivery result
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    /// Returns true if the report was delivered.
    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}

/// Builds one destination from its config.
///
/// The destination is validated and its remote resources (dataset/table,
/// bucket) are ensured before it is returned.
///
/// # Errors
///
/// Returns an error for an unknown type, an invalid config, a missing
/// collaborator client, or a failure while ensuring remote resources.
pub async fn create_destination(
    config: &DestinationConfig,
    clients: &DestinationClients,
) -> Result<Box<dyn ReportDestination>> {
    let kind = config.destination_type.trim().to_ascii_lowercase();
    let missing = |what: &str| {
        DqWatchError::configuration(format!(
            "No {what} client available for destination '{}'",
            config.display_name()
        ))
    };

    match kind.as_str() {
        "bigquery" => {
            let client = clients.warehouse.clone().ok_or_else(|| missing("warehouse"))?;
            Ok(Box::new(BigQueryDestination::connect(config, client).await?))
        }
        "cloud_storage" | "gcs" => {
            let client = clients
                .object_store
                .clone()
                .ok_or_else(|| missing("object store"))?;
            Ok(Box::new(CloudStorageDestination::connect(config, client).await?))
        }
        "notification" => {
            let destination = NotificationDestination::new(config, clients);
            destination.validate_config()?;
            if !destination.has_sender() {
                return Err(missing(destination.channel_name()));
            }
            Ok(Box::new(destination))
        }
        other => Err(DqWatchError::configuration(format!(
            "Unknown destination type '{other}'"
        ))),
    }
}

/// Builds every usable destination, in configuration order.
///
/// Entries that fail [`create_destination`] are logged and skipped.
pub async fn create_destinations(
    configs: &[DestinationConfig],
    clients: &DestinationClients,
) -> Vec<Box<dyn ReportDestination>> {
    let mut destinations = Vec::with_capacity(configs.len());

    for config in configs {
        match create_destination(config, clients).await {
            Ok(destination) => {
                info!("Initialized report destination '{}'", destination.name());
                destinations.push(destination);
            }
            Err(e) => {
                warn!("Skipping report destination '{}': {}", config.display_name(), e);
            }
        }
    }

    destinations
}
