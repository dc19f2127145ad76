//! Cloud Storage object destination.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{DestinationConfig, ObjectStoreClient, ReportDestination};
use crate::error::{DqWatchError, Result};
use crate::report::format::{ReportFormat, format_report};
use crate::report::models::QualityReport;

/// Object prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "quality-reports";

/// Uploads each report, rendered, as one object.
///
/// Objects are named `{prefix}/{YYYYmmdd_HHMMSS}_report.{ext}` using the
/// UTC upload time.
pub struct CloudStorageDestination {
    name: String,
    bucket: String,
    prefix: String,
    timeout: Option<Duration>,
    client: Arc<dyn ObjectStoreClient>,
}

impl CloudStorageDestination {
    /// Creates an unvalidated destination.
    pub fn new(config: &DestinationConfig, client: Arc<dyn ObjectStoreClient>) -> Self {
        Self {
            name: config.display_name(),
            bucket: config.bucket.clone().unwrap_or_default(),
            prefix: config
                .prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            timeout: config.timeout(),
            client,
        }
    }

    /// Creates, validates and ensures the bucket exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the bucket cannot be
    /// ensured.
    pub async fn connect(
        config: &DestinationConfig,
        client: Arc<dyn ObjectStoreClient>,
    ) -> Result<Self> {
        let destination = Self::new(config, client);
        destination.validate_config()?;
        destination.client.create_bucket(&destination.bucket).await?;
        info!(
            "Cloud Storage destination '{}' writing to bucket '{}'",
            destination.name, destination.bucket
        );
        Ok(destination)
    }

    /// Object name for a report rendered at `at`.
    pub fn object_name(&self, at: DateTime<Utc>, format: ReportFormat) -> String {
        let file = format!("{}_report.{}", at.format("%Y%m%d_%H%M%S"), format.extension());
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            file
        } else {
            format!("{prefix}/{file}")
        }
    }
}

#[async_trait]
impl ReportDestination for CloudStorageDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate_config(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(DqWatchError::configuration(format!(
                "Cloud Storage destination '{}' requires a bucket",
                self.name
            )));
        }
        Ok(())
    }

    async fn send_report(&self, report: &QualityReport, format: ReportFormat) -> Result<()> {
        let rendered = format_report(report, format)?;
        let object_name = self.object_name(Utc::now(), format);
        let content_type = rendered.content_type();

        self.client
            .upload_object(&self.bucket, &object_name, rendered.into_bytes(), content_type)
            .await?;
        debug!("Uploaded report to gs://{}/{}", self.bucket, object_name);
        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::MemoryObjectStore;
    use super::*;
    use crate::models::DetectionContext;
    use chrono::TimeZone;

    #[test]
    fn test_object_name() {
        let store: Arc<dyn ObjectStoreClient> = Arc::new(MemoryObjectStore::default());
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();

        let config = DestinationConfig::cloud_storage("b");
        let destination = CloudStorageDestination::new(&config, Arc::clone(&store));
        assert_eq!(
            destination.object_name(at, ReportFormat::Markdown),
            "quality-reports/20240309_070501_report.md"
        );

        let destination = CloudStorageDestination::new(
            &DestinationConfig::cloud_storage("b").with_prefix("nightly/"),
            Arc::clone(&store),
        );
        assert_eq!(
            destination.object_name(at, ReportFormat::Json),
            "nightly/20240309_070501_report.json"
        );

        let config = DestinationConfig::cloud_storage("b").with_prefix("");
        let destination = CloudStorageDestination::new(&config, store);
        assert_eq!(destination.object_name(at, ReportFormat::Csv), "20240309_070501_report.csv");
    }

    #[test]
    fn test_validation_requires_bucket() {
        let store: Arc<dyn ObjectStoreClient> = Arc::new(MemoryObjectStore::default());
        let mut config = DestinationConfig::cloud_storage("reports");
        config.bucket = None;
        assert!(CloudStorageDestination::new(&config, store).validate_config().is_err());
    }

    #[tokio::test]
    async fn test_send_report_uploads_rendered_object() {
        let store = Arc::new(MemoryObjectStore::default());
        let config = DestinationConfig::cloud_storage("reports");
        let destination = CloudStorageDestination::connect(&config, store.clone())
            .await
            .unwrap();
        assert_eq!(*store.buckets.lock().unwrap(), vec!["reports".to_string()]);

        let context = DetectionContext::new("sales", "orders");
        let report = QualityReport::assemble(&[], None, None, Vec::new(), &context);
        destination
            .send_report(&report, ReportFormat::Csv)
            .await
            .unwrap();

        let objects = store.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        let (bucket, name, data, content_type) = &objects[0];
        assert_eq!(bucket, "reports");
        assert!(name.starts_with("quality-reports/"));
        assert!(name.ends_with("_report.csv"));
        assert_eq!(data.as_slice(), b"rule_id,status,dimension,details\r\n");
        assert_eq!(content_type, "text/csv; charset=utf-8");
    }
}
