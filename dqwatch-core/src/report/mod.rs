//! Report assembly, rendering, distribution and history.
//!
//! The [`QualityReporter`] is the entry point: it runs issue detection,
//! assembles a [`QualityReport`], fans it out to the configured
//! [`destinations`], publishes gauges and answers history and trend
//! queries.

pub mod destinations;
mod format;
mod history;
pub mod metrics;
mod models;
mod pdf;
mod reporter;

// Re-export public API
pub use format::{RenderedReport, ReportFormat, ReportGenerator, format_report};
pub use history::{QualityTrends, ReportFilter, ReportHistory, TrendPoint};
pub use models::{QualityReport, ReportMetadata, ReportSummary};
pub use reporter::{DEFAULT_DESTINATION_TIMEOUT, QualityReporter};
