//! Core data structures and pipeline for dqwatch.
//!
//! This crate turns validation results into tracked quality issues and
//! distributable quality reports. It sits between a validation engine and a
//! scoring engine upstream, and storage, notification, metrics and
//! self-healing systems downstream.
//!
//! # Pipeline Guarantees
//! - Issue tracking and report history are lock-guarded and safe to share
//!   across concurrent report runs
//! - Report distribution is best-effort: a failing destination never stops
//!   the others from being attempted
//! - Every destination call runs under its own time budget
//! - The self-healing hand-off keeps a fixed field layout
//!
//! # Architecture
//! - [`issues`]: detection, severity classification and issue tracking
//! - [`report`]: report assembly, rendering, destinations, metrics and history
//! - [`config`]: JSON-loadable configuration for the whole pipeline

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod issues;
pub mod logging;
pub mod models;
pub mod report;
pub mod retention;

// Re-export commonly used types
pub use config::ReporterConfig;
pub use error::{DqWatchError, Result};
pub use issues::{
    DetectorConfig, HealingPayload, IssueDetector, IssueFilter, IssueSeverity, QualityIssue,
};
pub use models::{
    DetectionContext, QualityDimension, QualityScore, RuleMetadata, RuleType, ValidationResult,
    ValidationStatus, ValidationSummary,
};
pub use report::{
    QualityReport, QualityReporter, QualityTrends, ReportFilter, ReportFormat, format_report,
};
