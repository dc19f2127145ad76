//! Quality-issue detection and tracking.
//!
//! This module turns failing and warning validation results into tracked,
//! severity-classified issues:
//! - **Classification**: rule-level override, then schema rules, then
//!   completeness rules, with `low` as the fallback
//! - **Tracking**: a lock-guarded store keyed by issue id, shared across
//!   concurrent report runs
//! - **Queries**: typed filters, per-severity reports, retention cleanup
//! - **Healing hand-off**: the fixed payload shape consumed by the
//!   self-healing system
//!
//! # Example
//! ```rust
//! use dqwatch_core::issues::{IssueDetector, IssueSeverity};
//! use dqwatch_core::models::{
//!     DetectionContext, QualityDimension, RuleType, ValidationResult, ValidationStatus,
//! };
//!
//! let detector = IssueDetector::with_defaults();
//! let results = vec![ValidationResult::new(
//!     "orders_schema",
//!     RuleType::Schema,
//!     QualityDimension::Validity,
//!     ValidationStatus::Failed,
//! )];
//!
//! let issues = detector.detect_issues(&results, &DetectionContext::new("sales", "orders"));
//! assert_eq!(issues.len(), 1);
//! assert_eq!(issues[0].severity(), IssueSeverity::High);
//! ```

mod config;
mod detector;
mod filter;
mod healing;
mod models;

// Re-export public API
pub use config::DetectorConfig;
pub use detector::{IssueDetector, classify_issue_severity};
pub use filter::IssueFilter;
pub use healing::{HealingPayload, format_issue_for_healing};
pub use models::{IssueGroup, IssueReport, IssueSeverity, IssueSummary, QualityIssue};
