//! Issue detector facade.
//!
//! The detector owns the live issue set. Every read takes a shared lock and
//! every mutation (detection, status updates, threshold changes, retention
//! cleanup) takes the exclusive lock, so one detector can be shared through
//! an `Arc` by any number of concurrent report runs.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::config::DetectorConfig;
use super::filter::IssueFilter;
use super::healing::{HealingPayload, format_issue_for_healing};
use super::models::{IssueGroup, IssueReport, IssueSeverity, IssueSummary, QualityIssue};
use crate::Result;
use crate::models::{DetectionContext, QualityDimension, RuleMetadata, RuleType, ValidationResult};
use crate::retention::window_start;

/// Classifies the severity of an issue.
///
/// # Classification Order
/// 1. An explicit severity in the rule metadata wins
/// 2. Schema rules are `High`
/// 3. Completeness rules are `Medium`
/// 4. Everything else is `Low`
pub fn classify_issue_severity(
    rule_type: RuleType,
    dimension: QualityDimension,
    metadata: Option<&RuleMetadata>,
) -> IssueSeverity {
    if let Some(severity) = metadata.and_then(|m| m.severity) {
        return severity;
    }

    match (rule_type, dimension) {
        (RuleType::Schema, _) => IssueSeverity::High,
        (_, QualityDimension::Completeness) => IssueSeverity::Medium,
        _ => IssueSeverity::Low,
    }
}

#[derive(Debug, Default)]
struct DetectorState {
    config: DetectorConfig,
    issues: HashMap<Uuid, QualityIssue>,
    /// Issue ids in detection order
    order: Vec<Uuid>,
    groups: Vec<IssueGroup>,
}

impl DetectorState {
    fn ordered(&self) -> impl Iterator<Item = &QualityIssue> {
        self.order.iter().filter_map(|id| self.issues.get(id))
    }

    fn regroup(&mut self) {
        // One issue per group until pattern-based grouping is designed.
        self.groups = self
            .order
            .iter()
            .map(|id| IssueGroup {
                group_id: Uuid::new_v4(),
                issue_ids: vec![*id],
            })
            .collect();
    }
}

/// Detects, classifies, and tracks quality issues.
///
/// # Example
///
/// ```rust
/// use dqwatch_core::issues::{IssueDetector, IssueFilter, IssueSeverity};
/// use dqwatch_core::models::{
///     DetectionContext, QualityDimension, RuleType, ValidationResult, ValidationStatus,
/// };
///
/// let detector = IssueDetector::with_defaults();
/// let results = vec![ValidationResult::new(
///     "orders_id_not_null",
///     RuleType::Content,
///     QualityDimension::Completeness,
///     ValidationStatus::Warning,
/// )];
/// detector.detect_issues(&results, &DetectionContext::new("sales", "orders"));
///
/// let medium_and_up = detector.get_issues(Some(&IssueFilter::at_or_above(IssueSeverity::Medium)));
/// assert_eq!(medium_and_up.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct IssueDetector {
    state: RwLock<DetectorState>,
}

impl IssueDetector {
    /// Creates a new issue detector with the given configuration.
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            state: RwLock::new(DetectorState {
                config,
                ..DetectorState::default()
            }),
        }
    }

    /// Creates a new issue detector with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(DetectorConfig::default())
    }

    fn read(&self) -> RwLockReadGuard<'_, DetectorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DetectorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a snapshot of the detector configuration.
    pub fn config(&self) -> DetectorConfig {
        self.read().config.clone()
    }

    /// Returns the current severity threshold.
    pub fn severity_threshold(&self) -> IssueSeverity {
        self.read().config.severity_threshold
    }

    /// Sets the severity threshold from its string form.
    ///
    /// # Errors
    /// Returns `InvalidSeverity` if the value is not a recognized severity.
    pub fn set_severity_threshold(&self, threshold: &str) -> Result<()> {
        let severity: IssueSeverity = threshold.parse()?;
        self.write().config.severity_threshold = severity;
        tracing::debug!("Severity threshold set to {}", severity);
        Ok(())
    }

    /// Detects issues in a batch of validation results.
    ///
    /// Every failed or warning result becomes a new tracked issue; passed
    /// results are ignored. Groups are recomputed over the whole tracked
    /// set afterwards.
    ///
    /// # Returns
    /// Only the issues created by this call.
    pub fn detect_issues(
        &self,
        validation_results: &[ValidationResult],
        context: &DetectionContext,
    ) -> Vec<QualityIssue> {
        let detected: Vec<QualityIssue> = validation_results
            .iter()
            .filter(|result| result.status.is_actionable())
            .map(|result| {
                let severity = classify_issue_severity(
                    result.rule_type,
                    result.dimension,
                    context.metadata_for(&result.rule_id),
                );
                QualityIssue::new(result, severity, context)
            })
            .collect();

        let mut state = self.write();
        for issue in &detected {
            state.order.push(issue.issue_id());
            state.issues.insert(issue.issue_id(), issue.clone());
        }
        state.regroup();
        drop(state);

        tracing::info!(
            "Detected {} issue(s) from {} validation result(s) for {}.{}",
            detected.len(),
            validation_results.len(),
            context.dataset_name,
            context.table_name
        );

        detected
    }

    /// Recomputes issue groups over the tracked set.
    pub fn group_related_issues(&self) {
        self.write().regroup();
    }

    /// Returns the current issue groups.
    pub fn issue_groups(&self) -> Vec<IssueGroup> {
        self.read().groups.clone()
    }

    /// Number of tracked issues.
    pub fn tracked_count(&self) -> usize {
        self.read().issues.len()
    }

    /// Returns tracked issues in detection order, narrowed by a filter.
    pub fn get_issues(&self, filter: Option<&IssueFilter>) -> Vec<QualityIssue> {
        self.read()
            .ordered()
            .filter(|issue| filter.is_none_or(|f| f.matches(issue)))
            .cloned()
            .collect()
    }

    /// Looks up a tracked issue.
    pub fn get_issue_by_id(&self, issue_id: Uuid) -> Option<QualityIssue> {
        self.read().issues.get(&issue_id).cloned()
    }

    /// Updates the resolution state of an issue.
    ///
    /// `resolved = true` marks the issue resolved (a no-op if it already
    /// is); `resolved = false` reopens it.
    ///
    /// # Returns
    /// `false` if the issue is not tracked.
    pub fn update_issue_status(&self, issue_id: Uuid, resolved: bool) -> bool {
        let mut state = self.write();
        let Some(issue) = state.issues.get_mut(&issue_id) else {
            tracing::debug!("Status update for unknown issue {}", issue_id);
            return false;
        };

        if resolved {
            issue.mark_resolved();
        } else {
            issue.reopen();
        }
        true
    }

    /// Formats the given tracked issues for the self-healing system.
    ///
    /// Unknown ids are skipped.
    pub fn prepare_issues_for_healing(&self, issue_ids: &[Uuid]) -> Vec<HealingPayload> {
        let state = self.read();
        issue_ids
            .iter()
            .filter_map(|id| {
                let issue = state.issues.get(id);
                if issue.is_none() {
                    tracing::debug!("Skipping unknown issue {} for healing", id);
                }
                issue
            })
            .map(format_issue_for_healing)
            .collect()
    }

    /// Builds a per-severity report over the (filtered) tracked set.
    pub fn generate_issue_report(&self, filter: Option<&IssueFilter>) -> IssueReport {
        let details = self.get_issues(filter);
        IssueReport {
            summary: IssueSummary::from_issues(&details),
            details,
        }
    }

    /// Removes resolved issues older than the retention window.
    ///
    /// Unresolved issues are never removed.
    ///
    /// # Returns
    /// The number of issues removed.
    pub fn clear_resolved_issues(&self, older_than_days: u32) -> usize {
        let cutoff = window_start(Utc::now(), older_than_days);
        self.clear_resolved_issues_before(cutoff)
    }

    /// Removes resolved issues whose resolution time is before `cutoff`.
    pub fn clear_resolved_issues_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut state = self.write();
        let before = state.issues.len();

        state.issues.retain(|_, issue| {
            issue
                .resolution_time()
                .is_none_or(|resolved_at| resolved_at >= cutoff)
        });

        let removed = before - state.issues.len();
        if removed > 0 {
            let DetectorState { issues, order, .. } = &mut *state;
            order.retain(|id| issues.contains_key(id));
            state.regroup();
            tracing::info!("Cleared {} resolved issue(s) older than {}", removed, cutoff);
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::error::DqWatchError;
    use crate::models::ValidationStatus;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn result(
        rule_id: &str,
        rule_type: RuleType,
        dimension: QualityDimension,
        status: ValidationStatus,
    ) -> ValidationResult {
        ValidationResult::new(rule_id, rule_type, dimension, status)
            .with_details(json!({"rule": rule_id}))
    }

    fn mixed_batch() -> Vec<ValidationResult> {
        vec![
            result("p1", RuleType::Content, QualityDimension::Accuracy, ValidationStatus::Passed),
            result("p2", RuleType::Schema, QualityDimension::Validity, ValidationStatus::Passed),
            result("f1", RuleType::Schema, QualityDimension::Validity, ValidationStatus::Failed),
            result(
                "f2",
                RuleType::Content,
                QualityDimension::Completeness,
                ValidationStatus::Failed,
            ),
            result("w1", RuleType::Content, QualityDimension::Accuracy, ValidationStatus::Warning),
        ]
    }

    fn context() -> DetectionContext {
        DetectionContext::new("sales", "orders")
    }

    #[test]
    fn test_classification_fallthrough() {
        assert_eq!(
            classify_issue_severity(RuleType::Schema, QualityDimension::Completeness, None),
            IssueSeverity::High
        );
        assert_eq!(
            classify_issue_severity(RuleType::Content, QualityDimension::Completeness, None),
            IssueSeverity::Medium
        );
        assert_eq!(
            classify_issue_severity(RuleType::Statistical, QualityDimension::Timeliness, None),
            IssueSeverity::Low
        );
    }

    #[test]
    fn test_classification_metadata_override_wins() {
        let metadata = RuleMetadata::with_severity(IssueSeverity::Critical);
        assert_eq!(
            classify_issue_severity(RuleType::Custom, QualityDimension::Accuracy, Some(&metadata)),
            IssueSeverity::Critical
        );

        let low = RuleMetadata::with_severity(IssueSeverity::Low);
        assert_eq!(
            classify_issue_severity(RuleType::Schema, QualityDimension::Validity, Some(&low)),
            IssueSeverity::Low
        );

        // Metadata without a severity does not override
        let empty = RuleMetadata::default();
        assert_eq!(
            classify_issue_severity(RuleType::Schema, QualityDimension::Validity, Some(&empty)),
            IssueSeverity::High
        );
    }

    #[test]
    fn test_classification_is_total() {
        for rule_type in RuleType::ALL {
            for dimension in QualityDimension::ALL {
                let first = classify_issue_severity(*rule_type, *dimension, None);
                let second = classify_issue_severity(*rule_type, *dimension, None);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_detect_mixed_batch() {
        let detector = IssueDetector::with_defaults();
        let issues = detector.detect_issues(&mixed_batch(), &context());

        assert_eq!(issues.len(), 3);
        let severities: Vec<_> = issues.iter().map(QualityIssue::severity).collect();
        assert_eq!(
            severities,
            vec![IssueSeverity::High, IssueSeverity::Medium, IssueSeverity::Low]
        );
        assert_eq!(detector.tracked_count(), 3);
    }

    #[test]
    fn test_detect_uses_rule_metadata() {
        let detector = IssueDetector::with_defaults();
        let metadata = RuleMetadata::with_severity(IssueSeverity::Critical);
        let context = context().with_rule_metadata("w1", metadata);

        let issues = detector.detect_issues(&mixed_batch(), &context);
        let w1 = issues.iter().find(|i| i.rule_id() == "w1").unwrap();
        assert_eq!(w1.severity(), IssueSeverity::Critical);
    }

    #[test]
    fn test_detect_empty_batch() {
        let detector = IssueDetector::with_defaults();
        assert!(detector.detect_issues(&[], &context()).is_empty());
        assert_eq!(detector.tracked_count(), 0);
        assert!(detector.issue_groups().is_empty());
    }

    #[test]
    fn test_detect_returns_only_new_issues() {
        let detector = IssueDetector::with_defaults();
        detector.detect_issues(&mixed_batch(), &context());
        let second = detector.detect_issues(&mixed_batch()[2..3], &context());

        assert_eq!(second.len(), 1);
        assert_eq!(detector.tracked_count(), 4);
    }

    #[test]
    fn test_groups_cover_entire_tracked_set() {
        let detector = IssueDetector::with_defaults();
        detector.detect_issues(&mixed_batch(), &context());
        detector.detect_issues(&mixed_batch(), &context());

        let groups = detector.issue_groups();
        assert_eq!(groups.len(), 6);
        assert!(groups.iter().all(|g| g.issue_ids.len() == 1));

        let grouped: HashSet<Uuid> = groups.iter().flat_map(|g| g.issue_ids.clone()).collect();
        let tracked: HashSet<Uuid> = detector
            .get_issues(None)
            .iter()
            .map(QualityIssue::issue_id)
            .collect();
        assert_eq!(grouped, tracked);

        let group_ids: HashSet<Uuid> = groups.iter().map(|g| g.group_id).collect();
        assert_eq!(group_ids.len(), groups.len());
    }

    #[test]
    fn test_get_issues_preserves_detection_order() {
        let detector = IssueDetector::with_defaults();
        let issues = detector.detect_issues(&mixed_batch(), &context());

        let tracked: Vec<Uuid> = detector
            .get_issues(None)
            .iter()
            .map(QualityIssue::issue_id)
            .collect();
        let detected: Vec<Uuid> = issues.iter().map(QualityIssue::issue_id).collect();
        assert_eq!(tracked, detected);
    }

    #[test]
    fn test_get_issues_with_filter() {
        let detector = IssueDetector::with_defaults();
        detector.detect_issues(&mixed_batch(), &context());

        let schema_filter = IssueFilter::new().with_rule_type(RuleType::Schema);
        let schema_only = detector.get_issues(Some(&schema_filter));
        assert_eq!(schema_only.len(), 1);
        assert_eq!(schema_only[0].rule_id(), "f1");

        let all = detector.get_issues(Some(&IssueFilter::new()));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_get_issue_by_id() {
        let detector = IssueDetector::with_defaults();
        let issues = detector.detect_issues(&mixed_batch(), &context());

        let found = detector.get_issue_by_id(issues[0].issue_id()).unwrap();
        assert_eq!(found, issues[0]);
        assert!(detector.get_issue_by_id(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_update_issue_status() {
        let detector = IssueDetector::with_defaults();
        let id = detector.detect_issues(&mixed_batch(), &context())[0].issue_id();

        assert!(detector.update_issue_status(id, true));
        let resolved = detector.get_issue_by_id(id).unwrap();
        assert!(resolved.resolved());
        let first_time = resolved.resolution_time().unwrap();

        // Idempotent
        assert!(detector.update_issue_status(id, true));
        let again = detector.get_issue_by_id(id).unwrap();
        assert!(again.resolved());
        assert_eq!(again.resolution_time(), Some(first_time));

        // Reopen
        assert!(detector.update_issue_status(id, false));
        let reopened = detector.get_issue_by_id(id).unwrap();
        assert!(!reopened.resolved());
        assert!(reopened.resolution_time().is_none());
    }

    #[test]
    fn test_update_unknown_issue_returns_false() {
        let detector = IssueDetector::with_defaults();
        assert!(!detector.update_issue_status(Uuid::new_v4(), true));
    }

    #[test]
    fn test_prepare_issues_for_healing_skips_unknown() {
        let detector = IssueDetector::with_defaults();
        let issues = detector.detect_issues(&mixed_batch(), &context());

        let ids = vec![issues[0].issue_id(), Uuid::new_v4(), issues[2].issue_id()];
        let payloads = detector.prepare_issues_for_healing(&ids);

        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].issue_id, issues[0].issue_id().to_string());
        assert_eq!(payloads[0].rule_type, "schema");
        assert_eq!(payloads[1].dimension, "accuracy");
    }

    #[test]
    fn test_generate_issue_report() {
        let detector = IssueDetector::with_defaults();
        detector.detect_issues(&mixed_batch(), &context());

        let report = detector.generate_issue_report(None);
        assert_eq!(report.summary.total_issues, 3);
        assert_eq!(report.summary.critical_issues, 0);
        assert_eq!(report.summary.high_issues, 1);
        assert_eq!(report.summary.medium_issues, 1);
        assert_eq!(report.summary.low_issues, 1);
        assert_eq!(report.details.len(), 3);

        let filtered =
            detector.generate_issue_report(Some(&IssueFilter::at_or_above(IssueSeverity::Medium)));
        assert_eq!(filtered.summary.total_issues, 2);
        assert_eq!(filtered.summary.low_issues, 0);
    }

    #[test]
    fn test_clear_resolved_issues_respects_age_and_state() {
        let detector = IssueDetector::with_defaults();
        let issues = detector.detect_issues(&mixed_batch(), &context());
        let old_id = issues[0].issue_id();
        let recent_id = issues[1].issue_id();
        let open_id = issues[2].issue_id();

        {
            let mut state = detector.write();
            state
                .issues
                .get_mut(&old_id)
                .unwrap()
                .mark_resolved_at(Utc::now() - Duration::days(10));
            state
                .issues
                .get_mut(&recent_id)
                .unwrap()
                .mark_resolved_at(Utc::now() - Duration::days(1));
        }

        let removed = detector.clear_resolved_issues(7);
        assert_eq!(removed, 1);
        assert!(detector.get_issue_by_id(old_id).is_none());
        assert!(detector.get_issue_by_id(recent_id).is_some());
        assert!(detector.get_issue_by_id(open_id).is_some());
        assert_eq!(detector.get_issues(None).len(), 2);
        assert_eq!(detector.issue_groups().len(), 2);
    }

    #[test]
    fn test_clear_never_removes_unresolved() {
        let detector = IssueDetector::with_defaults();
        detector.detect_issues(&mixed_batch(), &context());

        let removed = detector.clear_resolved_issues_before(Utc::now() + Duration::days(365));
        assert_eq!(removed, 0);
        assert_eq!(detector.tracked_count(), 3);
    }

    #[test]
    fn test_clear_with_oversized_window_keeps_everything() {
        let detector = IssueDetector::with_defaults();
        let issues = detector.detect_issues(&mixed_batch(), &context());
        assert!(detector.update_issue_status(issues[0].issue_id(), true));

        assert_eq!(detector.clear_resolved_issues(u32::MAX), 0);
        assert_eq!(detector.clear_resolved_issues(100_000_000), 0);
        assert_eq!(detector.tracked_count(), 3);
    }

    #[test]
    fn test_set_severity_threshold() {
        let detector = IssueDetector::with_defaults();
        assert_eq!(detector.severity_threshold(), IssueSeverity::Medium);

        detector.set_severity_threshold("high").unwrap();
        assert_eq!(detector.severity_threshold(), IssueSeverity::High);
        assert_eq!(detector.config().severity_threshold, IssueSeverity::High);

        let err = detector.set_severity_threshold("severe").unwrap_err();
        assert!(matches!(err, DqWatchError::InvalidSeverity { .. }));
        assert_eq!(detector.severity_threshold(), IssueSeverity::High);
    }

    #[test]
    fn test_threshold_does_not_filter_detection() {
        let config = DetectorConfig::new().with_severity_threshold(IssueSeverity::Critical);
        let detector = IssueDetector::new(config);
        let issues = detector.detect_issues(&mixed_batch(), &context());
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_concurrent_detection() {
        let detector = Arc::new(IssueDetector::with_defaults());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let detector = Arc::clone(&detector);
                std::thread::spawn(move || detector.detect_issues(&mixed_batch(), &context()).len())
            })
            .collect();

        let created: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(created, 24);
        assert_eq!(detector.tracked_count(), 24);
        assert_eq!(detector.get_issues(None).len(), 24);
        assert_eq!(detector.issue_groups().len(), 24);
    }
}
