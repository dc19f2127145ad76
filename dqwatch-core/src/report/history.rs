//! In-memory report history and trend queries.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::models::QualityReport;
use crate::retention::window_start;

/// Predicate over retained reports.
///
/// Every populated field must match; an empty filter matches every report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFilter {
    /// Dataset name
    pub dataset_name: Option<String>,
    /// Table name
    pub table_name: Option<String>,
    /// Inclusive lower bound on the report timestamp
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the report timestamp
    pub until: Option<DateTime<Utc>>,
}

impl ReportFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
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

    /// Builder method to set the lower time bound.
    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Builder method to set the upper time bound.
    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Tests a report against every populated matcher.
    pub fn matches(&self, report: &QualityReport) -> bool {
        let metadata = &report.metadata;
        self.dataset_name
            .as_deref()
            .is_none_or(|name| metadata.dataset_name == name)
            && self
                .table_name
                .as_deref()
                .is_none_or(|name| metadata.table_name == name)
            && self.since.is_none_or(|since| metadata.timestamp >= since)
            && self.until.is_none_or(|until| metadata.timestamp < until)
    }
}

/// One point of a score time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Report timestamp
    pub timestamp: DateTime<Utc>,
    /// Overall score at that time
    pub overall_score: f64,
    /// Report the point was taken from
    pub report_id: Uuid,
}

/// Overall-score time series for one data asset.
///
/// Points are ordered by timestamp. Reports without a score contribute no
/// point and missing days are not filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTrends {
    /// Dataset name
    pub dataset_name: String,
    /// Table name
    pub table_name: String,
    /// Trailing window in days (`None` for explicit windows)
    pub days: Option<u32>,
    /// Window start (inclusive)
    pub start: DateTime<Utc>,
    /// Window end
    pub end: DateTime<Utc>,
    /// Score series
    pub points: Vec<TrendPoint>,
}

impl QualityTrends {
    /// Latest score in the window.
    pub fn latest(&self) -> Option<f64> {
        self.points.last().map(|p| p.overall_score)
    }

    /// Mean score over the window.
    pub fn average(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.points.len() as f64;
        Some(self.points.iter().map(|p| p.overall_score).sum::<f64>() / count)
    }

    /// Latest score minus earliest score.
    pub fn change(&self) -> Option<f64> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => Some(last.overall_score - first.overall_score),
            _ => None,
        }
    }
}

/// Lock-guarded list of generated reports, oldest first.
///
/// History is unbounded until cleared.
#[derive(Debug, Default)]
pub struct ReportHistory {
    reports: RwLock<Vec<QualityReport>>,
}

impl ReportHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<QualityReport>> {
        self.reports.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<QualityReport>> {
        self.reports.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a report.
    pub fn record(&self, report: QualityReport) {
        self.write().push(report);
    }

    /// Number of retained reports.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no report is retained.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns matching reports, oldest first.
    pub fn reports(&self, filter: Option<&ReportFilter>) -> Vec<QualityReport> {
        self.read()
            .iter()
            .filter(|report| filter.is_none_or(|f| f.matches(report)))
            .cloned()
            .collect()
    }

    /// Looks up a report by id.
    pub fn get(&self, report_id: Uuid) -> Option<QualityReport> {
        self.read()
            .iter()
            .find(|report| report.metadata.report_id == report_id)
            .cloned()
    }

    /// Score series for an asset over the trailing `days`.
    pub fn trends(&self, dataset_name: &str, table_name: &str, days: u32) -> QualityTrends {
        let end = Utc::now();
        let start = window_start(end, days);
        let mut trends = self.trends_since(dataset_name, table_name, start, end);
        trends.days = Some(days);
        trends
    }

    /// Score series for an asset with `start <= timestamp <= end`.
    pub fn trends_since(
        &self,
        dataset_name: &str,
        table_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> QualityTrends {
        let mut points: Vec<TrendPoint> = self
            .read()
            .iter()
            .filter(|report| {
                report.metadata.dataset_name == dataset_name
                    && report.metadata.table_name == table_name
                    && report.metadata.timestamp >= start
                    && report.metadata.timestamp <= end
            })
            .filter_map(|report| {
                report.overall_score().map(|overall_score| TrendPoint {
                    timestamp: report.metadata.timestamp,
                    overall_score,
                    report_id: report.metadata.report_id,
                })
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);

        QualityTrends {
            dataset_name: dataset_name.to_string(),
            table_name: table_name.to_string(),
            days: None,
            start,
            end,
            points,
        }
    }

    /// Removes reports older than `days`, returning the count removed.
    pub fn clear_older_than(&self, days: u32) -> usize {
        self.clear_before(window_start(Utc::now(), days))
    }

    /// Removes reports generated before `cutoff`, returning the count removed.
    pub fn clear_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut reports = self.write();
        let before = reports.len();
        reports.retain(|report| report.metadata.timestamp >= cutoff);
        let removed = before - reports.len();
        debug!("Cleared {} report(s) generated before {}", removed, cutoff);
        removed
    }

    /// Removes every report, returning the count removed.
    pub fn clear(&self) -> usize {
        let mut reports = self.write();
        let removed = reports.len();
        reports.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::models::{DetectionContext, QualityScore};

    fn report_at(dataset: &str, table: &str, days_ago: i64, score: Option<f64>) -> QualityReport {
        let context = DetectionContext::new(dataset, table);
        let quality_score = score.map(|s| QualityScore::new(s, 1.0));
        let mut report =
            QualityReport::assemble(&[], None, quality_score.as_ref(), Vec::new(), &context);
        report.metadata.timestamp = Utc::now() - Duration::days(days_ago);
        report
    }

    #[test]
    fn test_trends_window() {
        let history = ReportHistory::new();
        history.record(report_at("sales", "orders", 10, Some(0.70)));
        history.record(report_at("sales", "orders", 5, Some(0.80)));
        history.record(report_at("sales", "orders", 1, Some(0.90)));

        let trends = history.trends("sales", "orders", 7);
        assert_eq!(trends.days, Some(7));
        assert_eq!(trends.points.len(), 2);
        assert!((trends.points[0].overall_score - 0.80).abs() < f64::EPSILON);
        assert!((trends.points[1].overall_score - 0.90).abs() < f64::EPSILON);
        assert!((trends.change().unwrap() - 0.10).abs() < 1e-9);
        assert!((trends.average().unwrap() - 0.85).abs() < 1e-9);
        assert_eq!(trends.latest(), Some(0.90));
    }

    #[test]
    fn test_trends_ignore_other_assets_and_missing_scores() {
        let history = ReportHistory::new();
        history.record(report_at("sales", "orders", 1, Some(0.9)));
        history.record(report_at("sales", "customers", 1, Some(0.5)));
        history.record(report_at("sales", "orders", 2, None));

        let trends = history.trends("sales", "orders", 7);
        assert_eq!(trends.points.len(), 1);
        assert_eq!(trends.average(), Some(0.9));
    }

    #[test]
    fn test_trend_points_sorted_by_timestamp() {
        let history = ReportHistory::new();
        history.record(report_at("sales", "orders", 1, Some(0.9)));
        history.record(report_at("sales", "orders", 3, Some(0.6)));

        let trends = history.trends("sales", "orders", 7);
        assert!(trends.points[0].timestamp < trends.points[1].timestamp);
        assert_eq!(trends.points[0].overall_score, 0.6);
    }

    #[test]
    fn test_empty_trends() {
        let history = ReportHistory::new();
        let trends = history.trends("sales", "orders", 30);
        assert!(trends.points.is_empty());
        assert_eq!(trends.latest(), None);
        assert_eq!(trends.average(), None);
        assert_eq!(trends.change(), None);
    }

    #[test]
    fn test_filter_and_lookup() {
        let history = ReportHistory::new();
        let orders = report_at("sales", "orders", 1, Some(0.9));
        let orders_id = orders.report_id();
        history.record(orders);
        history.record(report_at("sales", "customers", 3, None));

        assert_eq!(history.reports(None).len(), 2);
        let filter = ReportFilter::new().with_asset("sales", "orders");
        let matched = history.reports(Some(&filter));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].report_id(), orders_id);

        let recent = ReportFilter::new().with_since(Utc::now() - Duration::days(2));
        assert_eq!(history.reports(Some(&recent)).len(), 1);
        let older = ReportFilter::new().with_until(Utc::now() - Duration::days(2));
        assert_eq!(history.reports(Some(&older)).len(), 1);

        assert!(history.get(orders_id).is_some());
        assert!(history.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_clear_older_than() {
        let history = ReportHistory::new();
        history.record(report_at("sales", "orders", 40, None));
        history.record(report_at("sales", "orders", 31, None));
        history.record(report_at("sales", "orders", 2, None));

        assert_eq!(history.clear_older_than(30), 2);
        assert_eq!(history.len(), 1);
        assert_eq!(history.clear_older_than(30), 0);
        assert_eq!(history.clear(), 1);
        assert!(history.is_empty());
    }

    #[test]
    fn test_oversized_windows_cover_all_history() {
        let history = ReportHistory::new();
        history.record(report_at("sales", "orders", 4000, Some(0.4)));
        history.record(report_at("sales", "orders", 1, Some(0.9)));

        let trends = history.trends("sales", "orders", 100_000_000);
        assert_eq!(trends.points.len(), 2);
        assert_eq!(trends.start, DateTime::<Utc>::MIN_UTC);

        assert_eq!(history.clear_older_than(u32::MAX), 0);
        assert_eq!(history.len(), 2);
    }
}
