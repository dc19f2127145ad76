//! Quality gauge emission.
//!
//! A published score becomes one gauge for the overall score, one per
//! dimension and one for the success rate. Every gauge carries `dataset`
//! and `table` labels; dimension gauges add a `dimension` label.

use async_trait::async_trait;
use metrics::{Label, gauge};

use crate::error::Result;
use crate::models::{DetectionContext, QualityScore};

/// Overall score gauge name.
pub const OVERALL_SCORE_METRIC: &str = "data_quality_overall_score";
/// Per-dimension score gauge name.
pub const DIMENSION_SCORE_METRIC: &str = "data_quality_dimension_score";
/// Success rate gauge name.
pub const SUCCESS_RATE_METRIC: &str = "data_quality_success_rate";

/// One gauge value ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSample {
    /// Metric name
    pub name: &'static str,
    /// Gauge value
    pub value: f64,
    /// Label pairs
    pub labels: Vec<(String, String)>,
}

/// Expands a score into the gauges published for it.
pub fn quality_gauges(score: &QualityScore, context: &DetectionContext) -> Vec<GaugeSample> {
    let asset_labels = vec![
        ("dataset".to_string(), context.dataset_name.clone()),
        ("table".to_string(), context.table_name.clone()),
    ];

    let mut samples = Vec::with_capacity(score.dimension_scores.len() + 2);
    samples.push(GaugeSample {
        name: OVERALL_SCORE_METRIC,
        value: score.overall_score,
        labels: asset_labels.clone(),
    });
    for (dimension, value) in &score.dimension_scores {
        let mut labels = asset_labels.clone();
        labels.push(("dimension".to_string(), dimension.as_str().to_string()));
        samples.push(GaugeSample {
            name: DIMENSION_SCORE_METRIC,
            value: *value,
            labels,
        });
    }
    samples.push(GaugeSample {
        name: SUCCESS_RATE_METRIC,
        value: score.success_rate,
        labels: asset_labels,
    });
    samples
}

/// Gauge sink for published quality metrics.
#[async_trait]
pub trait MetricsEmitter: Send + Sync {
    /// Emits one gauge value.
    async fn emit_gauge(&self, name: &str, value: f64, labels: &[(String, String)]) -> Result<()>;
}

/// Emits gauges through the process-wide `metrics` recorder.
///
/// Without an installed recorder the values are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeMetricsEmitter;

impl FacadeMetricsEmitter {
    /// Creates a facade emitter.
    pub const fn new() -> Self {
        Self
    }

    fn record(name: &str, value: f64, labels: &[(String, String)]) {
        let labels: Vec<Label> = labels
            .iter()
            .map(|(key, value)| Label::new(key.clone(), value.clone()))
            .collect();
        gauge!(name.to_string(), labels).set(value);
    }
}

#[async_trait]
impl MetricsEmitter for FacadeMetricsEmitter {
    async fn emit_gauge(&self, name: &str, value: f64, labels: &[(String, String)]) -> Result<()> {
        Self::record(name, value, labels);
        Ok(())
    }
}
