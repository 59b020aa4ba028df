//! Forecasting: feature engineering, per-metric regression, autoregressive
//! multi-day prediction.

use std::collections::HashMap;

use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::info;

use crate::domain::{Metric, ReadingSeries};

pub mod driver;
pub mod features;
pub mod model;

pub use driver::forecast;
pub use features::{derive_features, FeatureRow};
pub use model::{HoldoutMetrics, MetricModel};

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("series too short for lag features: {got} rows")]
    InsufficientData { got: usize },

    #[error("no trained model for metric {0}")]
    ModelNotTrained(Metric),

    #[error("training failed: {0}")]
    Training(String),

    #[error("prediction failed: {0}")]
    Prediction(String),
}

/// One trained model per tracked metric. Rebuilt wholesale each refresh;
/// never updated incrementally.
#[derive(Debug)]
pub struct ModelSet {
    models: HashMap<Metric, MetricModel>,
}

impl ModelSet {
    /// Train a fresh regression for every metric from the same series.
    pub fn train(series: &ReadingSeries) -> Result<Self, ForecastError> {
        let mut models = HashMap::new();
        for metric in Metric::iter() {
            let (features, targets) = derive_features(series, metric)?;
            let model = MetricModel::train(metric, &features, &targets)?;
            info!(
                metric = %metric,
                r2 = model.holdout.r2,
                rmse = model.holdout.rmse,
                samples = features.len(),
                "metric model trained"
            );
            models.insert(metric, model);
        }
        Ok(Self { models })
    }

    pub fn model(&self, metric: Metric) -> Result<&MetricModel, ForecastError> {
        self.models
            .get(&metric)
            .ok_or(ForecastError::ModelNotTrained(metric))
    }

    /// Holdout diagnostics per metric, for logging and the status surface.
    pub fn diagnostics(&self) -> HashMap<Metric, HoldoutMetrics> {
        self.models
            .iter()
            .map(|(m, model)| (*m, model.holdout.clone()))
            .collect()
    }
}
