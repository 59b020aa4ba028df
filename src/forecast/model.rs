//! Per-metric regression model
//!
//! A `MetricModel` is a fitted standardizer plus a smartcore linear
//! regression over the four calendar/lag features. Trained once per
//! refresh from a deterministic 80/20 split; the holdout metrics are
//! diagnostics only and never drive control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};

use super::features::{FeatureRow, FEATURE_COUNT};
use super::ForecastError;
use crate::domain::Metric;

/// Fraction of samples held out for evaluation.
pub const HOLDOUT_FRACTION: f64 = 0.2;

/// Goodness-of-fit numbers computed on the holdout slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldoutMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl HoldoutMetrics {
    fn from_predictions(predictions: &[f64], targets: &[f64]) -> Self {
        let n = predictions.len() as f64;

        let mae = predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / n;

        let mse = predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / n;

        let mean_target = targets.iter().sum::<f64>() / n;
        let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
        let ss_res: f64 = predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (t - p).powi(2))
            .sum();
        let r2 = if ss_tot.abs() < 1e-10 {
            0.0
        } else {
            1.0 - ss_res / ss_tot
        };

        Self {
            mae,
            rmse: mse.sqrt(),
            r2,
        }
    }
}

/// Per-feature standardization fitted on the training slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardizer {
    means: [f64; FEATURE_COUNT],
    stds: [f64; FEATURE_COUNT],
}

impl Standardizer {
    fn fit(rows: &[FeatureRow]) -> Self {
        let n = rows.len() as f64;
        let mut means = [0.0; FEATURE_COUNT];
        let mut stds = [0.0; FEATURE_COUNT];

        for row in rows {
            for (i, v) in row.to_array().iter().enumerate() {
                means[i] += v / n;
            }
        }
        for row in rows {
            for (i, v) in row.to_array().iter().enumerate() {
                stds[i] += (v - means[i]).powi(2) / n;
            }
        }
        for s in stds.iter_mut() {
            *s = s.sqrt();
            // Constant columns pass through unscaled.
            if *s < 1e-12 {
                *s = 1.0;
            }
        }

        Self { means, stds }
    }

    fn transform(&self, row: &FeatureRow) -> [f64; FEATURE_COUNT] {
        let mut out = row.to_array();
        for (i, v) in out.iter_mut().enumerate() {
            *v = (*v - self.means[i]) / self.stds[i];
        }
        out
    }
}

/// Trained regression state for one metric. Immutable after training;
/// replaced wholesale on retraining.
#[derive(Debug)]
pub struct MetricModel {
    pub metric: Metric,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
    pub holdout: HoldoutMetrics,
    scaler: Standardizer,
    regression: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl MetricModel {
    /// Fit a standardized linear regression over `features` against
    /// `targets`, holding out the trailing [`HOLDOUT_FRACTION`] for
    /// evaluation.
    pub fn train(
        metric: Metric,
        features: &[FeatureRow],
        targets: &[f64],
    ) -> Result<Self, ForecastError> {
        if features.is_empty() {
            return Err(ForecastError::InsufficientData { got: 0 });
        }
        if features.len() != targets.len() {
            return Err(ForecastError::Training(format!(
                "feature/target mismatch: {} vs {}",
                features.len(),
                targets.len()
            )));
        }

        let split = (features.len() as f64 * (1.0 - HOLDOUT_FRACTION)).floor() as usize;
        let split = split.max(1);
        let (train_rows, holdout_rows) = features.split_at(split.min(features.len()));
        let (train_targets, holdout_targets) = targets.split_at(split.min(targets.len()));

        let scaler = Standardizer::fit(train_rows);

        let x = matrix(&scaler, train_rows);
        let regression = LinearRegression::fit(
            &x,
            &train_targets.to_vec(),
            LinearRegressionParameters::default(),
        )
        .map_err(|e| ForecastError::Training(e.to_string()))?;

        // Tiny series leave no holdout; score on the training slice so the
        // diagnostics are still populated.
        let (eval_rows, eval_targets) = if holdout_rows.is_empty() {
            (train_rows, train_targets)
        } else {
            (holdout_rows, holdout_targets)
        };
        let predictions = regression
            .predict(&matrix(&scaler, eval_rows))
            .map_err(|e| ForecastError::Training(e.to_string()))?;
        let holdout = HoldoutMetrics::from_predictions(&predictions, eval_targets);

        Ok(Self {
            metric,
            trained_at: Utc::now(),
            training_samples: train_rows.len(),
            holdout,
            scaler,
            regression,
        })
    }

    /// Pure application of the fitted model to one feature row.
    pub fn predict_one(&self, row: &FeatureRow) -> Result<f64, ForecastError> {
        let scaled = self.scaler.transform(row);
        let x = DenseMatrix::new(1, FEATURE_COUNT, scaled.to_vec(), false);
        let predicted = self
            .regression
            .predict(&x)
            .map_err(|e| ForecastError::Prediction(e.to_string()))?;
        predicted
            .first()
            .copied()
            .ok_or_else(|| ForecastError::Prediction("empty prediction".into()))
    }
}

fn matrix(scaler: &Standardizer, rows: &[FeatureRow]) -> DenseMatrix<f64> {
    let mut flat = Vec::with_capacity(rows.len() * FEATURE_COUNT);
    for row in rows {
        flat.extend_from_slice(&scaler.transform(row));
    }
    DenseMatrix::new(rows.len(), FEATURE_COUNT, flat, false)
}
