//! Calendar and lag feature derivation
//!
//! One feature row per reading after the first: calendar fields from the
//! reading's own date, the lag field from the immediately preceding
//! reading. The first reading has no predecessor and is dropped.

use chrono::{Datelike, NaiveDate};

use super::ForecastError;
use crate::domain::{Metric, ReadingSeries};

pub const FEATURE_COUNT: usize = 4;

/// Input vector for one single-step prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub day_of_year: f64,
    pub month: f64,
    pub day: f64,
    /// The metric's value on the immediately preceding day.
    pub lag1: f64,
}

impl FeatureRow {
    pub fn for_date(date: NaiveDate, lag1: f64) -> Self {
        Self {
            day_of_year: date.ordinal() as f64,
            month: date.month() as f64,
            day: date.day() as f64,
            lag1,
        }
    }

    pub fn to_array(self) -> [f64; FEATURE_COUNT] {
        [self.day_of_year, self.month, self.day, self.lag1]
    }
}

/// Derive feature rows and aligned targets for one metric.
///
/// Emits exactly `series.len() - 1` rows; fails with `InsufficientData`
/// when there is no pair of consecutive readings to derive from.
pub fn derive_features(
    series: &ReadingSeries,
    metric: Metric,
) -> Result<(Vec<FeatureRow>, Vec<f64>), ForecastError> {
    if series.len() < 2 {
        return Err(ForecastError::InsufficientData { got: series.len() });
    }

    let mut features = Vec::with_capacity(series.len() - 1);
    let mut targets = Vec::with_capacity(series.len() - 1);
    for pair in series.readings().windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        features.push(FeatureRow::for_date(current.date, previous.value(metric)));
        targets.push(current.value(metric));
    }

    Ok((features, targets))
}
