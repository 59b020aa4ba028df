//! Autoregressive forecast driver
//!
//! Drives each metric's model forward over the horizon, feeding every
//! step's prediction back in as the next step's lag. Error therefore
//! compounds with horizon depth; that is the accepted cost of forecasting
//! past the observed data. Metrics are driven independently and share no
//! lag state.

use chrono::Duration;
use std::collections::HashMap;

use super::features::FeatureRow;
use super::{ForecastError, ModelSet};
use crate::domain::{Metric, Reading, ReadingSeries};
use strum::IntoEnumIterator;

/// Produce a forecast covering the `horizon_days` strictly after the last
/// observed date. Each step is a pure fold over `(lag) -> (prediction,
/// next_lag)`; nothing is mutated in place.
pub fn forecast(
    models: &ModelSet,
    series: &ReadingSeries,
    horizon_days: u32,
) -> Result<ReadingSeries, ForecastError> {
    let last = series
        .last()
        .ok_or(ForecastError::InsufficientData { got: 0 })?;
    let horizon = horizon_days as usize;

    let mut columns: HashMap<Metric, Vec<f64>> = HashMap::new();
    for metric in Metric::iter() {
        let model = models.model(metric)?;

        // Day 1's lag is the last observed value; every later day's lag is
        // the previous day's prediction.
        let mut lag = last.value(metric);
        let mut values = Vec::with_capacity(horizon);
        for step in 1..=horizon as i64 {
            let date = last.date + Duration::days(step);
            let prediction = model.predict_one(&FeatureRow::for_date(date, lag))?;
            values.push(prediction);
            lag = prediction;
        }
        columns.insert(metric, values);
    }

    let readings = (0..horizon)
        .map(|i| {
            let mut reading = Reading {
                date: last.date + Duration::days(i as i64 + 1),
                temperature: 0.0,
                humidity: 0.0,
                pressure: 0.0,
            };
            for metric in Metric::iter() {
                reading.set_value(metric, columns[&metric][i]);
            }
            reading
        })
        .collect();

    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticSource;

    fn trained() -> (ModelSet, ReadingSeries) {
        let series = SyntheticSource::new(42).generate_ending("2024-06-15".parse().unwrap(), 100);
        let models = ModelSet::train(&series).unwrap();
        (models, series)
    }

    #[test]
    fn test_forecast_dates_follow_series() {
        let (models, series) = trained();
        let result = forecast(&models, &series, 3).unwrap();

        assert_eq!(result.len(), 3);
        let dates: Vec<_> = result.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-06-16", "2024-06-17", "2024-06-18"]);
        for r in result.iter() {
            assert!(r.temperature.is_finite());
            assert!(r.humidity.is_finite());
            assert!(r.pressure.is_finite());
        }
    }

    #[test]
    fn test_forecast_is_deterministic() {
        let (models, series) = trained();
        let a = forecast(&models, &series, 7).unwrap();
        let b = forecast(&models, &series, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_each_step_feeds_the_next_lag() {
        let (models, series) = trained();
        let result = forecast(&models, &series, 4).unwrap();

        let model = models.model(Metric::Temperature).unwrap();
        let mut lag = series.last().unwrap().temperature;
        for predicted in result.iter() {
            let expected = model
                .predict_one(&FeatureRow::for_date(predicted.date, lag))
                .unwrap();
            assert!((predicted.temperature - expected).abs() < 1e-9);
            lag = predicted.temperature;
        }
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let (models, series) = trained();
        let result = forecast(&models, &series, 0).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_series_rejected() {
        let (models, _) = trained();
        let err = forecast(&models, &ReadingSeries::default(), 3).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { got: 0 }));
    }
}
