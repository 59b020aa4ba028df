//! Core sensor reading types
//!
//! A `Reading` is one day's observed temperature/humidity/pressure; a
//! `ReadingSeries` is an ascending-by-date sequence of readings. Every
//! pipeline stage consumes one series and produces a new one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The metrics tracked by the pipeline. Each gets its own forecast model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Humidity,
    Pressure,
}

/// One day's observed sensor values.
///
/// Invariant: `0 <= humidity <= 100`. Connectors clamp humidity on ingest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub date: NaiveDate,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
}

impl Reading {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Pressure => self.pressure,
        }
    }

    pub fn set_value(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Temperature => self.temperature = value,
            Metric::Humidity => self.humidity = value,
            Metric::Pressure => self.pressure = value,
        }
    }
}

/// An owned, ascending-by-date sequence of readings.
///
/// Construction sorts, so insertion order never matters to callers. The
/// series is a value: stages hand whole series around, nothing mutates one
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingSeries(Vec<Reading>);

impl ReadingSeries {
    pub fn new(mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.date);
        Self(readings)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn readings(&self) -> &[Reading] {
        &self.0
    }

    pub fn first(&self) -> Option<&Reading> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Reading> {
        self.0.last()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.0.last().map(|r| r.date)
    }

    /// Column view of one metric, in date order.
    pub fn values(&self, metric: Metric) -> Vec<f64> {
        self.0.iter().map(|r| r.value(metric)).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.0.iter()
    }

    pub fn into_readings(self) -> Vec<Reading> {
        self.0
    }
}

impl IntoIterator for ReadingSeries {
    type Item = Reading;
    type IntoIter = std::vec::IntoIter<Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Reading> for ReadingSeries {
    fn from_iter<T: IntoIterator<Item = Reading>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
