//! Backend connectors for sensor data acquisition
//!
//! Each connector implements [`SensorSource`]: fetch the most recent N days
//! of readings from one backend. The [`orchestrator`] selects a connector
//! from configuration and guarantees the pipeline always gets data by
//! falling back to the synthetic generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::domain::ReadingSeries;

pub mod file;
pub mod iot_channel;
pub mod orchestrator;
pub mod synthetic;
pub mod weather_api;

pub use file::FileBackedSource;
pub use iot_channel::IotChannelSource;
pub use orchestrator::{Acquisition, SourceOrchestrator};
pub use synthetic::SyntheticSource;
pub use weather_api::GenericWeatherApiSource;

/// Identifier for a configured data source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Simulated,
    GenericWeatherApi,
    IotChannelApi,
    FileBacked,
}

/// Connector-level failures. All of these are recovered by the
/// [`SourceOrchestrator`] via synthetic fallback and never escape `acquire`.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("credentials not configured for {0}")]
    MissingCredentials(&'static str),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("data file not found: {0}")]
    NotFound(PathBuf),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("series too short: {got} rows")]
    TooShort { got: usize },
}

/// Uniform "fetch N days of readings" capability over all backends.
///
/// `days` is the number of most-recent days requested; the file-backed
/// connector returns everything it has instead. Results are sorted
/// ascending by date.
#[async_trait]
pub trait SensorSource: Send + Sync {
    fn id(&self) -> SourceId;

    async fn fetch(&self, days: u32) -> Result<ReadingSeries, SourceError>;
}
