use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::PathBuf;

use crate::source::SourceId;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub persistence: PersistenceConfig,
}

/// Which backend to acquire from, plus per-backend credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: SourceId,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    /// Seed for the synthetic generator, both as a primary source and as
    /// the fallback.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_history_days")]
    pub history_days: u32,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_readings_collection")]
    pub readings_collection: String,
    #[serde(default = "default_forecast_collection")]
    pub forecast_collection: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("sensor_data.csv")
}

fn default_http_timeout() -> u64 {
    10
}

fn default_seed() -> u64 {
    42
}

fn default_history_days() -> u32 {
    100
}

fn default_horizon_days() -> u32 {
    7
}

fn default_readings_collection() -> String {
    "sensor_data".to_string()
}

fn default_forecast_collection() -> String {
    "predictions".to_string()
}

fn default_batch_size() -> usize {
    crate::persist::DEFAULT_BATCH_SIZE
}

fn default_max_retries() -> u32 {
    crate::persist::DEFAULT_MAX_RETRIES
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("SENSOR__").split("__"));
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.history_days < 2 {
            anyhow::bail!("pipeline.history_days must be at least 2 for lag features");
        }
        if self.persistence.enabled && self.persistence.base_url.is_empty() {
            anyhow::bail!("persistence.base_url must be set when persistence is enabled");
        }
        Ok(())
    }
}
