//! Sensor monitoring core: data acquisition, forecasting and persistence.
//!
//! The pipeline acquires a daily series of environmental readings from a
//! configured backend (with deterministic synthetic fallback), trains one
//! linear regression per metric over calendar and lag features, drives an
//! autoregressive multi-day forecast, and persists both series to a remote
//! document collection with batched, retried writes.

pub mod config;
pub mod domain;
pub mod forecast;
pub mod persist;
pub mod pipeline;
pub mod source;
pub mod telemetry;
