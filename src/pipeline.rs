//! Refresh-cycle orchestration
//!
//! One refresh is a sequential unit of work: acquire a series, train a
//! fresh model set, drive the forecast, persist both series. The result
//! is a [`PipelineState`] rebuilt wholesale each cycle; the previous state
//! is simply dropped. This state is the entire surface a presentation
//! layer is allowed to read.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::domain::{Metric, ReadingSeries};
use crate::forecast::{self, ForecastError, HoldoutMetrics, ModelSet};
use crate::persist::{BatchWriter, DocumentStore, PersistOutcome};
use crate::source::{Acquisition, SourceId, SourceOrchestrator};

/// Snapshot of one completed refresh cycle.
#[derive(Debug)]
pub struct PipelineState {
    pub series: ReadingSeries,
    /// `None` when the cycle could not produce a forecast; the raw series
    /// is still valid and displayable.
    pub forecast: Option<ReadingSeries>,
    pub diagnostics: HashMap<Metric, HoldoutMetrics>,
    pub source_used: SourceId,
    pub fallback_reason: Option<String>,
    pub persist_outcomes: Vec<(String, PersistOutcome)>,
    pub refreshed_at: DateTime<Utc>,
    pub status: String,
}

pub struct Pipeline<S> {
    orchestrator: SourceOrchestrator,
    config: PipelineConfig,
    writer: Option<SeriesSink<S>>,
}

struct SeriesSink<S> {
    writer: BatchWriter<S>,
    readings_collection: String,
    forecast_collection: String,
}

impl<S: DocumentStore> Pipeline<S> {
    pub fn new(orchestrator: SourceOrchestrator, config: PipelineConfig) -> Self {
        Self {
            orchestrator,
            config,
            writer: None,
        }
    }

    pub fn with_writer(
        mut self,
        writer: BatchWriter<S>,
        readings_collection: impl Into<String>,
        forecast_collection: impl Into<String>,
    ) -> Self {
        self.writer = Some(SeriesSink {
            writer,
            readings_collection: readings_collection.into(),
            forecast_collection: forecast_collection.into(),
        });
        self
    }

    /// Run one full refresh cycle. Never fails: acquisition degrades to
    /// synthetic data, a failed forecast leaves `forecast: None`, and
    /// persistence failures are reported on the state, not raised.
    pub async fn refresh(&self) -> PipelineState {
        let Acquisition {
            series,
            source_used,
            fallback_reason,
        } = self.orchestrator.acquire(self.config.history_days).await;

        let (forecast, diagnostics) = self.build_forecast(&series);

        let refreshed_at = Utc::now();
        let status = if forecast.is_some() {
            format!("Data refreshed at {}", refreshed_at.format("%H:%M:%S"))
        } else {
            format!(
                "Data refreshed at {} (forecast unavailable)",
                refreshed_at.format("%H:%M:%S")
            )
        };

        let persist_outcomes = self.persist(&series, forecast.as_ref()).await;

        PipelineState {
            series,
            forecast,
            diagnostics,
            source_used,
            fallback_reason,
            persist_outcomes,
            refreshed_at,
            status,
        }
    }

    fn build_forecast(
        &self,
        series: &ReadingSeries,
    ) -> (Option<ReadingSeries>, HashMap<Metric, HoldoutMetrics>) {
        let models = match ModelSet::train(series) {
            Ok(models) => models,
            Err(ForecastError::InsufficientData { got }) => {
                warn!(rows = got, "not enough data to train, forecast unavailable");
                return (None, HashMap::new());
            }
            Err(e) => {
                error!(error = %e, "training failed, forecast unavailable");
                return (None, HashMap::new());
            }
        };

        let diagnostics = models.diagnostics();
        match forecast::forecast(&models, series, self.config.horizon_days) {
            Ok(forecast) => {
                info!(rows = forecast.len(), "forecast produced");
                (Some(forecast), diagnostics)
            }
            Err(e) => {
                error!(error = %e, "forecast failed");
                (None, diagnostics)
            }
        }
    }

    async fn persist(
        &self,
        series: &ReadingSeries,
        forecast: Option<&ReadingSeries>,
    ) -> Vec<(String, PersistOutcome)> {
        let Some(sink) = &self.writer else {
            return Vec::new();
        };

        let mut outcomes = Vec::new();

        let outcome = sink.writer.persist(series, &sink.readings_collection).await;
        if !outcome.is_success() {
            warn!(collection = %sink.readings_collection, ?outcome, "readings persist incomplete");
        }
        outcomes.push((sink.readings_collection.clone(), outcome));

        if let Some(forecast) = forecast {
            let outcome = sink.writer.persist(forecast, &sink.forecast_collection).await;
            if !outcome.is_success() {
                warn!(collection = %sink.forecast_collection, ?outcome, "forecast persist incomplete");
            }
            outcomes.push((sink.forecast_collection.clone(), outcome));
        }

        outcomes
    }
}
