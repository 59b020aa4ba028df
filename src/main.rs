use anyhow::Result;
use sensor_monitor::config::Config;
use sensor_monitor::persist::{BatchWriter, HttpDocumentStore};
use sensor_monitor::pipeline::Pipeline;
use sensor_monitor::source::SourceOrchestrator;
use sensor_monitor::telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    info!(source = %cfg.source.id, days = cfg.pipeline.history_days, "starting refresh cycle");

    let orchestrator = SourceOrchestrator::from_config(&cfg.source)?;
    let mut pipeline = Pipeline::new(orchestrator, cfg.pipeline.clone());

    if cfg.persistence.enabled {
        let store = HttpDocumentStore::new(
            cfg.persistence.base_url.clone(),
            std::time::Duration::from_secs(cfg.persistence.http_timeout_seconds),
        )?;
        let writer = BatchWriter::new(store)
            .with_batch_size(cfg.persistence.batch_size)
            .with_max_retries(cfg.persistence.max_retries);
        pipeline = pipeline.with_writer(
            writer,
            cfg.persistence.readings_collection.clone(),
            cfg.persistence.forecast_collection.clone(),
        );
    }

    let state = pipeline.refresh().await;

    if let Some(reason) = &state.fallback_reason {
        warn!(%reason, "configured source was substituted with synthetic data");
    }
    for (metric, holdout) in &state.diagnostics {
        info!(metric = %metric, r2 = holdout.r2, mae = holdout.mae, "model diagnostics");
    }
    for (collection, outcome) in &state.persist_outcomes {
        info!(%collection, ?outcome, "persistence outcome");
    }
    info!(
        source = %state.source_used,
        rows = state.series.len(),
        forecast_rows = state.forecast.as_ref().map(|f| f.len()).unwrap_or(0),
        status = %state.status,
        "refresh cycle complete"
    );

    Ok(())
}
