use chrono::NaiveDate;
use crime_risk::assessment::AssessmentEngine;
use crime_risk::config::AppConfig;
use crime_risk::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Engine for one-shot CLI commands, honouring a `--tables` override.
pub(crate) fn load_engine(tables: Option<PathBuf>) -> Result<AssessmentEngine, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(path) = tables {
        config.assessment.reference_tables = Some(path);
    }
    Ok(config.assessment.build_engine()?)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
