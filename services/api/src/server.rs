use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_assessment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use crime_risk::config::AppConfig;
use crime_risk::error::AppError;
use crime_risk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(tables) = args.tables.take() {
        config.assessment.reference_tables = Some(tables);
    }

    telemetry::init(&config.telemetry)?;

    let engine = Arc::new(config.assessment.build_engine()?);
    let source = config
        .assessment
        .reference_tables
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "embedded".to_string());
    info!(
        %source,
        crime_types = engine.tables().time_windows.len(),
        max_batch_size = engine.max_batch_size(),
        "reference tables validated"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_assessment_routes(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "crime risk assessment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
