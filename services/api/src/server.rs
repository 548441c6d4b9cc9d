use crate::cli::ServeArgs;
use crate::infra::{open_catalog, open_lifecycle, AppState};
use crate::routes::with_service_routes;
use axum_prometheus::PrometheusMetricLayer;
use globaldorm::config::AppConfig;
use globaldorm::error::AppError;
use globaldorm::rooms::RoomCatalog;
use globaldorm::telemetry;
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
    args.storage.apply(&mut config.storage);

    telemetry::init(&config.telemetry)?;

    let catalog = open_catalog(&config.storage)?;
    let lifecycle = open_lifecycle(&config.storage)?;
    info!(
        rooms = catalog.len(),
        applications = lifecycle.count(),
        artifact = %config.storage.applications_file.display(),
        "application store opened"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        lifecycle,
        catalog,
    };

    let app = with_service_routes(app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "room application service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
