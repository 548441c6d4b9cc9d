use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use globaldorm::applications::{application_router, run_blocking, ApplicationDesk};
use globaldorm::rooms::{room_router, RoomCatalog};
use serde_json::json;

pub(crate) fn with_service_routes(state: AppState) -> axum::Router {
    let desk = ApplicationDesk {
        lifecycle: state.lifecycle.clone(),
        catalog: state.catalog.clone(),
    };

    application_router(desk)
        .merge(room_router(state.catalog.clone()))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .layer(Extension(state))
}

pub(crate) async fn healthcheck(Extension(state): Extension<AppState>) -> Response {
    let lifecycle = state.lifecycle.clone();
    let total_applications = match run_blocking(move || lifecycle.count()).await {
        Ok(total) => total,
        Err(response) => return response,
    };

    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "total_rooms": state.catalog.len(),
        "total_applications": total_applications,
    }))
    .into_response()
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
