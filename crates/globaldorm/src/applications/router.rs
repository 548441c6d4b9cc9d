use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{error, warn};

use super::domain::NewApplication;
use super::lifecycle::{ApplicationLifecycle, LifecycleError};
use super::persistence::ApplicationGateway;
use super::request::{CancelApplication, ValidationError};
use crate::rooms::RoomCatalog;

/// Shared handles for the application endpoints.
pub struct ApplicationDesk<G, C> {
    pub lifecycle: Arc<ApplicationLifecycle<G>>,
    pub catalog: Arc<C>,
}

impl<G, C> Clone for ApplicationDesk<G, C> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: Arc::clone(&self.lifecycle),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

/// Router builder exposing application submission, cancellation, and history.
pub fn application_router<G, C>(desk: ApplicationDesk<G, C>) -> Router
where
    G: ApplicationGateway + 'static,
    C: RoomCatalog + 'static,
{
    Router::new()
        .route("/api/applications", post(create_handler::<G, C>))
        .route(
            "/api/applications/:application_id",
            delete(cancel_handler::<G, C>),
        )
        .route(
            "/api/users/:user_id/applications",
            get(user_applications_handler::<G, C>),
        )
        .with_state(desk)
}

pub(crate) async fn create_handler<G, C>(
    State(desk): State<ApplicationDesk<G, C>>,
    body: Result<axum::Json<Value>, JsonRejection>,
) -> Response
where
    G: ApplicationGateway + 'static,
    C: RoomCatalog + 'static,
{
    let request = match body
        .map_err(malformed_body)
        .and_then(|axum::Json(body)| NewApplication::from_json(&body))
    {
        Ok(request) => request,
        Err(err) => return lifecycle_error_response(err.into()),
    };

    let Some(room) = desk.catalog.room(request.room_id) else {
        let payload = json!({
            "success": false,
            "message": "Room not found",
        });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    let lifecycle = Arc::clone(&desk.lifecycle);
    let outcome = match run_blocking(move || lifecycle.create(request, room)).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    match outcome {
        Ok(application_id) => {
            let payload = json!({
                "success": true,
                "message": "Application submitted successfully",
                "application_id": application_id,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn cancel_handler<G, C>(
    State(desk): State<ApplicationDesk<G, C>>,
    Path(application_id): Path<String>,
    body: Result<axum::Json<Value>, JsonRejection>,
) -> Response
where
    G: ApplicationGateway + 'static,
    C: RoomCatalog + 'static,
{
    let request = match body
        .map_err(malformed_body)
        .and_then(|axum::Json(body)| CancelApplication::from_parts(&application_id, &body))
    {
        Ok(request) => request,
        Err(err) => return lifecycle_error_response(err.into()),
    };

    let lifecycle = Arc::clone(&desk.lifecycle);
    let outcome = match run_blocking(move || {
        lifecycle.cancel(request.application_id, &request.user_id)
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    match outcome {
        Ok(application_id) => {
            let payload = json!({
                "success": true,
                "message": "Application cancelled successfully",
                "application_id": application_id,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn user_applications_handler<G, C>(
    State(desk): State<ApplicationDesk<G, C>>,
    Path(user_id): Path<String>,
) -> Response
where
    G: ApplicationGateway + 'static,
    C: RoomCatalog + 'static,
{
    let lifecycle = Arc::clone(&desk.lifecycle);
    let applications = match run_blocking(move || lifecycle.list_by_user(&user_id)).await {
        Ok(applications) => applications,
        Err(response) => return response,
    };

    let payload = json!({
        "success": true,
        "total": applications.len(),
        "applications": applications,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

/// Runs a lifecycle call on the blocking pool. The store lock is held across
/// a synchronous save, which must not park an async worker.
pub async fn run_blocking<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        error!(error = %err, "application task did not complete");
        let payload = json!({
            "success": false,
            "error": "internal_error",
            "message": "internal server error",
        });
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
    })
}

fn malformed_body(rejection: JsonRejection) -> ValidationError {
    ValidationError::MalformedBody(rejection.body_text())
}

pub(crate) fn status_for(err: &LifecycleError) -> StatusCode {
    match err {
        LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
        LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
        LifecycleError::DuplicateActiveApplication { .. }
        | LifecycleError::AlreadyCancelled(_)
        | LifecycleError::CannotCancelAccepted(_)
        | LifecycleError::CannotCancelRejected(_) => StatusCode::CONFLICT,
        LifecycleError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn lifecycle_error_response(err: LifecycleError) -> Response {
    let status = status_for(&err);
    let message = match &err {
        LifecycleError::Persistence(source) => {
            warn!(error = %source, "application request failed to commit");
            "failed to persist application changes".to_string()
        }
        other => other.to_string(),
    };

    let payload = json!({
        "success": false,
        "error": err.code(),
        "message": message,
    });
    (status, axum::Json(payload)).into_response()
}
