use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;

use super::{RoomCatalog, RoomQuery};

/// Router builder exposing catalog search and lookup.
pub fn room_router<C>(catalog: Arc<C>) -> Router
where
    C: RoomCatalog + 'static,
{
    Router::new()
        .route("/api/rooms", get(search_handler::<C>))
        .route("/api/rooms/:room_id", get(room_handler::<C>))
        .with_state(catalog)
}

pub(crate) async fn search_handler<C>(
    State(catalog): State<Arc<C>>,
    Query(query): Query<RoomQuery>,
) -> Response
where
    C: RoomCatalog + 'static,
{
    let rooms = catalog.search(&query);
    let payload = json!({
        "success": true,
        "total": rooms.len(),
        "rooms": rooms,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn room_handler<C>(
    State(catalog): State<Arc<C>>,
    Path(room_id): Path<String>,
) -> Response
where
    C: RoomCatalog + 'static,
{
    let Ok(room_id) = room_id.trim().parse::<u64>() else {
        let payload = json!({
            "success": false,
            "message": "room id must be a positive integer",
        });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    match catalog.room(room_id) {
        Some(room) => {
            let payload = json!({ "success": true, "room": room });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        None => {
            let payload = json!({ "success": false, "message": "Room not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}
