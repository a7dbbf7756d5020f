use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};

use stockroom_core::MovementId;
use stockroom_ledger::MovementType;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(record_movement).get(list_movements))
        .route("/:id", delete(reverse_movement))
}

pub async fn record_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RecordMovementRequest>,
) -> axum::response::Response {
    // Parse-and-validate boundary: nothing reaches the store unless the
    // whole command is well-formed.
    let cmd = match body.into_command() {
        Ok(cmd) => cmd,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().record_movement(cmd).await {
        Ok(movement) => {
            (StatusCode::CREATED, Json(dto::movement_to_json(&movement))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::MovementHistoryParams>,
) -> axum::response::Response {
    let filter = match params.movement_type.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<MovementType>() {
            Ok(movement_type) => Some(movement_type),
            Err(e) => return errors::domain_error_to_response(e),
        },
    };

    match services.store().list_movements(filter).await {
        Ok(movements) => {
            let items = movements
                .iter()
                .map(dto::movement_with_product_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn reverse_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovementId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid movement id")
        }
    };

    match services.store().reverse_movement(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
