use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::Auth;
use crate::state::SharedState;

/// Liveness plus a storage probe. No authentication.
pub async fn health(State(state): State<SharedState>) -> Response {
    let timestamp = Utc::now().to_rfc3339();
    match state.db.ping() {
        Ok(()) => Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": timestamp,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "storage probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "timestamp": timestamp })),
            )
                .into_response()
        }
    }
}

/// Health as seen by an authenticated client.
pub async fn pos_health(Auth(principal): Auth) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "user": {
            "email": principal.user.email,
            "name": principal.user.name,
            "store": principal.store.as_ref().map(|s| s.name.clone()),
            "role": principal.role_name(),
        },
    }))
}
