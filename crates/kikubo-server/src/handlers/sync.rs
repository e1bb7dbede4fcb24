use axum::extract::State;
use axum::Json;
use kikubo_sync::SyncState;

use crate::auth::Auth;
use crate::error::ServerResult;
use crate::payload::SyncLogView;
use crate::state::SharedState;

pub async fn status(State(state): State<SharedState>, Auth(principal): Auth) -> ServerResult<Json<SyncState>> {
    Ok(Json(state.sync.status(&principal)?))
}

/// The caller's most recent sync runs, newest first.
pub async fn history(
    State(state): State<SharedState>,
    Auth(principal): Auth,
) -> ServerResult<Json<Vec<SyncLogView>>> {
    let logs = state.sync.history(&principal)?;
    Ok(Json(
        logs.into_iter()
            .map(|log| SyncLogView::new(log, &principal.user.name))
            .collect(),
    ))
}
