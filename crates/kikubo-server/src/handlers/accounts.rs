use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use kikubo_auth::{ProfileUpdate, RegisterRequest, TokenPair};
use serde_json::{json, Value};

use super::REQUIRED;
use crate::auth::Auth;
use crate::error::{ServerError, ServerResult};
use crate::payload::{LoginRequest, LoginView, ProfileView, RefreshRequest, RegisterView};
use crate::state::SharedState;

pub async fn register(
    State(state): State<SharedState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<RegisterView>)> {
    let Json(request) = body?;
    let registration = state.accounts.register(request)?;
    let user = registration.user;
    Ok((
        StatusCode::CREATED,
        Json(RegisterView {
            user_id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            phone: user.phone,
            store_id: registration.store.id,
            store_name: registration.store.name,
            role_id: registration.role.id,
            role_name: registration.role.name,
        }),
    ))
}

pub async fn login(
    State(state): State<SharedState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ServerResult<Json<LoginView>> {
    let Json(request) = body?;
    let session = state.accounts.login(&request.email, &request.password)?;
    Ok(Json(LoginView::new(&session.principal, session.tokens)))
}

fn refresh_token(request: RefreshRequest) -> ServerResult<String> {
    let token = request.refresh.trim().to_string();
    if token.is_empty() {
        return Err(ServerError::field("refresh", REQUIRED));
    }
    Ok(token)
}

pub async fn refresh(
    State(state): State<SharedState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> ServerResult<Json<TokenPair>> {
    let Json(request) = body?;
    let tokens = state.accounts.refresh(&refresh_token(request)?)?;
    Ok(Json(tokens))
}

pub async fn logout(
    State(state): State<SharedState>,
    Auth(principal): Auth,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let Json(request) = body?;
    state.accounts.logout(&principal, &refresh_token(request)?)?;
    Ok(Json(json!({ "message": "Successfully logged out" })))
}

pub async fn profile(Auth(principal): Auth) -> Json<ProfileView> {
    Json(ProfileView::new(&principal.user, &principal))
}

async fn update_profile(
    state: SharedState,
    auth: Auth,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
    partial: bool,
) -> ServerResult<Json<ProfileView>> {
    let Json(update) = body?;
    let user = state.accounts.update_profile(&auth.0, update, partial)?;
    Ok(Json(ProfileView::new(&user, &auth.0)))
}

pub async fn put_profile(
    State(state): State<SharedState>,
    auth: Auth,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ServerResult<Json<ProfileView>> {
    update_profile(state, auth, body, false).await
}

pub async fn patch_profile(
    State(state): State<SharedState>,
    auth: Auth,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ServerResult<Json<ProfileView>> {
    update_profile(state, auth, body, true).await
}
