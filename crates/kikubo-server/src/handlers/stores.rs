use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use kikubo_auth::account::is_valid_email;
use kikubo_auth::Action;
use kikubo_types::{FieldErrors, Store};

use super::{required_text, text};
use crate::auth::Auth;
use crate::error::ServerResult;
use crate::payload::{RoleView, StaffView, StoreInput, StoreSummary, StoreView};
use crate::state::SharedState;

const NAME_MAX: usize = 200;
const CODE_MAX: usize = 20;
const PHONE_MAX: usize = 20;
const CURRENCY_MAX: usize = 3;

/// Active stores for the registration picker. No authentication.
pub async fn list_stores(State(state): State<SharedState>) -> ServerResult<Json<Vec<StoreSummary>>> {
    let stores = state.db.list_stores()?;
    Ok(Json(
        stores
            .iter()
            .filter(|s| s.is_active)
            .map(StoreSummary::from)
            .collect(),
    ))
}

fn store_view(state: &SharedState, store: &Store) -> ServerResult<StoreView> {
    let users = state.db.list_users(store.id)?.iter().filter(|u| u.is_active).count();
    let products = state
        .db
        .list_products(store.id)?
        .iter()
        .filter(|p| p.is_active)
        .count();
    Ok(StoreView::new(store, users, products))
}

pub async fn my_store(State(state): State<SharedState>, auth: Auth) -> ServerResult<Json<StoreView>> {
    auth.require(&state, Action::OwnerData { write: false }).await?;
    Ok(Json(store_view(&state, auth.store()?)?))
}

/// Apply `input` to `store`. With `partial == false` name and code are
/// required.
fn apply_store_input(store: &mut Store, input: StoreInput, partial: bool) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", input.name, NAME_MAX, partial);
    let code = required_text(&mut errors, "code", input.code, CODE_MAX, partial);
    let phone = text(&mut errors, "phone", input.phone, PHONE_MAX);
    let currency = text(&mut errors, "currency", input.currency, CURRENCY_MAX);
    if let Some(email) = input.email.as_deref().map(str::trim) {
        if !email.is_empty() && !is_valid_email(email) {
            errors.add("email", "Enter a valid email address.");
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    if let Some(name) = name {
        store.name = name;
    }
    if let Some(code) = code {
        store.code = code;
    }
    if let Some(address) = input.address {
        store.address = address.trim().to_string();
    }
    if let Some(phone) = phone {
        store.phone = phone;
    }
    if let Some(email) = input.email {
        store.email = email.trim().to_lowercase();
    }
    if let Some(rate) = input.tax_rate {
        store.tax_rate = rate;
    }
    if let Some(currency) = currency.filter(|c| !c.is_empty()) {
        store.currency = currency.to_uppercase();
    }
    store.updated_at = Utc::now();
    Ok(())
}

async fn update_my_store(
    state: SharedState,
    auth: Auth,
    body: Result<Json<StoreInput>, JsonRejection>,
    partial: bool,
) -> ServerResult<Json<StoreView>> {
    auth.require(&state, Action::OwnerData { write: true }).await?;
    let Json(input) = body?;
    let mut store = auth.store()?.clone();
    apply_store_input(&mut store, input, partial)?;
    state.db.update_store(&store)?;
    tracing::info!(store = %store.id, code = %store.code, "store updated");
    Ok(Json(store_view(&state, &store)?))
}

pub async fn put_my_store(
    State(state): State<SharedState>,
    auth: Auth,
    body: Result<Json<StoreInput>, JsonRejection>,
) -> ServerResult<Json<StoreView>> {
    update_my_store(state, auth, body, false).await
}

pub async fn patch_my_store(
    State(state): State<SharedState>,
    auth: Auth,
    body: Result<Json<StoreInput>, JsonRejection>,
) -> ServerResult<Json<StoreView>> {
    update_my_store(state, auth, body, true).await
}

/// Built-in roles by name. No authentication.
pub async fn list_roles(State(state): State<SharedState>) -> ServerResult<Json<Vec<RoleView>>> {
    let roles = state.db.list_roles()?;
    Ok(Json(roles.into_iter().map(RoleView::from).collect()))
}

/// Staff of the owner's store.
pub async fn list_users(State(state): State<SharedState>, auth: Auth) -> ServerResult<Json<Vec<StaffView>>> {
    auth.require(&state, Action::Administer).await?;
    let store = auth.store()?;
    let roles = state.db.list_roles()?;
    let mut users = state.db.list_users(store.id)?;
    users.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(users.iter().map(|u| StaffView::new(u, &roles)).collect()))
}
