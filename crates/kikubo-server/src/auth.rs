//! Bearer authentication for handlers.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use kikubo_auth::{Action, AuthProvider, Credentials, Principal};
use kikubo_types::Store;

use crate::error::{ServerError, ServerResult};
use crate::state::SharedState;

/// The authenticated caller. Rejects the request with 401 otherwise.
#[derive(Clone, Debug)]
pub struct Auth(pub Principal);

#[async_trait]
impl FromRequestParts<SharedState> for Auth {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> ServerResult<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let credentials = Credentials::from_header(header);
        let principal = state.accounts.authenticate(&credentials).await?;
        Ok(Self(principal))
    }
}

impl Auth {
    /// Fail with 403 unless the policy allows `action`.
    pub async fn require(&self, state: &SharedState, action: Action) -> ServerResult<()> {
        state.accounts.authorize(&self.0, &action).await?;
        Ok(())
    }

    /// The caller's store. Superusers without one get 403 on store-scoped
    /// endpoints.
    pub fn store(&self) -> ServerResult<&Store> {
        self.0
            .store
            .as_ref()
            .ok_or_else(|| ServerError::Forbidden("User not assigned to any store".into()))
    }
}
