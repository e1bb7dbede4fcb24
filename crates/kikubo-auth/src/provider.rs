use async_trait::async_trait;

use crate::account::AccountService;
use crate::error::{AuthError, AuthResult};
use crate::policy::{self, Action};
use crate::principal::Principal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Parse an `Authorization` header value. Anything that is not a
    /// non-empty `Bearer` token counts as anonymous.
    pub fn from_header(value: Option<&str>) -> Self {
        let Some((scheme, token)) = value.and_then(|v| v.trim().split_once(' ')) else {
            return Self::Anonymous;
        };
        let token = token.trim();
        if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
            Self::Bearer(token.to_string())
        } else {
            Self::Anonymous
        }
    }
}

/// Authentication seam used by the HTTP layer.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> AuthResult<Principal>;

    async fn authorize(&self, principal: &Principal, action: &Action) -> AuthResult<()> {
        policy::authorize(principal, action)
    }
}

#[async_trait]
impl AuthProvider for AccountService {
    async fn authenticate(&self, credentials: &Credentials) -> AuthResult<Principal> {
        match credentials {
            Credentials::Bearer(token) => self.authenticate_bearer(token),
            Credentials::Anonymous => Err(AuthError::failed(
                "Authentication credentials were not provided.",
            )),
        }
    }
}
