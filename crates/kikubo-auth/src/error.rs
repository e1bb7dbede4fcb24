use kikubo_store::StoreError;
use kikubo_types::FieldErrors;

/// Errors from account, session and policy operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Credentials or account state rejected. The message is client-facing.
    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("Token is expired or invalid")]
    InvalidToken,

    /// Authenticated but not allowed. The message is client-facing.
    #[error("{0}")]
    PermissionDenied(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("session registry lock poisoned")]
    LockPoisoned,
}

impl AuthError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed(message.into())
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }
}

impl From<FieldErrors> for AuthError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
