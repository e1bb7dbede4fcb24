use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kikubo_auth::AuthError;
use kikubo_reports::ReportError;
use kikubo_store::StoreError;
use kikubo_sync::SyncError;
use kikubo_types::FieldErrors;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule was violated on `field`.
    #[error("{message}")]
    Conflict { field: String, message: String },

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn not_found() -> Self {
        Self::NotFound("Not found.".into())
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Store(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<FieldErrors> for ServerError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => Self::not_found(),
            StoreError::Conflict { kind, field, value } => Self::Conflict {
                field: field.to_string(),
                message: format!("{kind} with {field} \"{value}\" already exists."),
            },
            StoreError::DuplicateInvoice { invoice_number, .. } => Self::Conflict {
                field: "invoice_number".into(),
                message: format!("Invoice with number \"{invoice_number}\" already exists."),
            },
            StoreError::InsufficientStock {
                code,
                available,
                requested,
                ..
            } => Self::field(
                "items",
                format!("Insufficient stock for {code}. Available: {available}, Requested: {requested}"),
            ),
            StoreError::ProductUnavailable { product } => Self::field(
                "items",
                format!("product \"{product}\" is not available in this store."),
            ),
            StoreError::QuantityOutOfRange { .. } => {
                Self::field("items", "Requested quantity is out of range.")
            }
            other => Self::Store(other),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(errors) => Self::Validation(errors),
            AuthError::AuthenticationFailed(message) => Self::Unauthorized(message),
            AuthError::InvalidToken => Self::Unauthorized(AuthError::InvalidToken.to_string()),
            AuthError::PermissionDenied(message) => Self::Forbidden(message),
            AuthError::Store(e) => e.into(),
            AuthError::LockPoisoned => Self::Internal("session registry lock poisoned".into()),
        }
    }
}

impl From<SyncError> for ServerError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::MalformedBatch => Self::field("invoices", "Expected a list of invoices."),
            SyncError::BatchTooLarge { .. } => Self::PayloadTooLarge(e.to_string()),
            SyncError::NoStore => Self::Forbidden(e.to_string()),
            SyncError::Store(e) => e.into(),
        }
    }
}

impl From<ReportError> for ServerError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::InvalidParameter { field, message } => Self::field(field, message),
            ReportError::Store(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(_: PathRejection) -> Self {
        Self::not_found()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(errors) => json!(errors),
            Self::Conflict { field, message } => json!(FieldErrors::single(field, message)),
            e if status.is_server_error() => {
                tracing::error!(error = %e, "request failed");
                json!({ "error": "Internal server error" })
            }
            e => json!({ "error": e.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kikubo_types::ProductId;

    #[test]
    fn store_errors_map_to_statuses() {
        let e: ServerError = StoreError::not_found("product", ProductId::new()).into();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);

        let e: ServerError = StoreError::conflict("product", "code", "SOAP").into();
        assert_eq!(e.status(), StatusCode::CONFLICT);

        let e: ServerError = StoreError::QuantityOutOfRange { product: None }.into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);

        let e: ServerError = StoreError::LockPoisoned.into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        let e: ServerError = AuthError::failed("Invalid credentials").into();
        assert_eq!(e.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(e.to_string(), "Invalid credentials");

        let e: ServerError = AuthError::denied("nope").into();
        assert_eq!(e.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn sync_errors_map_to_statuses() {
        let e: ServerError = SyncError::BatchTooLarge { size: 9, max: 1 }.into();
        assert_eq!(e.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let e: ServerError = SyncError::MalformedBatch.into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }
}
