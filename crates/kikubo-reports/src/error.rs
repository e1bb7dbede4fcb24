use kikubo_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// A query parameter could not be parsed.
    #[error("{field}: {message}")]
    InvalidParameter {
        field: &'static str,
        message: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ReportError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            message: message.into(),
        }
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
