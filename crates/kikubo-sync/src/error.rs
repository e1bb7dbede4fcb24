use kikubo_store::StoreError;

/// Errors that reject a whole sync request. Problems with individual
/// invoices never surface here; they end up in the report.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("request body must be an object with an \"invoices\" list")]
    MalformedBatch,

    #[error("batch of {size} invoices exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("User not assigned to any store")]
    NoStore,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type SyncResult<T> = Result<T, SyncError>;
