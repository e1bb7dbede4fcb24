use kikubo_types::{ProductId, StoreId};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A uniqueness rule would be violated.
    #[error("{kind} with {field} {value:?} already exists")]
    Conflict {
        kind: &'static str,
        field: &'static str,
        value: String,
    },

    /// The store already holds an invoice with this number.
    #[error("invoice with number {invoice_number:?} already exists in store {store}")]
    DuplicateInvoice {
        store: StoreId,
        invoice_number: String,
    },

    /// The product is missing, inactive, or belongs to another store.
    #[error("product {product} is not available for sale")]
    ProductUnavailable { product: ProductId },

    /// Not enough units left to fulfil the invoice.
    #[error("insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        product: ProductId,
        code: String,
        available: i64,
        requested: i64,
    },

    /// A line quantity, or the per-product sum of them, is not a sellable count.
    #[error("requested quantity out of range")]
    QuantityOutOfRange { product: Option<ProductId> },

    /// Error reported by the SQL backend.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored data could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lock guarding in-memory state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn conflict(kind: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            field,
            value: value.into(),
        }
    }

    /// Errors caused by the submitted data rather than the backend.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Conflict { .. }
                | Self::DuplicateInvoice { .. }
                | Self::ProductUnavailable { .. }
                | Self::InsufficientStock { .. }
                | Self::QuantityOutOfRange { .. }
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
