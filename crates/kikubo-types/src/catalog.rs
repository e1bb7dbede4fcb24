use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CategoryId, ProductId, StoreId, UserId};
use crate::money::Money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub store: StoreId,
    pub name: String,
    pub description: String,
    pub parent: Option<CategoryId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(store: StoreId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            store,
            name: name.into(),
            description: String::new(),
            parent: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A sellable item. `stock` is signed so that a corrupted count is visible
/// instead of wrapping; writes never take it below zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub store: StoreId,
    pub name: String,
    /// Store-unique product code (SKU).
    pub code: String,
    pub description: String,
    pub category: Option<CategoryId>,
    pub price: Money,
    pub cost: Money,
    pub stock: i64,
    pub low_stock_threshold: i64,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

    pub fn new(store: StoreId, name: impl Into<String>, code: impl Into<String>, price: Money) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            store,
            name: name.into(),
            code: code.into(),
            description: String::new(),
            category: None,
            price,
            cost: Money::ZERO,
            stock: 0,
            low_stock_threshold: Self::DEFAULT_LOW_STOCK_THRESHOLD,
            barcode: None,
            image_url: None,
            is_active: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }

    /// Whether this product may appear on a new invoice of `store`.
    pub fn is_sellable_in(&self, store: StoreId) -> bool {
        self.is_active && self.store == store
    }
}
