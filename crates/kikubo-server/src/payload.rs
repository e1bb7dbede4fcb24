//! Request and response bodies.

use chrono::{DateTime, Utc};
use kikubo_auth::{Principal, TokenPair};
use kikubo_types::{
    Category, CategoryId, Invoice, InvoiceId, InvoiceItem, InvoiceItemId, Money, PermissionSet,
    ProductId, Rate, Role, RoleId, RoleName, Store, StoreId, SyncLog, SyncLogId, SyncStatus, User,
    UserId,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -- auth --------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginView {
    pub email: String,
    pub name: String,
    pub username: String,
    pub user_id: UserId,
    pub store_id: Option<StoreId>,
    pub store_name: Option<String>,
    pub role: Option<RoleName>,
    pub tokens: TokenPair,
}

impl LoginView {
    pub fn new(principal: &Principal, tokens: TokenPair) -> Self {
        let user = &principal.user;
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            user_id: user.id,
            store_id: principal.store_id(),
            store_name: principal.store.as_ref().map(|s| s.name.clone()),
            role: principal.role_name(),
            tokens,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterView {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub store_id: StoreId,
    pub store_name: String,
    pub role_id: RoleId,
    pub role_name: RoleName,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProfileView {
    pub user_id: UserId,
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub store_id: Option<StoreId>,
    pub store_name: Option<String>,
    pub role_name: Option<RoleName>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileView {
    pub fn new(user: &User, principal: &Principal) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            bio: user.bio.clone(),
            store_id: principal.store_id(),
            store_name: principal.store.as_ref().map(|s| s.name.clone()),
            role_name: principal.role_name(),
            is_verified: user.is_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A member of staff as listed to the store owner.
#[derive(Clone, Debug, Serialize)]
pub struct StaffView {
    pub user_id: UserId,
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role_name: Option<RoleName>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl StaffView {
    pub fn new(user: &User, roles: &[Role]) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role_name: user
                .role
                .and_then(|id| roles.iter().find(|r| r.id == id))
                .map(|r| r.name),
            is_active: user.is_active,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

// -- stores & roles ----------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
pub struct StoreSummary {
    pub id: StoreId,
    pub name: String,
    pub code: String,
}

impl From<&Store> for StoreSummary {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            code: store.code.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StoreView {
    pub id: StoreId,
    pub name: String,
    pub code: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub tax_rate: Rate,
    pub currency: String,
    pub is_active: bool,
    pub user_count: usize,
    pub product_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreView {
    pub fn new(store: &Store, user_count: usize, product_count: usize) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            code: store.code.clone(),
            address: store.address.clone(),
            phone: store.phone.clone(),
            email: store.email.clone(),
            tax_rate: store.tax_rate,
            currency: store.currency.clone(),
            is_active: store.is_active,
            user_count,
            product_count,
            created_at: store.created_at,
            updated_at: store.updated_at,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StoreInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_rate: Option<Rate>,
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoleView {
    pub id: RoleId,
    pub name: RoleName,
    pub display_name: String,
    pub description: String,
    pub permissions: PermissionSet,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
            display_name: role.display_name,
            description: role.description,
            permissions: role.permissions,
        }
    }
}

// -- catalog -----------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
pub struct CategoryView {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub parent: Option<CategoryId>,
    pub product_count: usize,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryView {
    pub fn new(category: &Category, product_count: usize) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            description: category.description.clone(),
            parent: category.parent,
            product_count,
            is_active: category.is_active,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub parent: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Compact product row used by list endpoints.
#[derive(Clone, Debug, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub code: String,
    pub price: Money,
    pub stock: i64,
    pub is_active: bool,
}

impl From<&kikubo_types::Product> for ProductSummary {
    fn from(p: &kikubo_types::Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            code: p.code.clone(),
            price: p.price,
            stock: p.stock,
            is_active: p.is_active,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub code: String,
    pub description: String,
    pub category: Option<CategoryId>,
    pub category_name: Option<String>,
    pub price: Money,
    pub cost: Money,
    pub stock: i64,
    pub low_stock_threshold: i64,
    pub is_low_stock: bool,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    pub fn new(p: &kikubo_types::Product, category_name: Option<String>) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            code: p.code.clone(),
            description: p.description.clone(),
            category: p.category,
            category_name,
            price: p.price,
            cost: p.cost,
            stock: p.stock,
            low_stock_threshold: p.low_stock_threshold,
            is_low_stock: p.is_low_stock(),
            barcode: p.barcode.clone(),
            image_url: p.image_url.clone(),
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
    pub price: Option<Money>,
    pub cost: Option<Money>,
    pub stock: Option<i64>,
    pub low_stock_threshold: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub barcode: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
}

// -- invoices ----------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
pub struct InvoiceItemView {
    pub id: InvoiceItemId,
    pub product: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub quantity: i64,
    pub price: Money,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

impl From<&InvoiceItem> for InvoiceItemView {
    fn from(item: &InvoiceItem) -> Self {
        Self {
            id: item.id,
            product: item.product,
            product_name: item.product_name.clone(),
            product_code: item.product_code.clone(),
            quantity: item.quantity,
            price: item.price,
            total: item.total,
            created_at: item.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct InvoiceView {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub salesperson: UserId,
    pub salesperson_name: String,
    pub store_name: String,
    pub items: Vec<InvoiceItemView>,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub notes: String,
    pub sync_status: SyncStatus,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceView {
    pub fn new(invoice: &Invoice, salesperson_name: String, store_name: String) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            salesperson: invoice.salesperson,
            salesperson_name,
            store_name,
            items: invoice.items.iter().map(InvoiceItemView::from).collect(),
            subtotal: invoice.subtotal,
            tax: invoice.tax,
            discount: invoice.discount,
            total: invoice.total,
            customer_name: invoice.customer_name.clone(),
            customer_phone: invoice.customer_phone.clone(),
            customer_email: invoice.customer_email.clone(),
            notes: invoice.notes.clone(),
            sync_status: invoice.sync_status,
            synced_at: invoice.synced_at,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct InvoiceSummary {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub salesperson: UserId,
    pub salesperson_name: String,
    pub items: Vec<InvoiceItemView>,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub item_count: usize,
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
}

impl InvoiceSummary {
    pub fn new(invoice: &Invoice, salesperson_name: String) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            salesperson: invoice.salesperson,
            salesperson_name,
            items: invoice.items.iter().map(InvoiceItemView::from).collect(),
            subtotal: invoice.subtotal,
            tax: invoice.tax,
            discount: invoice.discount,
            total: invoice.total,
            item_count: invoice.item_count(),
            sync_status: invoice.sync_status,
            created_at: invoice.created_at,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InvoiceInput {
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub items: Vec<InvoiceItemInput>,
    pub discount: Option<Money>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub sync_status: Option<SyncStatus>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InvoiceItemInput {
    pub product: Option<String>,
    pub quantity: Option<i64>,
    /// Defaults to the catalog price.
    pub price: Option<Money>,
}

// -- sync --------------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
pub struct SyncLogView {
    pub id: SyncLogId,
    pub user_name: String,
    pub sync_type: kikubo_types::SyncKind,
    pub status: kikubo_types::SyncLogStatus,
    pub items_synced: u32,
    pub items_failed: u32,
    pub error_message: Option<String>,
    pub details: Value,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncLogView {
    pub fn new(log: SyncLog, user_name: &str) -> Self {
        Self {
            id: log.id,
            user_name: user_name.to_string(),
            sync_type: log.sync_type,
            status: log.status,
            items_synced: log.items_synced,
            items_failed: log.items_failed,
            error_message: log.error_message,
            details: log.details,
            started_at: log.started_at,
            completed_at: log.completed_at,
        }
    }
}
