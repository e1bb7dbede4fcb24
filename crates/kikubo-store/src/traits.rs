//! The [`PosStore`] trait defining the persistence interface.
//!
//! Every backend (in-memory, SQLite) implements this trait. Handlers, the
//! account service, the sync engine and the report builders only ever see
//! `dyn PosStore`.

use kikubo_types::{
    Category, CategoryId, Invoice, InvoiceId, NewInvoice, Product, ProductId, Role, RoleId,
    RoleName, Store, StoreId, SyncLog, User, UserId,
};

use crate::error::{StoreError, StoreResult};

/// Storage backend for tenants, accounts, catalog, invoices and sync logs.
///
/// Implementations must be thread-safe and keep the uniqueness rules below:
///
/// - store `code` is globally unique
/// - role `name` is globally unique
/// - user `username` and `email` are globally unique (email compared case-insensitively)
/// - category `name` is unique within a store
/// - product `code` is unique within a store
/// - invoice `invoice_number` is unique within a store
pub trait PosStore: Send + Sync {
    /// Cheap liveness probe used by the health endpoint.
    fn ping(&self) -> StoreResult<()>;

    // -- stores ----------------------------------------------------------

    fn create_store(&self, store: &Store) -> StoreResult<()>;
    fn get_store(&self, id: StoreId) -> StoreResult<Option<Store>>;
    fn get_store_by_code(&self, code: &str) -> StoreResult<Option<Store>>;
    /// All stores ordered by name.
    fn list_stores(&self) -> StoreResult<Vec<Store>>;
    fn update_store(&self, store: &Store) -> StoreResult<()>;

    // -- roles -----------------------------------------------------------

    fn create_role(&self, role: &Role) -> StoreResult<()>;
    fn get_role(&self, id: RoleId) -> StoreResult<Option<Role>>;
    fn get_role_by_name(&self, name: RoleName) -> StoreResult<Option<Role>>;
    fn list_roles(&self) -> StoreResult<Vec<Role>>;

    // -- users -----------------------------------------------------------

    fn create_user(&self, user: &User) -> StoreResult<()>;
    fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
    /// Case-insensitive lookup.
    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    fn username_exists(&self, username: &str) -> StoreResult<bool>;
    fn update_user(&self, user: &User) -> StoreResult<()>;
    /// Users attached to a store ordered by name.
    fn list_users(&self, store: StoreId) -> StoreResult<Vec<User>>;

    // -- catalog ---------------------------------------------------------

    fn create_category(&self, category: &Category) -> StoreResult<()>;
    fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    fn update_category(&self, category: &Category) -> StoreResult<()>;
    /// Categories of a store ordered by name.
    fn list_categories(&self, store: StoreId) -> StoreResult<Vec<Category>>;

    fn create_product(&self, product: &Product) -> StoreResult<()>;
    fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;
    fn update_product(&self, product: &Product) -> StoreResult<()>;
    /// Products of a store ordered by name.
    fn list_products(&self, store: StoreId) -> StoreResult<Vec<Product>>;

    // -- invoices --------------------------------------------------------

    /// Atomically persist an invoice and take its quantities out of stock.
    ///
    /// Fails without side effects when the number is already used in the
    /// store, any product is unavailable, or the summed quantity per product
    /// exceeds the stock on hand.
    fn commit_invoice(&self, invoice: NewInvoice) -> StoreResult<Invoice>;
    fn get_invoice(&self, id: InvoiceId) -> StoreResult<Option<Invoice>>;
    /// Invoices of a store, newest first.
    fn list_invoices(&self, store: StoreId) -> StoreResult<Vec<Invoice>>;
    fn invoice_number_exists(&self, store: StoreId, invoice_number: &str) -> StoreResult<bool>;

    // -- sync logs -------------------------------------------------------

    fn record_sync_log(&self, log: &SyncLog) -> StoreResult<()>;
    /// Most recent logs written by a user, newest first.
    fn list_sync_logs(&self, user: UserId, limit: usize) -> StoreResult<Vec<SyncLog>>;

    // -- provided --------------------------------------------------------

    /// Return the store with this code, creating it from `template` if absent.
    fn ensure_store(&self, template: &Store) -> StoreResult<(Store, bool)> {
        if let Some(existing) = self.get_store_by_code(&template.code)? {
            return Ok((existing, false));
        }
        self.create_store(template)?;
        Ok((template.clone(), true))
    }

    /// Return the role with this name, creating it from `template` if absent.
    fn ensure_role(&self, template: &Role) -> StoreResult<(Role, bool)> {
        if let Some(existing) = self.get_role_by_name(template.name)? {
            return Ok((existing, false));
        }
        self.create_role(template)?;
        Ok((template.clone(), true))
    }

    fn require_store(&self, id: StoreId) -> StoreResult<Store> {
        self.get_store(id)?
            .ok_or_else(|| StoreError::not_found("store", id))
    }

    fn require_user(&self, id: UserId) -> StoreResult<User> {
        self.get_user(id)?
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    fn require_product(&self, id: ProductId) -> StoreResult<Product> {
        self.get_product(id)?
            .ok_or_else(|| StoreError::not_found("product", id))
    }
}
