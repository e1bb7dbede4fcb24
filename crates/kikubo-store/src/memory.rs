//! In-memory store for tests and ephemeral servers.
//!
//! [`InMemoryPosStore`] keeps every table in one `RwLock` so that
//! `commit_invoice` can check stock and write the invoice under a single
//! write guard. Data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use kikubo_types::{
    Category, CategoryId, Invoice, InvoiceId, NewInvoice, Product, ProductId, Role, RoleId,
    RoleName, Store, StoreId, SyncLog, User, UserId,
};

use crate::error::{StoreError, StoreResult};
use crate::stock::plan_stock;
use crate::traits::PosStore;

#[derive(Debug, Default)]
struct Tables {
    stores: HashMap<StoreId, Store>,
    roles: HashMap<RoleId, Role>,
    users: HashMap<UserId, User>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    invoices: HashMap<InvoiceId, Invoice>,
    sync_logs: Vec<SyncLog>,
}

/// An in-memory implementation of [`PosStore`].
#[derive(Debug, Default)]
pub struct InMemoryPosStore {
    tables: RwLock<Tables>,
}

impl InMemoryPosStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::LockPoisoned)
    }
}

fn sorted_by_name<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    rows.sort_by(|a, b| key(a).cmp(key(b)));
    rows
}

impl Tables {
    fn check_user_unique(&self, user: &User) -> StoreResult<()> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.username == user.username {
                return Err(StoreError::conflict("user", "username", &user.username));
            }
            if other.email.eq_ignore_ascii_case(&user.email) {
                return Err(StoreError::conflict("user", "email", &user.email));
            }
        }
        Ok(())
    }

    fn check_category_unique(&self, category: &Category) -> StoreResult<()> {
        let taken = self.categories.values().any(|c| {
            c.id != category.id && c.store == category.store && c.name == category.name
        });
        if taken {
            return Err(StoreError::conflict("category", "name", &category.name));
        }
        Ok(())
    }

    fn check_product_unique(&self, product: &Product) -> StoreResult<()> {
        let taken = self.products.values().any(|p| {
            p.id != product.id && p.store == product.store && p.code == product.code
        });
        if taken {
            return Err(StoreError::conflict("product", "code", &product.code));
        }
        Ok(())
    }

    fn number_taken(&self, store: StoreId, invoice_number: &str) -> bool {
        self.invoices
            .values()
            .any(|i| i.store == store && i.invoice_number == invoice_number)
    }
}

impl PosStore for InMemoryPosStore {
    fn ping(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }

    fn create_store(&self, store: &Store) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.stores.values().any(|s| s.code == store.code) {
            return Err(StoreError::conflict("store", "code", &store.code));
        }
        t.stores.insert(store.id, store.clone());
        Ok(())
    }

    fn get_store(&self, id: StoreId) -> StoreResult<Option<Store>> {
        Ok(self.read()?.stores.get(&id).cloned())
    }

    fn get_store_by_code(&self, code: &str) -> StoreResult<Option<Store>> {
        Ok(self.read()?.stores.values().find(|s| s.code == code).cloned())
    }

    fn list_stores(&self) -> StoreResult<Vec<Store>> {
        let rows = self.read()?.stores.values().cloned().collect();
        Ok(sorted_by_name(rows, |s: &Store| s.name.as_str()))
    }

    fn update_store(&self, store: &Store) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.stores.contains_key(&store.id) {
            return Err(StoreError::not_found("store", store.id));
        }
        if t.stores.values().any(|s| s.id != store.id && s.code == store.code) {
            return Err(StoreError::conflict("store", "code", &store.code));
        }
        t.stores.insert(store.id, store.clone());
        Ok(())
    }

    fn create_role(&self, role: &Role) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.roles.values().any(|r| r.name == role.name) {
            return Err(StoreError::conflict("role", "name", role.name.as_str()));
        }
        t.roles.insert(role.id, role.clone());
        Ok(())
    }

    fn get_role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    fn get_role_by_name(&self, name: RoleName) -> StoreResult<Option<Role>> {
        Ok(self.read()?.roles.values().find(|r| r.name == name).cloned())
    }

    fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let mut rows: Vec<Role> = self.read()?.roles.values().cloned().collect();
        rows.sort_by_key(|r| r.name);
        Ok(rows)
    }

    fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.write()?;
        t.check_user_unique(user)?;
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn username_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(self.read()?.users.values().any(|u| u.username == username))
    }

    fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.users.contains_key(&user.id) {
            return Err(StoreError::not_found("user", user.id));
        }
        t.check_user_unique(user)?;
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    fn list_users(&self, store: StoreId) -> StoreResult<Vec<User>> {
        let rows = self
            .read()?
            .users
            .values()
            .filter(|u| u.belongs_to(store))
            .cloned()
            .collect();
        Ok(sorted_by_name(rows, |u: &User| u.name.as_str()))
    }

    fn create_category(&self, category: &Category) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.stores.contains_key(&category.store) {
            return Err(StoreError::not_found("store", category.store));
        }
        t.check_category_unique(category)?;
        t.categories.insert(category.id, category.clone());
        Ok(())
    }

    fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    fn update_category(&self, category: &Category) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.categories.contains_key(&category.id) {
            return Err(StoreError::not_found("category", category.id));
        }
        t.check_category_unique(category)?;
        t.categories.insert(category.id, category.clone());
        Ok(())
    }

    fn list_categories(&self, store: StoreId) -> StoreResult<Vec<Category>> {
        let rows = self
            .read()?
            .categories
            .values()
            .filter(|c| c.store == store)
            .cloned()
            .collect();
        Ok(sorted_by_name(rows, |c: &Category| c.name.as_str()))
    }

    fn create_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.stores.contains_key(&product.store) {
            return Err(StoreError::not_found("store", product.store));
        }
        t.check_product_unique(product)?;
        t.products.insert(product.id, product.clone());
        Ok(())
    }

    fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.products.contains_key(&product.id) {
            return Err(StoreError::not_found("product", product.id));
        }
        t.check_product_unique(product)?;
        t.products.insert(product.id, product.clone());
        Ok(())
    }

    fn list_products(&self, store: StoreId) -> StoreResult<Vec<Product>> {
        let rows = self
            .read()?
            .products
            .values()
            .filter(|p| p.store == store)
            .cloned()
            .collect();
        Ok(sorted_by_name(rows, |p: &Product| p.name.as_str()))
    }

    fn commit_invoice(&self, invoice: NewInvoice) -> StoreResult<Invoice> {
        let mut t = self.write()?;
        if t.number_taken(invoice.store, &invoice.invoice_number) {
            return Err(StoreError::DuplicateInvoice {
                store: invoice.store,
                invoice_number: invoice.invoice_number,
            });
        }
        let plan = plan_stock(&invoice, |id| Ok(t.products.get(&id).cloned()))?;

        let now = Utc::now();
        for (product_id, remaining) in plan {
            if let Some(product) = t.products.get_mut(&product_id) {
                product.stock = remaining;
                product.updated_at = now;
            }
        }
        let stored = invoice.into_invoice();
        t.invoices.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn get_invoice(&self, id: InvoiceId) -> StoreResult<Option<Invoice>> {
        Ok(self.read()?.invoices.get(&id).cloned())
    }

    fn list_invoices(&self, store: StoreId) -> StoreResult<Vec<Invoice>> {
        let mut rows: Vec<Invoice> = self
            .read()?
            .invoices
            .values()
            .filter(|i| i.store == store)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    fn invoice_number_exists(&self, store: StoreId, invoice_number: &str) -> StoreResult<bool> {
        Ok(self.read()?.number_taken(store, invoice_number))
    }

    fn record_sync_log(&self, log: &SyncLog) -> StoreResult<()> {
        self.write()?.sync_logs.push(log.clone());
        Ok(())
    }

    fn list_sync_logs(&self, user: UserId, limit: usize) -> StoreResult<Vec<SyncLog>> {
        let mut rows: Vec<SyncLog> = self
            .read()?
            .sync_logs
            .iter()
            .filter(|l| l.user == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }
}
