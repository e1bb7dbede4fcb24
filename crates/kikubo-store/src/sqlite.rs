//! SQLite-backed store.
//!
//! One connection behind a `Mutex`. Money is stored as integer cents,
//! identifiers and timestamps as text (RFC 3339 with nanoseconds so the
//! text sorts chronologically), permission sets and sync details as JSON.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use kikubo_types::{
    Category, CategoryId, Invoice, InvoiceId, InvoiceItem, Money, NewInvoice, Product, ProductId,
    Rate, Role, RoleId, RoleName, Store, StoreId, SyncLog, User, UserId,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::stock::plan_stock;
use crate::traits::PosStore;

pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS stores (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  code TEXT NOT NULL UNIQUE,
  address TEXT NOT NULL,
  phone TEXT NOT NULL,
  email TEXT NOT NULL,
  tax_rate INTEGER NOT NULL,
  currency TEXT NOT NULL,
  is_active INTEGER NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS roles (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL UNIQUE,
  display_name TEXT NOT NULL,
  description TEXT NOT NULL,
  permissions TEXT NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
  id TEXT PRIMARY KEY,
  username TEXT NOT NULL UNIQUE,
  name TEXT NOT NULL,
  email TEXT NOT NULL UNIQUE COLLATE NOCASE,
  phone TEXT,
  bio TEXT,
  store_id TEXT REFERENCES stores(id),
  role_id TEXT REFERENCES roles(id),
  is_verified INTEGER NOT NULL,
  is_active INTEGER NOT NULL,
  is_superuser INTEGER NOT NULL,
  password_hash TEXT NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS categories (
  id TEXT PRIMARY KEY,
  store_id TEXT NOT NULL REFERENCES stores(id),
  name TEXT NOT NULL,
  description TEXT NOT NULL,
  parent_id TEXT REFERENCES categories(id),
  is_active INTEGER NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  UNIQUE (store_id, name)
);
CREATE TABLE IF NOT EXISTS products (
  id TEXT PRIMARY KEY,
  store_id TEXT NOT NULL REFERENCES stores(id),
  name TEXT NOT NULL,
  code TEXT NOT NULL,
  description TEXT NOT NULL,
  category_id TEXT REFERENCES categories(id),
  price INTEGER NOT NULL,
  cost INTEGER NOT NULL,
  stock INTEGER NOT NULL,
  low_stock_threshold INTEGER NOT NULL,
  barcode TEXT,
  image_url TEXT,
  is_active INTEGER NOT NULL,
  created_by TEXT REFERENCES users(id),
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  UNIQUE (store_id, code)
);
CREATE TABLE IF NOT EXISTS invoices (
  id TEXT PRIMARY KEY,
  store_id TEXT NOT NULL REFERENCES stores(id),
  invoice_number TEXT NOT NULL,
  salesperson_id TEXT NOT NULL REFERENCES users(id),
  subtotal INTEGER NOT NULL,
  tax INTEGER NOT NULL,
  discount INTEGER NOT NULL,
  total INTEGER NOT NULL,
  customer_name TEXT NOT NULL,
  customer_phone TEXT NOT NULL,
  customer_email TEXT NOT NULL,
  notes TEXT NOT NULL,
  sync_status TEXT NOT NULL,
  synced_at TEXT,
  local_id TEXT,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL,
  UNIQUE (store_id, invoice_number)
);
CREATE INDEX IF NOT EXISTS invoices_store_created ON invoices (store_id, created_at);
CREATE TABLE IF NOT EXISTS invoice_items (
  id TEXT PRIMARY KEY,
  invoice_id TEXT NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
  position INTEGER NOT NULL,
  product_id TEXT NOT NULL REFERENCES products(id),
  product_name TEXT NOT NULL,
  product_code TEXT NOT NULL,
  quantity INTEGER NOT NULL,
  price INTEGER NOT NULL,
  total INTEGER NOT NULL,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS invoice_items_invoice ON invoice_items (invoice_id, position);
CREATE TABLE IF NOT EXISTS sync_logs (
  id TEXT PRIMARY KEY,
  user_id TEXT NOT NULL REFERENCES users(id),
  store_id TEXT NOT NULL REFERENCES stores(id),
  sync_type TEXT NOT NULL,
  status TEXT NOT NULL,
  items_synced INTEGER NOT NULL,
  items_failed INTEGER NOT NULL,
  error_message TEXT,
  details TEXT NOT NULL,
  started_at TEXT NOT NULL,
  completed_at TEXT
);
CREATE INDEX IF NOT EXISTS sync_logs_user_started ON sync_logs (user_id, started_at);
";

const STORE_COLUMNS: &str =
    "id, name, code, address, phone, email, tax_rate, currency, is_active, created_at, updated_at";
const ROLE_COLUMNS: &str =
    "id, name, display_name, description, permissions, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, name, email, phone, bio, store_id, role_id, \
     is_verified, is_active, is_superuser, password_hash, created_at, updated_at";
const CATEGORY_COLUMNS: &str =
    "id, store_id, name, description, parent_id, is_active, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, store_id, name, code, description, category_id, price, cost, \
     stock, low_stock_threshold, barcode, image_url, is_active, created_by, created_at, updated_at";
const INVOICE_COLUMNS: &str = "id, store_id, invoice_number, salesperson_id, subtotal, tax, \
     discount, total, customer_name, customer_phone, customer_email, notes, sync_status, \
     synced_at, local_id, created_at, updated_at";
const ITEM_COLUMNS: &str = "ii.invoice_id, ii.id, ii.product_id, ii.product_name, \
     ii.product_code, ii.quantity, ii.price, ii.total, ii.created_at";
const SYNC_LOG_COLUMNS: &str = "id, user_id, store_id, sync_type, status, items_synced, \
     items_failed, error_message, details, started_at, completed_at";

/// A [`PosStore`] persisted in a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        info!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    /// Private database that disappears with the store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(&format!("PRAGMA user_version={SCHEMA_VERSION};"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

// ---------------------------------------------------------------------------
// Column codecs
// ---------------------------------------------------------------------------

fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn opt_ts(at: &Option<DateTime<Utc>>) -> Option<String> {
    at.as_ref().map(ts)
}

fn conversion<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn id_at<T: From<Uuid>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map(T::from).map_err(|e| conversion(idx, e))
}

fn opt_id_at<T: From<Uuid>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Uuid::parse_str(&s).map(T::from).map_err(|e| conversion(idx, e)))
        .transpose()
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

fn opt_time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion(idx, e))
    })
    .transpose()
}

fn money_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Money> {
    Ok(Money::from_cents(row.get(idx)?))
}

/// Enum columns hold the serde name of the variant.
fn enum_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_value(serde_json::Value::String(raw)).map_err(|e| conversion(idx, e))
}

fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion(idx, e))
}

// ---------------------------------------------------------------------------
// Row mappers (column order follows the *_COLUMNS constants)
// ---------------------------------------------------------------------------

fn store_from_row(row: &Row<'_>) -> rusqlite::Result<Store> {
    let tax: u32 = row.get(6)?;
    Ok(Store {
        id: id_at(row, 0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        address: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        tax_rate: Rate::from_ten_thousandths(tax).map_err(|e| conversion(6, e))?,
        currency: row.get(7)?,
        is_active: row.get(8)?,
        created_at: time_at(row, 9)?,
        updated_at: time_at(row, 10)?,
    })
}

fn role_from_row(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: id_at(row, 0)?,
        name: enum_at(row, 1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        permissions: json_at(row, 4)?,
        created_at: time_at(row, 5)?,
        updated_at: time_at(row, 6)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: id_at(row, 0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        bio: row.get(5)?,
        store: opt_id_at(row, 6)?,
        role: opt_id_at(row, 7)?,
        is_verified: row.get(8)?,
        is_active: row.get(9)?,
        is_superuser: row.get(10)?,
        password_hash: row.get(11)?,
        created_at: time_at(row, 12)?,
        updated_at: time_at(row, 13)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: id_at(row, 0)?,
        store: id_at(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        parent: opt_id_at(row, 4)?,
        is_active: row.get(5)?,
        created_at: time_at(row, 6)?,
        updated_at: time_at(row, 7)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: id_at(row, 0)?,
        store: id_at(row, 1)?,
        name: row.get(2)?,
        code: row.get(3)?,
        description: row.get(4)?,
        category: opt_id_at(row, 5)?,
        price: money_at(row, 6)?,
        cost: money_at(row, 7)?,
        stock: row.get(8)?,
        low_stock_threshold: row.get(9)?,
        barcode: row.get(10)?,
        image_url: row.get(11)?,
        is_active: row.get(12)?,
        created_by: opt_id_at(row, 13)?,
        created_at: time_at(row, 14)?,
        updated_at: time_at(row, 15)?,
    })
}

fn invoice_from_row(row: &Row<'_>) -> rusqlite::Result<Invoice> {
    Ok(Invoice {
        id: id_at(row, 0)?,
        store: id_at(row, 1)?,
        invoice_number: row.get(2)?,
        salesperson: id_at(row, 3)?,
        items: Vec::new(),
        subtotal: money_at(row, 4)?,
        tax: money_at(row, 5)?,
        discount: money_at(row, 6)?,
        total: money_at(row, 7)?,
        customer_name: row.get(8)?,
        customer_phone: row.get(9)?,
        customer_email: row.get(10)?,
        notes: row.get(11)?,
        sync_status: enum_at(row, 12)?,
        synced_at: opt_time_at(row, 13)?,
        local_id: row.get(14)?,
        created_at: time_at(row, 15)?,
        updated_at: time_at(row, 16)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<(InvoiceId, InvoiceItem)> {
    let item = InvoiceItem {
        id: id_at(row, 1)?,
        product: id_at(row, 2)?,
        product_name: row.get(3)?,
        product_code: row.get(4)?,
        quantity: row.get(5)?,
        price: money_at(row, 6)?,
        total: money_at(row, 7)?,
        created_at: time_at(row, 8)?,
    };
    Ok((id_at(row, 0)?, item))
}

fn sync_log_from_row(row: &Row<'_>) -> rusqlite::Result<SyncLog> {
    Ok(SyncLog {
        id: id_at(row, 0)?,
        user: id_at(row, 1)?,
        store: id_at(row, 2)?,
        sync_type: enum_at(row, 3)?,
        status: enum_at(row, 4)?,
        items_synced: row.get(5)?,
        items_failed: row.get(6)?,
        error_message: row.get(7)?,
        details: json_at(row, 8)?,
        started_at: time_at(row, 9)?,
        completed_at: opt_time_at(row, 10)?,
    })
}

// ---------------------------------------------------------------------------
// Query helpers
// ---------------------------------------------------------------------------

fn query_all<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Vec<T>>
where
    P: Params,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_one<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Option<T>>
where
    P: Params,
{
    Ok(conn.query_row(sql, params, map).optional()?)
}

fn exists<P: Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<bool> {
    Ok(conn.query_row(sql, params, |row| row.get::<_, bool>(0))?)
}

fn product_by_id(conn: &Connection, id: ProductId) -> StoreResult<Option<Product>> {
    query_one(
        conn,
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
        [id.to_string()],
        product_from_row,
    )
}

fn number_taken(conn: &Connection, store: StoreId, invoice_number: &str) -> StoreResult<bool> {
    exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM invoices WHERE store_id = ?1 AND invoice_number = ?2)",
        params![store.to_string(), invoice_number],
    )
}

fn check_user_unique(conn: &Connection, user: &User) -> StoreResult<()> {
    let id = user.id.to_string();
    if exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id <> ?2)",
        params![user.username, id],
    )? {
        return Err(StoreError::conflict("user", "username", &user.username));
    }
    if exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND id <> ?2)",
        params![user.email, id],
    )? {
        return Err(StoreError::conflict("user", "email", &user.email));
    }
    Ok(())
}

fn check_category_unique(conn: &Connection, category: &Category) -> StoreResult<()> {
    if exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM categories WHERE store_id = ?1 AND name = ?2 AND id <> ?3)",
        params![category.store.to_string(), category.name, category.id.to_string()],
    )? {
        return Err(StoreError::conflict("category", "name", &category.name));
    }
    Ok(())
}

fn check_product_unique(conn: &Connection, product: &Product) -> StoreResult<()> {
    if exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM products WHERE store_id = ?1 AND code = ?2 AND id <> ?3)",
        params![product.store.to_string(), product.code, product.id.to_string()],
    )? {
        return Err(StoreError::conflict("product", "code", &product.code));
    }
    Ok(())
}

fn require_store_row(conn: &Connection, store: StoreId) -> StoreResult<()> {
    if exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM stores WHERE id = ?1)",
        [store.to_string()],
    )? {
        Ok(())
    } else {
        Err(StoreError::not_found("store", store))
    }
}

fn items_by_invoice<P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> StoreResult<HashMap<InvoiceId, Vec<InvoiceItem>>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM invoice_items ii JOIN invoices i ON i.id = ii.invoice_id \
         WHERE {filter} ORDER BY ii.invoice_id, ii.position"
    );
    let mut grouped: HashMap<InvoiceId, Vec<InvoiceItem>> = HashMap::new();
    for (invoice, item) in query_all(conn, &sql, params, item_from_row)? {
        grouped.entry(invoice).or_default().push(item);
    }
    Ok(grouped)
}

fn insert_invoice(conn: &Connection, invoice: &Invoice) -> StoreResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO invoices ({INVOICE_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            invoice.id.to_string(),
            invoice.store.to_string(),
            invoice.invoice_number,
            invoice.salesperson.to_string(),
            invoice.subtotal.cents(),
            invoice.tax.cents(),
            invoice.discount.cents(),
            invoice.total.cents(),
            invoice.customer_name,
            invoice.customer_phone,
            invoice.customer_email,
            invoice.notes,
            invoice.sync_status.as_str(),
            opt_ts(&invoice.synced_at),
            invoice.local_id,
            ts(&invoice.created_at),
            ts(&invoice.updated_at),
        ],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO invoice_items (id, invoice_id, position, product_id, product_name, \
         product_code, quantity, price, total, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for (position, item) in invoice.items.iter().enumerate() {
        stmt.execute(params![
            item.id.to_string(),
            invoice.id.to_string(),
            position as i64,
            item.product.to_string(),
            item.product_name,
            item.product_code,
            item.quantity,
            item.price.cents(),
            item.total.cents(),
            ts(&item.created_at),
        ])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PosStore
// ---------------------------------------------------------------------------

impl PosStore for SqliteStore {
    fn ping(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn create_store(&self, store: &Store) -> StoreResult<()> {
        let conn = self.lock()?;
        if exists(
            &conn,
            "SELECT EXISTS(SELECT 1 FROM stores WHERE code = ?1)",
            [&store.code],
        )? {
            return Err(StoreError::conflict("store", "code", &store.code));
        }
        conn.execute(
            &format!(
                "INSERT INTO stores ({STORE_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                store.id.to_string(),
                store.name,
                store.code,
                store.address,
                store.phone,
                store.email,
                store.tax_rate.ten_thousandths(),
                store.currency,
                store.is_active,
                ts(&store.created_at),
                ts(&store.updated_at),
            ],
        )?;
        debug!(code = %store.code, "created store");
        Ok(())
    }

    fn get_store(&self, id: StoreId) -> StoreResult<Option<Store>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            &format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = ?1"),
            [id.to_string()],
            store_from_row,
        )
    }

    fn get_store_by_code(&self, code: &str) -> StoreResult<Option<Store>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            &format!("SELECT {STORE_COLUMNS} FROM stores WHERE code = ?1"),
            [code],
            store_from_row,
        )
    }

    fn list_stores(&self) -> StoreResult<Vec<Store>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!("SELECT {STORE_COLUMNS} FROM stores ORDER BY name"),
            [],
            store_from_row,
        )
    }

    fn update_store(&self, store: &Store) -> StoreResult<()> {
        let conn = self.lock()?;
        if exists(
            &conn,
            "SELECT EXISTS(SELECT 1 FROM stores WHERE code = ?1 AND id <> ?2)",
            params![store.code, store.id.to_string()],
        )? {
            return Err(StoreError::conflict("store", "code", &store.code));
        }
        let changed = conn.execute(
            "UPDATE stores SET name = ?2, code = ?3, address = ?4, phone = ?5, email = ?6, \
             tax_rate = ?7, currency = ?8, is_active = ?9, updated_at = ?10 WHERE id = ?1",
            params![
                store.id.to_string(),
                store.name,
                store.code,
                store.address,
                store.phone,
                store.email,
                store.tax_rate.ten_thousandths(),
                store.currency,
                store.is_active,
                ts(&store.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("store", store.id));
        }
        Ok(())
    }

    fn create_role(&self, role: &Role) -> StoreResult<()> {
        let conn = self.lock()?;
        if exists(
            &conn,
            "SELECT EXISTS(SELECT 1 FROM roles WHERE name = ?1)",
            [role.name.as_str()],
        )? {
            return Err(StoreError::conflict("role", "name", role.name.as_str()));
        }
        conn.execute(
            &format!("INSERT INTO roles ({ROLE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                role.id.to_string(),
                role.name.as_str(),
                role.display_name,
                role.description,
                serde_json::to_string(&role.permissions)?,
                ts(&role.created_at),
                ts(&role.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?1"),
            [id.to_string()],
            role_from_row,
        )
    }

    fn get_role_by_name(&self, name: RoleName) -> StoreResult<Option<Role>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = ?1"),
            [name.as_str()],
            role_from_row,
        )
    }

    fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let conn = self.lock()?;
        let mut rows = query_all(
            &conn,
            &format!("SELECT {ROLE_COLUMNS} FROM roles"),
            [],
            role_from_row,
        )?;
        rows.sort_by_key(|r| r.name);
        Ok(rows)
    }

    fn create_user(&self, user: &User) -> StoreResult<()> {
        let conn = self.lock()?;
        check_user_unique(&conn, user)?;
        conn.execute(
            &format!(
                "INSERT INTO users ({USER_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                user.id.to_string(),
                user.username,
                user.name,
                user.email,
                user.phone,
                user.bio,
                user.store.map(|s| s.to_string()),
                user.role.map(|r| r.to_string()),
                user.is_verified,
                user.is_active,
                user.is_superuser,
                user.password_hash,
                ts(&user.created_at),
                ts(&user.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id.to_string()],
            user_from_row,
        )
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            [email],
            user_from_row,
        )
    }

    fn username_exists(&self, username: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        exists(
            &conn,
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            [username],
        )
    }

    fn update_user(&self, user: &User) -> StoreResult<()> {
        let conn = self.lock()?;
        check_user_unique(&conn, user)?;
        let changed = conn.execute(
            "UPDATE users SET username = ?2, name = ?3, email = ?4, phone = ?5, bio = ?6, \
             store_id = ?7, role_id = ?8, is_verified = ?9, is_active = ?10, is_superuser = ?11, \
             password_hash = ?12, updated_at = ?13 WHERE id = ?1",
            params![
                user.id.to_string(),
                user.username,
                user.name,
                user.email,
                user.phone,
                user.bio,
                user.store.map(|s| s.to_string()),
                user.role.map(|r| r.to_string()),
                user.is_verified,
                user.is_active,
                user.is_superuser,
                user.password_hash,
                ts(&user.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("user", user.id));
        }
        Ok(())
    }

    fn list_users(&self, store: StoreId) -> StoreResult<Vec<User>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!("SELECT {USER_COLUMNS} FROM users WHERE store_id = ?1 ORDER BY name"),
            [store.to_string()],
            user_from_row,
        )
    }

    fn create_category(&self, category: &Category) -> StoreResult<()> {
        let conn = self.lock()?;
        require_store_row(&conn, category.store)?;
        check_category_unique(&conn, category)?;
        conn.execute(
            &format!(
                "INSERT INTO categories ({CATEGORY_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                category.id.to_string(),
                category.store.to_string(),
                category.name,
                category.description,
                category.parent.map(|p| p.to_string()),
                category.is_active,
                ts(&category.created_at),
                ts(&category.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let conn = self.lock()?;
        query_one(
            &conn,
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
            [id.to_string()],
            category_from_row,
        )
    }

    fn update_category(&self, category: &Category) -> StoreResult<()> {
        let conn = self.lock()?;
        check_category_unique(&conn, category)?;
        let changed = conn.execute(
            "UPDATE categories SET name = ?2, description = ?3, parent_id = ?4, is_active = ?5, \
             updated_at = ?6 WHERE id = ?1",
            params![
                category.id.to_string(),
                category.name,
                category.description,
                category.parent.map(|p| p.to_string()),
                category.is_active,
                ts(&category.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("category", category.id));
        }
        Ok(())
    }

    fn list_categories(&self, store: StoreId) -> StoreResult<Vec<Category>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE store_id = ?1 ORDER BY name"),
            [store.to_string()],
            category_from_row,
        )
    }

    fn create_product(&self, product: &Product) -> StoreResult<()> {
        let conn = self.lock()?;
        require_store_row(&conn, product.store)?;
        check_product_unique(&conn, product)?;
        conn.execute(
            &format!(
                "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            params![
                product.id.to_string(),
                product.store.to_string(),
                product.name,
                product.code,
                product.description,
                product.category.map(|c| c.to_string()),
                product.price.cents(),
                product.cost.cents(),
                product.stock,
                product.low_stock_threshold,
                product.barcode,
                product.image_url,
                product.is_active,
                product.created_by.map(|u| u.to_string()),
                ts(&product.created_at),
                ts(&product.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let conn = self.lock()?;
        product_by_id(&conn, id)
    }

    fn update_product(&self, product: &Product) -> StoreResult<()> {
        let conn = self.lock()?;
        check_product_unique(&conn, product)?;
        let changed = conn.execute(
            "UPDATE products SET name = ?2, code = ?3, description = ?4, category_id = ?5, \
             price = ?6, cost = ?7, stock = ?8, low_stock_threshold = ?9, barcode = ?10, \
             image_url = ?11, is_active = ?12, updated_at = ?13 WHERE id = ?1",
            params![
                product.id.to_string(),
                product.name,
                product.code,
                product.description,
                product.category.map(|c| c.to_string()),
                product.price.cents(),
                product.cost.cents(),
                product.stock,
                product.low_stock_threshold,
                product.barcode,
                product.image_url,
                product.is_active,
                ts(&product.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("product", product.id));
        }
        Ok(())
    }

    fn list_products(&self, store: StoreId) -> StoreResult<Vec<Product>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE store_id = ?1 ORDER BY name"),
            [store.to_string()],
            product_from_row,
        )
    }

    fn commit_invoice(&self, invoice: NewInvoice) -> StoreResult<Invoice> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if number_taken(&tx, invoice.store, &invoice.invoice_number)? {
            return Err(StoreError::DuplicateInvoice {
                store: invoice.store,
                invoice_number: invoice.invoice_number,
            });
        }
        let plan = plan_stock(&invoice, |id| product_by_id(&tx, id))?;

        let now = ts(&Utc::now());
        for (product_id, remaining) in &plan {
            tx.execute(
                "UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1",
                params![product_id.to_string(), remaining, now],
            )?;
        }
        let stored = invoice.into_invoice();
        insert_invoice(&tx, &stored)?;
        tx.commit()?;
        debug!(number = %stored.invoice_number, items = stored.items.len(), "committed invoice");
        Ok(stored)
    }

    fn get_invoice(&self, id: InvoiceId) -> StoreResult<Option<Invoice>> {
        let conn = self.lock()?;
        let Some(mut invoice) = query_one(
            &conn,
            &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"),
            [id.to_string()],
            invoice_from_row,
        )?
        else {
            return Ok(None);
        };
        let mut items = items_by_invoice(&conn, "ii.invoice_id = ?1", [id.to_string()])?;
        invoice.items = items.remove(&id).unwrap_or_default();
        Ok(Some(invoice))
    }

    fn list_invoices(&self, store: StoreId) -> StoreResult<Vec<Invoice>> {
        let conn = self.lock()?;
        let mut invoices = query_all(
            &conn,
            &format!(
                "SELECT {INVOICE_COLUMNS} FROM invoices WHERE store_id = ?1 \
                 ORDER BY created_at DESC, id DESC"
            ),
            [store.to_string()],
            invoice_from_row,
        )?;
        let mut items = items_by_invoice(&conn, "i.store_id = ?1", [store.to_string()])?;
        for invoice in &mut invoices {
            invoice.items = items.remove(&invoice.id).unwrap_or_default();
        }
        Ok(invoices)
    }

    fn invoice_number_exists(&self, store: StoreId, invoice_number: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        number_taken(&conn, store, invoice_number)
    }

    fn record_sync_log(&self, log: &SyncLog) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO sync_logs ({SYNC_LOG_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                log.id.to_string(),
                log.user.to_string(),
                log.store.to_string(),
                log.sync_type.as_str(),
                log.status.as_str(),
                log.items_synced,
                log.items_failed,
                log.error_message,
                serde_json::to_string(&log.details)?,
                ts(&log.started_at),
                opt_ts(&log.completed_at),
            ],
        )?;
        Ok(())
    }

    fn list_sync_logs(&self, user: UserId, limit: usize) -> StoreResult<Vec<SyncLog>> {
        let conn = self.lock()?;
        query_all(
            &conn,
            &format!(
                "SELECT {SYNC_LOG_COLUMNS} FROM sync_logs WHERE user_id = ?1 \
                 ORDER BY started_at DESC, id DESC LIMIT ?2"
            ),
            params![user.to_string(), i64::try_from(limit).unwrap_or(i64::MAX)],
            sync_log_from_row,
        )
    }
}
