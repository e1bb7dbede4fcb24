//! Behaviour every backend must share. Each backend's test module calls
//! these against a fresh instance.

use chrono::{Duration, Utc};
use kikubo_types::{
    Category, InvoiceTotals, Money, NewInvoice, NewInvoiceItem, Product, Rate, Role, RoleName,
    Store, SyncKind, SyncLog, SyncLogId, SyncLogStatus, SyncStatus, User,
};

use crate::error::StoreError;
use crate::traits::PosStore;

struct Fixture {
    store: Store,
    seller: User,
    soap: Product,
}

fn fixture(db: &dyn PosStore) -> Fixture {
    let store = Store::demo();
    db.create_store(&store).unwrap();
    let (role, _) = db.ensure_role(&Role::builtin(RoleName::Salesperson)).unwrap();
    let seller = User::new(
        "seller",
        "Sam Seller",
        "sam@example.com",
        Some(store.id),
        Some(role.id),
    );
    db.create_user(&seller).unwrap();
    let mut soap = Product::new(store.id, "Soap", "SOAP-1", Money::from_cents(250));
    soap.stock = 10;
    db.create_product(&soap).unwrap();
    Fixture {
        store,
        seller,
        soap,
    }
}

fn sale(fx: &Fixture, number: &str, lines: &[i64]) -> NewInvoice {
    let items: Vec<NewInvoiceItem> = lines
        .iter()
        .map(|qty| NewInvoiceItem {
            product: fx.soap.id,
            product_name: fx.soap.name.clone(),
            product_code: fx.soap.code.clone(),
            quantity: *qty,
            price: fx.soap.price,
            total: fx.soap.price.times(*qty).unwrap(),
        })
        .collect();
    let totals = InvoiceTotals::compute(items.iter().map(|i| i.total), Money::ZERO, Rate::ZERO);
    NewInvoice {
        store: fx.store.id,
        invoice_number: number.into(),
        salesperson: fx.seller.id,
        items,
        totals,
        customer_name: "Walk-in".into(),
        customer_phone: String::new(),
        customer_email: String::new(),
        notes: String::new(),
        sync_status: SyncStatus::Synced,
        synced_at: Some(Utc::now()),
        local_id: Some(format!("local-{number}")),
        created_at: Utc::now(),
    }
}

pub(crate) fn tenant_and_accounts(db: &dyn PosStore) {
    db.ping().unwrap();
    let fx = fixture(db);

    assert_eq!(db.get_store(fx.store.id).unwrap(), Some(fx.store.clone()));
    let dup = Store::new("Other", "DEMO001");
    assert!(matches!(
        db.create_store(&dup),
        Err(StoreError::Conflict { field: "code", .. })
    ));

    let mut updated = fx.store.clone();
    updated.name = "Renamed".into();
    db.update_store(&updated).unwrap();
    assert_eq!(db.require_store(fx.store.id).unwrap().name, "Renamed");

    let found = db.get_user_by_email("SAM@example.com").unwrap().unwrap();
    assert_eq!(found.id, fx.seller.id);
    assert!(db.username_exists("seller").unwrap());
    assert!(!db.username_exists("nobody").unwrap());

    let clash = User::new("other", "Other", "Sam@Example.com", Some(fx.store.id), None);
    assert!(matches!(
        db.create_user(&clash),
        Err(StoreError::Conflict { field: "email", .. })
    ));

    let mut seller = fx.seller.clone();
    seller.bio = Some("Top seller".into());
    db.update_user(&seller).unwrap();
    assert_eq!(db.require_user(seller.id).unwrap().bio.as_deref(), Some("Top seller"));

    let users = db.list_users(fx.store.id).unwrap();
    assert_eq!(users.len(), 1);

    let ghost = User::new("ghost", "Ghost", "ghost@example.com", None, None);
    assert!(matches!(
        db.update_user(&ghost),
        Err(StoreError::NotFound { kind: "user", .. })
    ));
}

pub(crate) fn catalog_uniqueness(db: &dyn PosStore) {
    let fx = fixture(db);

    let drinks = Category::new(fx.store.id, "Drinks");
    db.create_category(&drinks).unwrap();
    assert!(matches!(
        db.create_category(&Category::new(fx.store.id, "Drinks")),
        Err(StoreError::Conflict { kind: "category", .. })
    ));
    assert!(matches!(
        db.create_category(&Category::new(kikubo_types::StoreId::new(), "Snacks")),
        Err(StoreError::NotFound { kind: "store", .. })
    ));

    let other = Store::new("Second", "SECOND");
    db.create_store(&other).unwrap();
    // Codes only collide within one store.
    let elsewhere = Product::new(other.id, "Soap", "SOAP-1", Money::from_cents(300));
    db.create_product(&elsewhere).unwrap();

    let twin = Product::new(fx.store.id, "Soap again", "SOAP-1", Money::from_cents(300));
    assert!(matches!(
        db.create_product(&twin),
        Err(StoreError::Conflict { field: "code", .. })
    ));

    let mut soap = fx.soap.clone();
    soap.category = Some(drinks.id);
    soap.price = Money::from_cents(275);
    db.update_product(&soap).unwrap();
    let stored = db.require_product(soap.id).unwrap();
    assert_eq!(stored.category, Some(drinks.id));
    assert_eq!(stored.price, Money::from_cents(275));

    assert_eq!(db.list_products(fx.store.id).unwrap().len(), 1);
    assert_eq!(db.list_categories(fx.store.id).unwrap().len(), 1);
    assert!(db.list_categories(other.id).unwrap().is_empty());
}

pub(crate) fn commit_decrements_stock(db: &dyn PosStore) {
    let fx = fixture(db);
    let invoice = db.commit_invoice(sale(&fx, "INV-001", &[3, 2])).unwrap();

    assert_eq!(invoice.items.len(), 2);
    assert_eq!(invoice.total, Money::from_cents(1250));
    assert_eq!(db.require_product(fx.soap.id).unwrap().stock, 5);
    assert!(db.invoice_number_exists(fx.store.id, "INV-001").unwrap());

    let loaded = db.get_invoice(invoice.id).unwrap().unwrap();
    assert_eq!(loaded, invoice);
}

pub(crate) fn commit_rejects_without_side_effects(db: &dyn PosStore) {
    let fx = fixture(db);
    db.commit_invoice(sale(&fx, "INV-001", &[1])).unwrap();

    let err = db.commit_invoice(sale(&fx, "INV-001", &[1])).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateInvoice { .. }));

    let err = db.commit_invoice(sale(&fx, "INV-002", &[5, 5])).unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientStock { available: 9, requested: 10, .. }
    ));

    let mut soap = db.require_product(fx.soap.id).unwrap();
    soap.is_active = false;
    db.update_product(&soap).unwrap();
    let err = db.commit_invoice(sale(&fx, "INV-003", &[1])).unwrap_err();
    assert!(matches!(err, StoreError::ProductUnavailable { .. }));

    assert_eq!(db.require_product(fx.soap.id).unwrap().stock, 9);
    assert_eq!(db.list_invoices(fx.store.id).unwrap().len(), 1);
    assert!(!db.invoice_number_exists(fx.store.id, "INV-002").unwrap());
}

pub(crate) fn invoices_listed_newest_first(db: &dyn PosStore) {
    let fx = fixture(db);
    let mut older = sale(&fx, "INV-OLD", &[1]);
    older.created_at = Utc::now() - Duration::days(2);
    db.commit_invoice(older).unwrap();
    db.commit_invoice(sale(&fx, "INV-NEW", &[1])).unwrap();

    let listed = db.list_invoices(fx.store.id).unwrap();
    let numbers: Vec<&str> = listed.iter().map(|i| i.invoice_number.as_str()).collect();
    assert_eq!(numbers, ["INV-NEW", "INV-OLD"]);
    assert!(listed.iter().all(|i| i.items.len() == 1));
}

pub(crate) fn sync_logs_limited_and_scoped(db: &dyn PosStore) {
    let fx = fixture(db);
    let base = Utc::now();
    for n in 0..5 {
        db.record_sync_log(&SyncLog {
            id: SyncLogId::new(),
            user: fx.seller.id,
            store: fx.store.id,
            sync_type: SyncKind::Invoice,
            status: SyncLogStatus::Completed,
            items_synced: n,
            items_failed: 0,
            error_message: None,
            details: serde_json::json!({"n": n}),
            started_at: base + Duration::seconds(i64::from(n)),
            completed_at: Some(base + Duration::seconds(i64::from(n))),
        })
        .unwrap();
    }

    let logs = db.list_sync_logs(fx.seller.id, 3).unwrap();
    let synced: Vec<u32> = logs.iter().map(|l| l.items_synced).collect();
    assert_eq!(synced, [4, 3, 2]);
    assert_eq!(logs[0].details, serde_json::json!({"n": 4}));
    assert!(db
        .list_sync_logs(kikubo_types::UserId::new(), 20)
        .unwrap()
        .is_empty());
}

pub(crate) fn ensure_helpers_are_idempotent(db: &dyn PosStore) {
    let (first, created) = db.ensure_store(&Store::demo()).unwrap();
    assert!(created);
    let (second, created) = db.ensure_store(&Store::demo()).unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);

    for name in RoleName::ALL {
        db.ensure_role(&Role::builtin(name)).unwrap();
    }
    let (owner, created) = db.ensure_role(&Role::builtin(RoleName::Owner)).unwrap();
    assert!(!created);
    assert_eq!(owner.permissions.len(), 7);
    assert_eq!(db.list_roles().unwrap().len(), 3);
}
