//! Foundation types for the Kikubo POS backend.
//!
//! Every other Kikubo crate depends on `kikubo-types`. It holds the
//! identifiers, exact money arithmetic, role/permission vocabulary and the
//! plain domain records that the store, auth, sync and report layers share.
//!
//! # Key Types
//!
//! - [`StoreId`], [`UserId`], [`ProductId`], ...: UUID v7 identifiers
//! - [`Money`]: exact amount in minor units (2 decimal places)
//! - [`Rate`]: 4 decimal place fraction (store tax rate)
//! - [`RoleName`] / [`Permission`] / [`PermissionSet`]: coarse access model
//! - [`Store`], [`Role`], [`User`], [`Category`], [`Product`]: tenant and catalog
//! - [`Invoice`], [`InvoiceItem`], [`NewInvoice`]: sales records
//! - [`SyncLog`]: audit record of a bulk sync run
//! - [`FieldErrors`]: per-field validation messages

pub mod catalog;
pub mod error;
pub mod ids;
pub mod invoice;
pub mod money;
pub mod role;
pub mod sync_log;
pub mod tenant;
pub mod user;
pub mod validation;

pub use catalog::{Category, Product};
pub use error::TypeError;
pub use ids::{
    CategoryId, InvoiceId, InvoiceItemId, ProductId, RoleId, StoreId, SyncLogId, UserId,
};
pub use invoice::{
    Invoice, InvoiceItem, InvoiceTotals, NewInvoice, NewInvoiceItem, SyncStatus, MAX_QUANTITY,
};
pub use money::{Money, Rate};
pub use role::{Permission, PermissionSet, RoleName};
pub use sync_log::{SyncKind, SyncLog, SyncLogStatus};
pub use tenant::{Role, Store};
pub use user::User;
pub use validation::FieldErrors;
