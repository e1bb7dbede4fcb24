use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RoleId, StoreId};
use crate::money::Rate;
use crate::role::{PermissionSet, RoleName};

/// A tenant. Every catalog entry, invoice and (non-superuser) account
/// belongs to exactly one store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    /// Short unique code, e.g. `DEMO001`.
    pub code: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub tax_rate: Rate,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: StoreId::new(),
            name: name.into(),
            code: code.into(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            tax_rate: Rate::ZERO,
            currency: "USD".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The seeded demonstration store.
    pub fn demo() -> Self {
        let mut store = Self::new("Demo Store", "DEMO001");
        store.address = "123 Main Street, City, Country".into();
        store.phone = "+1234567890".into();
        store.email = "demo@store.com".into();
        store.tax_rate = Rate::from_ten_thousandths(1000).unwrap_or(Rate::ZERO);
        store
    }
}

/// Role record. The name is one of the three built-in labels; the permission
/// set may be customised per deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub display_name: String,
    pub description: String,
    pub permissions: PermissionSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Role with the default display text and permissions for `name`.
    pub fn builtin(name: RoleName) -> Self {
        let now = Utc::now();
        Self {
            id: RoleId::new(),
            name,
            display_name: name.display_name().into(),
            description: name.description().into(),
            permissions: PermissionSet::defaults_for(name),
            created_at: now,
            updated_at: now,
        }
    }
}
