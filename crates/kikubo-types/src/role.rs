use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Coarse role label attached to every non-superuser account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Owner,
    Manager,
    Salesperson,
}

impl RoleName {
    pub const ALL: [RoleName; 3] = [RoleName::Owner, RoleName::Manager, RoleName::Salesperson];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Salesperson => "salesperson",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Owner => "Store Owner",
            Self::Manager => "Store Manager",
            Self::Salesperson => "Salesperson",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Owner => "Full access to store management and analytics",
            Self::Manager => "Manages products and views analytics",
            Self::Salesperson => "Creates and manages sales invoices",
        }
    }

    /// Owners and managers see every invoice in their store.
    pub fn sees_all_sales(&self) -> bool {
        matches!(self, Self::Owner | Self::Manager)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "manager" => Ok(Self::Manager),
            "salesperson" => Ok(Self::Salesperson),
            other => Err(TypeError::UnknownRole(other.to_string())),
        }
    }
}

/// A single capability a role may grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CanCreateInvoice,
    CanViewOwnSales,
    CanViewAllSales,
    CanViewProducts,
    CanManageProducts,
    CanManageUsers,
    CanViewAnalytics,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::CanCreateInvoice,
        Permission::CanViewOwnSales,
        Permission::CanViewAllSales,
        Permission::CanViewProducts,
        Permission::CanManageProducts,
        Permission::CanManageUsers,
        Permission::CanViewAnalytics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CanCreateInvoice => "can_create_invoice",
            Self::CanViewOwnSales => "can_view_own_sales",
            Self::CanViewAllSales => "can_view_all_sales",
            Self::CanViewProducts => "can_view_products",
            Self::CanManageProducts => "can_manage_products",
            Self::CanManageUsers => "can_manage_users",
            Self::CanViewAnalytics => "can_view_analytics",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == key)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of granted permissions.
///
/// On the wire this is a JSON object of `permission -> bool`, matching what
/// clients already store. Keys that are `false` or unknown are dropped on
/// read, so only granted permissions ever round-trip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    /// Permissions seeded for the built-in roles.
    pub fn defaults_for(role: RoleName) -> Self {
        use Permission::*;
        match role {
            RoleName::Salesperson => [CanCreateInvoice, CanViewOwnSales, CanViewProducts]
                .into_iter()
                .collect(),
            RoleName::Owner => Self::all(),
            RoleName::Manager => [
                CanCreateInvoice,
                CanViewAllSales,
                CanViewProducts,
                CanManageProducts,
                CanViewAnalytics,
            ]
            .into_iter()
            .collect(),
        }
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn grant(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    pub fn revoke(&mut self, permission: Permission) {
        self.0.remove(&permission);
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<&str, bool> = self.0.iter().map(|p| (p.as_str(), true)).collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, bool>::deserialize(deserializer)?;
        Ok(map
            .into_iter()
            .filter(|(_, granted)| *granted)
            .filter_map(|(key, _)| Permission::from_key(&key))
            .collect())
    }
}
