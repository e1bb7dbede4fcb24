use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RoleId, StoreId, UserId};

/// An account. Regular users always carry a store and a role; superusers
/// may have neither.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub store: Option<StoreId>,
    pub role: Option<RoleId>,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_superuser: bool,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        store: Option<StoreId>,
        role: Option<RoleId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username: username.into(),
            name: name.into(),
            email: email.into(),
            phone: None,
            bio: None,
            store,
            role,
            is_verified: false,
            is_active: true,
            is_superuser: false,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn belongs_to(&self, store: StoreId) -> bool {
        self.store == Some(store)
    }
}
