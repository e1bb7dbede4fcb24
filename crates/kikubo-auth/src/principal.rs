use kikubo_types::{Permission, Role, RoleName, Store, StoreId, User, UserId};

/// An authenticated caller together with the store and role it acts under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user: User,
    pub store: Option<Store>,
    pub role: Option<Role>,
}

impl Principal {
    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.store.as_ref().map(|s| s.id)
    }

    pub fn role_name(&self) -> Option<RoleName> {
        self.role.as_ref().map(|r| r.name)
    }

    pub fn is_superuser(&self) -> bool {
        self.user.is_superuser
    }

    pub fn is(&self, role: RoleName) -> bool {
        self.role_name() == Some(role)
    }

    /// Superusers hold every permission.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_superuser()
            || self
                .role
                .as_ref()
                .is_some_and(|r| r.permissions.contains(permission))
    }

    pub fn sees_all_sales(&self) -> bool {
        self.is_superuser() || self.role_name().is_some_and(|r| r.sees_all_sales())
    }

    pub fn belongs_to(&self, store: StoreId) -> bool {
        self.store_id() == Some(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: RoleName) -> Principal {
        let store = Store::demo();
        let role = Role::builtin(role);
        let user = User::new("u", "U", "u@example.com", Some(store.id), Some(role.id));
        Principal {
            user,
            store: Some(store),
            role: Some(role),
        }
    }

    #[test]
    fn permissions_follow_role() {
        let seller = principal(RoleName::Salesperson);
        assert!(seller.has_permission(Permission::CanCreateInvoice));
        assert!(!seller.has_permission(Permission::CanViewAnalytics));
        assert!(!seller.sees_all_sales());
        assert!(seller.is(RoleName::Salesperson));
    }

    #[test]
    fn superuser_has_everything() {
        let mut admin = principal(RoleName::Salesperson);
        admin.user.is_superuser = true;
        admin.role = None;
        assert!(admin.has_permission(Permission::CanManageUsers));
        assert!(admin.sees_all_sales());
    }

    #[test]
    fn no_role_no_permissions() {
        let mut p = principal(RoleName::Owner);
        p.role = None;
        assert!(!p.has_permission(Permission::CanViewProducts));
        assert_eq!(p.role_name(), None);
    }
}
