//! Access rules evaluated against a [`Principal`].

use std::fmt;

use kikubo_types::{Permission, RoleName, StoreId, UserId};

use crate::error::{AuthError, AuthResult};
use crate::principal::Principal;

/// Something a principal wants to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Owner-only administration.
    Administer,
    /// Owner-managed data: anyone authenticated may read, only owners write.
    OwnerData { write: bool },
    /// Touch an object that belongs to `store`.
    AccessStore { store: StoreId },
    /// Read a single invoice.
    ViewInvoice { store: StoreId, salesperson: UserId },
    CreateInvoice,
    ViewReports,
    ManageProducts,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Administer => write!(f, "administer"),
            Self::OwnerData { write: false } => write!(f, "owner-data:read"),
            Self::OwnerData { write: true } => write!(f, "owner-data:write"),
            Self::AccessStore { store } => write!(f, "store:{store}"),
            Self::ViewInvoice { store, .. } => write!(f, "invoice:{store}"),
            Self::CreateInvoice => write!(f, "create-invoice"),
            Self::ViewReports => write!(f, "view-reports"),
            Self::ManageProducts => write!(f, "manage-products"),
        }
    }
}

const DENIED: &str = "You do not have permission to perform this action.";

/// Decide `action` for `principal`.
pub fn is_allowed(principal: &Principal, action: &Action) -> bool {
    if principal.is_superuser() {
        return true;
    }
    match action {
        Action::Administer => principal.is(RoleName::Owner),
        Action::OwnerData { write } => !write || principal.is(RoleName::Owner),
        Action::AccessStore { store } => principal.belongs_to(*store),
        Action::ViewInvoice { store, salesperson } => {
            principal.belongs_to(*store)
                && (principal.sees_all_sales() || principal.id() == *salesperson)
        }
        Action::CreateInvoice => principal.has_permission(Permission::CanCreateInvoice),
        Action::ViewReports => principal.has_permission(Permission::CanViewAnalytics),
        Action::ManageProducts => principal.has_permission(Permission::CanManageProducts),
    }
}

/// Like [`is_allowed`] but returns a client-facing error on denial.
pub fn authorize(principal: &Principal, action: &Action) -> AuthResult<()> {
    if is_allowed(principal, action) {
        return Ok(());
    }
    tracing::debug!(user = %principal.id(), %action, "access denied");
    let message = match action {
        Action::CreateInvoice => "You do not have permission to create invoices.",
        Action::ViewReports => "You do not have permission to view reports.",
        Action::ManageProducts => "You do not have permission to manage products.",
        _ => DENIED,
    };
    Err(AuthError::denied(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kikubo_types::{Role, Store, User};

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
    fn owner_only_actions() {
        let owner = principal(RoleName::Owner);
        let manager = principal(RoleName::Manager);
        assert!(is_allowed(&owner, &Action::Administer));
        assert!(!is_allowed(&manager, &Action::Administer));
        assert!(is_allowed(&manager, &Action::OwnerData { write: false }));
        assert!(!is_allowed(&manager, &Action::OwnerData { write: true }));
        assert!(is_allowed(&owner, &Action::OwnerData { write: true }));
    }

    #[test]
    fn same_store_rule() {
        let seller = principal(RoleName::Salesperson);
        let own = seller.store_id().unwrap();
        assert!(is_allowed(&seller, &Action::AccessStore { store: own }));
        assert!(!is_allowed(
            &seller,
            &Action::AccessStore {
                store: StoreId::new()
            }
        ));
    }

    #[test]
    fn invoice_visibility() {
        let seller = principal(RoleName::Salesperson);
        let manager = principal(RoleName::Manager);
        let store = seller.store_id().unwrap();
        let own = Action::ViewInvoice {
            store,
            salesperson: seller.id(),
        };
        let foreign = Action::ViewInvoice {
            store,
            salesperson: UserId::new(),
        };
        assert!(is_allowed(&seller, &own));
        assert!(!is_allowed(&seller, &foreign));

        let manager_store = manager.store_id().unwrap();
        assert!(is_allowed(
            &manager,
            &Action::ViewInvoice {
                store: manager_store,
                salesperson: UserId::new()
            }
        ));
        // Managers never see other stores' invoices.
        assert!(!is_allowed(&manager, &foreign));
    }

    #[test]
    fn permission_backed_actions() {
        let seller = principal(RoleName::Salesperson);
        assert!(authorize(&seller, &Action::CreateInvoice).is_ok());
        let err = authorize(&seller, &Action::ViewReports).unwrap_err();
        assert_eq!(err.to_string(), "You do not have permission to view reports.");
        assert!(authorize(&seller, &Action::ManageProducts).is_err());

        let manager = principal(RoleName::Manager);
        assert!(authorize(&manager, &Action::ViewReports).is_ok());
        assert!(authorize(&manager, &Action::ManageProducts).is_ok());
    }

    #[test]
    fn superuser_passes_everything() {
        let mut admin = principal(RoleName::Salesperson);
        admin.user.is_superuser = true;
        admin.store = None;
        assert!(is_allowed(&admin, &Action::Administer));
        assert!(is_allowed(
            &admin,
            &Action::AccessStore {
                store: StoreId::new()
            }
        ));
    }

    #[test]
    fn action_display() {
        assert_eq!(Action::CreateInvoice.to_string(), "create-invoice");
        assert_eq!(Action::OwnerData { write: true }.to_string(), "owner-data:write");
    }
}
