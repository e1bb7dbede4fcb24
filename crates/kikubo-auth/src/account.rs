//! Account lifecycle: registration, login, token refresh, logout and
//! profile edits.

use std::sync::Arc;

use chrono::Utc;
use kikubo_store::PosStore;
use kikubo_types::{FieldErrors, Role, RoleId, Store, StoreId, User, UserId};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::password::{hash_password, verify_password};
use crate::principal::Principal;
use crate::token::{SessionRegistry, TokenPair};

pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 68;
pub const NAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 50;

const REQUIRED: &str = "This field is required.";

/// Body of a self-service registration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub role_id: Option<String>,
}

/// An account created by an operator (CLI) rather than self-registration.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub store: Option<StoreId>,
    pub role: Option<RoleId>,
    pub superuser: bool,
}

/// Editable profile fields. Anything else in the body is ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

/// Result of a successful registration.
#[derive(Clone, Debug)]
pub struct Registration {
    pub user: User,
    pub store: Store,
    pub role: Role,
}

/// Result of a successful login.
#[derive(Clone, Debug)]
pub struct Session {
    pub principal: Principal,
    pub tokens: TokenPair,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, _)| !host.is_empty())
        && !domain.ends_with('.')
}

/// Lower-case alphanumerics of the name, or the email local part when the
/// name has none. Capped at [`USERNAME_MAX`] characters.
pub fn username_base(name: &str, email: &str) -> String {
    let from_name: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let base = if from_name.is_empty() {
        email.split('@').next().unwrap_or_default().to_lowercase()
    } else {
        from_name
    };
    base.chars().take(USERNAME_MAX).collect()
}

fn check_password(password: &str, errors: &mut FieldErrors) {
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        errors.add("password", "Password must be at least 6 characters long.");
    } else if len > PASSWORD_MAX {
        errors.add("password", "Ensure this field has no more than 68 characters.");
    }
}

fn check_name(name: &str, errors: &mut FieldErrors) {
    if name.is_empty() {
        errors.add("name", "Name is required and cannot be empty.");
    } else if name.chars().count() < NAME_MIN {
        errors.add("name", "Name must be at least 2 characters long.");
    }
}

/// Account operations over a [`PosStore`] and a [`SessionRegistry`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn PosStore>,
    sessions: Arc<SessionRegistry>,
}

impl AccountService {
    pub fn new(store: Arc<dyn PosStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self { store, sessions }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Validate and create a self-registered account.
    ///
    /// All field problems are reported together.
    pub fn register(&self, request: RegisterRequest) -> AuthResult<Registration> {
        let mut errors = FieldErrors::new();

        let email = normalize_email(&request.email);
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        } else if self.store.get_user_by_email(&email)?.is_some() {
            errors.add("email", "A user with this email already exists.");
        }

        let name = request.name.trim().to_string();
        check_name(&name, &mut errors);
        check_password(&request.password, &mut errors);

        let store = match request.store_id.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("store_id", REQUIRED);
                None
            }
            Some(raw) => match StoreId::parse(raw) {
                Err(_) => {
                    errors.add("store_id", format!("\"{raw}\" is not a valid UUID."));
                    None
                }
                Ok(id) => {
                    let store = self.store.get_store(id)?.filter(|s| s.is_active);
                    if store.is_none() {
                        errors.add("store_id", "Invalid store ID or store is inactive.");
                    }
                    store
                }
            },
        };

        let role = match request.role_id.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("role_id", REQUIRED);
                None
            }
            Some(raw) => match RoleId::parse(raw) {
                Err(_) => {
                    errors.add("role_id", format!("\"{raw}\" is not a valid UUID."));
                    None
                }
                Ok(id) => {
                    let role = self.store.get_role(id)?;
                    if role.is_none() {
                        errors.add("role_id", "Invalid role ID.");
                    }
                    role
                }
            },
        };

        let (Some(store), Some(role)) = (store, role) else {
            return Err(AuthError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let user = self.insert_user(
            &name,
            &email,
            &request.password,
            request.phone.filter(|p| !p.trim().is_empty()),
            Some(store.id),
            Some(role.id),
            false,
        )?;
        info!(user = %user.id, store = %store.code, role = %role.name, "registered account");
        Ok(Registration { user, store, role })
    }

    /// Create an account on behalf of an operator. Email format and
    /// uniqueness are still enforced.
    pub fn create_account(&self, account: NewAccount) -> AuthResult<User> {
        let mut errors = FieldErrors::new();
        let email = normalize_email(&account.email);
        if !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        } else if self.store.get_user_by_email(&email)?.is_some() {
            errors.add("email", "A user with this email already exists.");
        }
        let name = account.name.trim().to_string();
        check_name(&name, &mut errors);
        check_password(&account.password, &mut errors);
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }
        let user = self.insert_user(
            &name,
            &email,
            &account.password,
            account.phone,
            account.store,
            account.role,
            account.superuser,
        )?;
        info!(user = %user.id, username = %user.username, "created account");
        Ok(user)
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: Option<String>,
        store: Option<StoreId>,
        role: Option<RoleId>,
        superuser: bool,
    ) -> AuthResult<User> {
        let username = self.unique_username(name, email)?;
        let mut user = User::new(username, name, email, store, role);
        user.phone = phone;
        user.is_superuser = superuser;
        // No mail delivery in this deployment, so accounts start verified.
        user.is_verified = true;
        user.password_hash = hash_password(password);
        self.store.create_user(&user)?;
        Ok(user)
    }

    fn unique_username(&self, name: &str, email: &str) -> AuthResult<String> {
        let base = username_base(name, email);
        let mut candidate = base.clone();
        let mut counter = 1u32;
        while self.store.username_exists(&candidate)? {
            candidate = format!("{base}{counter}");
            counter += 1;
        }
        Ok(candidate)
    }

    /// Check credentials and account state, then open a session.
    pub fn login(&self, email: &str, password: &str) -> AuthResult<Session> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::failed("Email and password are required"));
        }
        let user = self
            .store
            .get_user_by_email(&email)?
            .ok_or_else(|| AuthError::failed("Invalid credentials"))?;
        if !verify_password(password, &user.password_hash) {
            warn!(user = %user.id, "rejected login: bad password");
            return Err(AuthError::failed("Invalid credentials, try again"));
        }
        if !user.is_active {
            return Err(AuthError::failed("Account disabled, contact admin"));
        }
        if !user.is_verified {
            return Err(AuthError::failed("Email is not verified"));
        }
        let principal = self.principal_from_user(user)?;
        let purged = self.sessions.purge_expired()?;
        if purged > 0 {
            debug!(purged, "dropped expired sessions");
        }
        let tokens = self.sessions.issue(principal.id())?;
        info!(user = %principal.id(), "login");
        Ok(Session { principal, tokens })
    }

    /// Rotate a refresh token. The account must still be allowed to log in.
    pub fn refresh(&self, refresh: &str) -> AuthResult<TokenPair> {
        let owner = self.sessions.refresh_owner(refresh)?;
        let user = self.store.get_user(owner)?.ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            self.sessions.revoke(refresh)?;
            return Err(AuthError::failed("Account disabled, contact admin"));
        }
        let (_, pair) = self.sessions.rotate(refresh)?;
        Ok(pair)
    }

    /// Revoke a refresh token held by `principal`.
    pub fn logout(&self, principal: &Principal, refresh: &str) -> AuthResult<()> {
        if refresh.trim().is_empty() {
            return Err(FieldErrors::single("refresh", "Refresh token is required").into());
        }
        if self.sessions.refresh_owner(refresh)? != principal.id() {
            return Err(AuthError::InvalidToken);
        }
        self.sessions.revoke(refresh)?;
        info!(user = %principal.id(), "logout");
        Ok(())
    }

    /// Resolve a bearer access token to a principal.
    pub fn authenticate_bearer(&self, token: &str) -> AuthResult<Principal> {
        let user_id = self.sessions.resolve_access(token)?;
        self.principal_for(user_id)
    }

    /// Load a user with its store and role, re-checking account state.
    pub fn principal_for(&self, user_id: UserId) -> AuthResult<Principal> {
        let user = self
            .store
            .get_user(user_id)?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::failed("User is inactive"));
        }
        self.principal_from_user(user)
    }

    fn principal_from_user(&self, user: User) -> AuthResult<Principal> {
        let store = match user.store {
            Some(id) => self.store.get_store(id)?,
            None => None,
        };
        let role = match user.role {
            Some(id) => self.store.get_role(id)?,
            None => None,
        };
        if !user.is_superuser {
            match &store {
                None => return Err(AuthError::failed("User not assigned to any store")),
                Some(s) if !s.is_active => {
                    return Err(AuthError::failed("Store is inactive, contact admin"))
                }
                Some(_) => {}
            }
            if role.is_none() {
                return Err(AuthError::failed("User has no role assigned"));
            }
        }
        Ok(Principal { user, store, role })
    }

    /// Apply a profile edit. With `partial == false` the name is required.
    pub fn update_profile(
        &self,
        principal: &Principal,
        update: ProfileUpdate,
        partial: bool,
    ) -> AuthResult<User> {
        let mut user = principal.user.clone();
        let mut errors = FieldErrors::new();
        match update.name.as_deref().map(str::trim) {
            Some(name) => {
                check_name(name, &mut errors);
                user.name = name.to_string();
            }
            None if !partial => errors.add("name", REQUIRED),
            None => {}
        }
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone.trim().to_string()).filter(|p| !p.is_empty());
        }
        if let Some(bio) = update.bio {
            user.bio = Some(bio).filter(|b| !b.trim().is_empty());
        }
        user.updated_at = Utc::now();
        self.store.update_user(&user)?;
        Ok(user)
    }
}
