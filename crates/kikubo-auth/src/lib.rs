//! Accounts, sessions and access policy for the Kikubo POS backend.
//!
//! - [`AccountService`]: register, login, refresh, logout, profile edits
//! - [`SessionRegistry`]: opaque bearer access/refresh tokens with rotation
//! - [`Principal`]: the authenticated caller with its store and role
//! - [`policy`]: [`Action`]s and the rules that allow or deny them
//! - [`AuthProvider`]: the async seam the HTTP layer authenticates through

pub mod account;
pub mod error;
pub mod password;
pub mod policy;
pub mod principal;
pub mod provider;
pub mod token;

pub use account::{
    AccountService, NewAccount, ProfileUpdate, RegisterRequest, Registration, Session,
};
pub use error::{AuthError, AuthResult};
pub use password::{hash_password, verify_password};
pub use policy::{authorize, is_allowed, Action};
pub use principal::Principal;
pub use provider::{AuthProvider, Credentials};
pub use token::{SessionRegistry, TokenConfig, TokenPair};
