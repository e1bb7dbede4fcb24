//! Opaque bearer sessions.
//!
//! Tokens are 32 random bytes, hex encoded. The registry only keeps a
//! BLAKE3 digest of each token, so a dump of the registry cannot be replayed.
//! Every access token remembers the refresh token it was minted under;
//! rotating or revoking a refresh token drops its access tokens too.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use kikubo_types::UserId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

const TOKEN_BYTES: usize = 32;
/// Upper bound for configured lifetimes (about a century).
const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Lifetimes of issued tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(10),
            refresh_ttl: Duration::days(30),
        }
    }
}

impl TokenConfig {
    pub fn from_secs(access: u64, refresh: u64) -> Self {
        let secs = |v: u64| Duration::seconds(i64::try_from(v).unwrap_or(MAX_TTL_SECS).min(MAX_TTL_SECS));
        Self {
            access_ttl: secs(access),
            refresh_ttl: secs(refresh),
        }
    }
}

/// What the client receives after login or refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Clone, Debug)]
struct AccessEntry {
    user: UserId,
    refresh_digest: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct RefreshEntry {
    user: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Sessions {
    access: HashMap<String, AccessEntry>,
    refresh: HashMap<String, RefreshEntry>,
}

impl Sessions {
    fn drop_refresh(&mut self, refresh_digest: &str) -> Option<RefreshEntry> {
        let entry = self.refresh.remove(refresh_digest)?;
        self.access.retain(|_, a| a.refresh_digest != refresh_digest);
        Some(entry)
    }
}

/// Thread-safe registry of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    config: TokenConfig,
    sessions: RwLock<Sessions>,
}

fn new_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    hex::encode(bytes)
}

fn digest(token: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"kikubo-token-v1:");
    hasher.update(token.as_bytes());
    hasher.finalize().to_hex().to_string()
}

impl SessionRegistry {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(Sessions::default()),
        }
    }

    pub fn config(&self) -> TokenConfig {
        self.config
    }

    fn write(&self) -> AuthResult<RwLockWriteGuard<'_, Sessions>> {
        self.sessions.write().map_err(|_| AuthError::LockPoisoned)
    }

    /// Start a new session for `user`.
    pub fn issue(&self, user: UserId) -> AuthResult<TokenPair> {
        let mut sessions = self.write()?;
        Ok(self.issue_locked(&mut sessions, user))
    }

    fn issue_locked(&self, sessions: &mut Sessions, user: UserId) -> TokenPair {
        let now = Utc::now();
        let pair = TokenPair {
            refresh: new_token(),
            access: new_token(),
        };
        let refresh_digest = digest(&pair.refresh);
        sessions.refresh.insert(
            refresh_digest.clone(),
            RefreshEntry {
                user,
                expires_at: now + self.config.refresh_ttl,
            },
        );
        sessions.access.insert(
            digest(&pair.access),
            AccessEntry {
                user,
                refresh_digest,
                expires_at: now + self.config.access_ttl,
            },
        );
        pair
    }

    /// User behind a live access token.
    pub fn resolve_access(&self, token: &str) -> AuthResult<UserId> {
        let sessions = self.sessions.read().map_err(|_| AuthError::LockPoisoned)?;
        match sessions.access.get(&digest(token)) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(entry.user),
            _ => Err(AuthError::InvalidToken),
        }
    }

    /// User behind a live refresh token, without consuming it.
    pub fn refresh_owner(&self, token: &str) -> AuthResult<UserId> {
        let sessions = self.sessions.read().map_err(|_| AuthError::LockPoisoned)?;
        match sessions.refresh.get(&digest(token)) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(entry.user),
            _ => Err(AuthError::InvalidToken),
        }
    }

    /// Exchange a refresh token for a fresh pair. The old refresh token and
    /// the access tokens minted under it stop working.
    pub fn rotate(&self, refresh: &str) -> AuthResult<(UserId, TokenPair)> {
        let mut sessions = self.write()?;
        let entry = sessions
            .drop_refresh(&digest(refresh))
            .ok_or(AuthError::InvalidToken)?;
        if entry.expires_at <= Utc::now() {
            return Err(AuthError::InvalidToken);
        }
        let pair = self.issue_locked(&mut sessions, entry.user);
        debug!(user = %entry.user, "rotated refresh token");
        Ok((entry.user, pair))
    }

    /// End the session behind `refresh`. Returns the user it belonged to.
    pub fn revoke(&self, refresh: &str) -> AuthResult<UserId> {
        let mut sessions = self.write()?;
        sessions
            .drop_refresh(&digest(refresh))
            .map(|entry| entry.user)
            .ok_or(AuthError::InvalidToken)
    }

    /// Forget expired entries. Returns how many refresh tokens were removed.
    pub fn purge_expired(&self) -> AuthResult<usize> {
        let now = Utc::now();
        let mut sessions = self.write()?;
        let before = sessions.refresh.len();
        sessions.refresh.retain(|_, r| r.expires_at > now);
        sessions.access.retain(|_, a| a.expires_at > now);
        Ok(before - sessions.refresh.len())
    }

    /// Number of live refresh tokens.
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .read()
            .map(|s| s.refresh.len())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_64_hex_chars() {
        let registry = SessionRegistry::default();
        let pair = registry.issue(UserId::new()).unwrap();
        assert_eq!(pair.access.len(), 64);
        assert!(pair.access.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(pair.access, pair.refresh);
    }

    #[test]
    fn access_resolves_to_user() {
        let registry = SessionRegistry::default();
        let user = UserId::new();
        let pair = registry.issue(user).unwrap();
        assert_eq!(registry.resolve_access(&pair.access).unwrap(), user);
        assert!(matches!(
            registry.resolve_access(&pair.refresh),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn rotation_invalidates_old_tokens() {
        let registry = SessionRegistry::default();
        let user = UserId::new();
        let first = registry.issue(user).unwrap();
        let (owner, second) = registry.rotate(&first.refresh).unwrap();
        assert_eq!(owner, user);
        assert!(registry.rotate(&first.refresh).is_err());
        assert!(registry.resolve_access(&first.access).is_err());
        assert_eq!(registry.resolve_access(&second.access).unwrap(), user);
    }

    #[test]
    fn revoke_ends_session() {
        let registry = SessionRegistry::default();
        let pair = registry.issue(UserId::new()).unwrap();
        registry.revoke(&pair.refresh).unwrap();
        assert!(registry.resolve_access(&pair.access).is_err());
        assert!(registry.revoke(&pair.refresh).is_err());
        assert_eq!(registry.active_sessions(), 0);
    }

    #[test]
    fn zero_ttl_tokens_are_expired() {
        let registry = SessionRegistry::new(TokenConfig::from_secs(0, 0));
        let pair = registry.issue(UserId::new()).unwrap();
        assert!(registry.resolve_access(&pair.access).is_err());
        assert!(registry.refresh_owner(&pair.refresh).is_err());
        assert_eq!(registry.purge_expired().unwrap(), 1);
    }
}
