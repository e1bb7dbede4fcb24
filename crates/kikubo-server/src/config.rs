use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use kikubo_store::{InMemoryPosStore, PosStore, SqliteStore};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Where the server keeps its data.
///
/// Written as `"memory"` or `"sqlite:<path>"` in the config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DatabaseConfig {
    Memory,
    Sqlite(PathBuf),
}

impl DatabaseConfig {
    pub fn open(&self) -> ServerResult<Arc<dyn PosStore>> {
        Ok(match self {
            Self::Memory => Arc::new(InMemoryPosStore::new()),
            Self::Sqlite(path) => Arc::new(SqliteStore::open(path)?),
        })
    }
}

impl fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
        }
    }
}

impl FromStr for DatabaseConfig {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("memory") {
            return Ok(Self::Memory);
        }
        match s.strip_prefix("sqlite:") {
            Some(path) if !path.trim().is_empty() => Ok(Self::Sqlite(PathBuf::from(path.trim()))),
            _ => Err(ServerError::Config(format!(
                "database must be \"memory\" or \"sqlite:<path>\", got {s:?}"
            ))),
        }
    }
}

impl TryFrom<String> for DatabaseConfig {
    type Error = ServerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DatabaseConfig> for String {
    fn from(value: DatabaseConfig) -> Self {
        value.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database: DatabaseConfig,
    /// Items per page on paginated lists.
    pub page_size: usize,
    /// Largest accepted bulk sync batch.
    pub max_sync_batch: usize,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    /// Allow cross-origin requests from anywhere.
    pub cors_allow_any: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            database: DatabaseConfig::Memory,
            page_size: 10,
            max_sync_batch: 500,
            access_token_ttl_secs: 10 * 60,
            refresh_token_ttl_secs: 30 * 24 * 60 * 60,
            cors_allow_any: true,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.page_size == 0 {
            return Err(ServerError::Config("page_size must be at least 1".into()));
        }
        if self.max_sync_batch == 0 {
            return Err(ServerError::Config("max_sync_batch must be at least 1".into()));
        }
        if self.access_token_ttl_secs == 0 || self.refresh_token_ttl_secs == 0 {
            return Err(ServerError::Config("token lifetimes must be positive".into()));
        }
        Ok(())
    }
}
