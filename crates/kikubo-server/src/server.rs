use std::sync::Arc;

use kikubo_store::PosStore;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::{AppState, SharedState};

/// Kikubo POS API server.
pub struct KikuboServer {
    state: SharedState,
}

impl KikuboServer {
    /// Open the configured database and build the shared state.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let db = config.database.open()?;
        Ok(Self::with_store(config, db))
    }

    /// Serve an already opened store.
    pub fn with_store(config: ServerConfig, db: Arc<dyn PosStore>) -> Self {
        Self {
            state: Arc::new(AppState::new(db, config)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let addr = self.state.config.bind_addr;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, database = %self.state.config.database, "Kikubo POS server listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    #[test]
    fn server_construction() {
        let server = KikuboServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(server.state().sync.config().max_batch, 500);
    }

    #[test]
    fn opens_sqlite_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            database: DatabaseConfig::Sqlite(dir.path().join("pos.db")),
            ..ServerConfig::default()
        };
        let server = KikuboServer::new(config).unwrap();
        server.state().db.ping().unwrap();
        let _router = server.router();
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ServerConfig {
            page_size: 0,
            ..ServerConfig::default()
        };
        assert!(KikuboServer::new(config).is_err());
    }
}
