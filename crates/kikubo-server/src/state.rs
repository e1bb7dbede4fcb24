use std::sync::Arc;

use kikubo_auth::{AccountService, SessionRegistry, TokenConfig};
use kikubo_reports::ReportService;
use kikubo_store::PosStore;
use kikubo_sync::{BulkSyncEngine, SyncConfig};

use crate::config::ServerConfig;

/// Shared state handed to every handler.
pub struct AppState {
    pub db: Arc<dyn PosStore>,
    pub accounts: AccountService,
    pub sync: BulkSyncEngine,
    pub reports: ReportService,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(db: Arc<dyn PosStore>, config: ServerConfig) -> Self {
        let tokens = TokenConfig::from_secs(config.access_token_ttl_secs, config.refresh_token_ttl_secs);
        let sessions = Arc::new(SessionRegistry::new(tokens));
        Self {
            accounts: AccountService::new(db.clone(), sessions),
            sync: BulkSyncEngine::with_default_checks(
                db.clone(),
                SyncConfig {
                    max_batch: config.max_sync_batch,
                },
            ),
            reports: ReportService::new(db.clone()),
            db,
            config,
        }
    }
}

pub type SharedState = Arc<AppState>;
