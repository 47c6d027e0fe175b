use std::sync::Arc;

use crate::config::{AppConfig, JwtConfig};
use crate::store::{MemStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        // Store backends are injected behind the trait; swap in a real
        // document database client here without touching the handlers.
        let store = Arc::new(MemStore::new()) as Arc<dyn Store>;
        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        Self {
            store: Arc::new(MemStore::new()),
            config,
        }
    }
}
