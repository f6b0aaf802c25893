use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::store::{MemoryStore, PgStore, Store};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store = if config.database_url.starts_with("memory://") {
            warn!("using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new()) as Arc<dyn Store>
        } else {
            Arc::new(PgStore::connect(&config.database_url).await?) as Arc<dyn Store>
        };

        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let keys = JwtKeys::new(&config.jwt);
        Self {
            store,
            config: Arc::new(config),
            keys,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig {
            database_url: "memory://".into(),
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                algorithm: jsonwebtoken::Algorithm::HS256,
                ttl_minutes: 5,
            },
        };
        Self::from_parts(Arc::new(MemoryStore::new()), config)
    }
}
