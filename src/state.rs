use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AppConfig, StoreBackend};
use crate::identity::{jwt::JwtKeys, IdentityService, StoreIdentity};
use crate::store::{DocumentStore, MemoryDocumentStore, PgDocumentStore, UnavailableStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityService>,
    /// Decided once at start-up; `false` puts register/login in mock mode.
    pub store_available: bool,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (store, store_available): (Arc<dyn DocumentStore>, bool) = match config.store_backend {
            StoreBackend::Memory => {
                info!("using in-memory document store");
                (Arc::new(MemoryDocumentStore::new()), true)
            }
            StoreBackend::Postgres => match config.database_url.as_deref() {
                Some(url) => match connect_postgres(url).await {
                    Ok(store) => (Arc::new(store), true),
                    Err(e) => {
                        warn!(error = %e, "document store unreachable; running in mock mode");
                        (Arc::new(UnavailableStore), false)
                    }
                },
                None => {
                    warn!("DATABASE_URL not set; running in mock mode");
                    (Arc::new(UnavailableStore), false)
                }
            },
        };

        Ok(Self::from_parts(config, store, store_available))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn DocumentStore>,
        store_available: bool,
    ) -> Self {
        let identity = Arc::new(StoreIdentity::new(
            store.clone(),
            JwtKeys::from(&config.jwt),
        )) as Arc<dyn IdentityService>;
        Self {
            config,
            store,
            identity,
            store_available,
        }
    }

    /// In-memory store, store available.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::test()),
            Arc::new(MemoryDocumentStore::new()),
            true,
        )
    }

    /// No reachable store: mock mode.
    #[cfg(test)]
    pub fn fake_offline() -> Self {
        Self::from_parts(Arc::new(AppConfig::test()), Arc::new(UnavailableStore), false)
    }
}

async fn connect_postgres(url: &str) -> anyhow::Result<PgDocumentStore> {
    let store = PgDocumentStore::connect(url).await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(store.pool()).await {
        warn!(error = %e, "migration failed; continuing");
    }
    store.ping().await?;
    Ok(store)
}
