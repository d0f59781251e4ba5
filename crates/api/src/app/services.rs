use std::sync::Arc;

use tracing::{info, warn};

use carhub_auth::{FirebaseVerifier, Hs256Verifier, IdentityVerifier};
use carhub_store::{DocumentStore, InMemoryStore, MongoStore, StoreResult};

use crate::config::{AuthConfig, StoreConfig};

/// Shared handles for handlers: the document store, built once at startup.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn DocumentStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub async fn shutdown(&self) {
        info!(backend = self.store.backend(), "closing document store");
        self.store.shutdown().await;
    }
}

pub async fn build_services(config: &StoreConfig) -> StoreResult<AppServices> {
    match config {
        StoreConfig::Mongo { uri, database } => {
            let store = MongoStore::connect(uri, database).await?;
            store.ensure_indexes().await?;
            info!(database = %database, "connected to MongoDB");
            Ok(AppServices::new(Arc::new(store)))
        }
        StoreConfig::Memory => {
            warn!("STORE_BACKEND=memory; data is lost on restart");
            Ok(AppServices::in_memory())
        }
    }
}

pub fn build_verifier(config: &AuthConfig) -> Arc<dyn IdentityVerifier> {
    match config {
        AuthConfig::Firebase { project_id } => {
            info!(project_id = %project_id, "verifying Firebase identity tokens");
            Arc::new(FirebaseVerifier::new(project_id))
        }
        AuthConfig::Hs256 { secret } => {
            if config.uses_dev_secret() {
                warn!("HS256 tokens signed with the dev default secret are accepted");
            }
            Arc::new(Hs256Verifier::new(secret.as_bytes()))
        }
    }
}
