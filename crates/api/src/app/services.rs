use std::sync::Arc;

use anyhow::Context;

use stockroom_store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore};

/// Shared application services: the store handle injected into handlers.
///
/// The store is passed explicitly (no process-wide singleton), so tests can
/// wire isolated instances.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn InventoryStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn InventoryStore {
        self.store.as_ref()
    }
}

/// Select the store implementation from the environment.
///
/// `USE_PERSISTENT_STORES=true` requires `DATABASE_URL` and applies the
/// schema migrations on startup; anything else wires the in-memory store
/// (dev/test).
pub async fn build_services() -> anyhow::Result<AppServices> {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
        let store = PostgresInventoryStore::connect(&database_url).await?;
        store.run_migrations().await?;
        tracing::info!("using postgres inventory store");
        return Ok(AppServices::new(Arc::new(store)));
    }

    tracing::info!("using in-memory inventory store");
    Ok(AppServices::new(Arc::new(InMemoryInventoryStore::new())))
}
