// src/infrastructure/database.rs
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::tenant::{ConnectionDescriptor, ProviderKind};
use crate::infrastructure::persistence::error::{map_migrate, map_sqlx};
use sqlx::{AnyPool, any::AnyPoolOptions};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OnceCell};

const DEFAULT_MAX_CONNECTIONS: u32 = 16;

pub async fn init_pool(descriptor: &ConnectionDescriptor, max_connections: u32) -> DomainResult<AnyPool> {
    sqlx::any::install_default_drivers();

    AnyPoolOptions::new()
        .max_connections(max_connections)
        .connect(descriptor.url())
        .await
        .map_err(map_sqlx)
}

pub async fn run_migrations(pool: &AnyPool, provider: ProviderKind) -> DomainResult<()> {
    match provider {
        ProviderKind::Sqlite => sqlx::migrate!("./migrations/sqlite").run(pool).await,
        ProviderKind::Postgres => sqlx::migrate!("./migrations/postgres").run(pool).await,
    }
    .map_err(map_migrate)
}

/// Process-wide cache of one pool per connection string. The first request for
/// a tenant database connects and migrates it.
///
/// The map lock only guards the lookup. Connecting happens inside the per-URL
/// cell, so a slow database stalls requests for that URL and nothing else.
#[derive(Clone)]
pub struct PoolRegistry {
    pools: Arc<Mutex<HashMap<String, Arc<OnceCell<AnyPool>>>>>,
    max_connections: u32,
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}

impl PoolRegistry {
    pub fn new(max_connections: u32) -> Self {
        Self {
            pools: Arc::new(Mutex::new(HashMap::new())),
            max_connections: max_connections.max(1),
        }
    }

    pub async fn pool_for(&self, descriptor: &ConnectionDescriptor) -> DomainResult<AnyPool> {
        let cell = {
            let mut pools = self.pools.lock().await;
            Arc::clone(pools.entry(descriptor.url().to_string()).or_default())
        };

        // A failed connect leaves the cell empty and the next caller retries.
        let pool = cell
            .get_or_try_init(|| async {
                let pool = init_pool(descriptor, self.max_connections).await?;
                run_migrations(&pool, descriptor.provider()).await?;
                tracing::info!(provider = %descriptor.provider(), "opened tenant database pool");
                Ok::<_, DomainError>(pool)
            })
            .await?;
        Ok(pool.clone())
    }

    pub async fn close_all(&self) {
        let cells: Vec<Arc<OnceCell<AnyPool>>> =
            self.pools.lock().await.drain().map(|(_, cell)| cell).collect();
        for cell in cells {
            if let Some(pool) = cell.get() {
                pool.close().await;
            }
        }
    }
}
