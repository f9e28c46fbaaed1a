//! Persistence backends for Codeweaver.
//!
//! Both implement `codeweaver_core::GenerationStore`. [`open`] picks one
//! from the `[storage]` config section.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use codeweaver_config::StorageConfig;
use codeweaver_core::error::StoreError;
use codeweaver_core::store::GenerationStore;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// `database_url` value that selects [`InMemoryStore`].
pub const IN_MEMORY_URL: &str = "memory";

/// Open the store described by `config`.
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn GenerationStore>, StoreError> {
    if config.database_url == IN_MEMORY_URL {
        tracing::warn!("Using the in-memory store; generations will not survive a restart");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    #[cfg(feature = "sqlite")]
    {
        let store = SqliteStore::new(&config.database_url, config.max_connections).await?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "sqlite"))]
    Err(StoreError::Unavailable(format!(
        "'{}' needs the sqlite feature",
        config.database_url
    )))
}
