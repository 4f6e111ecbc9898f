//! Book record store: owner-scoped document access and its lifecycle module.
//!
//! Every lookup, update and delete takes the owner id alongside the record id,
//! so a record owned by someone else is indistinguishable from a missing one.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use shelf_kernel::{settings::DatabaseSettings, InitCtx, Module};
use thiserror::Error;

mod memory;
mod record;

pub use memory::InMemoryBookStore;
pub use record::{BookChanges, BookRecord, NewBookRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot I/O failed for {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot is not valid JSON")]
    Snapshot(#[from] serde_json::Error),
}

/// Owner-scoped access to book documents.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All records of `owner_id`, most recently updated first.
    async fn find_many_by_owner(&self, owner_id: &str) -> Result<Vec<BookRecord>, StoreError>;

    async fn find_one(&self, id: &str, owner_id: &str) -> Result<Option<BookRecord>, StoreError>;

    async fn create(&self, record: NewBookRecord) -> Result<BookRecord, StoreError>;

    /// `Ok(None)` when no record with `id` belongs to `owner_id`.
    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        changes: BookChanges,
    ) -> Result<Option<BookRecord>, StoreError>;

    /// `Ok(false)` when no record with `id` belongs to `owner_id`.
    async fn delete(&self, id: &str, owner_id: &str) -> Result<bool, StoreError>;
}

/// Open the store described by the database settings.
pub async fn open(settings: &DatabaseSettings) -> Result<InMemoryBookStore, StoreError> {
    match &settings.snapshot_path {
        Some(path) => InMemoryBookStore::open(path.clone()).await,
        None => {
            tracing::info!(target: "shelf-db", "no snapshot path configured, books live in memory only");
            Ok(InMemoryBookStore::in_memory())
        }
    }
}

/// Core module owning the store's lifecycle; flushes the snapshot on stop.
pub struct StoreModule {
    store: Arc<InMemoryBookStore>,
}

impl StoreModule {
    pub fn new(store: Arc<InMemoryBookStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for StoreModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.store.len().await;
        tracing::info!(
            module = self.name(),
            books,
            snapshot = ?self.store.snapshot_path(),
            "book store ready"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.store.flush().await?;
        tracing::info!(module = self.name(), "book store flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_kernel::settings::Settings;

    #[tokio::test]
    async fn open_without_path_is_memory_only() {
        let store = open(&DatabaseSettings::default()).await.unwrap();
        assert!(store.snapshot_path().is_none());
        store.flush().await.unwrap();
    }

    #[tokio::test]
    async fn module_stop_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("books.json");
        let settings = DatabaseSettings {
            snapshot_path: Some(path.clone()),
        };
        let store = Arc::new(open(&settings).await.unwrap());
        let module = StoreModule::new(store);

        let app_settings = Settings::default();
        module
            .init(&InitCtx {
                settings: &app_settings,
            })
            .await
            .unwrap();
        module.stop().await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn module_init_runs_on_a_spawned_task() {
        let store = Arc::new(InMemoryBookStore::in_memory());
        let module = StoreModule::new(store);

        let handle = tokio::spawn(async move {
            let settings = Settings::default();
            module.init(&InitCtx::new(&settings)).await
        });
        handle.await.unwrap().unwrap();
    }
}
