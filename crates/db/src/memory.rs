use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{BookChanges, BookRecord, BookStore, NewBookRecord, StoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    revision: u64,
    books: Vec<BookRecord>,
}

#[derive(Debug, Default)]
struct StoreState {
    revision: u64,
    books: HashMap<String, BookRecord>,
}

impl StoreState {
    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn owned_mut(&mut self, id: &str, owner_id: &str) -> Option<&mut BookRecord> {
        self.books
            .get_mut(id)
            .filter(|record| record.owner_id == owner_id)
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut books: Vec<BookRecord> = self.books.values().cloned().collect();
        books.sort_by_key(|record| record.revision);
        Snapshot {
            revision: self.revision,
            books,
        }
    }
}

/// Document store keeping every book in memory.
///
/// With a snapshot path the whole document set is rewritten to disk after each
/// mutation (and on [`InMemoryBookStore::flush`]), and reloaded on open.
#[derive(Debug, Default)]
pub struct InMemoryBookStore {
    state: RwLock<StoreState>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryBookStore {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by a JSON snapshot; a missing file means an empty store.
    pub async fn open(snapshot_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = snapshot_path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        // A hand-edited snapshot may carry a stale counter.
        let max_revision = snapshot.books.iter().map(|r| r.revision).max().unwrap_or(0);
        let state = StoreState {
            revision: snapshot.revision.max(max_revision),
            books: snapshot
                .books
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        };

        tracing::info!(
            path = %path.display(),
            books = state.books.len(),
            "book store snapshot loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.books.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Write the current document set to the snapshot file, if any.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let state = self.state.read().await;
        self.persist(&state).await
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(&state.to_snapshot())?;
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        tracing::debug!(path = %path.display(), revision = state.revision, "book store snapshot written");
        Ok(())
    }

    /// Persist a mutation already applied to `state`. When the snapshot
    /// cannot be written, `undo` reverts the documents and the revision
    /// counter goes back to `revision`, so a failed call changes nothing.
    async fn commit<F>(&self, state: &mut StoreState, revision: u64, undo: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut HashMap<String, BookRecord>) + Send,
    {
        if let Err(err) = self.persist(state).await {
            undo(&mut state.books);
            state.revision = revision;
            tracing::warn!(error = %err, "book store mutation rolled back");
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn find_many_by_owner(&self, owner_id: &str) -> Result<Vec<BookRecord>, StoreError> {
        let state = self.state.read().await;
        let mut books: Vec<BookRecord> = state
            .books
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        books.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.revision.cmp(&a.revision))
        });
        Ok(books)
    }

    async fn find_one(&self, id: &str, owner_id: &str) -> Result<Option<BookRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .books
            .get(id)
            .filter(|record| record.owner_id == owner_id)
            .cloned())
    }

    async fn create(&self, new: NewBookRecord) -> Result<BookRecord, StoreError> {
        let mut state = self.state.write().await;
        let now = OffsetDateTime::now_utc();
        let record = BookRecord {
            id: Uuid::now_v7().to_string(),
            owner_id: new.owner_id,
            title: new.title,
            author: new.author,
            description: new.description,
            price: new.price,
            published_at: new.published_at,
            created_at: now,
            updated_at: now,
            revision: state.next_revision(),
        };
        state.books.insert(record.id.clone(), record.clone());

        let id = record.id.clone();
        self.commit(&mut state, record.revision - 1, move |books| {
            books.remove(&id);
        })
        .await?;
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        changes: BookChanges,
    ) -> Result<Option<BookRecord>, StoreError> {
        let mut state = self.state.write().await;
        if state.owned_mut(id, owner_id).is_none() {
            return Ok(None);
        }
        if changes.is_empty() {
            return Ok(state.books.get(id).cloned());
        }

        let previous_revision = state.revision;
        let revision = state.next_revision();
        let Some(record) = state.owned_mut(id, owner_id) else {
            return Ok(None);
        };
        let original = record.clone();
        changes.apply_to(record);
        record.updated_at = OffsetDateTime::now_utc();
        record.revision = revision;
        let updated = record.clone();

        self.commit(&mut state, previous_revision, move |books| {
            books.insert(original.id.clone(), original);
        })
        .await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.owned_mut(id, owner_id).is_none() {
            return Ok(false);
        }
        let previous_revision = state.revision;
        let Some(removed) = state.books.remove(id) else {
            return Ok(false);
        };
        state.next_revision();

        self.commit(&mut state, previous_revision, move |books| {
            books.insert(removed.id.clone(), removed);
        })
        .await?;
        Ok(true)
    }
}
