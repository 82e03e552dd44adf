//! Local recipe persistence.
//!
//! The orchestrator only talks to storage through [`LocalStore`]. The SQLite
//! implementation lives in the application crate; [`MemoryStore`] backs tests
//! and ephemeral sessions.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use parking_lot::Mutex;

use crate::models::{Recipe, SyncStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Recipe not found: {0}")]
    NotFound(i64),
    #[error("Local store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StoreError::Backend(error.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait LocalStore: Send + Sync {
    fn get_all(&self) -> impl Future<Output = StoreResult<Vec<Recipe>>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = StoreResult<Option<Recipe>>> + Send;

    /// Inserts or replaces by id, assigning a fresh id when the record has
    /// none. Returns the id the record was stored under.
    fn insert(&self, recipe: &Recipe) -> impl Future<Output = StoreResult<i64>> + Send;

    /// Deleting a record that is not stored is a no-op.
    fn delete(&self, recipe: &Recipe) -> impl Future<Output = StoreResult<()>> + Send;

    /// Sets the sync status of one record without touching its content or
    /// timestamp. `error` is kept alongside for `Error` and cleared otherwise.
    fn update_sync_status(
        &self,
        id: i64,
        status: SyncStatus,
        synced_at: i64,
        error: Option<&str>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn get_by_sync_status(
        &self,
        status: SyncStatus,
    ) -> impl Future<Output = StoreResult<Vec<Recipe>>> + Send;

    /// Remembers a local delete the server has not confirmed yet.
    fn add_tombstone(&self, id: i64) -> impl Future<Output = StoreResult<()>> + Send;

    fn tombstones(&self) -> impl Future<Output = StoreResult<Vec<i64>>> + Send;

    fn remove_tombstone(&self, id: i64) -> impl Future<Output = StoreResult<()>> + Send;
}

#[derive(Debug, Clone)]
struct StoredRecipe {
    recipe: Recipe,
    last_sync_at: Option<i64>,
    sync_error: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    recipes: BTreeMap<i64, StoredRecipe>,
    tombstones: BTreeSet<i64>,
    next_id: i64,
}

/// In-process [`LocalStore`]. Ids start at 1 and never go backwards.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded push error for a record.
    pub fn sync_error(&self, id: i64) -> Option<String> {
        let state = self.state.lock();
        state.recipes.get(&id).and_then(|r| r.sync_error.clone())
    }

    pub fn last_sync_at(&self, id: i64) -> Option<i64> {
        let state = self.state.lock();
        state.recipes.get(&id).and_then(|r| r.last_sync_at)
    }
}

impl LocalStore for MemoryStore {
    async fn get_all(&self) -> StoreResult<Vec<Recipe>> {
        let state = self.state.lock();
        Ok(state.recipes.values().map(|r| r.recipe.clone()).collect())
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Recipe>> {
        let state = self.state.lock();
        Ok(state.recipes.get(&id).map(|r| r.recipe.clone()))
    }

    async fn insert(&self, recipe: &Recipe) -> StoreResult<i64> {
        let mut state = self.state.lock();
        let id = match recipe.id {
            Some(id) => id,
            None => state.next_id.max(1),
        };
        state.next_id = state.next_id.max(id.saturating_add(1));

        let last_sync_at = state.recipes.get(&id).and_then(|r| r.last_sync_at);
        state.recipes.insert(
            id,
            StoredRecipe {
                recipe: Recipe {
                    id: Some(id),
                    ..recipe.clone()
                },
                last_sync_at,
                sync_error: None,
            },
        );
        Ok(id)
    }

    async fn delete(&self, recipe: &Recipe) -> StoreResult<()> {
        if let Some(id) = recipe.id {
            self.state.lock().recipes.remove(&id);
        }
        Ok(())
    }

    async fn update_sync_status(
        &self,
        id: i64,
        status: SyncStatus,
        synced_at: i64,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        let stored = state.recipes.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        stored.recipe.sync_status = status;
        stored.last_sync_at = Some(synced_at);
        stored.sync_error = match status {
            SyncStatus::Error => error.map(str::to_string),
            _ => None,
        };
        Ok(())
    }

    async fn get_by_sync_status(&self, status: SyncStatus) -> StoreResult<Vec<Recipe>> {
        let state = self.state.lock();
        Ok(state
            .recipes
            .values()
            .filter(|r| r.recipe.sync_status == status)
            .map(|r| r.recipe.clone())
            .collect())
    }

    async fn add_tombstone(&self, id: i64) -> StoreResult<()> {
        self.state.lock().tombstones.insert(id);
        Ok(())
    }

    async fn tombstones(&self) -> StoreResult<Vec<i64>> {
        Ok(self.state.lock().tombstones.iter().copied().collect())
    }

    async fn remove_tombstone(&self, id: i64) -> StoreResult<()> {
        self.state.lock().tombstones.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new();

        let first = store.insert(&Recipe::new("A", "a")).await.unwrap();
        let second = store.insert(&Recipe::new("B", "b")).await.unwrap();

        assert_eq!((first, second), (1, 2));
        let stored = store.get_by_id(2).await.unwrap().unwrap();
        assert_eq!(stored.id, Some(2));
        assert_eq!(stored.title, "B");
    }

    #[tokio::test]
    async fn test_insert_with_id_replaces_and_advances_counter() {
        let store = MemoryStore::new();
        store
            .insert(&Recipe::new("Remote", "r").with_id(10))
            .await
            .unwrap();
        store
            .insert(&Recipe::new("Remote v2", "r").with_id(10))
            .await
            .unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Remote v2");

        let next = store.insert(&Recipe::new("Local", "l")).await.unwrap();
        assert_eq!(next, 11);
    }

    #[tokio::test]
    async fn test_insert_with_largest_id() {
        let store = MemoryStore::new();

        let id = store
            .insert(&Recipe::new("A", "a").with_id(i64::MAX))
            .await
            .unwrap();

        assert_eq!(id, i64::MAX);
        assert!(store.get_by_id(i64::MAX).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_sync_status_keeps_content() {
        let store = MemoryStore::new();
        let id = store
            .insert(&Recipe::new("A", "a").with_timestamp(77))
            .await
            .unwrap();

        store
            .update_sync_status(id, SyncStatus::Error, 1000, Some("conflict"))
            .await
            .unwrap();

        let stored = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Error);
        assert_eq!(stored.timestamp, 77);
        assert_eq!(store.sync_error(id).as_deref(), Some("conflict"));
        assert_eq!(store.last_sync_at(id), Some(1000));

        store
            .update_sync_status(id, SyncStatus::Synced, 2000, None)
            .await
            .unwrap();
        assert_eq!(store.sync_error(id), None);
    }

    #[tokio::test]
    async fn test_update_sync_status_of_missing_record() {
        let store = MemoryStore::new();
        let err = store
            .update_sync_status(99, SyncStatus::Synced, 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(99)));
    }

    #[tokio::test]
    async fn test_get_by_sync_status_filters() {
        let store = MemoryStore::new();
        store.insert(&Recipe::new("P", "p")).await.unwrap();
        store
            .insert(&Recipe::new("S", "s").with_sync_status(SyncStatus::Synced))
            .await
            .unwrap();

        let pending = store.get_by_sync_status(SyncStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "P");
    }

    #[tokio::test]
    async fn test_delete_and_tombstones() {
        let store = MemoryStore::new();
        let id = store.insert(&Recipe::new("A", "a")).await.unwrap();
        let recipe = store.get_by_id(id).await.unwrap().unwrap();

        store.delete(&recipe).await.unwrap();
        store.delete(&recipe).await.unwrap();
        assert!(store.get_by_id(id).await.unwrap().is_none());

        store.add_tombstone(id).await.unwrap();
        store.add_tombstone(id).await.unwrap();
        assert_eq!(store.tombstones().await.unwrap(), vec![id]);

        store.remove_tombstone(id).await.unwrap();
        assert!(store.tombstones().await.unwrap().is_empty());
    }
}
