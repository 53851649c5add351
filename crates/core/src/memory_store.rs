//! In-process [`StagingStore`] used by tests and embedded hosts.
//!
//! All state sits behind one mutex, so every method is trivially atomic.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::item::ContentItem;
use crate::store::{StagingStore, StoreError, StoreResult, VersionSnapshot};
use crate::types::DbId;

#[derive(Debug, Default)]
struct State {
    last_id: DbId,
    draft: BTreeMap<DbId, ContentItem>,
    live: BTreeMap<DbId, ContentItem>,
    history: BTreeMap<DbId, Vec<VersionSnapshot>>,
}

impl State {
    fn slug_holder(&self, slug: &str, exclude_id: DbId) -> Option<&ContentItem> {
        self.draft
            .values()
            .find(|item| item.id != exclude_id && item.slug == slug)
    }

    /// Write a draft at `max(history) + 1` and append its snapshot.
    fn write_draft(&mut self, item: &ContentItem) -> StoreResult<ContentItem> {
        if self.slug_holder(&item.slug, item.id).is_some() {
            return Err(StoreError::SlugTaken {
                slug: item.slug.clone(),
            });
        }

        let next_version = self
            .history
            .get(&item.id)
            .and_then(|rows| rows.iter().map(|row| row.version).max())
            .unwrap_or(0)
            + 1;
        let created_at = self
            .draft
            .get(&item.id)
            .map_or(item.created_at, |existing| existing.created_at);

        let mut written = item.clone();
        written.version = next_version;
        written.created_at = created_at;
        written.updated_at = Utc::now();

        self.history
            .entry(item.id)
            .or_default()
            .push(VersionSnapshot::of(&written));
        self.draft.insert(item.id, written.clone());
        self.last_id = self.last_id.max(item.id);
        Ok(written)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStagingStore {
    state: Mutex<State>,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
    async fn allocate_id(&self) -> StoreResult<DbId> {
        let mut state = self.lock();
        state.last_id += 1;
        Ok(state.last_id)
    }

    async fn get_draft(&self, id: DbId) -> StoreResult<Option<ContentItem>> {
        Ok(self.lock().draft.get(&id).cloned())
    }

    async fn get_live(&self, id: DbId) -> StoreResult<Option<ContentItem>> {
        Ok(self.lock().live.get(&id).cloned())
    }

    async fn write_draft(&self, item: &ContentItem) -> StoreResult<ContentItem> {
        self.lock().write_draft(item)
    }

    async fn write_live(&self, item: &ContentItem) -> StoreResult<ContentItem> {
        let mut state = self.lock();
        state.live.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn publish(&self, item: &ContentItem) -> StoreResult<ContentItem> {
        let mut state = self.lock();
        let written = state.write_draft(item)?;
        state.live.insert(written.id, written.clone());
        Ok(written)
    }

    async fn delete_draft(&self, id: DbId) -> StoreResult<bool> {
        Ok(self.lock().draft.remove(&id).is_some())
    }

    async fn delete_live(&self, id: DbId) -> StoreResult<bool> {
        Ok(self.lock().live.remove(&id).is_some())
    }

    async fn delete_version_history(&self, id: DbId) -> StoreResult<u64> {
        Ok(self
            .lock()
            .history
            .remove(&id)
            .map_or(0, |rows| rows.len() as u64))
    }

    async fn find_draft_by_slug(
        &self,
        slug: &str,
        exclude_id: DbId,
    ) -> StoreResult<Option<ContentItem>> {
        Ok(self.lock().slug_holder(slug, exclude_id).cloned())
    }

    async fn current_draft_version(&self, id: DbId) -> StoreResult<Option<i32>> {
        Ok(self.lock().draft.get(&id).map(|item| item.version))
    }

    async fn current_live_version(&self, id: DbId) -> StoreResult<Option<i32>> {
        Ok(self.lock().live.get(&id).map(|item| item.version))
    }

    async fn revert_draft_to_live(
        &self,
        id: DbId,
        slug: &str,
    ) -> StoreResult<Option<ContentItem>> {
        let mut state = self.lock();
        let Some(live) = state.live.get(&id).cloned() else {
            return Ok(None);
        };
        let Some(created_at) = state.draft.get(&id).map(|draft| draft.created_at) else {
            return Ok(None);
        };
        if state.slug_holder(slug, id).is_some() {
            return Err(StoreError::SlugTaken {
                slug: slug.to_string(),
            });
        }

        let mut reverted = live;
        reverted.slug = slug.to_string();
        reverted.created_at = created_at;
        reverted.updated_at = Utc::now();
        state.draft.insert(id, reverted.clone());
        Ok(Some(reverted))
    }

    async fn version_history(&self, id: DbId) -> StoreResult<Vec<VersionSnapshot>> {
        Ok(self.lock().history.get(&id).cloned().unwrap_or_default())
    }

    async fn purge(&self, id: DbId) -> StoreResult<bool> {
        let mut state = self.lock();
        state.history.remove(&id);
        Ok(state.draft.remove(&id).is_some())
    }
}
