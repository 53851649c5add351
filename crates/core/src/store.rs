//! The staging store: draft records, live records and version history.
//!
//! Implementations must make each method atomic on its own. In particular
//! [`StagingStore::write_draft`] enforces slug uniqueness at commit time,
//! [`StagingStore::publish`] commits the draft write and the live copy
//! together, [`StagingStore::revert_draft_to_live`] never exposes a
//! half-copied record, and [`StagingStore::purge`] removes history and draft
//! in one unit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::item::{ContentItem, ItemStatus};
use crate::types::{DbId, Timestamp};

/// Errors raised by staging store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another draft record already holds this slug.
    #[error("Slug '{slug}' is already taken")]
    SlugTaken { slug: String },

    /// The backing store failed (connection, transaction, I/O).
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A stored row could not be turned back into a content item.
    #[error("Corrupt record: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One row of version history, written on every draft write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub record_id: DbId,
    pub version: i32,
    pub title: String,
    pub slug: String,
    pub status: ItemStatus,
    /// Stored meta title; `None` means it follows the title.
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub content: String,
    pub created_at: Timestamp,
}

impl VersionSnapshot {
    pub fn of(item: &ContentItem) -> Self {
        Self {
            record_id: item.id,
            version: item.version,
            title: item.title.clone(),
            slug: item.slug.clone(),
            status: item.status,
            meta_title: item.stored_meta_title().map(str::to_string),
            meta_description: item.meta_description.clone(),
            content: item.content.clone(),
            created_at: item.updated_at,
        }
    }
}

#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Reserve a fresh item id.
    async fn allocate_id(&self) -> StoreResult<DbId>;

    async fn get_draft(&self, id: DbId) -> StoreResult<Option<ContentItem>>;

    async fn get_live(&self, id: DbId) -> StoreResult<Option<ContentItem>>;

    /// Insert or update the draft record and append a history snapshot.
    ///
    /// The written record receives version `max(history) + 1`, which is
    /// returned along with store-assigned timestamps. Fails with
    /// [`StoreError::SlugTaken`] if another draft holds `item.slug`.
    async fn write_draft(&self, item: &ContentItem) -> StoreResult<ContentItem>;

    /// Insert or replace the live record with `item`, version included.
    async fn write_live(&self, item: &ContentItem) -> StoreResult<ContentItem>;

    /// Write the draft exactly like [`StagingStore::write_draft`] and copy the
    /// written record to the live stage, all in one unit.
    ///
    /// On any failure neither the draft, the history nor the live record
    /// changes.
    async fn publish(&self, item: &ContentItem) -> StoreResult<ContentItem>;

    /// Returns `true` if a draft record was removed.
    async fn delete_draft(&self, id: DbId) -> StoreResult<bool>;

    /// Returns `true` if a live record was removed.
    async fn delete_live(&self, id: DbId) -> StoreResult<bool>;

    /// Returns the number of history rows removed.
    async fn delete_version_history(&self, id: DbId) -> StoreResult<u64>;

    /// A draft record other than `exclude_id` holding `slug`.
    async fn find_draft_by_slug(
        &self,
        slug: &str,
        exclude_id: DbId,
    ) -> StoreResult<Option<ContentItem>>;

    async fn current_draft_version(&self, id: DbId) -> StoreResult<Option<i32>>;

    async fn current_live_version(&self, id: DbId) -> StoreResult<Option<i32>>;

    /// Overwrite the draft record with the live one, version pointer included,
    /// without appending history. The draft takes `slug` instead of the live
    /// slug. `None` if either record is missing; [`StoreError::SlugTaken`] if
    /// another draft holds `slug`.
    async fn revert_draft_to_live(
        &self,
        id: DbId,
        slug: &str,
    ) -> StoreResult<Option<ContentItem>>;

    /// History rows for `id`, oldest first.
    async fn version_history(&self, id: DbId) -> StoreResult<Vec<VersionSnapshot>>;

    /// Remove version history and the draft record.
    ///
    /// The default runs the two deletes back to back; transactional stores
    /// should override it so readers never see a partial purge.
    async fn purge(&self, id: DbId) -> StoreResult<bool> {
        self.delete_version_history(id).await?;
        self.delete_draft(id).await
    }
}
