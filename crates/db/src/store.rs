//! Postgres-backed [`StagingStore`].
//!
//! Each trait method maps onto one repository call or one transaction, so the
//! atomicity rules of the trait hold across processes sharing the database.

use async_trait::async_trait;
use pagestage_core::item::ContentItem;
use pagestage_core::store::{StagingStore, StoreError, StoreResult, VersionSnapshot};
use pagestage_core::types::DbId;

use sqlx::{Postgres, Transaction};

use crate::repositories::{ContentItemRepo, ContentItemVersionRepo};
use crate::DbPool;

/// PostgreSQL unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Unique constraint on draft slugs.
const SLUG_CONSTRAINT: &str = "uq_content_items_slug";

#[derive(Debug, Clone)]
pub struct PgStagingStore {
    pool: DbPool,
}

impl PgStagingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl StagingStore for PgStagingStore {
    async fn allocate_id(&self) -> StoreResult<DbId> {
        ContentItemRepo::next_id(&self.pool).await.map_err(backend)
    }

    async fn get_draft(&self, id: DbId) -> StoreResult<Option<ContentItem>> {
        let row = ContentItemRepo::find_draft(&self.pool, id)
            .await
            .map_err(backend)?;
        row.map(ContentItem::try_from).transpose()
    }

    async fn get_live(&self, id: DbId) -> StoreResult<Option<ContentItem>> {
        let row = ContentItemRepo::find_live(&self.pool, id)
            .await
            .map_err(backend)?;
        row.map(ContentItem::try_from).transpose()
    }

    async fn write_draft(&self, item: &ContentItem) -> StoreResult<ContentItem> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let written = write_draft_tx(&mut tx, item).await?;
        tx.commit().await.map_err(backend)?;
        Ok(written)
    }

    async fn write_live(&self, item: &ContentItem) -> StoreResult<ContentItem> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let row = ContentItemRepo::upsert_live(&mut tx, item)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        ContentItem::try_from(row)
    }

    async fn publish(&self, item: &ContentItem) -> StoreResult<ContentItem> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let written = write_draft_tx(&mut tx, item).await?;
        ContentItemRepo::upsert_live(&mut tx, &written)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        tracing::debug!(item_id = written.id, version = written.version, "Published draft and live copy");
        Ok(written)
    }

    async fn delete_draft(&self, id: DbId) -> StoreResult<bool> {
        ContentItemRepo::delete_draft(&self.pool, id)
            .await
            .map_err(backend)
    }

    async fn delete_live(&self, id: DbId) -> StoreResult<bool> {
        ContentItemRepo::delete_live(&self.pool, id)
            .await
            .map_err(backend)
    }

    async fn delete_version_history(&self, id: DbId) -> StoreResult<u64> {
        ContentItemVersionRepo::delete_for_record(&self.pool, id)
            .await
            .map_err(backend)
    }

    async fn find_draft_by_slug(
        &self,
        slug: &str,
        exclude_id: DbId,
    ) -> StoreResult<Option<ContentItem>> {
        let row = ContentItemRepo::find_draft_by_slug(&self.pool, slug, exclude_id)
            .await
            .map_err(backend)?;
        row.map(ContentItem::try_from).transpose()
    }

    async fn current_draft_version(&self, id: DbId) -> StoreResult<Option<i32>> {
        ContentItemRepo::draft_version(&self.pool, id)
            .await
            .map_err(backend)
    }

    async fn current_live_version(&self, id: DbId) -> StoreResult<Option<i32>> {
        ContentItemRepo::live_version(&self.pool, id)
            .await
            .map_err(backend)
    }

    async fn revert_draft_to_live(
        &self,
        id: DbId,
        slug: &str,
    ) -> StoreResult<Option<ContentItem>> {
        let row = ContentItemRepo::revert_draft_to_live(&self.pool, id, slug)
            .await
            .map_err(|err| slug_conflict(err, slug))?;
        row.map(ContentItem::try_from).transpose()
    }

    async fn version_history(&self, id: DbId) -> StoreResult<Vec<VersionSnapshot>> {
        ContentItemVersionRepo::list_for_record(&self.pool, id)
            .await
            .map_err(backend)?
            .into_iter()
            .map(VersionSnapshot::try_from)
            .collect()
    }

    async fn purge(&self, id: DbId) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let versions = ContentItemVersionRepo::delete_for_record_tx(&mut tx, id)
            .await
            .map_err(backend)?;
        let removed = ContentItemRepo::delete_draft_tx(&mut tx, id)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        tracing::debug!(item_id = id, versions, removed, "Purged draft and history");
        Ok(removed)
    }
}

/// Write the draft at the next version and append its history row.
///
/// The advisory lock serializes version allocation for one record across
/// processes until the transaction ends.
async fn write_draft_tx(
    tx: &mut Transaction<'_, Postgres>,
    item: &ContentItem,
) -> StoreResult<ContentItem> {
    ContentItemVersionRepo::lock_record(tx, item.id)
        .await
        .map_err(backend)?;
    let version = ContentItemVersionRepo::next_version(tx, item.id)
        .await
        .map_err(backend)?;
    let row = ContentItemRepo::upsert_draft(tx, item, version)
        .await
        .map_err(|err| slug_conflict(err, &item.slug))?;
    let written = ContentItem::try_from(row)?;
    ContentItemVersionRepo::create(tx, &written)
        .await
        .map_err(backend)?;
    Ok(written)
}

fn is_slug_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_err.constraint() == Some(SLUG_CONSTRAINT)
        }
        _ => false,
    }
}

fn slug_conflict(err: sqlx::Error, slug: &str) -> StoreError {
    if is_slug_conflict(&err) {
        StoreError::SlugTaken {
            slug: slug.to_string(),
        }
    } else {
        backend(err)
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Database error");
    StoreError::Backend(err.to_string())
}
