//! Repository for the `content_items` (draft) and `content_items_live` tables.

use pagestage_core::item::ContentItem;
use pagestage_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::content_item::ContentItemRow;

/// Column list shared by both stage tables.
const COLUMNS: &str = "id, title, slug, status, meta_title, meta_description, \
    content, version, created_at, updated_at";

/// Draft columns qualified with the `d` alias, for joined updates.
const DRAFT_COLUMNS: &str = "d.id, d.title, d.slug, d.status, d.meta_title, \
    d.meta_description, d.content, d.version, d.created_at, d.updated_at";

const DRAFT_TABLE: &str = "content_items";
const LIVE_TABLE: &str = "content_items_live";

/// Provides reads and writes for draft and live records.
pub struct ContentItemRepo;

impl ContentItemRepo {
    /// Reserve the next item id.
    pub async fn next_id(pool: &PgPool) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT nextval('content_items_id_seq')")
            .fetch_one(pool)
            .await
    }

    pub async fn find_draft(pool: &PgPool, id: DbId) -> Result<Option<ContentItemRow>, sqlx::Error> {
        Self::find_in(pool, DRAFT_TABLE, id).await
    }

    pub async fn find_live(pool: &PgPool, id: DbId) -> Result<Option<ContentItemRow>, sqlx::Error> {
        Self::find_in(pool, LIVE_TABLE, id).await
    }

    /// Find a draft other than `exclude_id` holding `slug`.
    pub async fn find_draft_by_slug(
        pool: &PgPool,
        slug: &str,
        exclude_id: DbId,
    ) -> Result<Option<ContentItemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {DRAFT_TABLE} WHERE slug = $1 AND id <> $2");
        sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(slug)
            .bind(exclude_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn draft_version(pool: &PgPool, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        Self::version_in(pool, DRAFT_TABLE, id).await
    }

    pub async fn live_version(pool: &PgPool, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        Self::version_in(pool, LIVE_TABLE, id).await
    }

    /// Insert or update the draft record at `version`.
    ///
    /// `created_at` is only written on insert.
    pub async fn upsert_draft(
        tx: &mut Transaction<'_, Postgres>,
        item: &ContentItem,
        version: i32,
    ) -> Result<ContentItemRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO {DRAFT_TABLE}
                (id, title, slug, status, meta_title, meta_description, content, version, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                slug = EXCLUDED.slug,
                status = EXCLUDED.status,
                meta_title = EXCLUDED.meta_title,
                meta_description = EXCLUDED.meta_description,
                content = EXCLUDED.content,
                version = EXCLUDED.version,
                updated_at = now()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(item.id)
            .bind(&item.title)
            .bind(&item.slug)
            .bind(item.status.as_str())
            .bind(item.stored_meta_title())
            .bind(&item.meta_description)
            .bind(&item.content)
            .bind(version)
            .bind(item.created_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Insert or replace the live record with an exact copy of `item`.
    pub async fn upsert_live(
        tx: &mut Transaction<'_, Postgres>,
        item: &ContentItem,
    ) -> Result<ContentItemRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO {LIVE_TABLE}
                (id, title, slug, status, meta_title, meta_description, content, version,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                slug = EXCLUDED.slug,
                status = EXCLUDED.status,
                meta_title = EXCLUDED.meta_title,
                meta_description = EXCLUDED.meta_description,
                content = EXCLUDED.content,
                version = EXCLUDED.version,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(item.id)
            .bind(&item.title)
            .bind(&item.slug)
            .bind(item.status.as_str())
            .bind(item.stored_meta_title())
            .bind(&item.meta_description)
            .bind(&item.content)
            .bind(item.version)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Copy the live record over the draft in one statement, version
    /// included, giving the draft `slug`. Returns `None` if either record is
    /// missing.
    pub async fn revert_draft_to_live(
        pool: &PgPool,
        id: DbId,
        slug: &str,
    ) -> Result<Option<ContentItemRow>, sqlx::Error> {
        let query = format!(
            "UPDATE {DRAFT_TABLE} d SET
                title = l.title,
                slug = $2,
                status = l.status,
                meta_title = l.meta_title,
                meta_description = l.meta_description,
                content = l.content,
                version = l.version,
                updated_at = now()
             FROM {LIVE_TABLE} l
             WHERE d.id = $1 AND l.id = d.id
             RETURNING {DRAFT_COLUMNS}"
        );
        sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(id)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Delete a draft record. Returns `true` if a row was removed.
    pub async fn delete_draft(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!("DELETE FROM {DRAFT_TABLE} WHERE id = $1"))
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a draft record inside an open transaction.
    pub async fn delete_draft_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!("DELETE FROM {DRAFT_TABLE} WHERE id = $1"))
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a live record. Returns `true` if a row was removed.
    pub async fn delete_live(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!("DELETE FROM {LIVE_TABLE} WHERE id = $1"))
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_in(
        pool: &PgPool,
        table: &str,
        id: DbId,
    ) -> Result<Option<ContentItemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {table} WHERE id = $1");
        sqlx::query_as::<_, ContentItemRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    async fn version_in(pool: &PgPool, table: &str, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        let query = format!("SELECT version FROM {table} WHERE id = $1");
        sqlx::query_scalar::<_, i32>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
