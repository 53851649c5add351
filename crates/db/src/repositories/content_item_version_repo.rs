//! Repository for the `content_item_versions` table.

use pagestage_core::item::ContentItem;
use pagestage_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::content_item_version::ContentItemVersionRow;

/// Column list for content_item_versions queries.
const COLUMNS: &str = "record_id, version, title, slug, status, meta_title, \
    meta_description, content, created_at";

/// Provides append and listing operations for version history.
pub struct ContentItemVersionRepo;

impl ContentItemVersionRepo {
    /// Serialize draft writes for one record until the transaction ends.
    pub async fn lock_record(
        tx: &mut Transaction<'_, Postgres>,
        record_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(record_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// The version number the next draft write for `record_id` receives.
    pub async fn next_version(
        tx: &mut Transaction<'_, Postgres>,
        record_id: DbId,
    ) -> Result<i32, sqlx::Error> {
        let latest = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(version) FROM content_item_versions WHERE record_id = $1",
        )
        .bind(record_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(latest.unwrap_or(0) + 1)
    }

    /// Append a snapshot of a freshly written draft.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        item: &ContentItem,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO content_item_versions
                (record_id, version, title, slug, status, meta_title, meta_description,
                 content, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(item.id)
        .bind(item.version)
        .bind(&item.title)
        .bind(&item.slug)
        .bind(item.status.as_str())
        .bind(item.stored_meta_title())
        .bind(&item.meta_description)
        .bind(&item.content)
        .bind(item.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// History rows for a record, oldest first.
    pub async fn list_for_record(
        pool: &PgPool,
        record_id: DbId,
    ) -> Result<Vec<ContentItemVersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_item_versions
             WHERE record_id = $1
             ORDER BY version ASC"
        );
        sqlx::query_as::<_, ContentItemVersionRow>(&query)
            .bind(record_id)
            .fetch_all(pool)
            .await
    }

    /// Delete every history row of a record.
    pub async fn delete_for_record(pool: &PgPool, record_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM content_item_versions WHERE record_id = $1")
            .bind(record_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every history row of a record inside an open transaction.
    pub async fn delete_for_record_tx(
        tx: &mut Transaction<'_, Postgres>,
        record_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM content_item_versions WHERE record_id = $1")
            .bind(record_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}
