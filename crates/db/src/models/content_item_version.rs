//! Version history rows.
//!
//! Versions are immutable snapshots of a draft, created on every draft write.

use pagestage_core::item::ItemStatus;
use pagestage_core::store::{StoreError, VersionSnapshot};
use pagestage_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `content_item_versions` table.
#[derive(Debug, Clone, FromRow)]
pub struct ContentItemVersionRow {
    pub record_id: DbId,
    pub version: i32,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub content: String,
    pub created_at: Timestamp,
}

impl TryFrom<ContentItemVersionRow> for VersionSnapshot {
    type Error = StoreError;

    fn try_from(row: ContentItemVersionRow) -> Result<Self, Self::Error> {
        let status = ItemStatus::from_str(&row.status).map_err(|e| {
            StoreError::Decode(format!(
                "version {} of content item {}: {e}",
                row.version, row.record_id
            ))
        })?;
        Ok(Self {
            record_id: row.record_id,
            version: row.version,
            title: row.title,
            slug: row.slug,
            status,
            meta_title: row.meta_title,
            meta_description: row.meta_description,
            content: row.content,
            created_at: row.created_at,
        })
    }
}
