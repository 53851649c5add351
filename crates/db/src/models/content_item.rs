//! Content item rows, shared by the draft (`content_items`) and live
//! (`content_items_live`) tables.

use pagestage_core::item::{ContentItem, ItemStatus};
use pagestage_core::store::StoreError;
use pagestage_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from `content_items` or `content_items_live`.
#[derive(Debug, Clone, FromRow)]
pub struct ContentItemRow {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub content: String,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ContentItemRow> for ContentItem {
    type Error = StoreError;

    fn try_from(row: ContentItemRow) -> Result<Self, Self::Error> {
        let status = ItemStatus::from_str(&row.status)
            .map_err(|e| StoreError::Decode(format!("content item {}: {e}", row.id)))?;
        let mut item = ContentItem::blank(row.id).with_stored_meta_title(row.meta_title);
        item.title = row.title;
        item.slug = row.slug;
        item.status = status;
        item.meta_description = row.meta_description;
        item.content = row.content;
        item.version = row.version;
        item.created_at = row.created_at;
        item.updated_at = row.updated_at;
        Ok(item)
    }
}
