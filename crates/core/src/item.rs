//! The versioned content item and its status enums.
//!
//! A [`ContentItem`] exists as one draft record and at most one live record,
//! both keyed by the same `id`. The enums here describe which copy a caller is
//! reading ([`Stage`]), what the item stores about itself ([`ItemStatus`]),
//! and what the two stores imply together ([`ItemState`], [`DisplayStatus`]).

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::StagingConfig;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Which record set a read targets.
///
/// Passed explicitly on every call that depends on it; there is no ambient
/// reading mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Draft,
    Live,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Live => "live",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// The stored status marker of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Draft,
    Published,
}

impl ItemStatus {
    /// Return the wire-format string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    /// Parse from a wire-format string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            _ => Err(CoreError::Validation(format!(
                "Invalid status: '{s}'. Must be one of: draft, published"
            ))),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ItemState / DisplayStatus
// ---------------------------------------------------------------------------

/// Lifecycle state derived from the draft and live stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    DraftOnly,
    Published,
    PublishedWithDraftChanges,
    /// No draft record exists (deleted, or never created).
    Deleted,
}

impl ItemState {
    /// Derive the state from the current version pointers of both stores.
    pub fn from_versions(draft_version: Option<i32>, live_version: Option<i32>) -> Self {
        match (draft_version, live_version) {
            (None, _) => Self::Deleted,
            (Some(_), None) => Self::DraftOnly,
            (Some(draft), Some(live)) if live < draft => Self::PublishedWithDraftChanges,
            (Some(_), Some(_)) => Self::Published,
        }
    }

    /// Status shown to operators, or `None` for deleted items.
    pub fn display_status(&self) -> Option<DisplayStatus> {
        match self {
            Self::DraftOnly => Some(DisplayStatus::Draft),
            Self::Published => Some(DisplayStatus::Published),
            Self::PublishedWithDraftChanges => Some(DisplayStatus::PublishedChanged),
            Self::Deleted => None,
        }
    }
}

/// Operator-facing status label. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Draft,
    Published,
    PublishedChanged,
}

impl DisplayStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
            Self::PublishedChanged => "Published (changed)",
        }
    }
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

/// A content item as read from (or about to be written to) one of the stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub status: ItemStatus,
    /// Stored meta title; `None` whenever it would repeat `title`.
    meta_title: Option<String>,
    pub meta_description: Option<String>,
    /// Opaque rich-text payload.
    pub content: String,
    /// Version pointer of the record in the store it was read from.
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContentItem {
    /// A never-saved item carrying the configured defaults.
    pub fn new(id: DbId, config: &StagingConfig) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: config.default_title.clone(),
            slug: config.default_slug.clone(),
            status: ItemStatus::Draft,
            meta_title: None,
            meta_description: None,
            content: String::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Empty placeholder used as the "previous live copy" of never-published items.
    pub fn blank(id: DbId) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: String::new(),
            slug: String::new(),
            status: ItemStatus::Draft,
            meta_title: None,
            meta_description: None,
            content: String::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Meta title, falling back to the title when none is stored.
    pub fn meta_title(&self) -> &str {
        self.meta_title.as_deref().unwrap_or(&self.title)
    }

    /// Set the meta title. A value equal to the title is stored as `None`.
    pub fn set_meta_title(&mut self, value: Option<String>) {
        self.meta_title = value.filter(|v| !v.is_empty() && *v != self.title);
    }

    /// The raw stored meta title, for persistence layers.
    pub fn stored_meta_title(&self) -> Option<&str> {
        self.meta_title.as_deref()
    }

    /// Restore the raw stored meta title as read from a store.
    pub fn with_stored_meta_title(mut self, stored: Option<String>) -> Self {
        self.meta_title = stored;
        self
    }

    /// Menu title; always the title.
    pub fn menu_title(&self) -> &str {
        &self.title
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for creating a new content item.
#[derive(Debug, Default, Deserialize)]
pub struct NewContentItem {
    /// Defaults to the configured default title if `None`.
    pub title: Option<String>,
    /// Auto-generated from title if `None`.
    pub slug: Option<String>,
    pub content: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// DTO for editing a draft. Only non-`None` fields are applied.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateContentItem {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

impl UpdateContentItem {
    /// Apply the present fields to `item`.
    pub fn apply_to(&self, item: &mut ContentItem) -> Result<(), CoreError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
            item.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            item.slug = slug.clone();
        }
        if let Some(content) = &self.content {
            item.content = content.clone();
        }
        if let Some(meta_title) = &self.meta_title {
            item.set_meta_title(Some(meta_title.clone()));
        }
        if let Some(meta_description) = &self.meta_description {
            item.meta_description = Some(meta_description.clone()).filter(|d| !d.is_empty());
        }
        Ok(())
    }
}

/// Maximum title length, matching the `VARCHAR(255)` title column.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Validate an item title (non-empty, <= 255 chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
