//! Row types for the staging tables.

pub mod content_item;
pub mod content_item_version;
