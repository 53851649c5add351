//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction) as the first argument.

pub mod content_item_repo;
pub mod content_item_version_repo;

pub use content_item_repo::ContentItemRepo;
pub use content_item_version_repo::ContentItemVersionRepo;
