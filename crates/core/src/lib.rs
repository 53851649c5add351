//! Draft/live staging for CMS content items.
//!
//! Items are edited as a draft record and promoted to a live record on
//! publish. [`versioning::StagingService`] drives the transitions,
//! [`slug`] keeps URL segments unique across drafts, [`permissions`] resolves
//! who may view, publish or unpublish, and [`duplication`] copies items into
//! new drafts. Persistence sits behind [`store::StagingStore`].

pub mod actions;
pub mod actor;
pub mod config;
pub mod duplication;
pub mod error;
pub mod extensions;
pub mod item;
pub mod links;
pub mod locks;
pub mod memory_store;
pub mod permissions;
pub mod slug;
pub mod store;
pub mod types;
pub mod versioning;

pub use error::{CoreError, CoreResult};
pub use item::{ContentItem, ItemStatus, Stage};
pub use store::{StagingStore, StoreError};
pub use versioning::StagingService;
