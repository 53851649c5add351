//! Actors and the permission codes the staging core checks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Grants every permission code.
pub const PERMISSION_ADMIN: &str = "ADMIN";

/// Required to view draft-only content on the draft stage.
pub const PERMISSION_VIEW_DRAFT_CONTENT: &str = "VIEW_DRAFT_CONTENT";

/// Edit content items (used by [`CodeAuthority`](crate::permissions::CodeAuthority)).
pub const PERMISSION_EDIT_CONTENT: &str = "EDIT_CONTENT";

/// Create content items.
pub const PERMISSION_CREATE_CONTENT: &str = "CREATE_CONTENT";

/// Delete content items.
pub const PERMISSION_DELETE_CONTENT: &str = "DELETE_CONTENT";

/// Someone performing an operation.
///
/// Anonymous visitors are represented by [`Actor::anonymous`], which has no id
/// and no permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<DbId>,
    pub permissions: BTreeSet<String>,
}

impl Actor {
    /// An authenticated actor with no permissions.
    pub fn new(id: DbId) -> Self {
        Self {
            id: Some(id),
            permissions: BTreeSet::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Grant a permission code.
    pub fn with_permission(mut self, code: impl Into<String>) -> Self {
        self.permissions.insert(code.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }

    /// Whether the actor holds `code`. [`PERMISSION_ADMIN`] implies every code.
    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code) || self.permissions.contains(PERMISSION_ADMIN)
    }
}

/// Supplies the ambient actor when an operation is called without one.
pub trait CurrentActorProvider: Send + Sync {
    fn current_actor(&self) -> Option<Actor>;
}

/// A provider that always returns the same actor.
#[derive(Debug, Clone, Default)]
pub struct FixedActor(pub Option<Actor>);

impl CurrentActorProvider for FixedActor {
    fn current_actor(&self) -> Option<Actor> {
        self.0.clone()
    }
}
