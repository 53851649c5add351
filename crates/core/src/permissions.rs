//! Permission cascade resolution.
//!
//! Each decision is resolved in a fixed order and the first decisive rule
//! wins:
//!
//! | Decision               | 1. override | 2.                              | 3.                          | 4.    |
//! |------------------------|-------------|---------------------------------|-----------------------------|-------|
//! | `can_view`             | extension   | draft item on draft stage needs `VIEW_DRAFT_CONTENT` | container view decision | allow |
//! | `can_publish`          | extension   | administrators allowed          | `can_edit`                  |       |
//! | `can_delete_from_live` | extension   | `can_publish`                   |                             |       |
//!
//! Reordering these rules changes who may publish or unpublish.

use std::sync::Arc;

use crate::actor::{
    Actor, CurrentActorProvider, PERMISSION_ADMIN, PERMISSION_CREATE_CONTENT,
    PERMISSION_DELETE_CONTENT, PERMISSION_EDIT_CONTENT, PERMISSION_VIEW_DRAFT_CONTENT,
};
use crate::extensions::{Capability, ExtensionRegistry};
use crate::item::{ContentItem, ItemStatus, Stage};

// ---------------------------------------------------------------------------
// Authority
// ---------------------------------------------------------------------------

/// The hosting application's base capabilities and the listing container's
/// view policy.
pub trait Authority: Send + Sync {
    fn can_edit(&self, actor: &Actor, item: &ContentItem) -> bool;

    fn can_delete(&self, actor: &Actor, item: &ContentItem) -> bool {
        self.can_edit(actor, item)
    }

    fn can_create(&self, actor: &Actor) -> bool {
        actor.is_authenticated()
    }

    fn is_administrator(&self, actor: &Actor) -> bool {
        actor.has_permission(PERMISSION_ADMIN)
    }

    /// The listing container's view decision, or `None` if it has no policy.
    fn container_can_view(&self, _actor: &Actor) -> Option<bool> {
        None
    }
}

/// An [`Authority`] driven purely by actor permission codes.
#[derive(Debug, Clone, Default)]
pub struct CodeAuthority {
    /// Fixed container view decision, if the container defines one.
    pub container_view: Option<bool>,
}

impl Authority for CodeAuthority {
    fn can_edit(&self, actor: &Actor, _item: &ContentItem) -> bool {
        actor.has_permission(PERMISSION_EDIT_CONTENT)
    }

    fn can_delete(&self, actor: &Actor, _item: &ContentItem) -> bool {
        actor.has_permission(PERMISSION_DELETE_CONTENT)
    }

    fn can_create(&self, actor: &Actor) -> bool {
        actor.has_permission(PERMISSION_CREATE_CONTENT)
    }

    fn container_can_view(&self, _actor: &Actor) -> Option<bool> {
        self.container_view
    }
}

// ---------------------------------------------------------------------------
// PermissionResolver
// ---------------------------------------------------------------------------

/// Resolves permission decisions for an explicit or ambient actor.
#[derive(Clone)]
pub struct PermissionResolver {
    authority: Arc<dyn Authority>,
    actors: Arc<dyn CurrentActorProvider>,
    extensions: Arc<ExtensionRegistry>,
}

impl PermissionResolver {
    pub fn new(
        authority: Arc<dyn Authority>,
        actors: Arc<dyn CurrentActorProvider>,
        extensions: Arc<ExtensionRegistry>,
    ) -> Self {
        Self {
            authority,
            actors,
            extensions,
        }
    }

    /// The supplied actor, else the ambient one, else an anonymous actor.
    pub fn resolve_actor(&self, actor: Option<&Actor>) -> Actor {
        match actor {
            Some(actor) => actor.clone(),
            None => self.actors.current_actor().unwrap_or_else(Actor::anonymous),
        }
    }

    pub fn can_view(&self, actor: Option<&Actor>, item: &ContentItem, stage: Stage) -> bool {
        let actor = self.resolve_actor(actor);
        if let Some(decision) = self
            .extensions
            .resolve_override(Capability::View, &actor, item)
        {
            trace_decision(Capability::View, item, decision, "extension override");
            return decision;
        }

        if stage == Stage::Draft && item.status == ItemStatus::Draft {
            let decision = actor.has_permission(PERMISSION_VIEW_DRAFT_CONTENT);
            trace_decision(Capability::View, item, decision, "draft content permission");
            return decision;
        }

        if let Some(decision) = self.authority.container_can_view(&actor) {
            trace_decision(Capability::View, item, decision, "container policy");
            return decision;
        }

        true
    }

    pub fn can_edit(&self, actor: Option<&Actor>, item: &ContentItem) -> bool {
        let actor = self.resolve_actor(actor);
        self.authority.can_edit(&actor, item)
    }

    pub fn can_delete(&self, actor: Option<&Actor>, item: &ContentItem) -> bool {
        let actor = self.resolve_actor(actor);
        self.authority.can_delete(&actor, item)
    }

    pub fn can_create(&self, actor: Option<&Actor>) -> bool {
        let actor = self.resolve_actor(actor);
        self.authority.can_create(&actor)
    }

    pub fn can_publish(&self, actor: Option<&Actor>, item: &ContentItem) -> bool {
        let actor = self.resolve_actor(actor);
        self.can_publish_as(&actor, item)
    }

    pub fn can_delete_from_live(&self, actor: Option<&Actor>, item: &ContentItem) -> bool {
        let actor = self.resolve_actor(actor);
        if let Some(decision) =
            self.extensions
                .resolve_override(Capability::DeleteFromLive, &actor, item)
        {
            trace_decision(Capability::DeleteFromLive, item, decision, "extension override");
            return decision;
        }
        self.can_publish_as(&actor, item)
    }

    fn can_publish_as(&self, actor: &Actor, item: &ContentItem) -> bool {
        if let Some(decision) = self
            .extensions
            .resolve_override(Capability::Publish, actor, item)
        {
            trace_decision(Capability::Publish, item, decision, "extension override");
            return decision;
        }

        if self.authority.is_administrator(actor) {
            trace_decision(Capability::Publish, item, true, "administrator");
            return true;
        }

        let decision = self.authority.can_edit(actor, item);
        trace_decision(Capability::Publish, item, decision, "edit permission");
        decision
    }
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

fn trace_decision(capability: Capability, item: &ContentItem, decision: bool, rule: &str) {
    tracing::debug!(item_id = item.id, %capability, decision, rule, "Permission resolved");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
