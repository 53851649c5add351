//! Extension hooks: lifecycle handlers, permission overrides and slug updaters.
//!
//! Handlers are kept in registration order per named event. Lifecycle
//! handlers may abort a transition by returning `Err`; they are advisory and
//! never take part in rolling back mutations that were already committed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::error::{CoreError, CoreResult};
use crate::item::{ContentItem, Stage};

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Named extension points fired around state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    BeforePublish,
    AfterPublish,
    BeforeUnpublish,
    AfterUnpublish,
    BeforeDuplicate,
    AfterDuplicate,
    BeforeRevertToLive,
    AfterRevertToLive,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforePublish => "before_publish",
            Self::AfterPublish => "after_publish",
            Self::BeforeUnpublish => "before_unpublish",
            Self::AfterUnpublish => "after_unpublish",
            Self::BeforeDuplicate => "before_duplicate",
            Self::AfterDuplicate => "after_duplicate",
            Self::BeforeRevertToLive => "before_revert_to_live",
            Self::AfterRevertToLive => "after_revert_to_live",
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Permission decisions that extensions may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    View,
    Publish,
    DeleteFromLive,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "can_view",
            Self::Publish => "can_publish",
            Self::DeleteFromLive => "can_delete_from_live",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Handler traits
// ---------------------------------------------------------------------------

/// Context handed to lifecycle handlers alongside the subject item.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub event: LifecycleEvent,
    /// The actor performing the transition, when one was resolved.
    pub actor: Option<Actor>,
    /// Publish: the live copy before publishing (blank if never published).
    /// Duplicate: the source item.
    pub related: Option<ContentItem>,
    /// The active view for stage-sensitive transitions.
    pub stage: Stage,
}

impl HookContext {
    pub fn new(event: LifecycleEvent, stage: Stage) -> Self {
        Self {
            event,
            actor: None,
            related: None,
            stage,
        }
    }

    pub fn with_actor(mut self, actor: Option<Actor>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_related(mut self, related: ContentItem) -> Self {
        self.related = Some(related);
        self
    }
}

/// A handler fired at a [`LifecycleEvent`].
///
/// Returning `Err` aborts the enclosing transition.
pub trait LifecycleHook: Send + Sync {
    fn apply(&self, item: &ContentItem, ctx: &HookContext) -> Result<(), String>;
}

impl<F> LifecycleHook for F
where
    F: Fn(&ContentItem, &HookContext) -> Result<(), String> + Send + Sync,
{
    fn apply(&self, item: &ContentItem, ctx: &HookContext) -> Result<(), String> {
        self(item, ctx)
    }
}

/// A handler that may decide a [`Capability`] outright.
///
/// `None` defers to the next handler and finally to the built-in rules.
pub trait PermissionOverride: Send + Sync {
    fn can_override(&self, actor: &Actor, item: &ContentItem) -> Option<bool>;
}

impl<F> PermissionOverride for F
where
    F: Fn(&Actor, &ContentItem) -> Option<bool> + Send + Sync,
{
    fn can_override(&self, actor: &Actor, item: &ContentItem) -> Option<bool> {
        self(actor, item)
    }
}

/// Rewrites a slug generated from a title. Receives the original title.
pub trait SlugUpdater: Send + Sync {
    fn update_slug(&self, slug: &mut String, title: &str);
}

impl<F> SlugUpdater for F
where
    F: Fn(&mut String, &str) + Send + Sync,
{
    fn update_slug(&self, slug: &mut String, title: &str) {
        self(slug, title)
    }
}

// ---------------------------------------------------------------------------
// ExtensionRegistry
// ---------------------------------------------------------------------------

/// Ordered handler lists per named event.
#[derive(Default)]
pub struct ExtensionRegistry {
    lifecycle: HashMap<LifecycleEvent, Vec<Arc<dyn LifecycleHook>>>,
    overrides: HashMap<Capability, Vec<Arc<dyn PermissionOverride>>>,
    slug_updaters: Vec<Arc<dyn SlugUpdater>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lifecycle handler. Handlers run in registration order.
    pub fn on<H>(&mut self, event: LifecycleEvent, hook: H) -> &mut Self
    where
        H: LifecycleHook + 'static,
    {
        self.lifecycle.entry(event).or_default().push(Arc::new(hook));
        self
    }

    /// Register a permission override for `capability`.
    pub fn override_capability<O>(&mut self, capability: Capability, handler: O) -> &mut Self
    where
        O: PermissionOverride + 'static,
    {
        self.overrides
            .entry(capability)
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Register a slug updater.
    pub fn on_update_slug<U>(&mut self, updater: U) -> &mut Self
    where
        U: SlugUpdater + 'static,
    {
        self.slug_updaters.push(Arc::new(updater));
        self
    }

    /// Fire every handler registered for `ctx.event`, stopping at the first error.
    pub fn fire(&self, item: &ContentItem, ctx: &HookContext) -> CoreResult<()> {
        let Some(hooks) = self.lifecycle.get(&ctx.event) else {
            return Ok(());
        };
        for hook in hooks {
            hook.apply(item, ctx).map_err(|message| {
                tracing::warn!(item_id = item.id, event = %ctx.event, %message, "Extension hook failed");
                CoreError::Hook {
                    event: ctx.event,
                    message,
                }
            })?;
        }
        Ok(())
    }

    /// The first definite answer from the overrides for `capability`.
    pub fn resolve_override(
        &self,
        capability: Capability,
        actor: &Actor,
        item: &ContentItem,
    ) -> Option<bool> {
        self.overrides
            .get(&capability)?
            .iter()
            .find_map(|handler| handler.can_override(actor, item))
    }

    /// Pass a generated slug through every registered updater.
    pub fn update_slug(&self, slug: &mut String, title: &str) {
        for updater in &self.slug_updaters {
            updater.update_slug(slug, title);
        }
    }

    pub fn hook_count(&self, event: LifecycleEvent) -> usize {
        self.lifecycle.get(&event).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("lifecycle_events", &self.lifecycle.len())
            .field("overrides", &self.overrides.len())
            .field("slug_updaters", &self.slug_updaters.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;
    use crate::config::StagingConfig;

    fn item() -> ContentItem {
        ContentItem::new(7, &StagingConfig::default())
    }

    #[test]
    fn handlers_fire_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        for name in ["first", "second"] {
            let log = Arc::clone(&log);
            registry.on(
                LifecycleEvent::AfterPublish,
                move |_: &ContentItem, _: &HookContext| {
                    log.lock().unwrap().push(name);
                    Ok(())
                },
            );
        }

        assert_eq!(registry.hook_count(LifecycleEvent::AfterPublish), 2);
        assert_eq!(registry.hook_count(LifecycleEvent::BeforePublish), 0);

        let ctx = HookContext::new(LifecycleEvent::AfterPublish, Stage::Draft);
        registry.fire(&item(), &ctx).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn failing_handler_stops_the_chain() {
        let calls = Arc::new(Mutex::new(0));
        let mut registry = ExtensionRegistry::new();
        registry.on(
            LifecycleEvent::BeforePublish,
            |_: &ContentItem, _: &HookContext| Err("embargoed".to_string()),
        );
        let counter = Arc::clone(&calls);
        registry.on(
            LifecycleEvent::BeforePublish,
            move |_: &ContentItem, _: &HookContext| {
                *counter.lock().unwrap() += 1;
                Ok(())
            },
        );

        let ctx = HookContext::new(LifecycleEvent::BeforePublish, Stage::Draft);
        let err = registry.fire(&item(), &ctx).unwrap_err();
        assert_matches!(
            err,
            CoreError::Hook { event: LifecycleEvent::BeforePublish, ref message } if message == "embargoed"
        );
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn first_definite_override_wins() {
        let mut registry = ExtensionRegistry::new();
        registry
            .override_capability(Capability::Publish, |_: &Actor, _: &ContentItem| None)
            .override_capability(Capability::Publish, |_: &Actor, _: &ContentItem| {
                Some(false)
            })
            .override_capability(Capability::Publish, |_: &Actor, _: &ContentItem| {
                Some(true)
            });

        assert_eq!(
            registry.resolve_override(Capability::Publish, &Actor::anonymous(), &item()),
            Some(false)
        );
        assert_eq!(
            registry.resolve_override(Capability::View, &Actor::anonymous(), &item()),
            None
        );
    }

    #[test]
    fn slug_updaters_chain() {
        let mut registry = ExtensionRegistry::new();
        registry
            .on_update_slug(|slug: &mut String, _: &str| slug.push_str("-en"))
            .on_update_slug(|slug: &mut String, title: &str| {
                if title.starts_with("Draft") {
                    slug.insert_str(0, "wip-");
                }
            });

        let mut slug = "draft-notes".to_string();
        registry.update_slug(&mut slug, "Draft notes");
        assert_eq!(slug, "wip-draft-notes-en");
    }
}
