//! The staged-versioning state machine.
//!
//! [`StagingService`] owns the collaborators every transition needs and runs
//! save / publish / unpublish / revert / delete against a [`StagingStore`].
//!
//! Permission failures return `Ok(false)` and leave both the
//! store and the caller's item untouched. Store failures and hook failures
//! propagate as errors. A failing hook aborts the transition before any
//! further store write, but writes already committed in that transition are
//! not rolled back: hooks are advisory, not transaction participants.

use std::sync::Arc;

use crate::actor::{Actor, CurrentActorProvider};
use crate::config::StagingConfig;
use crate::error::{CoreError, CoreResult};
use crate::extensions::{ExtensionRegistry, HookContext, LifecycleEvent};
use crate::item::{
    validate_title, ContentItem, DisplayStatus, ItemState, ItemStatus, NewContentItem, Stage,
};
use crate::locks::EntityLocks;
use crate::permissions::{Authority, PermissionResolver};
use crate::slug;
use crate::store::{StagingStore, StoreError, VersionSnapshot};
use crate::types::DbId;

pub struct StagingService {
    pub(crate) store: Arc<dyn StagingStore>,
    pub(crate) permissions: PermissionResolver,
    pub(crate) extensions: Arc<ExtensionRegistry>,
    pub(crate) config: StagingConfig,
    pub(crate) locks: EntityLocks,
}

impl StagingService {
    pub fn new(
        store: Arc<dyn StagingStore>,
        authority: Arc<dyn Authority>,
        actors: Arc<dyn CurrentActorProvider>,
        extensions: Arc<ExtensionRegistry>,
        config: StagingConfig,
    ) -> Self {
        let permissions = PermissionResolver::new(authority, actors, Arc::clone(&extensions));
        Self {
            store,
            permissions,
            extensions,
            config,
            locks: EntityLocks::new(),
        }
    }

    pub fn permissions(&self) -> &PermissionResolver {
        &self.permissions
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn StagingStore {
        self.store.as_ref()
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Read an item from the given stage.
    pub async fn load(&self, id: DbId, stage: Stage) -> CoreResult<Option<ContentItem>> {
        let item = match stage {
            Stage::Draft => self.store.get_draft(id).await?,
            Stage::Live => self.store.get_live(id).await?,
        };
        Ok(item)
    }

    /// Read an item from the given stage or fail with `NotFound`.
    pub async fn require(&self, id: DbId, stage: Stage) -> CoreResult<ContentItem> {
        self.load(id, stage).await?.ok_or(CoreError::NotFound {
            entity: "content_item",
            id,
        })
    }

    pub async fn is_published(&self, id: DbId) -> CoreResult<bool> {
        Ok(self.store.current_live_version(id).await?.is_some())
    }

    /// Whether the draft holds changes that are not live yet.
    pub async fn has_changes_on_stage(&self, id: DbId) -> CoreResult<bool> {
        let draft = self.store.current_draft_version(id).await?;
        let live = self.store.current_live_version(id).await?;
        Ok(ItemState::from_versions(draft, live) == ItemState::PublishedWithDraftChanges)
    }

    pub async fn state(&self, id: DbId) -> CoreResult<ItemState> {
        let draft = self.store.current_draft_version(id).await?;
        let live = self.store.current_live_version(id).await?;
        Ok(ItemState::from_versions(draft, live))
    }

    pub async fn display_status(&self, id: DbId) -> CoreResult<Option<DisplayStatus>> {
        Ok(self.state(id).await?.display_status())
    }

    pub async fn version_history(&self, id: DbId) -> CoreResult<Vec<VersionSnapshot>> {
        Ok(self.store.version_history(id).await?)
    }

    // ── Create / save ────────────────────────────────────────────────

    /// Create and save a new draft-only item.
    pub async fn create(&self, input: NewContentItem) -> CoreResult<ContentItem> {
        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        let id = self.store.allocate_id().await?;
        let mut item = ContentItem::new(id, &self.config);
        if let Some(title) = input.title {
            item.title = title;
        }
        if let Some(slug) = input.slug {
            item.slug = slug;
        }
        if let Some(content) = input.content {
            item.content = content;
        }
        item.set_meta_title(input.meta_title);
        item.meta_description = input.meta_description.filter(|d| !d.is_empty());

        let _guard = self.locks.acquire(id).await;
        let saved = self.write_draft(item).await?;
        tracing::info!(item_id = saved.id, slug = %saved.slug, "Item created");
        Ok(saved)
    }

    /// Persist the draft fields of `item`, advancing its draft version.
    ///
    /// On success `item` is replaced by the stored record (new version,
    /// resolved slug). Fails with `NotFound` once the draft record is gone:
    /// a deleted item is never brought back by a stale copy.
    pub async fn save(&self, item: &mut ContentItem) -> CoreResult<()> {
        validate_title(&item.title)?;
        let _guard = self.locks.acquire(item.id).await;
        if self.store.current_draft_version(item.id).await?.is_none() {
            return Err(CoreError::NotFound {
                entity: "content_item",
                id: item.id,
            });
        }
        *item = self.write_draft(item.clone()).await?;
        Ok(())
    }

    /// Resolve the slug and write the draft, inserting it if it is new.
    pub(crate) async fn write_draft(&self, item: ContentItem) -> CoreResult<ContentItem> {
        self.commit_draft(item, false).await
    }

    /// Resolve the slug and write the draft, retrying while another writer
    /// claims the chosen slug first. With `publish` the live copy is written
    /// in the same store call.
    async fn commit_draft(&self, mut item: ContentItem, publish: bool) -> CoreResult<ContentItem> {
        let persisted_slug = self.store.get_draft(item.id).await?.map(|draft| draft.slug);
        let candidate = slug::candidate_slug(
            &item,
            persisted_slug.as_deref(),
            &self.config,
            &self.extensions,
        );

        loop {
            item.slug = slug::resolve_unique(self.store.as_ref(), &candidate, item.id).await?;
            let written = if publish {
                self.store.publish(&item).await
            } else {
                self.store.write_draft(&item).await
            };
            match written {
                Ok(saved) => {
                    tracing::debug!(item_id = saved.id, version = saved.version, slug = %saved.slug, publish, "Draft written");
                    return Ok(saved);
                }
                Err(StoreError::SlugTaken { slug }) => {
                    tracing::warn!(item_id = item.id, slug = %slug, "Slug claimed concurrently, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    // ── Publish ──────────────────────────────────────────────────────

    /// Save the draft and copy it to the live store.
    ///
    /// Returns `Ok(false)` without side effects if the item has no draft
    /// record (never saved, or deleted) or the actor may not publish.
    pub async fn publish(&self, item: &mut ContentItem, actor: Option<&Actor>) -> CoreResult<bool> {
        validate_title(&item.title)?;
        let _guard = self.locks.acquire(item.id).await;
        if self.store.current_draft_version(item.id).await?.is_none() {
            tracing::info!(item_id = item.id, "Publish skipped, item has no draft record");
            return Ok(false);
        }
        if !self.permissions.can_publish(actor, item) {
            tracing::info!(item_id = item.id, "Publish denied");
            return Ok(false);
        }

        let actor = Some(self.permissions.resolve_actor(actor));
        let original = self
            .store
            .get_live(item.id)
            .await?
            .unwrap_or_else(|| ContentItem::blank(item.id));

        let before = HookContext::new(LifecycleEvent::BeforePublish, Stage::Draft)
            .with_actor(actor.clone())
            .with_related(original.clone());
        self.extensions.fire(item, &before)?;

        let mut draft = item.clone();
        draft.status = ItemStatus::Published;
        *item = self.commit_draft(draft, true).await?;
        tracing::info!(item_id = item.id, version = item.version, slug = %item.slug, "Item published");

        let after = HookContext::new(LifecycleEvent::AfterPublish, Stage::Draft)
            .with_actor(actor)
            .with_related(original);
        self.extensions.fire(item, &after)?;
        Ok(true)
    }

    // ── Unpublish ────────────────────────────────────────────────────

    /// Remove the live copy.
    ///
    /// `view` is the stage the caller is working in. The draft status is only
    /// reset when working in the draft stage, so a live-stage caller never
    /// resurrects a record. Returns `Ok(false)` if the store holds no draft
    /// record for the item or the actor may not delete from live.
    pub async fn unpublish(
        &self,
        item: &mut ContentItem,
        actor: Option<&Actor>,
        view: Stage,
    ) -> CoreResult<bool> {
        let _guard = self.locks.acquire(item.id).await;
        self.unpublish_locked(item, actor, view).await
    }

    async fn unpublish_locked(
        &self,
        item: &mut ContentItem,
        actor: Option<&Actor>,
        view: Stage,
    ) -> CoreResult<bool> {
        if self.store.current_draft_version(item.id).await?.is_none() {
            return Ok(false);
        }
        if !self.permissions.can_delete_from_live(actor, item) {
            tracing::info!(item_id = item.id, "Unpublish denied");
            return Ok(false);
        }

        let actor = Some(self.permissions.resolve_actor(actor));
        let before =
            HookContext::new(LifecycleEvent::BeforeUnpublish, view).with_actor(actor.clone());
        self.extensions.fire(item, &before)?;

        self.store.delete_live(item.id).await?;

        if view != Stage::Live && self.store.get_draft(item.id).await?.is_some() {
            let mut draft = item.clone();
            draft.status = ItemStatus::Draft;
            *item = self.write_draft(draft).await?;
        }
        tracing::info!(item_id = item.id, "Item unpublished");

        let after = HookContext::new(LifecycleEvent::AfterUnpublish, view).with_actor(actor);
        self.extensions.fire(item, &after)?;
        Ok(true)
    }

    // ── Revert ───────────────────────────────────────────────────────

    /// Discard draft changes by copying the live record back onto the draft.
    ///
    /// Returns `Ok(false)` if there is no live copy. On success `item` holds
    /// the reverted draft, whose version equals the live version. If another
    /// draft took the live slug meanwhile, the draft gets the next free
    /// `-N` variant of it instead.
    pub async fn revert_to_live(
        &self,
        item: &mut ContentItem,
        actor: Option<&Actor>,
    ) -> CoreResult<bool> {
        let _guard = self.locks.acquire(item.id).await;
        let Some(live) = self.store.get_live(item.id).await? else {
            tracing::debug!(item_id = item.id, "Revert skipped, item has no live copy");
            return Ok(false);
        };

        let actor = Some(self.permissions.resolve_actor(actor));
        let before = HookContext::new(LifecycleEvent::BeforeRevertToLive, Stage::Draft)
            .with_actor(actor.clone())
            .with_related(live.clone());
        self.extensions.fire(item, &before)?;

        let reverted = loop {
            let slug = slug::resolve_unique(self.store.as_ref(), &live.slug, item.id).await?;
            match self.store.revert_draft_to_live(item.id, &slug).await {
                Ok(Some(reverted)) => break reverted,
                Ok(None) => return Ok(false),
                Err(StoreError::SlugTaken { slug }) => {
                    tracing::warn!(item_id = item.id, slug = %slug, "Slug claimed concurrently, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        };
        if reverted.slug != live.slug {
            tracing::info!(item_id = item.id, live_slug = %live.slug, slug = %reverted.slug, "Live slug is held by another draft");
        }
        *item = reverted;
        tracing::info!(item_id = item.id, version = item.version, "Draft reverted to live");

        let after =
            HookContext::new(LifecycleEvent::AfterRevertToLive, Stage::Draft).with_actor(actor);
        self.extensions.fire(item, &after)?;
        Ok(true)
    }

    // ── Delete ───────────────────────────────────────────────────────

    /// Unpublish, then remove the draft record and all version history.
    ///
    /// Returns `Ok(false)` and removes nothing if the item is live and the
    /// actor may not unpublish it.
    pub async fn delete(&self, item: &ContentItem, actor: Option<&Actor>) -> CoreResult<bool> {
        let _guard = self.locks.acquire(item.id).await;

        if self.store.get_live(item.id).await?.is_some() {
            let mut working = item.clone();
            if !self.unpublish_locked(&mut working, actor, Stage::Draft).await? {
                tracing::info!(item_id = item.id, "Delete denied, item is still live");
                return Ok(false);
            }
        }

        let removed = self.store.purge(item.id).await?;
        tracing::info!(item_id = item.id, removed, "Item deleted");
        Ok(true)
    }
}

impl std::fmt::Debug for StagingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingService")
            .field("config", &self.config)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::actor::{FixedActor, PERMISSION_EDIT_CONTENT};
    use crate::extensions::Capability;
    use crate::memory_store::MemoryStagingStore;
    use crate::permissions::CodeAuthority;
    use crate::store::StoreResult;

    fn editor() -> Actor {
        Actor::new(10).with_permission(PERMISSION_EDIT_CONTENT)
    }

    fn service_with(store: Arc<dyn StagingStore>, extensions: ExtensionRegistry) -> StagingService {
        StagingService::new(
            store,
            Arc::new(CodeAuthority::default()),
            Arc::new(FixedActor(Some(editor()))),
            Arc::new(extensions),
            StagingConfig::default(),
        )
    }

    fn service() -> StagingService {
        service_with(Arc::new(MemoryStagingStore::new()), ExtensionRegistry::new())
    }

    fn titled(title: &str) -> NewContentItem {
        NewContentItem {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    // -- slugs ---------------------------------------------------------------

    #[tokio::test]
    async fn same_title_yields_distinct_slugs() {
        let svc = service();
        let mut slugs = Vec::new();
        for _ in 0..3 {
            slugs.push(svc.create(titled("Weekly Update")).await.unwrap().slug);
        }
        assert_eq!(slugs, vec!["weekly-update", "weekly-update-2", "weekly-update-3"]);
    }

    #[tokio::test]
    async fn default_items_get_distinct_default_slugs() {
        let svc = service();
        let first = svc.create(NewContentItem::default()).await.unwrap();
        let second = svc.create(NewContentItem::default()).await.unwrap();
        assert_eq!(first.title, "New Item");
        assert_eq!(first.slug, "new-item");
        assert_eq!(second.slug, "new-item-2");
    }

    #[tokio::test]
    async fn resave_does_not_append_suffix() {
        let svc = service();
        svc.create(titled("Events")).await.unwrap();
        let mut second = svc.create(titled("Events")).await.unwrap();
        assert_eq!(second.slug, "events-2");

        second.content = "<p>Updated</p>".into();
        svc.save(&mut second).await.unwrap();
        svc.save(&mut second).await.unwrap();
        assert_eq!(second.slug, "events-2");
    }

    #[tokio::test]
    async fn punctuation_is_stripped_from_title_slug() {
        let item = service().create(titled("Hello, World!!!")).await.unwrap();
        assert_eq!(item.slug, "hello-world");
    }

    #[tokio::test]
    async fn unsanitizable_title_uses_id_fallback() {
        let svc = service();
        let mut item = svc.create(NewContentItem::default()).await.unwrap();
        item.title = "!!!".into();
        item.slug = String::new();
        svc.save(&mut item).await.unwrap();
        assert_eq!(item.slug, format!("item-{}", item.id));
    }

    #[tokio::test]
    async fn renaming_does_not_move_custom_slug() {
        let svc = service();
        let mut item = svc.create(titled("Original")).await.unwrap();
        item.title = "Renamed".into();
        svc.save(&mut item).await.unwrap();
        assert_eq!(item.slug, "original");
    }

    /// Reports slugs as free once, simulating a concurrent writer that claims
    /// the slug between the pre-check and the commit.
    struct StaleSlugReads {
        inner: MemoryStagingStore,
        stale_reads: Mutex<u32>,
    }

    #[async_trait]
    impl StagingStore for StaleSlugReads {
        async fn allocate_id(&self) -> StoreResult<DbId> {
            self.inner.allocate_id().await
        }
        async fn get_draft(&self, id: DbId) -> StoreResult<Option<ContentItem>> {
            self.inner.get_draft(id).await
        }
        async fn get_live(&self, id: DbId) -> StoreResult<Option<ContentItem>> {
            self.inner.get_live(id).await
        }
        async fn write_draft(&self, item: &ContentItem) -> StoreResult<ContentItem> {
            self.inner.write_draft(item).await
        }
        async fn write_live(&self, item: &ContentItem) -> StoreResult<ContentItem> {
            self.inner.write_live(item).await
        }
        async fn publish(&self, item: &ContentItem) -> StoreResult<ContentItem> {
            self.inner.publish(item).await
        }
        async fn delete_draft(&self, id: DbId) -> StoreResult<bool> {
            self.inner.delete_draft(id).await
        }
        async fn delete_live(&self, id: DbId) -> StoreResult<bool> {
            self.inner.delete_live(id).await
        }
        async fn delete_version_history(&self, id: DbId) -> StoreResult<u64> {
            self.inner.delete_version_history(id).await
        }
        async fn find_draft_by_slug(
            &self,
            slug: &str,
            exclude_id: DbId,
        ) -> StoreResult<Option<ContentItem>> {
            {
                let mut stale = self.stale_reads.lock().unwrap();
                if *stale > 0 {
                    *stale -= 1;
                    return Ok(None);
                }
            }
            self.inner.find_draft_by_slug(slug, exclude_id).await
        }
        async fn current_draft_version(&self, id: DbId) -> StoreResult<Option<i32>> {
            self.inner.current_draft_version(id).await
        }
        async fn current_live_version(&self, id: DbId) -> StoreResult<Option<i32>> {
            self.inner.current_live_version(id).await
        }
        async fn revert_draft_to_live(
            &self,
            id: DbId,
            slug: &str,
        ) -> StoreResult<Option<ContentItem>> {
            self.inner.revert_draft_to_live(id, slug).await
        }
        async fn version_history(&self, id: DbId) -> StoreResult<Vec<VersionSnapshot>> {
            self.inner.version_history(id).await
        }
    }

    #[tokio::test]
    async fn lost_slug_race_retries_with_next_suffix() {
        let store = Arc::new(StaleSlugReads {
            inner: MemoryStagingStore::new(),
            stale_reads: Mutex::new(0),
        });
        let svc = service_with(store.clone(), ExtensionRegistry::new());
        svc.create(titled("Launch")).await.unwrap();

        *store.stale_reads.lock().unwrap() = 1;
        let second = svc.create(titled("Launch")).await.unwrap();
        assert_eq!(second.slug, "launch-2");
    }

    #[tokio::test]
    async fn concurrent_creates_never_share_a_slug() {
        let svc = Arc::new(service());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                tokio::spawn(async move { svc.create(titled("Breaking")).await.unwrap().slug })
            })
            .collect();

        let mut slugs = Vec::new();
        for handle in handles {
            slugs.push(handle.await.unwrap());
        }
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), 8);
    }

    // -- publish / unpublish -------------------------------------------------

    #[tokio::test]
    async fn publish_then_unpublish() {
        let svc = service();
        let mut item = svc.create(titled("Menu")).await.unwrap();

        assert!(svc.publish(&mut item, None).await.unwrap());
        assert!(svc.is_published(item.id).await.unwrap());
        assert_eq!(item.status, ItemStatus::Published);
        let live = svc.require(item.id, Stage::Live).await.unwrap();
        assert_eq!(live, item);

        assert!(svc.unpublish(&mut item, None, Stage::Draft).await.unwrap());
        assert!(!svc.is_published(item.id).await.unwrap());
        assert_eq!(item.status, ItemStatus::Draft);
        assert_eq!(svc.state(item.id).await.unwrap(), ItemState::DraftOnly);
    }

    #[tokio::test]
    async fn unpublish_from_live_view_leaves_draft_status() {
        let svc = service();
        let mut item = svc.create(titled("Menu")).await.unwrap();
        svc.publish(&mut item, None).await.unwrap();
        let version = item.version;

        assert!(svc.unpublish(&mut item, None, Stage::Live).await.unwrap());
        let draft = svc.require(item.id, Stage::Draft).await.unwrap();
        assert_eq!(draft.status, ItemStatus::Published);
        assert_eq!(draft.version, version);
    }

    #[tokio::test]
    async fn changes_on_stage_track_draft_edits() {
        let svc = service();
        let mut item = svc.create(titled("Pricing")).await.unwrap();
        svc.publish(&mut item, None).await.unwrap();
        assert!(!svc.has_changes_on_stage(item.id).await.unwrap());
        assert_eq!(
            svc.display_status(item.id).await.unwrap(),
            Some(DisplayStatus::Published)
        );

        item.content = "<p>New prices</p>".into();
        svc.save(&mut item).await.unwrap();
        assert!(svc.has_changes_on_stage(item.id).await.unwrap());
        assert_eq!(
            svc.display_status(item.id).await.unwrap(),
            Some(DisplayStatus::PublishedChanged)
        );
    }

    #[tokio::test]
    async fn denied_publish_changes_nothing() {
        let svc = service();
        let mut item = svc.create(titled("Secret")).await.unwrap();
        let before = item.clone();

        let nobody = Actor::new(99);
        assert!(!svc.publish(&mut item, Some(&nobody)).await.unwrap());
        assert_eq!(item, before);
        assert!(!svc.is_published(item.id).await.unwrap());
        assert_eq!(svc.version_history(item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn publish_override_true_beats_missing_edit_permission() {
        let mut extensions = ExtensionRegistry::new();
        extensions
            .override_capability(Capability::Publish, |_: &Actor, _: &ContentItem| Some(true));
        let svc = service_with(Arc::new(MemoryStagingStore::new()), extensions);
        let mut item = svc.create(titled("Open")).await.unwrap();

        assert!(svc.publish(&mut item, Some(&Actor::new(99))).await.unwrap());
    }

    #[tokio::test]
    async fn publish_override_false_beats_edit_permission() {
        let mut extensions = ExtensionRegistry::new();
        extensions
            .override_capability(Capability::Publish, |_: &Actor, _: &ContentItem| Some(false));
        let svc = service_with(Arc::new(MemoryStagingStore::new()), extensions);
        let mut item = svc.create(titled("Locked")).await.unwrap();

        assert!(!svc.publish(&mut item, Some(&editor())).await.unwrap());
        assert!(!svc.is_published(item.id).await.unwrap());
    }

    #[tokio::test]
    async fn publish_hooks_receive_previous_live_copy() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut extensions = ExtensionRegistry::new();
        for event in [LifecycleEvent::BeforePublish, LifecycleEvent::AfterPublish] {
            let seen = Arc::clone(&seen);
            extensions.on(event, move |item: &ContentItem, ctx: &HookContext| {
                let previous = ctx.related.as_ref().map(|r| r.content.clone());
                seen.lock()
                    .unwrap()
                    .push((ctx.event, item.content.clone(), previous));
                Ok(())
            });
        }
        let svc = service_with(Arc::new(MemoryStagingStore::new()), extensions);
        let mut item = svc.create(titled("Hooks")).await.unwrap();
        item.content = "v1".into();
        svc.publish(&mut item, None).await.unwrap();
        item.content = "v2".into();
        svc.publish(&mut item, None).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].2.as_deref(), Some(""));
        assert_eq!(
            seen[3],
            (LifecycleEvent::AfterPublish, "v2".to_string(), Some("v1".to_string()))
        );
    }

    #[tokio::test]
    async fn failing_before_publish_hook_aborts_without_writes() {
        let mut extensions = ExtensionRegistry::new();
        extensions.on(
            LifecycleEvent::BeforePublish,
            |_: &ContentItem, _: &HookContext| Err("embargo until Monday".to_string()),
        );
        let svc = service_with(Arc::new(MemoryStagingStore::new()), extensions);
        let mut item = svc.create(titled("Embargoed")).await.unwrap();

        let err = svc.publish(&mut item, None).await.unwrap_err();
        assert_matches!(err, CoreError::Hook { event: LifecycleEvent::BeforePublish, .. });
        assert!(!svc.is_published(item.id).await.unwrap());
        assert_eq!(item.status, ItemStatus::Draft);
    }

    #[tokio::test]
    async fn failing_after_publish_hook_keeps_committed_publish() {
        let mut extensions = ExtensionRegistry::new();
        extensions.on(
            LifecycleEvent::AfterPublish,
            |_: &ContentItem, _: &HookContext| Err("notify failed".to_string()),
        );
        let svc = service_with(Arc::new(MemoryStagingStore::new()), extensions);
        let mut item = svc.create(titled("Notified")).await.unwrap();

        assert!(svc.publish(&mut item, None).await.is_err());
        assert!(svc.is_published(item.id).await.unwrap());
    }

    /// Delegates to a memory store but fails every live write.
    struct LiveWritesFail {
        inner: MemoryStagingStore,
    }

    #[async_trait]
    impl StagingStore for LiveWritesFail {
        async fn allocate_id(&self) -> StoreResult<DbId> {
            self.inner.allocate_id().await
        }
        async fn get_draft(&self, id: DbId) -> StoreResult<Option<ContentItem>> {
            self.inner.get_draft(id).await
        }
        async fn get_live(&self, id: DbId) -> StoreResult<Option<ContentItem>> {
            self.inner.get_live(id).await
        }
        async fn write_draft(&self, item: &ContentItem) -> StoreResult<ContentItem> {
            self.inner.write_draft(item).await
        }
        async fn write_live(&self, _item: &ContentItem) -> StoreResult<ContentItem> {
            Err(StoreError::Backend("down".into()))
        }
        async fn publish(&self, _item: &ContentItem) -> StoreResult<ContentItem> {
            Err(StoreError::Backend("down".into()))
        }
        async fn delete_draft(&self, id: DbId) -> StoreResult<bool> {
            self.inner.delete_draft(id).await
        }
        async fn delete_live(&self, id: DbId) -> StoreResult<bool> {
            self.inner.delete_live(id).await
        }
        async fn delete_version_history(&self, id: DbId) -> StoreResult<u64> {
            self.inner.delete_version_history(id).await
        }
        async fn find_draft_by_slug(
            &self,
            slug: &str,
            exclude_id: DbId,
        ) -> StoreResult<Option<ContentItem>> {
            self.inner.find_draft_by_slug(slug, exclude_id).await
        }
        async fn current_draft_version(&self, id: DbId) -> StoreResult<Option<i32>> {
            self.inner.current_draft_version(id).await
        }
        async fn current_live_version(&self, id: DbId) -> StoreResult<Option<i32>> {
            self.inner.current_live_version(id).await
        }
        async fn revert_draft_to_live(
            &self,
            id: DbId,
            slug: &str,
        ) -> StoreResult<Option<ContentItem>> {
            self.inner.revert_draft_to_live(id, slug).await
        }
        async fn version_history(&self, id: DbId) -> StoreResult<Vec<VersionSnapshot>> {
            self.inner.version_history(id).await
        }
    }

    #[tokio::test]
    async fn failed_live_write_leaves_draft_unpublished() {
        let svc = service_with(
            Arc::new(LiveWritesFail {
                inner: MemoryStagingStore::new(),
            }),
            ExtensionRegistry::new(),
        );
        let mut item = svc.create(titled("Outage")).await.unwrap();
        let version = item.version;

        let err = svc.publish(&mut item, None).await.unwrap_err();
        assert_matches!(err, CoreError::Store(StoreError::Backend(_)));

        let draft = svc.require(item.id, Stage::Draft).await.unwrap();
        assert_eq!(draft.status, ItemStatus::Draft);
        assert_eq!(draft.version, version);
        assert_eq!(svc.version_history(item.id).await.unwrap().len(), 1);
        assert!(!svc.is_published(item.id).await.unwrap());
        assert_eq!(item.status, ItemStatus::Draft);
    }

    #[tokio::test]
    async fn unpublish_requires_saved_item_and_permission() {
        let svc = service();
        let mut unsaved = ContentItem::new(500, svc.config());
        assert!(!svc.unpublish(&mut unsaved, None, Stage::Draft).await.unwrap());

        let mut item = svc.create(titled("Kept")).await.unwrap();
        svc.publish(&mut item, None).await.unwrap();
        let nobody = Actor::new(99);
        assert!(!svc.unpublish(&mut item, Some(&nobody), Stage::Draft).await.unwrap());
        assert!(svc.is_published(item.id).await.unwrap());
    }

    // -- revert --------------------------------------------------------------

    #[tokio::test]
    async fn revert_restores_live_fields() {
        let svc = service();
        let mut item = svc.create(titled("About")).await.unwrap();
        item.content = "<p>Published copy</p>".into();
        item.set_meta_title(Some("About the company".into()));
        svc.publish(&mut item, None).await.unwrap();
        let live = svc.require(item.id, Stage::Live).await.unwrap();

        item.title = "About (draft)".into();
        item.content = "<p>Work in progress</p>".into();
        svc.save(&mut item).await.unwrap();
        assert!(svc.has_changes_on_stage(item.id).await.unwrap());

        assert!(svc.revert_to_live(&mut item, None).await.unwrap());
        assert_eq!(item.title, live.title);
        assert_eq!(item.content, live.content);
        assert_eq!(item.meta_title(), "About the company");
        assert_eq!(item.version, live.version);
        assert!(!svc.has_changes_on_stage(item.id).await.unwrap());

        // Later edits never reuse a version number.
        item.content = "<p>Next</p>".into();
        svc.save(&mut item).await.unwrap();
        assert_eq!(item.version, 4);
    }

    #[tokio::test]
    async fn revert_dedups_live_slug_held_by_another_draft() {
        let svc = service();
        let mut first = svc.create(titled("News")).await.unwrap();
        svc.publish(&mut first, None).await.unwrap();
        assert_eq!(first.slug, "news");

        first.slug = "news-archive".into();
        svc.save(&mut first).await.unwrap();
        let second = svc.create(titled("News")).await.unwrap();
        assert_eq!(second.slug, "news");

        assert!(svc.revert_to_live(&mut first, None).await.unwrap());
        assert_eq!(first.slug, "news-2");
        assert_eq!(svc.require(first.id, Stage::Draft).await.unwrap().slug, "news-2");
        assert_eq!(svc.require(first.id, Stage::Live).await.unwrap().slug, "news");
        assert_eq!(svc.require(second.id, Stage::Draft).await.unwrap().slug, "news");
    }

    #[tokio::test]
    async fn revert_without_live_copy_is_a_no_op() {
        let svc = service();
        let mut item = svc.create(titled("Unpublished")).await.unwrap();
        item.content = "local edit".into();

        assert!(!svc.revert_to_live(&mut item, None).await.unwrap());
        assert_eq!(item.content, "local edit");
    }

    // -- delete --------------------------------------------------------------

    #[tokio::test]
    async fn delete_removes_every_trace() {
        let svc = service();
        let mut item = svc.create(titled("Temporary")).await.unwrap();
        svc.publish(&mut item, None).await.unwrap();
        item.content = "edit".into();
        svc.save(&mut item).await.unwrap();

        assert!(svc.delete(&item, None).await.unwrap());
        assert!(svc.load(item.id, Stage::Draft).await.unwrap().is_none());
        assert!(svc.load(item.id, Stage::Live).await.unwrap().is_none());
        assert!(svc.version_history(item.id).await.unwrap().is_empty());
        assert_eq!(svc.state(item.id).await.unwrap(), ItemState::Deleted);
    }

    #[tokio::test]
    async fn deleted_item_stays_deleted() {
        let svc = service();
        let mut item = svc.create(titled("Gone")).await.unwrap();
        assert!(svc.delete(&item, None).await.unwrap());

        let err = svc.save(&mut item).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });
        assert!(!svc.publish(&mut item, None).await.unwrap());

        assert_eq!(svc.state(item.id).await.unwrap(), ItemState::Deleted);
        assert!(!svc.is_published(item.id).await.unwrap());
        assert!(svc.version_history(item.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_trusts_the_store_over_a_stale_copy() {
        let svc = service();
        let mut item = svc.create(titled("Stale")).await.unwrap();
        svc.publish(&mut item, None).await.unwrap();

        let mut stale = item.clone();
        stale.version = 0;
        assert!(svc.delete(&stale, None).await.unwrap());
        assert!(svc.load(item.id, Stage::Draft).await.unwrap().is_none());
        assert!(!svc.is_published(item.id).await.unwrap());
        assert_eq!(svc.state(item.id).await.unwrap(), ItemState::Deleted);
    }

    #[tokio::test]
    async fn delete_of_draft_only_item_needs_no_unpublish() {
        let svc = service();
        let item = svc.create(titled("Scratch")).await.unwrap();
        assert!(svc.delete(&item, Some(&Actor::new(99))).await.unwrap());
        assert!(svc.load(item.id, Stage::Draft).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn denied_delete_of_live_item_keeps_everything() {
        let svc = service();
        let mut item = svc.create(titled("Protected")).await.unwrap();
        svc.publish(&mut item, None).await.unwrap();

        assert!(!svc.delete(&item, Some(&Actor::new(99))).await.unwrap());
        assert!(svc.load(item.id, Stage::Draft).await.unwrap().is_some());
        assert!(svc.is_published(item.id).await.unwrap());
        assert!(!svc.version_history(item.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let err = service().require(404, Stage::Draft).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { id: 404, .. });
    }
}
