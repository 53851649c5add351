//! Duplicating items into new draft-only items.

use chrono::Utc;

use crate::actor::Actor;
use crate::config::StagingConfig;
use crate::error::CoreResult;
use crate::extensions::{HookContext, LifecycleEvent};
use crate::item::{ContentItem, ItemStatus, Stage};
use crate::types::DbId;
use crate::versioning::StagingService;

/// Build an unsaved copy of `source` under `new_id`.
///
/// Every field is copied by value except identity, status (reset to draft),
/// version and timestamps. The title is prefixed with the copy marker.
pub fn copy_of(source: &ContentItem, new_id: DbId, config: &StagingConfig) -> ContentItem {
    let now = Utc::now();
    let mut copy = source.clone();
    copy.id = new_id;
    copy.title = format!("{}{}", config.copy_title_prefix, source.title);
    copy.status = ItemStatus::Draft;
    copy.version = 0;
    copy.created_at = now;
    copy.updated_at = now;
    copy
}

impl StagingService {
    /// Duplicate `source` into a new draft-only item.
    ///
    /// Both duplication hooks receive the new item, with `source` as the
    /// related item. When `write` is false the copy is returned unsaved.
    pub async fn duplicate(
        &self,
        source: &ContentItem,
        actor: Option<&Actor>,
        write: bool,
    ) -> CoreResult<ContentItem> {
        let id = self.store.allocate_id().await?;
        let mut copy = copy_of(source, id, &self.config);
        let actor = Some(self.permissions.resolve_actor(actor));

        let before = HookContext::new(LifecycleEvent::BeforeDuplicate, Stage::Draft)
            .with_actor(actor.clone())
            .with_related(source.clone());
        self.extensions.fire(&copy, &before)?;

        if write {
            let _guard = self.locks.acquire(id).await;
            copy = self.write_draft(copy).await?;
            tracing::info!(source_id = source.id, item_id = copy.id, slug = %copy.slug, "Item duplicated");
        }

        let after = HookContext::new(LifecycleEvent::AfterDuplicate, Stage::Draft)
            .with_actor(actor)
            .with_related(source.clone());
        self.extensions.fire(&copy, &after)?;
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::actor::FixedActor;
    use crate::extensions::ExtensionRegistry;
    use crate::item::NewContentItem;
    use crate::memory_store::MemoryStagingStore;
    use crate::permissions::CodeAuthority;

    fn service(extensions: ExtensionRegistry) -> StagingService {
        StagingService::new(
            Arc::new(MemoryStagingStore::new()),
            Arc::new(CodeAuthority::default()),
            Arc::new(FixedActor(None)),
            Arc::new(extensions),
            StagingConfig::default(),
        )
    }

    async fn published_source(svc: &StagingService) -> ContentItem {
        let mut source = svc
            .create(NewContentItem {
                title: Some("Team".into()),
                content: Some("<p>Our people</p>".into()),
                meta_description: Some("Who we are".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let admin = Actor::new(1).with_permission(crate::actor::PERMISSION_ADMIN);
        assert!(svc.publish(&mut source, Some(&admin)).await.unwrap());
        source
    }

    #[tokio::test]
    async fn duplicate_is_a_new_draft_copy() {
        let svc = service(ExtensionRegistry::new());
        let source = published_source(&svc).await;

        let copy = svc.duplicate(&source, None, true).await.unwrap();
        assert_ne!(copy.id, source.id);
        assert_eq!(copy.title, "Copy of Team");
        assert_eq!(copy.status, ItemStatus::Draft);
        assert_eq!(copy.content, source.content);
        assert_eq!(copy.meta_description, source.meta_description);
        assert_eq!(copy.slug, "team-2");
        assert_eq!(copy.version, 1);
        assert!(!svc.is_published(copy.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_is_independent_of_source() {
        let svc = service(ExtensionRegistry::new());
        let mut source = published_source(&svc).await;
        let copy = svc.duplicate(&source, None, true).await.unwrap();

        source.content = "<p>Rewritten</p>".into();
        svc.save(&mut source).await.unwrap();

        let stored_copy = svc.require(copy.id, Stage::Draft).await.unwrap();
        assert_eq!(stored_copy.content, "<p>Our people</p>");
    }

    #[tokio::test]
    async fn unsaved_duplicate_leaves_store_untouched() {
        let svc = service(ExtensionRegistry::new());
        let source = published_source(&svc).await;

        let copy = svc.duplicate(&source, None, false).await.unwrap();
        assert_eq!(copy.version, 0);
        assert!(svc.load(copy.id, Stage::Draft).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplication_hooks_receive_the_new_item() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut extensions = ExtensionRegistry::new();
        for event in [LifecycleEvent::BeforeDuplicate, LifecycleEvent::AfterDuplicate] {
            let seen = Arc::clone(&seen);
            extensions.on(event, move |item: &ContentItem, ctx: &HookContext| {
                let source_id = ctx.related.as_ref().map(|r| r.id);
                seen.lock().unwrap().push((item.id, item.version, source_id));
                Ok(())
            });
        }
        let svc = service(extensions);
        let source = published_source(&svc).await;

        let copy = svc.duplicate(&source, None, true).await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (copy.id, 0, Some(source.id)),
                (copy.id, 1, Some(source.id)),
            ]
        );
    }
}
