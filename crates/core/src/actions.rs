//! Which operator actions are available for an item.

use serde::Serialize;

use crate::actor::Actor;
use crate::error::CoreResult;
use crate::item::ContentItem;
use crate::versioning::StagingService;

/// An operation an operator may trigger on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemAction {
    /// Offered instead of everything else for items without a draft record.
    Create,
    Unpublish,
    Delete,
    /// Discard draft changes and revert to the live copy.
    Rollback,
    Duplicate,
    SaveDraft,
    Publish,
}

impl ItemAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Unpublish => "unpublish",
            Self::Delete => "delete",
            Self::Rollback => "rollback",
            Self::Duplicate => "duplicate",
            Self::SaveDraft => "save_draft",
            Self::Publish => "publish",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Unpublish => "Unpublish",
            Self::Delete => "Delete",
            Self::Rollback => "Cancel draft changes",
            Self::Duplicate => "Duplicate",
            Self::SaveDraft => "Save Draft",
            Self::Publish => "Save & Publish",
        }
    }
}

impl std::fmt::Display for ItemAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StagingService {
    /// The actions `actor` may take on `item`, in display order.
    pub async fn available_actions(
        &self,
        item: &ContentItem,
        actor: Option<&Actor>,
    ) -> CoreResult<Vec<ItemAction>> {
        if self.store.get_draft(item.id).await?.is_none() {
            return Ok(vec![ItemAction::Create]);
        }

        let permissions = &self.permissions;
        let actor = permissions.resolve_actor(actor);
        let actor = Some(&actor);
        let published = self.is_published(item.id).await?;
        let can_edit = permissions.can_edit(actor, item);
        let can_publish = permissions.can_publish(actor, item);

        let mut actions = Vec::new();
        if published && can_publish && permissions.can_delete_from_live(actor, item) {
            actions.push(ItemAction::Unpublish);
        }
        if can_edit {
            if permissions.can_delete(actor, item) {
                actions.push(ItemAction::Delete);
            }
            if published && self.has_changes_on_stage(item.id).await? {
                actions.push(ItemAction::Rollback);
            }
            if permissions.can_create(actor) {
                actions.push(ItemAction::Duplicate);
            }
            actions.push(ItemAction::SaveDraft);
        }
        if can_publish {
            actions.push(ItemAction::Publish);
        }
        Ok(actions)
    }
}
