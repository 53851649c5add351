//! Run one CLI command against a staging service.
//!
//! Every command returns a JSON document describing the outcome. Permission
//! denials are outcomes, not errors.

use pagestage_core::item::{NewContentItem, Stage, UpdateContentItem};
use pagestage_core::links::{item_link, ListingPage};
use pagestage_core::types::DbId;
use pagestage_core::StagingService;
use serde_json::{json, Value};

use crate::cli::Command;

/// A listing page known only by its link.
struct PathListing(String);

impl ListingPage for PathListing {
    fn link(&self) -> String {
        self.0.clone()
    }

    fn absolute_link(&self) -> String {
        self.0.clone()
    }
}

pub async fn run(svc: &StagingService, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::Create {
            title,
            slug,
            content,
            meta_title,
            meta_description,
        } => {
            let item = svc
                .create(NewContentItem {
                    title,
                    slug,
                    content,
                    meta_title,
                    meta_description,
                })
                .await?;
            Ok(json!(item))
        }

        Command::Edit {
            id,
            title,
            slug,
            content,
            meta_title,
            meta_description,
        } => {
            let mut item = svc.require(id, Stage::Draft).await?;
            UpdateContentItem {
                title,
                slug,
                content,
                meta_title,
                meta_description,
            }
            .apply_to(&mut item)?;
            svc.save(&mut item).await?;
            Ok(json!(item))
        }

        Command::Show { id, live, listing } => {
            let stage = if live { Stage::Live } else { Stage::Draft };
            let item = svc.require(id, stage).await?;
            let listing = PathListing(listing);
            Ok(json!({
                "item": item,
                "stage": stage,
                "state": svc.state(id).await?,
                "status": svc.display_status(id).await?.map(|s| s.label()),
                "viewable": svc.permissions().can_view(None, &item, stage),
                "link": item_link(&listing, &item, None, svc.config()),
                "actions": svc.available_actions(&item, None).await?,
            }))
        }

        Command::Publish { id } => {
            let mut item = svc.require(id, Stage::Draft).await?;
            let published = svc.publish(&mut item, None).await?;
            Ok(outcome(id, "published", published))
        }

        Command::Unpublish { id, live } => {
            let view = if live { Stage::Live } else { Stage::Draft };
            let mut item = svc.require(id, view).await?;
            let unpublished = svc.unpublish(&mut item, None, view).await?;
            Ok(outcome(id, "unpublished", unpublished))
        }

        Command::Revert { id } => {
            let mut item = svc.require(id, Stage::Draft).await?;
            let reverted = svc.revert_to_live(&mut item, None).await?;
            Ok(outcome(id, "reverted", reverted))
        }

        Command::Delete { id } => {
            let item = svc.require(id, Stage::Draft).await?;
            let deleted = svc.delete(&item, None).await?;
            Ok(outcome(id, "deleted", deleted))
        }

        Command::Duplicate { id, dry_run } => {
            let source = svc.require(id, Stage::Draft).await?;
            let copy = svc.duplicate(&source, None, !dry_run).await?;
            Ok(json!({ "source_id": id, "saved": !dry_run, "item": copy }))
        }

        Command::History { id } => Ok(json!(svc.version_history(id).await?)),
    }
}

fn outcome(id: DbId, field: &str, done: bool) -> Value {
    if !done {
        tracing::warn!(item_id = id, outcome = field, "Operation not performed");
    }
    let mut value = json!({ "id": id });
    value[field] = Value::Bool(done);
    value
}
