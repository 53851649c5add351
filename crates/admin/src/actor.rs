//! Resolve the acting operator from the environment.
//!
//! | Env Var                       | Default          |
//! |-------------------------------|------------------|
//! | `PAGESTAGE_ACTOR_ID`          | unset: anonymous |
//! | `PAGESTAGE_ACTOR_PERMISSIONS` | empty            |
//!
//! Permissions are a comma-separated list of codes such as
//! `EDIT_CONTENT,DELETE_CONTENT`.

use anyhow::Context;
use pagestage_core::actor::Actor;
use pagestage_core::types::DbId;

pub fn actor_from_env() -> anyhow::Result<Option<Actor>> {
    actor_from_vars(
        std::env::var("PAGESTAGE_ACTOR_ID").ok().as_deref(),
        std::env::var("PAGESTAGE_ACTOR_PERMISSIONS").ok().as_deref(),
    )
}

pub fn actor_from_vars(id: Option<&str>, permissions: Option<&str>) -> anyhow::Result<Option<Actor>> {
    let Some(id) = id.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let id: DbId = id
        .parse()
        .with_context(|| format!("PAGESTAGE_ACTOR_ID must be an integer, got '{id}'"))?;

    let actor = permissions
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .fold(Actor::new(id), |actor, code| actor.with_permission(code));
    Ok(Some(actor))
}
