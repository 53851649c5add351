//! `pagestage-admin` -- operator CLI for staged content items.
//!
//! Connects to PostgreSQL, applies migrations, runs one command and prints
//! the outcome as JSON on stdout. Logs go to stderr.
//!
//! # Environment variables
//!
//! | Variable                      | Required | Default | Description                       |
//! |-------------------------------|----------|---------|-----------------------------------|
//! | `DATABASE_URL`                | yes      | --      | PostgreSQL connection string      |
//! | `DB_MAX_CONNECTIONS`          | no       | `20`    | Pool size                         |
//! | `PAGESTAGE_ACTOR_ID`          | no       | --      | Acting operator id                |
//! | `PAGESTAGE_ACTOR_PERMISSIONS` | no       | --      | Comma-separated permission codes  |
//! | `RUST_LOG`                    | no       | `pagestage_admin=info,pagestage_core=info` | Log filter |

use std::sync::Arc;

use clap::Parser;
use pagestage_admin::actor::actor_from_env;
use pagestage_admin::cli::Cli;
use pagestage_admin::commands;
use pagestage_core::actor::FixedActor;
use pagestage_core::config::StagingConfig;
use pagestage_core::extensions::ExtensionRegistry;
use pagestage_core::permissions::CodeAuthority;
use pagestage_core::StagingService;
use pagestage_db::{DbConfig, PgStagingStore};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pagestage_admin=info,pagestage_core=info".into());
    let json_layer = cli
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!cli.log_json)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let db = DbConfig::from_env()?;
    let pool = pagestage_db::create_pool(&db.database_url, db.max_connections).await?;
    pagestage_db::run_migrations(&pool).await?;

    let actor = actor_from_env()?;
    tracing::info!(
        actor_id = ?actor.as_ref().and_then(|a| a.id),
        "Starting pagestage-admin",
    );

    let service = StagingService::new(
        Arc::new(PgStagingStore::new(pool)),
        Arc::new(CodeAuthority::default()),
        Arc::new(FixedActor(actor)),
        Arc::new(ExtensionRegistry::new()),
        StagingConfig::from_env(),
    );

    let output = commands::run(&service, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
