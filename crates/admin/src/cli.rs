//! Command line definition.

use clap::{Parser, Subcommand};
use pagestage_core::types::DbId;

/// Manage draft and live content items
#[derive(Parser, Debug)]
#[command(name = "pagestage-admin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new draft item
    Create {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        meta_title: Option<String>,
        #[arg(long)]
        meta_description: Option<String>,
    },

    /// Edit and save the draft of an item
    Edit {
        id: DbId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        meta_title: Option<String>,
        #[arg(long)]
        meta_description: Option<String>,
    },

    /// Show an item with its state, link and available actions
    Show {
        id: DbId,
        /// Read the live copy instead of the draft
        #[arg(long)]
        live: bool,
        /// Link of the listing page the item is shown on
        #[arg(long, default_value = "/")]
        listing: String,
    },

    /// Publish the draft
    Publish { id: DbId },

    /// Remove the live copy
    Unpublish {
        id: DbId,
        /// Work in the live stage; the draft status is left untouched
        #[arg(long)]
        live: bool,
    },

    /// Discard draft changes and revert to the live copy
    Revert { id: DbId },

    /// Unpublish and delete the item with its history
    Delete { id: DbId },

    /// Copy the item into a new draft
    Duplicate {
        id: DbId,
        /// Build the copy without saving it
        #[arg(long)]
        dry_run: bool,
    },

    /// List the version history of an item
    History { id: DbId },
}
