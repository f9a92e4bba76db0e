use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use dialoguer::Confirm;
use serde_json::json;

use flowpad::store::{StoreConfig, View, ViewStore};

#[derive(Debug, Parser)]
#[command(
    name = "flowpad",
    about = "Manage flowpad diagram views stored in SQLite."
)]
pub struct Cli {
    /// Path to the view database (defaults to FLOWPAD_DB_PATH or ./flowpad.db).
    #[arg(long = "db")]
    db: Option<PathBuf>,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// List stored views, most recently updated first.
    List,
    /// Create a new empty view.
    Create { name: String },
    /// Print a summary of one view.
    Show { id: String },
    /// Export a view as JSON. Use '-' or omit the output to write to stdout.
    Export {
        id: String,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Rename a view.
    Rename { id: String, name: String },
    /// Copy a view under a new name.
    Duplicate {
        id: String,
        #[arg(long = "name")]
        name: Option<String>,
    },
    /// Delete a view.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(short = 'y', long = "yes", action = ArgAction::SetTrue)]
        yes: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = match cli.db {
        Some(path) => StoreConfig { path },
        None => StoreConfig::default(),
    };
    let store = ViewStore::open(config).await?;
    let pool = store.pool();

    match cli.command {
        CliCommand::List => {
            let views = View::list(pool).await?;
            if views.is_empty() {
                if !cli.quiet {
                    println!("no views stored yet");
                }
                return Ok(());
            }
            for item in views {
                println!(
                    "{}  {}  (updated {})",
                    item.id,
                    item.name,
                    item.updated_at.to_rfc3339()
                );
            }
        }
        CliCommand::Create { name } => {
            let view = View::create(pool, &name).await?;
            if cli.quiet {
                println!("{}", view.id);
            } else {
                println!("created view '{}' with id {}", view.name, view.id);
            }
        }
        CliCommand::Show { id } => {
            let view = require_view(pool, &id).await?;
            println!("id:      {}", view.id);
            println!("name:    {}", view.name);
            println!("nodes:   {}", view.nodes.len());
            println!("edges:   {}", view.edges.len());
            println!("created: {}", view.created_at.to_rfc3339());
            println!("updated: {}", view.updated_at.to_rfc3339());
        }
        CliCommand::Export { id, output } => {
            let view = require_view(pool, &id).await?;
            let payload = json!({
                "name": view.name,
                "nodes": view.nodes,
                "edges": view.edges,
            });
            let rendered = serde_json::to_string_pretty(&payload)
                .context("Failed to serialize view for export")?;

            match output {
                Some(path) if path.as_os_str() != "-" => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write '{}'", path.display()))?;
                    if !cli.quiet {
                        println!("exported '{}' to {}", view.name, path.display());
                    }
                }
                _ => println!("{rendered}"),
            }
        }
        CliCommand::Rename { id, name } => {
            let view = require_view(pool, &id).await?;
            let renamed = view.rename(pool, &name).await?;
            if !cli.quiet {
                println!("renamed view {} to '{}'", renamed.id, renamed.name);
            }
        }
        CliCommand::Duplicate { id, name } => {
            let view = require_view(pool, &id).await?;
            let copy = view.duplicate(pool, name.as_deref()).await?;
            if cli.quiet {
                println!("{}", copy.id);
            } else {
                println!(
                    "duplicated '{}' as '{}' ({})",
                    view.name, copy.name, copy.id
                );
            }
        }
        CliCommand::Delete { id, yes } => {
            let view = require_view(pool, &id).await?;
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete view '{}'?", view.name))
                    .default(false)
                    .interact()
                    .context("Failed to read confirmation")?;
                if !confirmed {
                    if !cli.quiet {
                        println!("aborted");
                    }
                    return Ok(());
                }
            }
            view.delete(pool).await?;
            if !cli.quiet {
                println!("deleted view '{}'", view.name);
            }
        }
    }

    Ok(())
}

async fn require_view(pool: &sqlx::SqlitePool, id: &str) -> Result<View> {
    match View::get_by_id(pool, id).await? {
        Some(view) => Ok(view),
        None => bail!("no view with id '{id}'"),
    }
}
