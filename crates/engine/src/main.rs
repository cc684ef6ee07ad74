//! Charforge Engine - command-line entry point.
//!
//! Loads the content catalog named by `CHARFORGE_CATALOG_PATH` (or
//! `--catalog`) and runs one query against a character JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use charforge_domain::{Character, TraitId};
use charforge_engine::infrastructure::{
    clock::SystemClock, content_sources::JsonCatalogSource, settings::EngineConfig,
};
use charforge_engine::App;

/// Character progression engine
#[derive(Parser)]
#[command(name = "charforge-engine")]
#[command(about = "Resolve character features, choices and derived state", long_about = None)]
#[command(version)]
struct Cli {
    /// Catalog bundle file or directory (overrides CHARFORGE_CATALOG_PATH)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Validate the catalog and print its record counts
    Catalog,

    /// Print the derived state of a character
    Derive { character: PathBuf },

    /// Print every unlocked choice and its state
    Choices { character: PathBuf },

    /// Print the options for one choice
    Options { character: PathBuf, trait_id: String },

    /// Drop selections whose granting trait is no longer reachable
    Prune {
        character: PathBuf,
        /// Write the pruned character back to the file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from repo root regardless of the working directory.
    load_dotenv_from_repo_root();

    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "charforge_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env();
    if let Some(path) = cli.catalog {
        config = config.with_catalog_path(path);
    }

    let source = JsonCatalogSource::new(&config.catalog_path);
    let app = App::load(&config, &source, SystemClock::shared())
        .await
        .with_context(|| format!("loading catalog from {}", config.catalog_path.display()))?;

    match cli.command {
        Command::Catalog => {
            let summary = app.catalog.summary();
            println!("version:       {}", app.catalog.version());
            println!("classes:       {}", summary.classes);
            println!("subclasses:    {}", summary.subclasses);
            println!("ancestries:    {}", summary.ancestries);
            println!("backgrounds:   {}", summary.backgrounds);
            println!("pools:         {}", summary.pools);
            println!("spell schools: {}", summary.schools);
            println!("choice traits: {}", summary.choice_traits);
        }
        Command::Derive { character } => {
            let character = read_character(&character).await?;
            let state = app.derive(&character)?;
            print_json(&*state)?;
        }
        Command::Choices { character } => {
            let character = read_character(&character).await?;
            let statuses = app.use_cases.availability.choice_statuses(&character)?;
            print_json(&statuses)?;
        }
        Command::Options {
            character,
            trait_id,
        } => {
            let character = read_character(&character).await?;
            let options = app
                .use_cases
                .availability
                .options(&character, &TraitId::from(trait_id))?;
            print_json(&options)?;
        }
        Command::Prune { character: path, write } => {
            let mut character = read_character(&path).await?;
            let removed = app.use_cases.selections.prune_orphaned(&mut character)?;
            tracing::info!(character_id = %character.id, removed, "Pruned orphaned selections");
            if write && removed > 0 {
                let json = serde_json::to_string_pretty(&character)?;
                tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
            } else {
                print_json(&character)?;
            }
        }
    }

    Ok(())
}

async fn read_character(path: &Path) -> Result<Character> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing character {}", path.display()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
