//! # Catalog Curator CLI (`curate`)
//!
//! ## Usage
//!
//! ```bash
//! curate --config ./config/curate.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `curate init` | Create the SQLite database and run schema migrations |
//! | `curate import <file.json>` | Insert guides from a JSON seed file |
//! | `curate list` | List approved guides |
//! | `curate classify` | Classify every approved guide |
//! | `curate coverage` | Report facet coverage without writing |
//! | `curate run` | Classify, repair gaps, verify, and report (default) |
//!
//! `curate run` exits with status 1 when any facet value is still
//! uncovered after repair.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use catalog_curator_core::models::CanonicalCategory;
use catalog_curator::{commands, config, import, migrate};

/// Catalog Curator: classify guides and repair facet coverage gaps.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/curate.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "curate",
    about = "Taxonomy classification and facet-coverage repair for a guide catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/curate.toml")]
    config: PathBuf,

    /// Debug logging on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Only warnings and errors on stderr.
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Import guides from a JSON array.
    ///
    /// Items without an `id` get a fresh UUID; approved items are
    /// classified on the way in. Tags must not contain commas.
    Import {
        /// Path to the JSON seed file.
        path: PathBuf,
    },

    /// List approved guides.
    List {
        /// Only guides stored under this category.
        #[arg(long)]
        category: Option<CanonicalCategory>,
    },

    /// Classify every approved guide and persist changed categories.
    ///
    /// `[repair] dry_run` does not apply here; only `--dry-run` does.
    Classify {
        /// Report reclassifications without writing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Report per-value facet coverage. Never writes.
    Coverage {
        /// Only facets of this category.
        #[arg(long)]
        category: Option<CanonicalCategory>,
    },

    /// Classify, repair coverage gaps once, verify, and report.
    Run {
        /// Plan repairs and report the projected result without writing.
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON instead of tables.
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(cli: &Cli) {
    let json = matches!(cli.command, Some(Commands::Run { json: true, .. }));
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet || json {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    if !cli.verbose {
        builder.filter_module("sqlx", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);

    let cfg = config::load_config(&cli.config)?;
    let command = cli.command.unwrap_or(Commands::Run {
        dry_run: false,
        json: false,
    });

    match command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { path } => {
            let count = import::run_import(&cfg, &path).await?;
            println!("Imported {} item(s).", count);
        }
        Commands::List { category } => {
            commands::run_list(&cfg, category).await?;
        }
        Commands::Classify { dry_run } => {
            commands::run_classify(&cfg, dry_run).await?;
        }
        Commands::Coverage { category } => {
            commands::run_coverage(&cfg, category).await?;
        }
        Commands::Run { dry_run, json } => {
            let report =
                commands::run_curation(&cfg, cfg.repair.dry_run || dry_run, json).await?;
            if !report.passed() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
