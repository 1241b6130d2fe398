//! # docsync
//!
//! CLI tool for docsync documents and room sync.
//!
//! ## Commands
//!
//! - `create`: Create a document in the local store
//! - `show`: Print a document's title and text
//! - `list`: List stored documents
//! - `apply`: Apply a JSON operation list to a document as a remote batch
//! - `demo`: Two clients editing one document over an in-process hub
//!
//! ## Example
//!
//! ```bash
//! # Create a document
//! docsync create --title "Notes"
//!
//! # Apply edits from a file
//! docsync apply <id> --ops edits.json
//!
//! # Read it back
//! docsync show <id>
//!
//! # Watch two clients converge
//! docsync demo --text "hello world"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsync_client::FsStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{apply, create, demo, list, show};
use config::Config;

/// CLI tool for docsync documents and room sync.
#[derive(Parser, Debug)]
#[command(name = "docsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding documents and docsync.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/docsync.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a document and print its id
    Create {
        /// Document title
        #[arg(long, short)]
        title: String,
    },

    /// Print a document's title and plain text
    Show {
        /// Document id
        id: String,
    },

    /// List stored documents
    List,

    /// Apply a JSON operation list to a document as a remote batch
    Apply {
        /// Document id
        id: String,

        /// File containing a JSON array of operations
        #[arg(long)]
        ops: PathBuf,
    },

    /// Two clients on one in-process hub edit the same document
    Demo {
        /// Text typed by the first client
        #[arg(long, default_value = "hello world")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    let config = Config::load(&data_dir, cli.config.as_deref()).await?;
    init_logging(&config);

    let store = FsStore::new(config.documents_dir(&data_dir));

    match cli.command {
        Commands::Create { title } => {
            create::run(&store, &title).await?;
        }
        Commands::Show { id } => {
            show::run(&store, &id).await?;
        }
        Commands::List => {
            list::run(&store).await?;
        }
        Commands::Apply { id, ops } => {
            apply::run(&store, &config, &id, &ops).await?;
        }
        Commands::Demo { text } => {
            demo::run(&config, &text).await?;
        }
    }

    Ok(())
}

/// Install the log subscriber; RUST_LOG wins over the config level.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Get the default data directory for docsync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "ydun", "docsync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
