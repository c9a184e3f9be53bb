//! Schema Index CLI
//!
//! Imports schema documents and bundles into a schema index.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use schema_index::config::StorageBackend;
use schema_index::{ContentHasher, FsIndex, ImportError, IndexConfig, SchemaImporter, Sha256Hasher, UploadedFile};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-index")]
#[command(about = "Content-addressed schema import")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    /// Override the storage path from config
    #[arg(short, long)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a schema base (.json) or a bundle (.zip)
    Import {
        /// Target namespace
        #[arg(short, long)]
        namespace: String,
        /// File to import
        file: PathBuf,
    },

    /// Check whether a schema base name is free in a namespace
    Available {
        #[arg(short, long)]
        namespace: String,
        name: String,
    },

    /// Print the hashlink of a JSON document
    Hash {
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// The memory backend starts empty on every run, so the CLI requires `fs`
fn open_storage(config: &IndexConfig) -> anyhow::Result<FsIndex> {
    match config.storage.backend {
        StorageBackend::Fs => {
            let path = config.storage_path();
            FsIndex::open(&path).with_context(|| format!("opening index at {:?}", path))
        }
        StorageBackend::Memory => {
            anyhow::bail!("storage backend \"memory\" does not persist between runs; use \"fs\" with the CLI")
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = IndexConfig::load_from(cli.config.as_deref())?;
    if let Some(index) = cli.index {
        config.storage.path = index;
    }

    match cli.command {
        Commands::Import { namespace, file } => {
            let storage = open_storage(&config)?;
            let importer = SchemaImporter::with_config(storage, Sha256Hasher::new(), config.import.clone());
            let upload = UploadedFile::from_path(&file);

            match importer.import(&namespace, upload) {
                Ok(outcome) => {
                    println!("{} {}", outcome.kind, outcome.hashlink);
                    Ok(())
                }
                Err(ImportError::ValidationFailed(errors)) => {
                    eprintln!("❌ {} failed validation:", file.display());
                    eprintln!("{}", serde_json::to_string_pretty(&errors)?);
                    std::process::exit(1);
                }
                Err(e) => Err(e.into()),
            }
        }

        Commands::Available { namespace, name } => {
            let storage = open_storage(&config)?;
            let importer = SchemaImporter::with_config(storage, Sha256Hasher::new(), config.import.clone());

            if importer.name_available(&namespace, &name)? {
                println!("✅ '{}' is available in {}", name, namespace);
            } else {
                println!("❌ '{}' is taken in {}", name, namespace);
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Hash { file } => {
            let content = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_slice(&content)?;
            println!("{}", Sha256Hasher::new().hash(&value));
            Ok(())
        }

        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
