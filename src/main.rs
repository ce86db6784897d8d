use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use module_index::config::{Config, data_dir};
use module_index::logging;
use module_index::storage::sqlite::Database;
use module_index::version::error::StoreError;
use module_index::version::resolver::VersionResolver;

#[derive(Parser)]
#[command(name = "module-index")]
#[command(version, about = "Resolve module and package versions from a registry database")]
struct Cli {
    /// Registry database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Newest version of a package
    Latest { path: String },
    /// A package at a version
    Package { path: String, version: String },
    /// A module version with all of its packages
    Version { path: String, version: String },
    /// Tagged versions of a package series, newest first
    Tagged { path: String },
    /// Most recent pseudo-versions of a package series
    Pseudo { path: String },
    /// A module version by module path
    Info { module_path: String, version: String },
    /// Packages imported by a package
    Imports { path: String, version: String },
    /// Packages importing a package
    ImportedBy { path: String },
    /// License files of a package with their contents
    Licenses { path: String, version: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn execute(resolver: VersionResolver<Database>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Latest { path } => print_json(&resolver.get_latest_package(&path).await?),
        Command::Package { path, version } => {
            print_json(&resolver.get_package(&path, &version).await?)
        }
        Command::Version { path, version } => {
            print_json(&resolver.get_version_for_package(&path, &version).await?)
        }
        Command::Tagged { path } => {
            print_json(&resolver.get_tagged_versions_for_package_series(&path).await?)
        }
        Command::Pseudo { path } => {
            print_json(&resolver.get_pseudo_versions_for_package_series(&path).await?)
        }
        Command::Info {
            module_path,
            version,
        } => print_json(&resolver.get_version(&module_path, &version).await?),
        Command::Imports { path, version } => {
            print_json(&resolver.get_imports(&path, &version).await?)
        }
        Command::ImportedBy { path } => print_json(&resolver.get_imported_by(&path).await?),
        Command::Licenses { path, version } => {
            print_json(&resolver.get_licenses(&path, &version).await?)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir().join("config.json"));
    let mut config = Config::load(&config_path)?;
    if cli.verbose {
        config.log.level = "debug".to_string();
    }
    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }
    Ok(config)
}

fn run(config: &Config, command: Command) -> anyhow::Result<()> {
    let db_path = config.db_path();
    let database = Database::open(&db_path)
        .with_context(|| format!("failed to open registry database {:?}", db_path))?;
    let resolver = VersionResolver::new(Arc::new(database), config.query.clone());

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(execute(resolver, command))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::FAILURE;
        }
    };
    let _guard = match logging::init(&config.log, &config.log_path()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match run(&config, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<StoreError>() {
                Some(e) if e.is_not_found() => info!("{:#}", err),
                _ => error!("{:#}", err),
            }
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
