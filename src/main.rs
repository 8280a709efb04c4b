//! dbscope CLI - test connections, run SQL and browse schemas
//!
//! Usage:
//!   dbscope profile list
//!   dbscope profile add --title <title> --engine <engine> --host <host> --username <user>
//!   dbscope databases <profile-id>
//!   dbscope tables <profile-id> <database>
//!   dbscope structure <profile-id> <database> [<table>...]
//!   dbscope exec <profile-id> <database> <statement>
//!
//! Examples:
//!   dbscope test sample-edu-mysql
//!   dbscope exec sample-edu-mysql edu_public_data "SELECT 1 AS x"

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use dbscope::config::ConnectorSettings;
use dbscope::services::cache::{tables_with_structure, ConnectorBackend, SchemaCache, SchemaOrchestrator};
use dbscope::services::database::traits::{ConnectionProfile, Database, EngineType, SslConfig};
use dbscope::services::database::ConnectorFactory;
use dbscope::services::storage::ProfileStore;

#[derive(Parser)]
#[command(name = "dbscope")]
#[command(about = "dbscope - one interface to MySQL, PostgreSQL and MSSQL")]
#[command(version)]
struct Cli {
    /// Profile snapshot (defaults to ~/.dbscope/profiles.json)
    #[arg(long, global = true, env = "DBSCOPE_PROFILES")]
    profiles: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage connection profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Open and close a connection
    Test {
        /// Profile id
        id: String,
    },

    /// List user databases
    Databases {
        /// Profile id
        id: String,
    },

    /// List tables of a database, with their structures
    Tables {
        /// Profile id
        id: String,

        /// Database name
        database: String,
    },

    /// Print CREATE TABLE statements
    Structure {
        /// Profile id
        id: String,

        /// Database name
        database: String,

        /// Tables to describe (all tables if omitted)
        tables: Vec<String>,
    },

    /// Run a statement verbatim
    Exec {
        /// Profile id
        id: String,

        /// Database name
        database: String,

        /// SQL statement
        statement: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List stored profiles
    List,

    /// Store a new profile
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, value_enum)]
        engine: EngineArg,

        #[arg(long)]
        host: String,

        /// Defaults to the engine's standard port
        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        username: String,

        #[arg(long, default_value = "", env = "DBSCOPE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Default database
        #[arg(long)]
        database: Option<String>,

        /// Connect over TLS
        #[arg(long)]
        tls: bool,

        /// PEM file with the CA certificate (implies --tls)
        #[arg(long)]
        ca: Option<PathBuf>,
    },

    /// Remove a profile
    Remove {
        /// Profile id
        id: String,
    },
}

#[derive(Clone, ValueEnum)]
enum EngineArg {
    Mysql,
    Postgresql,
    Mssql,
}

impl From<EngineArg> for EngineType {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Mysql => EngineType::MySQL,
            EngineArg::Postgresql => EngineType::PostgreSQL,
            EngineArg::Mssql => EngineType::MSSQL,
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dbscope=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    smol::block_on(run(cli))
}

/// Each invocation starts from an empty schema cache, so listings always come
/// from the server.
async fn run(cli: Cli) -> Result<()> {
    let path = match cli.profiles {
        Some(path) => path,
        None => ProfileStore::default_path()?,
    };
    let store = ProfileStore::load_from(&path).await?;
    let settings = ConnectorSettings::from_env();

    match cli.command {
        Commands::Profile { action } => cmd_profile(&store, &path, action).await,
        Commands::Test { id } => {
            let connector =
                ConnectorFactory::create_with_settings(find_profile(&store, &id).await?, &settings)?;
            let ok = connector.test_connection().await?;
            print_json(&serde_json::json!({ "connected": ok }))
        }
        Commands::Databases { id } => {
            let profile = find_profile(&store, &id).await?;
            let orchestrator = SchemaOrchestrator::new(
                Arc::new(SchemaCache::new()),
                store,
                ConnectorBackend::new(settings),
            );
            let databases = orchestrator
                .get_or_fetch_database_list(&profile, false)
                .await?;
            let names: Vec<&str> = databases.iter().map(|db| db.name.as_str()).collect();
            print_json(&names)
        }
        Commands::Tables { id, database } => {
            let profile = find_profile(&store, &id).await?;
            let orchestrator = SchemaOrchestrator::new(
                Arc::new(SchemaCache::new()),
                store,
                ConnectorBackend::new(settings),
            );
            let tables = orchestrator
                .get_or_fetch_database_schema(&Database::new(profile.id, database), false)
                .await?;
            print_json(&tables)
        }
        Commands::Structure {
            id,
            database,
            tables,
        } => {
            let connector =
                ConnectorFactory::create_with_settings(find_profile(&store, &id).await?, &settings)?;
            if tables.is_empty() {
                for table in tables_with_structure(connector.as_ref(), &database).await? {
                    println!("-- {}\n{}\n", table.name, table.structure);
                }
                return Ok(());
            }

            let mut structures = connector.table_structures(&database, &tables);
            while let Some(structure) = structures.next().await {
                let structure = structure?;
                println!("-- {}\n{}\n", structure.name, structure.structure);
            }
            Ok(())
        }
        Commands::Exec {
            id,
            database,
            statement,
        } => {
            let connector =
                ConnectorFactory::create_with_settings(find_profile(&store, &id).await?, &settings)?;
            let result = connector.execute(&database, &statement).await?;
            print_json(&result)
        }
    }
}

async fn cmd_profile(store: &ProfileStore, path: &Path, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::List => print_json(&store.list().await),
        ProfileAction::Add {
            title,
            engine,
            host,
            port,
            username,
            password,
            database,
            tls,
            ca,
        } => {
            let engine_type = EngineType::from(engine);
            let port = port
                .or(engine_type.default_port())
                .context("A port is required for this engine")?;

            let mut profile =
                ConnectionProfile::new(title, engine_type, host, port, username, password);
            profile.database = database;
            if let Some(ca) = ca {
                let pem = smol::fs::read_to_string(&ca)
                    .await
                    .with_context(|| format!("Failed to read {}", ca.display()))?;
                profile.ssl = Some(SslConfig {
                    ca: Some(pem),
                    ..SslConfig::default()
                });
            } else if tls {
                profile.ssl = Some(SslConfig::default());
            }

            let created = store.create_connection(profile).await;
            store.persist_to(path).await?;
            print_json(&created)
        }
        ProfileAction::Remove { id } => {
            let removed = store.remove_where(|profile| profile.id == id).await;
            if removed == 0 {
                anyhow::bail!("No connection profile with id '{}'", id);
            }
            store.persist_to(path).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
    }
}

async fn find_profile(store: &ProfileStore, id: &str) -> Result<ConnectionProfile> {
    store
        .get_connection_by_id(id)
        .await
        .with_context(|| format!("No connection profile with id '{}'", id))
}
