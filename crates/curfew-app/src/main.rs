//! Curfew - hour-of-day sale restrictions for storefront categories.
//!
//! This is the main binary:
//! - `serve` runs the HTTP API the storefront calls
//! - the other subcommands inspect and edit the settings and catalog

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use curfew_app::commands;
use curfew_core::{ProductId, TimeOfDay};
use curfew_server::{AppState, Server, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use curfew_storage::Database;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Curfew - block restricted categories during a daily time window
#[derive(Parser, Debug)]
#[command(name = "curfew", version, about)]
struct Args {
    /// Database path (default: platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable debug logging (also logs to the console)
    #[arg(long, global = true)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        /// Port to bind to
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Show the effective restriction state
    Status {
        /// Evaluate at this time instead of now (HH:MM)
        #[arg(long)]
        at: Option<TimeOfDay>,
    },

    /// Check whether a product can be bought
    Check {
        product_id: ProductId,

        /// Evaluate at this time instead of now (HH:MM)
        #[arg(long)]
        at: Option<TimeOfDay>,
    },

    /// Inspect or change restriction settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Manage categories and product membership
    #[command(subcommand)]
    Catalog(CatalogCommand),
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print every setting
    Show,

    /// Store a setting (key with or without the curfew_ prefix)
    Set { key: String, value: String },

    /// Remove a setting so its default applies
    Reset { key: String },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Add or rename a category
    AddCategory { slug: String, name: String },

    /// Delete a category and its product assignments
    RemoveCategory { slug: String },

    /// Replace a product's categories, in order
    Assign {
        product_id: ProductId,
        #[arg(required = true)]
        slugs: Vec<String>,
    },

    /// List all categories
    List,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "curfew", "curfew").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("curfew={},warn", log_level)));

    // The server logs to the console too; one-shot commands keep stdout for their report
    let console = args.debug || matches!(args.command, Command::Serve { .. });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("curfew")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                if console {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stderr))
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                }

                tracing::debug!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

fn open_database(path: Option<&PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::with_path(path),
        None => Database::new(),
    };
    db.map_err(|e| anyhow::anyhow!("Database error: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(&args);
    tracing::debug!("Args: {:?}", args);

    let db = open_database(args.db.as_ref())?;

    match args.command {
        Command::Serve { host, port } => {
            tracing::info!("Starting Curfew...");
            let state = AppState::new(db)?;
            let config = ServerConfig {
                host,
                port,
                db_path: args.db.map(|p| p.display().to_string()),
            };
            Server::with_state(config, state)?.run().await?;
            tracing::info!("Curfew shutting down");
        }
        Command::Status { at } => {
            println!("{}", commands::status(&db, at)?);
        }
        Command::Check { product_id, at } => {
            println!("{}", commands::check_product(&db, product_id, at)?);
        }
        Command::Settings(SettingsCommand::Show) => {
            for (key, value) in commands::show_settings(&db)? {
                match value {
                    Some(value) => println!("{key} = {value}"),
                    None => println!("{key} (default)"),
                }
            }
        }
        Command::Settings(SettingsCommand::Set { key, value }) => {
            let stored = commands::set_setting(&db, &key, &value)?;
            println!("{key} = {stored}");
        }
        Command::Settings(SettingsCommand::Reset { key }) => {
            if commands::reset_setting(&db, &key)? {
                println!("{key} reset to default");
            } else {
                println!("{key} was not set");
            }
        }
        Command::Catalog(CatalogCommand::AddCategory { slug, name }) => {
            let category = commands::add_category(&db, &slug, &name)?;
            println!("{} ({})", category.slug, category.name);
        }
        Command::Catalog(CatalogCommand::RemoveCategory { slug }) => {
            commands::remove_category(&db, &slug)?;
            println!("{slug} removed");
        }
        Command::Catalog(CatalogCommand::Assign { product_id, slugs }) => {
            commands::assign_product(&db, product_id, &slugs)?;
            println!("product {product_id}: {}", slugs.join(", "));
        }
        Command::Catalog(CatalogCommand::List) => {
            for category in db.get_all_categories()? {
                println!("{}\t{}", category.slug, category.name);
            }
        }
    }

    Ok(())
}
