//! bookfolk CLI
//!
//! Command-line interface for bookfolk - track the books you read, the
//! quotes you keep and how much you read each month.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bookfolk_core::{App, Config};

mod catalog;
mod commands;
mod editor;
mod output;

use catalog::Catalog;
use commands::book::{AddArgs, ListFilter};
use output::{Output, OutputFormat};

/// Log level variable; defaults to info
const LOG_ENV: &str = "BOOKFOLK_LOG";

#[derive(Parser)]
#[command(name = "bookfolk")]
#[command(about = "bookfolk - Track your reading")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in (or create an account with --signup)
    Login {
        #[arg(short, long)]
        email: Option<String>,
        /// Create a new account
        #[arg(long)]
        signup: bool,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage books
    Book {
        #[command(subcommand)]
        command: BookCommands,
    },
    /// Manage quotes
    Quote {
        #[command(subcommand)]
        command: QuoteCommands,
    },
    /// Reading summary for a month
    Stats {
        /// Month to report on (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Books read per month
    Chart {
        /// Only count this year (default: all years combined)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Find cover images for books that have none
    Covers,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum BookCommands {
    /// Add a book
    #[command(alias = "create")]
    Add(AddArgs),
    /// List books
    #[command(alias = "ls")]
    List(ListFilter),
    /// Show book details (including quotes)
    Show {
        /// Book ID (full or prefix)
        id: String,
        /// Open the cover image
        #[arg(long)]
        open_cover: bool,
    },
    /// Mark a book as read
    Complete {
        /// Book ID (full or prefix)
        id: String,
        /// Date finished (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Mark as still reading instead
        #[arg(long, conflicts_with = "date")]
        undo: bool,
    },
    /// Toggle favorite
    #[command(alias = "fav")]
    Favorite {
        /// Book ID (full or prefix)
        id: String,
    },
    /// Delete a book
    #[command(alias = "rm")]
    Delete {
        /// Book ID (full or prefix)
        id: String,
    },
    /// Search the book catalog
    Search {
        query: String,
        /// Maximum results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum QuoteCommands {
    /// Add a quote to a book
    Add {
        /// Book ID (full or prefix)
        book_id: String,
        /// Quote text (opens editor if not provided)
        text: Option<String>,
        /// Page number
        #[arg(short, long)]
        page: Option<u32>,
        /// Your notes on the quote
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// List quotes (all books, or one)
    #[command(alias = "ls")]
    List {
        /// Book ID (full or prefix)
        book_id: Option<String>,
    },
    /// Remove a quote from a book
    #[command(alias = "delete")]
    Rm {
        /// Book ID (full or prefix)
        book_id: String,
        /// Quote ID (full or prefix)
        quote_id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, backend, api_key, project_id,
        /// catalog_api_key, request_timeout_secs, log_file)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work without a backend
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let mut app = App::from_config(&config).context("Failed to open the book store")?;
    if let Err(e) = app.restore().await {
        warn!(error = %e, "could not restore session");
        output.warn(&format!("Could not restore your session: {}", e.user_message()));
    }

    let catalog = Catalog::new(config.catalog_api_key.clone(), config.request_timeout_secs)?;

    match cli.command {
        Commands::Login { email, signup } => {
            commands::auth::login(&mut app, email, signup, &output).await
        }
        Commands::Logout => commands::auth::logout(&mut app, &output).await,
        Commands::Whoami => commands::auth::whoami(&app, &output),
        Commands::Book { command } => handle_book_command(command, &mut app, &catalog, &output).await,
        Commands::Quote { command } => handle_quote_command(command, &mut app, &output).await,
        Commands::Stats { month } => commands::stats::summary(&mut app, month, &output).await,
        Commands::Chart { year } => commands::stats::chart(&mut app, year, &output).await,
        Commands::Covers => commands::book::covers(&mut app, &catalog, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

async fn handle_book_command(
    command: BookCommands,
    app: &mut App,
    catalog: &Catalog,
    output: &Output,
) -> Result<()> {
    match command {
        BookCommands::Add(args) => commands::book::add(app, catalog, args, output).await,
        BookCommands::List(filter) => commands::book::list(app, filter, output).await,
        BookCommands::Show { id, open_cover } => {
            commands::book::show(app, id, open_cover, output).await
        }
        BookCommands::Complete { id, date, undo } => {
            commands::book::complete(app, id, date, undo, output).await
        }
        BookCommands::Favorite { id } => commands::book::favorite(app, id, output).await,
        BookCommands::Delete { id } => commands::book::delete(app, id, output).await,
        BookCommands::Search { query, limit } => {
            commands::book::search(catalog, query, limit, output).await
        }
    }
}

async fn handle_quote_command(command: QuoteCommands, app: &mut App, output: &Output) -> Result<()> {
    match command {
        QuoteCommands::Add {
            book_id,
            text,
            page,
            notes,
        } => commands::quote::add(app, book_id, text, page, notes, output).await,
        QuoteCommands::List { book_id } => commands::quote::list(app, book_id, output).await,
        QuoteCommands::Rm { book_id, quote_id } => {
            commands::quote::remove(app, book_id, quote_id, output).await
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize file logging
///
/// Appends to config.log_file (default {data_dir}/bookfolk.log) at the
/// level in BOOKFOLK_LOG. Logging never goes to the terminal.
fn init_logging(config: &Config) {
    let log_level = std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    let log_path = config.log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "bookfolk_core={},bookfolk={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    info!(backend = %config.backend, "bookfolk starting");
}
