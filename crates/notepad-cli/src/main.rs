//! Notepad CLI
//!
//! Command-line interface for Notepad - short text notes kept in local
//! storage.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use notepad_core::{Config, ExecutionContext};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

/// Log filter used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "notepad_core=warn,notepad_cli=warn";

#[derive(Parser)]
#[command(name = "notepad")]
#[command(about = "Notepad - short text notes kept in local storage")]
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
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new record
    Add {
        /// Record title (2-64 characters)
        title: String,
        /// Record description (opens editor if not provided)
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List all records
    #[command(alias = "ls")]
    List,
    /// Show record details
    Show {
        /// Record ID (full UUID or prefix)
        id: String,
    },
    /// Edit a record (prompts when no field is given)
    Edit {
        /// Record ID (full UUID or prefix)
        id: String,
        /// New title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        /// Record ID (full UUID or prefix)
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete all records
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or change the colour theme
    Theme {
        #[command(subcommand)]
        command: Option<ThemeCommands>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ThemeCommands {
    /// Show the current theme
    Show,
    /// Switch between light and dark
    Toggle,
    /// Go back to the default theme
    Reset,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, records_key, sync_across_tabs, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work on the file directly
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let ctx = commands::open_context(&config);
    debug!("Running in {}", ctx.id());

    match cli.command.unwrap_or(Commands::List) {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Theme { command } => handle_theme_command(command, &ctx, &config, &output),
        command => handle_record_command(command, &ctx, &config, &output),
    }
}

fn handle_record_command(
    command: Commands,
    ctx: &ExecutionContext,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let mut store = commands::open_records(ctx, config);

    match command {
        Commands::Add { title, description } => {
            commands::record::add(&mut store, title, description, output)
        }
        Commands::List => commands::record::list(&mut store, output),
        Commands::Show { id } => commands::record::show(&mut store, id, output),
        Commands::Edit {
            id,
            title,
            description,
        } => commands::record::edit(&mut store, id, title, description, output),
        Commands::Delete { id, yes } => commands::record::delete(&mut store, id, yes, output),
        Commands::Clear { yes } => commands::record::clear(&mut store, yes, output),
        Commands::Theme { .. } | Commands::Config { .. } => unreachable!(), // Handled in main
    }
}

fn handle_theme_command(
    command: Option<ThemeCommands>,
    ctx: &ExecutionContext,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let mut store = commands::theme::open(ctx, config);

    match command {
        Some(ThemeCommands::Show) | None => commands::theme::show(&store, output),
        Some(ThemeCommands::Toggle) => commands::theme::toggle(&mut store, output),
        Some(ThemeCommands::Reset) => commands::theme::reset(&mut store, output),
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

/// Initialize logging
///
/// Level comes from RUST_LOG, defaulting to warnings only. Logs go to
/// stderr, or to `log_file` when configured.
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let Some(ref log_path) = config.log_file else {
        let _ = builder.with_writer(std::io::stderr).try_init();
        return;
    };

    match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => {
            // Ignore error if already initialized
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            debug!("Logging to {:?}", log_path);
        }
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
