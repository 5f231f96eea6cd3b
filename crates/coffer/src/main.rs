//! # Coffer CLI
//!
//! Command-line entry point for the Coffer file resource service.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;

mod commands;
mod config;
mod logging;

#[derive(Parser)]
#[command(name = "coffer")]
#[command(author = "Daemoniorum Engineering")]
#[command(version)]
#[command(about = "Serve a directory as a REST file resource", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the file server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory to serve (defaults to the working directory)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Name of the item mapping document inside the root
        #[arg(long)]
        items_file: Option<String>,

        /// Fail item requests instead of treating a corrupt mapping as empty
        #[arg(long)]
        strict_items: bool,

        /// Enable permissive CORS
        #[arg(long)]
        cors: bool,

        /// Reject uploads larger than this many bytes
        #[arg(long)]
        max_upload_bytes: Option<u64>,
    },

    /// Display version and build info
    Version,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging(&cli.log_level, cli.json_logs);

    match cli.command {
        Commands::Serve {
            host,
            port,
            root,
            items_file,
            strict_items,
            cors,
            max_upload_bytes,
        } => {
            // Command-line values win over the config file and environment.
            let mut cfg = config::Config::load();
            if let Some(host) = host {
                cfg.host = host;
            }
            if let Some(port) = port {
                cfg.port = port;
            }
            if root.is_some() {
                cfg.storage_root = root;
            }
            if let Some(items_file) = items_file {
                cfg.items_file = items_file;
            }
            if max_upload_bytes.is_some() {
                cfg.max_upload_bytes = max_upload_bytes;
            }
            cfg.strict_items |= strict_items;
            cfg.cors |= cors;

            commands::serve(cfg).await?;
        },

        Commands::Version => {
            commands::version();
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                config::show_config();
            },
            ConfigAction::Path => {
                println!("{}", config::Config::config_path().display());
            },
        },
    }

    Ok(())
}
