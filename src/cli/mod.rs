//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod scrape;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use shopscrape::config::Settings;

#[derive(Parser)]
#[command(name = "shopscrape")]
#[command(about = "Scrape product catalogs into CSV files")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: discovered shopscrape.toml/json)
    #[arg(short, long, global = true, env = "SHOPSCRAPE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape categories and write one CSV file per category
    Scrape {
        /// Only scrape these categories (repeatable; default: all)
        #[arg(long = "category", short = 'C')]
        categories: Vec<String>,
        /// Directory for output files (overrides config)
        #[arg(short, long, env = "SHOPSCRAPE_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
        /// Show the browser window while loading dynamic pages
        #[arg(long)]
        headful: bool,
        /// Connect to a running Chrome DevTools endpoint instead of launching one
        #[arg(long)]
        remote_browser: Option<String>,
    },

    /// List configured categories with their resolved URLs
    Categories,

    /// Print the effective configuration as TOML
    Config,
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Scrape {
            categories,
            output_dir,
            headful,
            remote_browser,
        } => {
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            if headful {
                settings.browser.headless = false;
            }
            if remote_browser.is_some() {
                settings.browser.remote_url = remote_browser;
            }
            scrape::cmd_scrape(&settings, &categories, cli.verbose).await
        }
        Commands::Categories => config_cmd::cmd_categories(&settings),
        Commands::Config => config_cmd::cmd_config(&settings),
    }
}
