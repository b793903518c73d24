//! Command-line interface definitions for the harvester.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Paths can also be provided via environment variables.

use crate::config::HarvestConfig;
use clap::Parser;

/// Command-line arguments for the harvester.
///
/// Flags given here override the matching settings from the config file.
///
/// # Examples
///
/// ```sh
/// # Harvest the terms in ./terms.json into ./harvest.db with default settings
/// term_harvester
///
/// # Custom files and a shallower crawl
/// term_harvester -t names.json -c config.yaml -d /var/lib/harvest.db --max-pages 5
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON file mapping category names to lists of search terms
    #[arg(short, long, env = "HARVEST_TERMS", default_value = "terms.json")]
    pub terms: String,

    /// Optional path to config.yaml file
    #[arg(short, long, env = "HARVEST_CONFIG")]
    pub config: Option<String>,

    /// SQLite database file (overrides `database_path` from the config file)
    #[arg(short, long, env = "HARVEST_DATABASE")]
    pub database: Option<String>,

    /// Highest search results page to request per term (overrides `max_pages`)
    #[arg(long)]
    pub max_pages: Option<usize>,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
    }
}
