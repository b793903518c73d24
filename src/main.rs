//! # Term Harvester
//!
//! A scheduled crawler that searches a celebrity news site for a list of
//! people, extracts every matching article and keeps a per-person SQLite
//! table up to date.
//!
//! ## Features
//!
//! - Reads the people to monitor from a JSON file grouped by category
//! - Walks the site's paginated search results until a page has no articles
//! - Extracts title, creation/publication/modification dates and body text
//! - Inserts new articles and rewrites changed ones, keyed by URL
//! - Paces requests with a fixed page delay and a jittered article delay
//!
//! ## Usage
//!
//! ```sh
//! term_harvester -t terms.json -d harvest.db
//! ```
//!
//! ## Architecture
//!
//! For every term, in file order:
//! 1. **Probe**: Fetch the first results page and check for the no-content marker
//! 2. **Prepare**: Create the term's table if it does not exist yet
//! 3. **Walk**: Collect article links page by page and extract each article
//! 4. **Store**: Upsert each record and report per-term counters

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod harvest;
mod models;
mod pacing;
mod scrapers;
mod store;
mod utils;

use cli::Cli;
use config::{HarvestConfig, load_catalog};
use harvest::{Harvester, print_summary};
use pacing::RandomPacer;
use scrapers::HttpFetcher;
use store::{ArticleStore, StoreConfig};
use utils::format_elapsed;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("term_harvester starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.terms, ?args.config, ?args.database, "Parsed CLI arguments");

    // --- Configuration ---
    let mut config = match HarvestConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    args.apply(&mut config);
    debug!(?config, "Effective configuration");

    let catalog = match load_catalog(&args.terms) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(path = %args.terms, error = %e, "Failed to load terms file");
            return Err(e.into());
        }
    };
    info!(
        categories = catalog.categories.len(),
        terms = catalog.term_count(),
        "Loaded search terms"
    );

    // --- Harvest ---
    let store = ArticleStore::new(StoreConfig::new(&config.database_path));
    let fetcher = HttpFetcher::new(&config)?;
    let pacer = RandomPacer::from_config(&config);
    let harvester = Harvester::new(config, fetcher, pacer, store)?;

    let summary = match harvester.run(&catalog).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Harvest aborted");
            return Err(e.into());
        }
    };
    print_summary(&summary);

    info!(
        elapsed = %format_elapsed(start_time.elapsed()),
        "term_harvester finished"
    );
    Ok(())
}
