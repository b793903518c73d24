//! Runtime configuration and the terms file.
//!
//! Settings come from an optional `config.yaml`; every field has a default so
//! the file may be partial or absent. The terms file is a JSON object mapping
//! category names to ordered lists of search terms.
//!
//! ```yaml
//! site_base_url: https://www.tmz.com
//! database_path: harvest.db
//! max_pages: 20
//! page_delay_ms: 1000
//! article_delay_min_ms: 1000
//! article_delay_max_ms: 3000
//! ```

use crate::error::{HarvestError, Result};
use crate::models::{Catalog, SearchTerm};
use crate::store::schema::sanitize_table_name;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Harvester settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Scheme and host of the news site, without a trailing slash.
    pub site_base_url: String,
    /// SQLite database file holding one table per term.
    pub database_path: String,
    /// Highest search page ever requested for one term.
    pub max_pages: usize,
    /// Pause after each result page that yielded links.
    pub page_delay_ms: u64,
    /// Lower bound of the randomized pause after each article.
    pub article_delay_min_ms: u64,
    /// Upper bound of the randomized pause after each article.
    pub article_delay_max_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Text the site shows on a search page with no results.
    pub no_content_marker: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            site_base_url: "https://www.tmz.com".to_string(),
            database_path: "harvest.db".to_string(),
            // Results repeat beyond page 20.
            max_pages: 20,
            page_delay_ms: 1_000,
            article_delay_min_ms: 1_000,
            article_delay_max_ms: 3_000,
            request_timeout_secs: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
            no_content_marker: "No Content Found".to_string(),
        }
    }
}

impl HarvestConfig {
    /// Load settings from a YAML file, or defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        info!(path, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let mut config: HarvestConfig = serde_yaml::from_str(raw)?;
        config.site_base_url = config.site_base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// URL of one search results page.
    pub fn search_url(&self, query: &str, page: usize) -> String {
        format!("{}/search/?q={}&page={}", self.site_base_url, query, page)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Read and validate the terms file.
///
/// Aborts on unreadable or malformed input, and on any term whose table
/// identifier would be rejected by the store, so a bad entry fails the run
/// before any request is made.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let catalog = parse_catalog(&raw)?;
    info!(
        categories = catalog.categories.len(),
        terms = catalog.term_count(),
        "Loaded terms file"
    );
    Ok(catalog)
}

pub fn parse_catalog(raw: &str) -> Result<Catalog> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let serde_json::Value::Object(map) = value else {
        return Err(HarvestError::Catalog(
            "expected an object mapping category names to term lists".to_string(),
        ));
    };

    let mut catalog = Catalog::default();
    for (category, names) in map {
        let names: Vec<String> = serde_json::from_value(names).map_err(|e| {
            HarvestError::Catalog(format!("category {category:?} is not a list of strings: {e}"))
        })?;
        for name in &names {
            sanitize_table_name(&SearchTerm::new(name.as_str(), category.as_str()).table_name())?;
        }
        catalog.categories.push((category, names));
    }
    Ok(catalog)
}
