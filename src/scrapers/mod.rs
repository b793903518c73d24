//! Page fetching and HTML extraction for the news site.
//!
//! Harvesting a term is a two-phase pattern repeated page by page:
//!
//! 1. **Indexing**: read a search results page and collect article URLs
//!    ([`search`])
//! 2. **Fetching**: download each article and pull out its fields
//!    ([`article`], with timestamps normalized by [`dates`])
//!
//! Everything in the submodules is synchronous and works on HTML strings; the
//! only async seam is [`Fetch`], so parsed documents never live across an
//! `.await`.

pub mod article;
pub mod dates;
pub mod search;

use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use reqwest::Client;
use tracing::{debug, instrument};

/// Something that can GET a page and return its body as text.
pub trait Fetch {
    async fn get(&self, url: &str) -> Result<String>;
}

/// [`Fetch`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
