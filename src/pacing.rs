//! Politeness delays between requests.
//!
//! The harvester never sleeps inline; it asks a [`Pacer`] instead. Production
//! runs use [`RandomPacer`], tests use [`NoPacing`].

use crate::config::HarvestConfig;
use rand::{Rng, rng};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// When and how long to pause between requests.
pub trait Pacer {
    /// Called after a search results page that yielded links.
    async fn after_page(&self);

    /// Called after each article has been fetched and stored.
    async fn after_article(&self);
}

/// Fixed pause between pages, uniformly random pause between articles.
#[derive(Debug, Clone)]
pub struct RandomPacer {
    page_delay: Duration,
    article_min: Duration,
    article_max: Duration,
}

impl RandomPacer {
    pub fn new(page_delay: Duration, article_min: Duration, article_max: Duration) -> Self {
        // Tolerate swapped bounds from a hand-edited config.
        let (article_min, article_max) = if article_min <= article_max {
            (article_min, article_max)
        } else {
            (article_max, article_min)
        };
        Self {
            page_delay,
            article_min,
            article_max,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(
            config.page_delay(),
            Duration::from_millis(config.article_delay_min_ms),
            Duration::from_millis(config.article_delay_max_ms),
        )
    }

    /// Draw the next article delay.
    pub fn article_delay(&self) -> Duration {
        let min = self.article_min.as_millis() as u64;
        let max = self.article_max.as_millis() as u64;
        Duration::from_millis(rng().random_range(min..=max))
    }
}

impl Pacer for RandomPacer {
    async fn after_page(&self) {
        debug!(delay = ?self.page_delay, "Pausing between result pages");
        sleep(self.page_delay).await;
    }

    async fn after_article(&self) {
        let delay = self.article_delay();
        debug!(?delay, "Pausing between articles");
        sleep(delay).await;
    }
}

/// Never pauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl Pacer for NoPacing {
    async fn after_page(&self) {}

    async fn after_article(&self) {}
}
