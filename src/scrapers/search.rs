//! Search results page parsing.
//!
//! Article URLs on the site look like `https://www.tmz.com/2024/03/18/slug/`:
//! the site base followed by a four-digit year segment. Everything else on a
//! results page (navigation, tags, video hubs) is ignored.

use crate::error::Result;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node, Selector};
use tracing::debug;
use url::Url;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Matches article URLs for one site.
#[derive(Debug, Clone)]
pub struct ArticleUrlPattern {
    regex: Regex,
}

impl ArticleUrlPattern {
    pub fn for_site(site_base_url: &str) -> Result<Self> {
        let base = regex::escape(site_base_url.trim_end_matches('/'));
        let regex = Regex::new(&format!(r"^{base}/\d{{4}}/"))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

/// Distinct article URLs on one results page, in first-seen order.
///
/// Relative hrefs are resolved against `page_url` before matching.
pub fn article_links(html: &str, page_url: &str, pattern: &ArticleUrlPattern) -> Vec<String> {
    let base = Url::parse(page_url).ok();
    let document = Html::parse_document(html);

    let links: Vec<String> = document
        .select(&LINK_SELECTOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok().map(String::from),
            None => Some(href.to_string()),
        })
        .filter(|url| pattern.matches(url))
        .unique()
        .collect();

    debug!(count = links.len(), %page_url, "Indexed article links");
    links
}

/// Whether the page carries the site's "no results" text as a whole text node.
pub fn has_no_content_marker(html: &str, marker: &str) -> bool {
    let document = Html::parse_document(html);
    document
        .tree
        .values()
        .any(|node| matches!(node, Node::Text(text) if text.trim() == marker))
}
