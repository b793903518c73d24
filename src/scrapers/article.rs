//! Article page extraction.
//!
//! Turns one article page into an [`ArticleRecord`]. Missing markup never
//! aborts extraction: each field falls back to one of the sentinel constants
//! below and the record is stored anyway.
//!
//! # Where fields come from
//!
//! | Field | Source | Fallback |
//! |-------|--------|----------|
//! | title | `h1.article__header--headline-title`, else `h1.article__header--title` | [`TITLE_NOT_FOUND`] |
//! | dates | `dateCreated` / `datePublished` / `dateModified` in the first JSON-LD block | [`DATE_NOT_FOUND`] per field, [`DATES_NOT_FOUND`] without a block |
//! | body | every `p` inside `div.article__blocks.clearfix`, space-joined | [`TEXT_NOT_FOUND`] |

use crate::models::{ArticleRecord, SearchTerm};
use crate::scrapers::dates::normalize_date;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use tracing::debug;

pub const TITLE_NOT_FOUND: &str = "Title not found";
/// One date key is missing from an otherwise present JSON-LD block.
pub const DATE_NOT_FOUND: &str = "Date not found";
/// The page has no JSON-LD block at all.
pub const DATES_NOT_FOUND: &str = "Dates not found";
pub const TEXT_NOT_FOUND: &str = "Text not found";

/// Inline elements whose text is kept (trimmed) by [`extract_text`].
const INLINE_TAGS: [&str; 5] = ["a", "strong", "em", "b", "i"];

static HEADLINE_SELECTORS: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        Selector::parse("h1.article__header--headline-title").expect("valid headline selector"),
        Selector::parse("h1.article__header--title").expect("valid headline selector"),
    ]
});
static JSON_LD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid json-ld selector")
});
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.article__blocks.clearfix").expect("valid body selector"));
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("valid paragraph selector"));

/// Flatten a mixed-content element into one string.
///
/// Only direct children are inspected: text nodes are kept verbatim, links
/// and bold/italic elements contribute their trimmed text, anything else is
/// dropped. The result is trimmed once more at the end.
///
/// Returns `None` when there is no element, which is not the same as an
/// element with no text (`Some("")`).
pub fn extract_text(node: Option<ElementRef<'_>>) -> Option<String> {
    let node = node?;
    let mut text = String::new();

    for child in node.children() {
        match child.value() {
            Node::Text(fragment) => text.push_str(fragment),
            Node::Element(element) if INLINE_TAGS.contains(&element.name()) => {
                if let Some(inline) = ElementRef::wrap(child) {
                    text.push_str(inline.text().collect::<String>().trim());
                }
            }
            _ => {}
        }
    }

    Some(text.trim().to_string())
}

/// The three JSON-LD timestamps, as published (not yet normalized).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDates {
    pub created: String,
    pub published: String,
    pub modified: String,
}

impl RawDates {
    fn all(value: &str) -> Self {
        Self {
            created: value.to_string(),
            published: value.to_string(),
            modified: value.to_string(),
        }
    }
}

pub fn extract_title(document: &Html) -> String {
    let heading = HEADLINE_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next());
    extract_text(heading).unwrap_or_else(|| TITLE_NOT_FOUND.to_string())
}

pub fn extract_dates(document: &Html) -> RawDates {
    let Some(script) = document.select(&JSON_LD_SELECTOR).next() else {
        return RawDates::all(DATES_NOT_FOUND);
    };

    let raw = script.text().collect::<String>();
    let data = match serde_json::from_str::<Value>(&raw) {
        Ok(data) => Some(data),
        Err(e) => {
            debug!(error = %e, "JSON-LD block is not valid JSON");
            None
        }
    };

    let field = |key: &str| {
        data.as_ref()
            .and_then(|data| data.get(key))
            .and_then(Value::as_str)
            .unwrap_or(DATE_NOT_FOUND)
            .to_string()
    };

    RawDates {
        created: field("dateCreated"),
        published: field("datePublished"),
        modified: field("dateModified"),
    }
}

pub fn extract_body(document: &Html) -> String {
    match document.select(&BODY_SELECTOR).next() {
        Some(container) => container
            .select(&PARAGRAPH_SELECTOR)
            .filter_map(|paragraph| extract_text(Some(paragraph)))
            .collect::<Vec<_>>()
            .join(" "),
        None => TEXT_NOT_FOUND.to_string(),
    }
}

/// Build the record for one article page.
pub fn extract_article(html: &str, term: &SearchTerm, url: &str) -> ArticleRecord {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let dates = extract_dates(&document);
    let body_text = extract_body(&document);

    debug!(
        %url,
        title = %truncate_for_log(&title, 80),
        modified = %dates.modified,
        body_bytes = body_text.len(),
        "Parsed article"
    );

    ArticleRecord {
        search_term: term.table_name(),
        category: term.category.clone(),
        url: url.to_string(),
        title,
        created_at: normalize_date(&dates.created),
        published_at: normalize_date(&dates.published),
        modified_at: normalize_date(&dates.modified),
        body_text,
    }
}
