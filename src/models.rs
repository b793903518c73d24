//! Data models for search terms, harvested articles and run statistics.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SearchTerm`]: one subject to monitor, with its query and table forms
//! - [`Catalog`]: the ordered category → terms list loaded at startup
//! - [`ArticleRecord`]: one extracted article, ready to be upserted
//! - [`TableState`], [`UpsertOutcome`]: what the store did with a request
//! - [`TermOutcome`], [`RunSummary`]: counters reported per term and per run

use std::time::Duration;

/// A search term as read from the terms file.
///
/// The raw name is what a human typed (`"Kim Kardashian"`). Two derived
/// forms are used downstream:
///
/// * [`SearchTerm::query`] for the search URL (`Kim+Kardashian`)
/// * [`SearchTerm::table_name`] for the storage table (`Kim_Kardashian`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    /// The term exactly as listed in the terms file.
    pub raw_name: String,
    /// The category (group) the term was listed under.
    pub category: String,
}

impl SearchTerm {
    pub fn new(raw_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
            category: category.into(),
        }
    }

    /// Query-string form: words percent-encoded and joined with `+`.
    pub fn query(&self) -> String {
        self.raw_name
            .split(' ')
            .map(|word| urlencoding::encode(word).into_owned())
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Storage form: words joined with `_`.
    ///
    /// Not validated here; [`crate::store::schema::sanitize_table_name`]
    /// decides whether the result is usable as an identifier.
    pub fn table_name(&self) -> String {
        self.raw_name.replace(' ', "_")
    }
}

/// The ordered list of categories and their terms.
///
/// Category order and term order follow the terms file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub categories: Vec<(String, Vec<String>)>,
}

impl Catalog {
    pub fn term_count(&self) -> usize {
        self.categories.iter().map(|(_, names)| names.len()).sum()
    }
}

/// One article as extracted from its page.
///
/// Every text field is always populated: missing markup is replaced by the
/// sentinel constants in [`crate::scrapers::article`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    /// Table identifier of the term that discovered the article.
    pub search_term: String,
    pub category: String,
    /// Article URL; the natural key inside a term's table.
    pub url: String,
    pub title: String,
    pub created_at: String,
    pub published_at: String,
    /// Change-detection key: a row is rewritten only when this differs.
    pub modified_at: String,
    pub body_text: String,
}

/// Which branch `ensure_table` took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Created,
    Existing,
}

/// Which branch `upsert` took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The URL was new; a row was inserted.
    Inserted,
    /// The stored `date_modified` differed; mutable columns were rewritten.
    Updated,
    /// The stored `date_modified` matched; nothing was written.
    Unchanged,
}

/// Counters for one term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermOutcome {
    /// Result pages that yielded at least one qualifying link.
    pub pages_with_links: usize,
    /// Result pages requested, including the probe and the terminating page.
    pub pages_fetched: usize,
    /// Distinct qualifying links processed across all pages.
    pub links_found: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Upserts that failed and were skipped.
    pub failed: usize,
    /// `None` when the term had no content and no table was touched.
    pub table_state: Option<TableState>,
    pub elapsed: Duration,
}

impl TermOutcome {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Aggregate counters for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub terms: usize,
    /// Terms that produced at least one link.
    pub terms_with_links: usize,
    pub pages: usize,
    pub links: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn absorb(&mut self, term: &TermOutcome) {
        self.terms += 1;
        if term.links_found > 0 {
            self.terms_with_links += 1;
        }
        self.pages += term.pages_with_links;
        self.links += term.links_found;
        self.inserted += term.inserted;
        self.updated += term.updated;
        self.unchanged += term.unchanged;
        self.failed += term.failed;
    }
}
