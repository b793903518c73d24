//! The ingestion pipeline: categories → terms → result pages → articles.
//!
//! [`Harvester::harvest_term`] drives one term through three states:
//!
//! 1. **Probing**: fetch result page 1. A transport failure or the site's
//!    "no content" marker ends the term with zero counts and no table.
//! 2. **Walking**: make sure the term's table exists, then walk pages 1, 2, …
//!    (page 1 reuses the probe body). Each page's distinct article links are
//!    fetched, extracted and upserted. The first page with zero qualifying
//!    links ends the term, as does reaching `max_pages`.
//! 3. **Done**: report counters.
//!
//! A single empty page is trusted: later pages are never checked. Transport
//! failures are indistinguishable from empty pages.

use crate::config::HarvestConfig;
use crate::error::Result;
use crate::models::{Catalog, RunSummary, SearchTerm, TableState, TermOutcome, UpsertOutcome};
use crate::pacing::Pacer;
use crate::scrapers::Fetch;
use crate::scrapers::article::extract_article;
use crate::scrapers::search::{ArticleUrlPattern, article_links, has_no_content_marker};
use crate::store::ArticleStore;
use crate::utils::format_elapsed;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

pub struct Harvester<F, P> {
    config: HarvestConfig,
    fetcher: F,
    pacer: P,
    store: ArticleStore,
    pattern: ArticleUrlPattern,
}

impl<F, P> Harvester<F, P>
where
    F: Fetch,
    P: Pacer,
{
    pub fn new(config: HarvestConfig, fetcher: F, pacer: P, store: ArticleStore) -> Result<Self> {
        let pattern = ArticleUrlPattern::for_site(&config.site_base_url)?;
        Ok(Self {
            config,
            fetcher,
            pacer,
            store,
            pattern,
        })
    }

    /// Harvest every term of every category, in file order.
    ///
    /// Only a storage failure while preparing a term's table stops the run;
    /// everything else is logged and the next term proceeds.
    #[instrument(level = "info", skip_all, fields(terms = catalog.term_count()))]
    pub async fn run(&self, catalog: &Catalog) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        for (category, names) in &catalog.categories {
            println!("\n--- Harvesting category: {category} ---\n");

            for name in names {
                let term = SearchTerm::new(name.as_str(), category.as_str());
                println!("Searching for: {} [Category: {}]", term.raw_name, term.category);

                let outcome = self.harvest_term(&term).await?;
                self.report_term(&term, &outcome).await;
                summary.absorb(&outcome);
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            terms = summary.terms,
            links = summary.links,
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            elapsed_secs = summary.elapsed.as_secs(),
            "Harvest complete"
        );
        Ok(summary)
    }

    /// Walk the search results for one term.
    #[instrument(level = "info", skip(self, term), fields(term = %term.raw_name, category = %term.category))]
    pub async fn harvest_term(&self, term: &SearchTerm) -> Result<TermOutcome> {
        let started = Instant::now();
        let mut outcome = TermOutcome::default();
        let query = term.query();

        let probe_url = self.config.search_url(&query, 1);
        outcome.pages_fetched += 1;
        let probe = match self.fetcher.get(&probe_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %probe_url, error = %e, "First result page failed; skipping term");
                outcome.elapsed = started.elapsed();
                return Ok(outcome);
            }
        };

        if has_no_content_marker(&probe, &self.config.no_content_marker) {
            info!("Search returned no content");
            outcome.elapsed = started.elapsed();
            return Ok(outcome);
        }

        let table_state = self.store.ensure_table(term).await?;
        outcome.table_state = Some(table_state);

        let mut pending = Some(probe);
        let mut page = 1;
        while page <= self.config.max_pages {
            let page_url = self.config.search_url(&query, page);
            let html = match pending.take() {
                Some(html) => html,
                None => {
                    outcome.pages_fetched += 1;
                    match self.fetcher.get(&page_url).await {
                        Ok(html) => html,
                        Err(e) => {
                            warn!(url = %page_url, error = %e, "Result page failed; treating as empty");
                            break;
                        }
                    }
                }
            };

            let links = self.walk_page(term, &html, &page_url, &mut outcome).await;
            if links == 0 {
                info!(page, "No more useful links");
                break;
            }

            outcome.links_found += links;
            outcome.pages_with_links += 1;
            info!(page, links, total = outcome.links_found, "Result page harvested");

            page += 1;
            if page <= self.config.max_pages {
                self.pacer.after_page().await;
            }
        }

        outcome.elapsed = started.elapsed();
        Ok(outcome)
    }

    /// Fetch, extract and store every article linked from one result page.
    ///
    /// Returns the number of distinct qualifying links processed. A failed
    /// article fetch abandons the page and reports 0.
    async fn walk_page(
        &self,
        term: &SearchTerm,
        html: &str,
        page_url: &str,
        outcome: &mut TermOutcome,
    ) -> usize {
        let links = article_links(html, page_url, &self.pattern);
        let mut visited = 0;

        for url in &links {
            let article_html = match self.fetcher.get(url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(%url, error = %e, "Article fetch failed; abandoning page");
                    return 0;
                }
            };

            let record = extract_article(&article_html, term, url);
            match self.store.upsert(&record).await {
                Ok(result) => {
                    if result == UpsertOutcome::Updated {
                        println!("-> Article updated: {url}");
                    }
                    outcome.record(result);
                }
                Err(e) => {
                    error!(%url, error = %e, "Failed to store article; skipping");
                    outcome.failed += 1;
                }
            }

            visited += 1;
            self.pacer.after_article().await;
        }

        visited
    }

    async fn report_term(&self, term: &SearchTerm, outcome: &TermOutcome) {
        if outcome.links_found == 0 {
            println!(
                "Cancelling harvest for '{}' (no useful links found).",
                term.raw_name
            );
            println!("---\n");
            return;
        }

        match outcome.table_state {
            Some(TableState::Created) => println!("Table for '{}' created.", term.raw_name),
            Some(TableState::Existing) => {
                println!("Table for '{}' already existed; checked for updates.", term.raw_name)
            }
            None => {}
        }
        println!(
            "Result pages with links: {} ({} requested)",
            outcome.pages_with_links, outcome.pages_fetched
        );
        println!(
            "Useful links found: {} ({} new, {} updated, {} unchanged, {} failed)",
            outcome.links_found, outcome.inserted, outcome.updated, outcome.unchanged, outcome.failed
        );
        match self.store.count_articles(term).await {
            Ok(stored) => println!("Articles stored for '{}': {stored}", term.raw_name),
            Err(e) => warn!(term = %term.raw_name, error = %e, "Could not count stored articles"),
        }
        println!(
            "Elapsed for '{}': {}",
            term.raw_name,
            format_elapsed(outcome.elapsed)
        );
        println!("Harvest for '{}' completed.", term.raw_name);
        println!("---\n");
    }
}

/// Print the end-of-run totals.
pub fn print_summary(summary: &RunSummary) {
    println!("\n--- Harvest finished for all categories and terms ---");
    println!("Total elapsed: {}", format_elapsed(summary.elapsed));
    println!(
        "Terms with useful links: {} of {}",
        summary.terms_with_links, summary.terms
    );
    println!("Total result pages with links: {}", summary.pages);
    println!("Total useful links found: {}", summary.links);
    println!(
        "Articles: {} new, {} updated, {} unchanged, {} failed",
        summary.inserted, summary.updated, summary.unchanged, summary.failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use crate::pacing::NoPacing;
    use crate::scrapers::article::TITLE_NOT_FOUND;
    use crate::store::StoreConfig;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const SITE: &str = "https://www.tmz.com";

    /// Serves canned pages and remembers every URL asked for.
    #[derive(Default)]
    struct FakeSite {
        pages: Mutex<HashMap<String, String>>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn serve(&self, url: impl Into<String>, body: impl Into<String>) {
            self.pages.lock().unwrap().insert(url.into(), body.into());
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn request_count(&self, url: &str) -> usize {
            self.requests().iter().filter(|r| *r == url).count()
        }
    }

    impl Fetch for &FakeSite {
        async fn get(&self, url: &str) -> Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| HarvestError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn search_url(query: &str, page: usize) -> String {
        format!("{SITE}/search/?q={query}&page={page}")
    }

    fn article_url(slug: &str) -> String {
        format!("{SITE}/2023/05/01/{slug}/")
    }

    fn search_page(slugs: &[&str]) -> String {
        let links: String = slugs
            .iter()
            .map(|slug| format!(r#"<a href="{}">{slug}</a>"#, article_url(slug)))
            .collect();
        format!(
            r#"<html><body><nav><a href="{SITE}/videos/">Videos</a></nav>{links}</body></html>"#
        )
    }

    fn article_page(title: &str, modified: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">
                {{"dateCreated": "2023-05-01T10:00:00+0000",
                  "datePublished": "2023-05-01T10:00:00+0000",
                  "dateModified": "{modified}"}}
               </script></head>
               <body><h1 class="article__header--headline-title">{title}</h1>
               <div class="article__blocks clearfix"><p>{title} body.</p></div></body></html>"#
        )
    }

    fn test_config(dir: &TempDir) -> HarvestConfig {
        HarvestConfig {
            database_path: dir.path().join("harvest.db").to_string_lossy().to_string(),
            ..Default::default()
        }
    }

    fn harvester<'a>(site: &'a FakeSite, config: &HarvestConfig) -> Harvester<&'a FakeSite, NoPacing> {
        let store = ArticleStore::new(StoreConfig::new(&config.database_path));
        Harvester::new(config.clone(), site, NoPacing, store).unwrap()
    }

    fn store(config: &HarvestConfig) -> ArticleStore {
        ArticleStore::new(StoreConfig::new(&config.database_path))
    }

    fn term() -> SearchTerm {
        SearchTerm::new("Kim Kardashian", "celebrities")
    }

    #[tokio::test]
    async fn test_no_content_marker_skips_term_without_table() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let site = FakeSite::default();
        site.serve(
            search_url("Kim+Kardashian", 1),
            "<html><body><div class='results'>No Content Found</div></body></html>",
        );

        let outcome = harvester(&site, &config).harvest_term(&term()).await.unwrap();

        assert_eq!(outcome.links_found, 0);
        assert_eq!(outcome.pages_with_links, 0);
        assert_eq!(outcome.table_state, None);
        assert_eq!(site.requests().len(), 1);
        assert!(!store(&config).has_table(&term()).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_probe_skips_term() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let site = FakeSite::default();

        let outcome = harvester(&site, &config).harvest_term(&term()).await.unwrap();

        assert_eq!(outcome.links_found, 0);
        assert_eq!(outcome.table_state, None);
        assert!(!store(&config).has_table(&term()).await.unwrap());
    }

    #[tokio::test]
    async fn test_pagination_stops_at_first_empty_page() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let site = FakeSite::default();
        site.serve(search_url("Kim+Kardashian", 1), search_page(&["a", "b"]));
        site.serve(search_url("Kim+Kardashian", 2), search_page(&["c"]));
        site.serve(search_url("Kim+Kardashian", 3), search_page(&[]));
        // Never reached: the empty page 3 ends the term.
        site.serve(search_url("Kim+Kardashian", 4), search_page(&["d"]));
        for slug in ["a", "b", "c", "d"] {
            site.serve(article_url(slug), article_page(slug, "2023-05-02T08:00:00+0000"));
        }

        let outcome = harvester(&site, &config).harvest_term(&term()).await.unwrap();

        assert_eq!(outcome.table_state, Some(TableState::Created));
        assert_eq!(outcome.pages_with_links, 2);
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.links_found, 3);
        assert_eq!(outcome.inserted, 3);
        // The probe body is reused for page 1.
        assert_eq!(site.request_count(&search_url("Kim+Kardashian", 1)), 1);
        assert_eq!(site.request_count(&search_url("Kim+Kardashian", 4)), 0);
        assert_eq!(site.request_count(&article_url("d")), 0);
        assert_eq!(store(&config).count_articles(&term()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_pagination_never_exceeds_page_cap() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let site = FakeSite::default();
        for page in 1..=25 {
            site.serve(search_url("Kim+Kardashian", page), search_page(&["same"]));
        }
        site.serve(article_url("same"), article_page("Same", "2023-05-02T08:00:00+0000"));

        let outcome = harvester(&site, &config).harvest_term(&term()).await.unwrap();

        assert_eq!(outcome.pages_with_links, 20);
        assert_eq!(outcome.pages_fetched, 20);
        assert_eq!(outcome.links_found, 20);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.unchanged, 19);
        assert_eq!(site.request_count(&search_url("Kim+Kardashian", 21)), 0);
    }

    #[tokio::test]
    async fn test_duplicate_links_on_a_page_are_visited_once() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let site = FakeSite::default();
        site.serve(search_url("Kim+Kardashian", 1), search_page(&["a", "a", "b", "a"]));
        site.serve(search_url("Kim+Kardashian", 2), search_page(&[]));
        site.serve(article_url("a"), article_page("A", "2023-05-02T08:00:00+0000"));
        site.serve(article_url("b"), article_page("B", "2023-05-02T08:00:00+0000"));

        let outcome = harvester(&site, &config).harvest_term(&term()).await.unwrap();

        assert_eq!(outcome.links_found, 2);
        assert_eq!(outcome.inserted, 2);
        assert_eq!(site.request_count(&article_url("a")), 1);
    }

    #[tokio::test]
    async fn test_failed_article_fetch_ends_page_as_empty() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let site = FakeSite::default();
        site.serve(search_url("Kim+Kardashian", 1), search_page(&["a", "missing", "b"]));
        site.serve(search_url("Kim+Kardashian", 2), search_page(&["c"]));
        site.serve(article_url("a"), article_page("A", "2023-05-02T08:00:00+0000"));
        site.serve(article_url("b"), article_page("B", "2023-05-02T08:00:00+0000"));

        let outcome = harvester(&site, &config).harvest_term(&term()).await.unwrap();

        assert_eq!(outcome.links_found, 0);
        assert_eq!(outcome.pages_with_links, 0);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(site.request_count(&article_url("b")), 0);
        assert_eq!(site.request_count(&search_url("Kim+Kardashian", 2)), 0);
    }

    #[tokio::test]
    async fn test_articles_without_markup_are_stored_with_sentinels() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let site = FakeSite::default();
        site.serve(search_url("Kim+Kardashian", 1), search_page(&["bare"]));
        site.serve(search_url("Kim+Kardashian", 2), search_page(&[]));
        site.serve(article_url("bare"), "<html><body><p>Just text</p></body></html>");

        harvester(&site, &config).harvest_term(&term()).await.unwrap();

        let stored = store(&config)
            .find_article(&term(), &article_url("bare"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.record.title, TITLE_NOT_FOUND);
    }

    fn catalog() -> Catalog {
        Catalog {
            categories: vec![
                ("celebrities".to_string(), vec!["Kim Kardashian".to_string()]),
                ("athletes".to_string(), vec!["Nobody Known".to_string()]),
            ],
        }
    }

    fn serve_catalog_site(site: &FakeSite, modified_b: &str) {
        site.serve(search_url("Kim+Kardashian", 1), search_page(&["a", "b"]));
        site.serve(search_url("Kim+Kardashian", 2), search_page(&[]));
        site.serve(article_url("a"), article_page("A", "2023-05-02T08:00:00+0000"));
        site.serve(article_url("b"), article_page("B", modified_b));
        site.serve(
            search_url("Nobody+Known", 1),
            "<html><body><p>No Content Found</p></body></html>",
        );
    }

    #[tokio::test]
    async fn test_second_run_over_unchanged_site_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let site = FakeSite::default();
        serve_catalog_site(&site, "2023-05-02T08:00:00+0000");
        let harvester = harvester(&site, &config);

        let first = harvester.run(&catalog()).await.unwrap();
        assert_eq!(first.terms, 2);
        assert_eq!(first.terms_with_links, 1);
        assert_eq!(first.inserted, 2);

        let second = harvester.run(&catalog()).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 2);
        assert_eq!(store(&config).count_articles(&term()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_changed_modification_date_updates_row() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let site = FakeSite::default();
        serve_catalog_site(&site, "2023-05-02T08:00:00+0000");
        harvester(&site, &config).run(&catalog()).await.unwrap();
        let before = store(&config)
            .find_article(&term(), &article_url("b"))
            .await
            .unwrap()
            .unwrap();

        let edited = FakeSite::default();
        serve_catalog_site(&edited, "2023-05-03T12:00:00+0000");
        let summary = harvester(&edited, &config).run(&catalog()).await.unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.unchanged, 1);
        let after = store(&config)
            .find_article(&term(), &article_url("b"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.record.modified_at, "03-05-2023 05:00:00");
        assert_eq!(store(&config).count_articles(&term()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_store_aborts_run() {
        let dir = TempDir::new().unwrap();
        let config = HarvestConfig {
            database_path: dir
                .path()
                .join("no/such/dir/harvest.db")
                .to_string_lossy()
                .to_string(),
            ..Default::default()
        };
        let site = FakeSite::default();
        serve_catalog_site(&site, "2023-05-02T08:00:00+0000");

        assert!(harvester(&site, &config).run(&catalog()).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_upsert_is_counted_and_walk_continues() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        store(&config).ensure_table(&term()).await.unwrap();
        let conn = rusqlite::Connection::open(&config.database_path).unwrap();
        conn.execute_batch(&format!(
            r#"CREATE TRIGGER reject_a BEFORE INSERT ON "Kim_Kardashian"
               WHEN NEW.link = '{}'
               BEGIN SELECT RAISE(ABORT, 'rejected'); END;"#,
            article_url("a")
        ))
        .unwrap();
        drop(conn);

        let site = FakeSite::default();
        site.serve(search_url("Kim+Kardashian", 1), search_page(&["a", "b"]));
        site.serve(search_url("Kim+Kardashian", 2), search_page(&[]));
        for slug in ["a", "b"] {
            site.serve(article_url(slug), article_page(slug, "2023-05-02T08:00:00+0000"));
        }

        let outcome = harvester(&site, &config).harvest_term(&term()).await.unwrap();

        assert_eq!(outcome.table_state, Some(TableState::Existing));
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.links_found, 2);
        assert_eq!(outcome.pages_with_links, 1);
        assert!(store(&config).find_article(&term(), &article_url("a")).await.unwrap().is_none());
        assert!(store(&config).find_article(&term(), &article_url("b")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_accented_term_gets_its_own_table() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let beyonce = SearchTerm::new("Beyoncé", "singers");
        let site = FakeSite::default();
        site.serve(search_url("Beyonc%C3%A9", 1), search_page(&["a"]));
        site.serve(search_url("Beyonc%C3%A9", 2), search_page(&[]));
        site.serve(article_url("a"), article_page("A", "2023-05-02T08:00:00+0000"));

        let outcome = harvester(&site, &config).harvest_term(&beyonce).await.unwrap();

        assert_eq!(outcome.table_state, Some(TableState::Created));
        assert_eq!(outcome.inserted, 1);
        assert_eq!(store(&config).count_articles(&beyonce).await.unwrap(), 1);
    }
}
