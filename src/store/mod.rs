//! SQLite persistence with one table per search term.
//!
//! Every public operation opens its own connection and drops it before
//! returning, on success and on error alike. Nothing is held across a run.
//!
//! # Upsert rules
//!
//! | Stored row | Stored `date_modified` | Action | Outcome |
//! |------------|------------------------|--------|---------|
//! | none | - | insert full record | [`UpsertOutcome::Inserted`] |
//! | exists | differs from incoming | rewrite mutable columns by `link` | [`UpsertOutcome::Updated`] |
//! | exists | equal to incoming | nothing | [`UpsertOutcome::Unchanged`] |

pub mod schema;

use crate::error::Result;
use crate::models::{ArticleRecord, SearchTerm, TableState, UpsertOutcome};
use rusqlite::{OptionalExtension, params};
use schema::sanitize_table_name;
use std::path::PathBuf;
use tokio_rusqlite::Connection;
use tracing::{debug, info, instrument};

/// Connection settings for [`ArticleStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

impl StoreConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }
}

/// A row read back from a term table.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArticle {
    /// Surrogate key; never changes once assigned.
    pub id: i64,
    pub record: ArticleRecord,
}

#[derive(Debug, Clone)]
pub struct ArticleStore {
    config: StoreConfig,
}

impl ArticleStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.config.database_path).await?)
    }

    /// Create the term's table unless it already exists.
    #[instrument(level = "debug", skip_all, fields(table = %term.table_name()))]
    pub async fn ensure_table(&self, term: &SearchTerm) -> Result<TableState> {
        let table = sanitize_table_name(&term.table_name())?;
        let conn = self.connect().await?;

        let state = conn
            .call(move |conn| {
                let count: i64 =
                    conn.query_row(schema::TABLE_EXISTS_SQL, params![table.as_str()], |row| {
                        row.get(0)
                    })?;
                if count > 0 {
                    return Ok(TableState::Existing);
                }
                conn.execute_batch(&schema::create_table_sql(&table))?;
                Ok(TableState::Created)
            })
            .await?;

        match state {
            TableState::Created => info!(term = %term.raw_name, "Created table"),
            TableState::Existing => debug!(term = %term.raw_name, "Table already exists"),
        }
        Ok(state)
    }

    /// Insert, update or skip one record, keyed by its URL.
    ///
    /// The lookup and the write share one transaction.
    #[instrument(level = "debug", skip_all, fields(table = %record.search_term, url = %record.url))]
    pub async fn upsert(&self, record: &ArticleRecord) -> Result<UpsertOutcome> {
        let table = sanitize_table_name(&record.search_term)?;
        let record = record.clone();
        let conn = self.connect().await?;

        let outcome = conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let stored: Option<Option<String>> = tx
                    .query_row(
                        &schema::select_modified_sql(&table),
                        params![record.url],
                        |row| row.get(0),
                    )
                    .optional()?;

                let outcome = match stored {
                    None => {
                        tx.execute(
                            &schema::insert_sql(&table),
                            params![
                                record.search_term,
                                record.category,
                                record.url,
                                record.title,
                                record.created_at,
                                record.published_at,
                                record.modified_at,
                                record.body_text,
                            ],
                        )?;
                        UpsertOutcome::Inserted
                    }
                    Some(modified) if modified.as_deref() != Some(record.modified_at.as_str()) => {
                        tx.execute(
                            &schema::update_sql(&table),
                            params![
                                record.search_term,
                                record.category,
                                record.title,
                                record.created_at,
                                record.published_at,
                                record.modified_at,
                                record.body_text,
                                record.url,
                            ],
                        )?;
                        UpsertOutcome::Updated
                    }
                    Some(_) => UpsertOutcome::Unchanged,
                };
                tx.commit()?;
                Ok(outcome)
            })
            .await?;

        debug!(?outcome, "Upserted article");
        Ok(outcome)
    }

    /// Number of rows in the term's table.
    pub async fn count_articles(&self, term: &SearchTerm) -> Result<usize> {
        let table = sanitize_table_name(&term.table_name())?;
        let conn = self.connect().await?;
        let count = conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {}", table.quoted()),
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Look up one stored article by URL.
    #[cfg(test)]
    pub async fn find_article(&self, term: &SearchTerm, url: &str) -> Result<Option<StoredArticle>> {
        let table = sanitize_table_name(&term.table_name())?;
        let url = url.to_string();
        let conn = self.connect().await?;
        let article = conn
            .call(move |conn| {
                let article = conn
                    .query_row(
                        &format!(
                            "SELECT id, search_term, category, link, title, date_created,
                                    date_published, date_modified, article_text
                             FROM {} WHERE link = ?1",
                            table.quoted()
                        ),
                        params![url],
                        stored_article_from_row,
                    )
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Whether the term's table exists.
    #[cfg(test)]
    pub async fn has_table(&self, term: &SearchTerm) -> Result<bool> {
        let table = sanitize_table_name(&term.table_name())?;
        let conn = self.connect().await?;
        let exists = conn
            .call(move |conn| {
                let count: i64 =
                    conn.query_row(schema::TABLE_EXISTS_SQL, params![table.as_str()], |row| {
                        row.get(0)
                    })?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
fn stored_article_from_row(row: &rusqlite::Row) -> rusqlite::Result<StoredArticle> {
    Ok(StoredArticle {
        id: row.get(0)?,
        record: ArticleRecord {
            search_term: row.get(1)?,
            category: row.get(2)?,
            url: row.get(3)?,
            title: row.get(4)?,
            created_at: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            published_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            modified_at: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            body_text: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        },
    })
}
