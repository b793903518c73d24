//! Per-term table layout and identifier sanitizing.
//!
//! Table names come from the terms file, so they are checked against an
//! allow-list (letters, digits and `_`, any script) before they are ever
//! interpolated into SQL, and always quoted.

use crate::error::{HarvestError, Result};

const MAX_TABLE_NAME_LEN: usize = 64;

/// A table identifier that passed [`sanitize_table_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier wrapped in double quotes, ready for SQL.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

/// Accept 1 to 64 Unicode letters, digits or `_`, except the reserved
/// `sqlite_` prefix.
pub fn sanitize_table_name(raw: &str) -> Result<TableName> {
    let valid = !raw.is_empty()
        && raw.chars().count() <= MAX_TABLE_NAME_LEN
        && raw.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !raw.to_ascii_lowercase().starts_with("sqlite_");
    if valid {
        Ok(TableName(raw.to_string()))
    } else {
        Err(HarvestError::InvalidTableName(raw.to_string()))
    }
}

pub fn create_table_sql(table: &TableName) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_term TEXT NOT NULL,
    category TEXT NOT NULL,
    link TEXT NOT NULL,
    title TEXT NOT NULL,
    date_created TEXT,
    date_published TEXT,
    date_modified TEXT,
    article_text TEXT
)"#,
        table.quoted()
    )
}

pub const TABLE_EXISTS_SQL: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1";

pub fn select_modified_sql(table: &TableName) -> String {
    format!("SELECT date_modified FROM {} WHERE link = ?1", table.quoted())
}

pub fn insert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (search_term, category, link, title, date_created, date_published, date_modified, article_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        table.quoted()
    )
}

pub fn update_sql(table: &TableName) -> String {
    format!(
        "UPDATE {} SET
             search_term = ?1,
             category = ?2,
             title = ?3,
             date_created = ?4,
             date_published = ?5,
             date_modified = ?6,
             article_text = ?7
         WHERE link = ?8",
        table.quoted()
    )
}
