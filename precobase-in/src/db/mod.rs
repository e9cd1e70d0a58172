//! Database access for precobase-in
//!
//! Free async functions over a shared `SqlitePool`, one module per table.
//! The schema is bootstrapped idempotently at startup.

pub mod categories;
pub mod records;
pub mod settings;
pub mod source_items;

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use precobase_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Open the service database and make sure all tables exist
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = precobase_common::db::init_pool(db_path).await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create the precobase-in tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            parent_code TEXT,
            level INTEGER NOT NULL DEFAULT 1,
            keywords TEXT NOT NULL DEFAULT '[]',
            common_units TEXT NOT NULL DEFAULT '[]',
            active INTEGER NOT NULL DEFAULT 1,
            item_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS source_items (
            id TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT '',
            quantity REAL,
            unit_price REAL,
            total_value REAL,
            source TEXT NOT NULL,
            source_reference TEXT,
            price_date TEXT,
            region TEXT,
            pre_classified_code TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS normalized_records (
            id TEXT PRIMARY KEY,
            original_item_id TEXT NOT NULL UNIQUE,
            category_id TEXT,
            normalized_description TEXT NOT NULL,
            normalized_unit TEXT NOT NULL,
            normalized_price REAL,
            confidence REAL NOT NULL,
            method TEXT NOT NULL,
            requires_review INTEGER NOT NULL DEFAULT 0,
            manually_reviewed INTEGER NOT NULL DEFAULT 0,
            reviewed_by TEXT,
            reviewed_at TEXT,
            review_notes TEXT,
            keywords TEXT NOT NULL DEFAULT '[]',
            estimated_kind TEXT NOT NULL,
            processing_time_ms INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_records_review
            ON normalized_records (requires_review, manually_reviewed, confidence)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_records_category
            ON normalized_records (category_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

// Columns are stored as TEXT; these map decode failures onto the
// common error type with the column name attached.

pub(crate) fn parse_uuid(value: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("invalid uuid in {}: {}", column, e)))
}

pub(crate) fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("invalid timestamp in {}: {}", column, e)))
}

pub(crate) fn parse_date(value: &str, column: &str) -> Result<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .map_err(|e| Error::Internal(format!("invalid date in {}: {}", column, e)))
}

pub(crate) fn keywords_to_json(keywords: &[String]) -> String {
    serde_json::to_string(keywords).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn keywords_from_json(value: &str) -> Vec<String> {
    serde_json::from_str(value).unwrap_or_default()
}

// max_connections(1) keeps every query on the one connection that owns
// the shared in-memory database.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();
    pool
}
