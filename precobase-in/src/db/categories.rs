//! Category taxonomy persistence
//!
//! Read-mostly lookups for the classifier plus the atomic `item_count`
//! maintenance used by the pipeline.

use precobase_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Category, CategoryKind};

use super::{keywords_from_json, keywords_to_json, parse_timestamp, parse_uuid};

fn category_from_row(row: &SqliteRow) -> Result<Category> {
    let id: String = row.get("id");
    let kind: String = row.get("kind");
    let keywords: String = row.get("keywords");
    let common_units: String = row.get("common_units");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Category {
        id: parse_uuid(&id, "categories.id")?,
        code: row.get("code"),
        name: row.get("name"),
        kind: CategoryKind::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("unknown category kind: {}", kind)))?,
        parent_code: row.get("parent_code"),
        level: row.get("level"),
        keywords: keywords_from_json(&keywords),
        common_units: keywords_from_json(&common_units),
        active: row.get::<i64, _>("active") != 0,
        item_count: row.get("item_count"),
        created_at: parse_timestamp(&created_at, "categories.created_at")?,
        updated_at: parse_timestamp(&updated_at, "categories.updated_at")?,
    })
}

/// Insert or update a category, keyed by code
pub async fn upsert_category(pool: &SqlitePool, category: &Category) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO categories (
            id, code, name, kind, parent_code, level, keywords, common_units,
            active, item_count, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(code) DO UPDATE SET
            name = excluded.name,
            kind = excluded.kind,
            parent_code = excluded.parent_code,
            level = excluded.level,
            keywords = excluded.keywords,
            common_units = excluded.common_units,
            active = excluded.active,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(category.id.to_string())
    .bind(&category.code)
    .bind(&category.name)
    .bind(category.kind.as_str())
    .bind(&category.parent_code)
    .bind(category.level)
    .bind(keywords_to_json(&category.keywords))
    .bind(keywords_to_json(&category.common_units))
    .bind(category.active as i64)
    .bind(category.item_count)
    .bind(category.created_at.to_rfc3339())
    .bind(category.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up a category by taxonomy code, active or not
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT * FROM categories WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(category_from_row).transpose()
}

/// Active categories of one kind, alphabetical, capped at `limit`
pub async fn find_by_kind_active(
    pool: &SqlitePool,
    kind: CategoryKind,
    limit: i64,
) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM categories
        WHERE kind = ? AND active = 1
        ORDER BY name ASC
        LIMIT ?
        "#,
    )
    .bind(kind.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(category_from_row).collect()
}

/// Active categories whose name contains any of `terms`
/// (case-insensitive). Empty `terms` matches nothing.
pub async fn search_by_name_contains(
    pool: &SqlitePool,
    terms: &[String],
    limit: i64,
) -> Result<Vec<Category>> {
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let clauses = vec!["instr(lower(name), ?) > 0"; terms.len()].join(" OR ");
    let sql = format!(
        "SELECT * FROM categories WHERE active = 1 AND ({}) ORDER BY name ASC LIMIT ?",
        clauses
    );

    let mut query = sqlx::query(&sql);
    for term in terms {
        query = query.bind(term.to_lowercase());
    }
    let rows = query.bind(limit).fetch_all(pool).await?;

    rows.iter().map(category_from_row).collect()
}

/// Shift a category's denormalized record count by `delta`, clamped at
/// zero. A single UPDATE so concurrent shifts never lose increments.
pub async fn adjust_item_count(pool: &SqlitePool, category_id: Uuid, delta: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE categories
        SET item_count = MAX(0, item_count + ?), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(delta)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(category_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}
