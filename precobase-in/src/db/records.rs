//! Normalized record persistence
//!
//! One row per source item (UNIQUE original_item_id). Rows are replaced
//! whole by reprocessing and mutated only through manual review.

use precobase_common::{Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{CategoryKind, ClassificationMethod, NormalizedRecord};

use super::{keywords_from_json, keywords_to_json, parse_timestamp, parse_uuid};

/// Review-queue row: the record joined with the raw item it normalizes
/// and the name of its current category, for display to the reviewer
#[derive(Debug, Clone, Serialize)]
pub struct ReviewQueueEntry {
    pub record: NormalizedRecord,
    pub original_description: String,
    pub original_unit: String,
    pub category_code: Option<String>,
    pub category_name: Option<String>,
}

/// Totals feeding pipeline statistics
#[derive(Debug, Clone, Copy)]
pub struct RecordAggregates {
    pub total: i64,
    pub review_pending: i64,
    pub review_completed: i64,
    pub average_confidence: f64,
}

fn record_from_row(row: &SqliteRow) -> Result<NormalizedRecord> {
    let id: String = row.get("id");
    let original_item_id: String = row.get("original_item_id");
    let category_id: Option<String> = row.get("category_id");
    let method: String = row.get("method");
    let reviewed_at: Option<String> = row.get("reviewed_at");
    let keywords: String = row.get("keywords");
    let estimated_kind: String = row.get("estimated_kind");
    let created_at: String = row.get("created_at");

    Ok(NormalizedRecord {
        id: parse_uuid(&id, "normalized_records.id")?,
        original_item_id: parse_uuid(&original_item_id, "normalized_records.original_item_id")?,
        category_id: category_id
            .map(|v| parse_uuid(&v, "normalized_records.category_id"))
            .transpose()?,
        normalized_description: row.get("normalized_description"),
        normalized_unit: row.get("normalized_unit"),
        normalized_price: row.get("normalized_price"),
        confidence: row.get("confidence"),
        method: ClassificationMethod::parse(&method)
            .ok_or_else(|| Error::Internal(format!("unknown classification method: {}", method)))?,
        requires_review: row.get::<i64, _>("requires_review") != 0,
        manually_reviewed: row.get::<i64, _>("manually_reviewed") != 0,
        reviewed_by: row.get("reviewed_by"),
        reviewed_at: reviewed_at
            .map(|v| parse_timestamp(&v, "normalized_records.reviewed_at"))
            .transpose()?,
        review_notes: row.get("review_notes"),
        keywords: keywords_from_json(&keywords),
        estimated_kind: CategoryKind::parse(&estimated_kind)
            .ok_or_else(|| Error::Internal(format!("unknown estimated kind: {}", estimated_kind)))?,
        processing_time_ms: row.get("processing_time_ms"),
        created_at: parse_timestamp(&created_at, "normalized_records.created_at")?,
    })
}

pub async fn insert_record(pool: &SqlitePool, record: &NormalizedRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO normalized_records (
            id, original_item_id, category_id, normalized_description,
            normalized_unit, normalized_price, confidence, method,
            requires_review, manually_reviewed, reviewed_by, reviewed_at,
            review_notes, keywords, estimated_kind, processing_time_ms,
            created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.original_item_id.to_string())
    .bind(record.category_id.map(|id| id.to_string()))
    .bind(&record.normalized_description)
    .bind(&record.normalized_unit)
    .bind(record.normalized_price)
    .bind(record.confidence)
    .bind(record.method.as_str())
    .bind(record.requires_review as i64)
    .bind(record.manually_reviewed as i64)
    .bind(&record.reviewed_by)
    .bind(record.reviewed_at.map(|t| t.to_rfc3339()))
    .bind(&record.review_notes)
    .bind(keywords_to_json(&record.keywords))
    .bind(record.estimated_kind.as_str())
    .bind(record.processing_time_ms)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite the mutable fields of an existing record
pub async fn update_record(pool: &SqlitePool, record: &NormalizedRecord) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE normalized_records SET
            category_id = ?,
            normalized_description = ?,
            normalized_unit = ?,
            normalized_price = ?,
            confidence = ?,
            method = ?,
            requires_review = ?,
            manually_reviewed = ?,
            reviewed_by = ?,
            reviewed_at = ?,
            review_notes = ?
        WHERE id = ?
        "#,
    )
    .bind(record.category_id.map(|id| id.to_string()))
    .bind(&record.normalized_description)
    .bind(&record.normalized_unit)
    .bind(record.normalized_price)
    .bind(record.confidence)
    .bind(record.method.as_str())
    .bind(record.requires_review as i64)
    .bind(record.manually_reviewed as i64)
    .bind(&record.reviewed_by)
    .bind(record.reviewed_at.map(|t| t.to_rfc3339()))
    .bind(&record.review_notes)
    .bind(record.id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<NormalizedRecord>> {
    let row = sqlx::query("SELECT * FROM normalized_records WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

pub async fn find_by_original_item(
    pool: &SqlitePool,
    original_item_id: Uuid,
) -> Result<Option<NormalizedRecord>> {
    let row = sqlx::query("SELECT * FROM normalized_records WHERE original_item_id = ?")
        .bind(original_item_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

pub async fn delete_record(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM normalized_records WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Records awaiting human review, worst confidence first
pub async fn list_for_review(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<Vec<ReviewQueueEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT r.*,
               i.description AS original_description,
               i.unit AS original_unit,
               c.code AS category_code,
               c.name AS category_name
        FROM normalized_records r
        JOIN source_items i ON i.id = r.original_item_id
        LEFT JOIN categories c ON c.id = r.category_id
        WHERE r.requires_review = 1 AND r.manually_reviewed = 0
        ORDER BY r.confidence ASC, r.created_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ReviewQueueEntry {
                record: record_from_row(row)?,
                original_description: row.get("original_description"),
                original_unit: row.get("original_unit"),
                category_code: row.get("category_code"),
                category_name: row.get("category_name"),
            })
        })
        .collect()
}

/// Automatic classifications below `threshold`, reviewed rows excluded
pub async fn list_low_confidence(
    pool: &SqlitePool,
    threshold: f64,
    limit: i64,
) -> Result<Vec<NormalizedRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM normalized_records
        WHERE confidence < ? AND manually_reviewed = 0
        ORDER BY confidence ASC
        LIMIT ?
        "#,
    )
    .bind(threshold)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

pub async fn aggregates(pool: &SqlitePool) -> Result<RecordAggregates> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(SUM(CASE WHEN requires_review = 1 AND manually_reviewed = 0
                                 THEN 1 ELSE 0 END), 0) AS review_pending,
               COALESCE(SUM(manually_reviewed), 0) AS review_completed,
               COALESCE(AVG(confidence), 0.0) AS average_confidence
        FROM normalized_records
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(RecordAggregates {
        total: row.get("total"),
        review_pending: row.get("review_pending"),
        review_completed: row.get("review_completed"),
        average_confidence: row.get("average_confidence"),
    })
}

/// Record counts grouped by classification method
pub async fn count_by_method(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT method, COUNT(*) AS n
        FROM normalized_records
        GROUP BY method
        ORDER BY method ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| (row.get("method"), row.get("n"))).collect())
}
