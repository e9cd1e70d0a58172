//! Source item persistence
//!
//! The pipeline treats this table as a read-only feed; inserts exist for
//! ingestion and test fixtures.

use precobase_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{ItemSource, SourceItem};

use super::{parse_date, parse_timestamp, parse_uuid};

fn item_from_row(row: &SqliteRow) -> Result<SourceItem> {
    let id: String = row.get("id");
    let source: String = row.get("source");
    let price_date: Option<String> = row.get("price_date");
    let created_at: String = row.get("created_at");

    Ok(SourceItem {
        id: parse_uuid(&id, "source_items.id")?,
        description: row.get("description"),
        unit: row.get("unit"),
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        total_value: row.get("total_value"),
        source: ItemSource::parse(&source)
            .ok_or_else(|| Error::Internal(format!("unknown item source: {}", source)))?,
        source_reference: row.get("source_reference"),
        price_date: price_date
            .map(|d| parse_date(&d, "source_items.price_date"))
            .transpose()?,
        region: row.get("region"),
        pre_classified_code: row.get("pre_classified_code"),
        created_at: parse_timestamp(&created_at, "source_items.created_at")?,
    })
}

pub async fn insert_item(pool: &SqlitePool, item: &SourceItem) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO source_items (
            id, description, unit, quantity, unit_price, total_value,
            source, source_reference, price_date, region,
            pre_classified_code, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(&item.description)
    .bind(&item.unit)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.total_value)
    .bind(item.source.as_str())
    .bind(&item.source_reference)
    .bind(item.price_date.map(|d| d.to_string()))
    .bind(&item.region)
    .bind(&item.pre_classified_code)
    .bind(item.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<SourceItem>> {
    let row = sqlx::query("SELECT * FROM source_items WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(item_from_row).transpose()
}

/// Most recent items first
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<SourceItem>> {
    let rows = sqlx::query("SELECT * FROM source_items ORDER BY created_at DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(item_from_row).collect()
}

/// Most recent items that have no normalized record yet
pub async fn list_unclassified(pool: &SqlitePool, limit: i64) -> Result<Vec<SourceItem>> {
    let rows = sqlx::query(
        r#"
        SELECT i.* FROM source_items i
        LEFT JOIN normalized_records r ON r.original_item_id = i.id
        WHERE r.id IS NULL
        ORDER BY i.created_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(item_from_row).collect()
}

pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM source_items")
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn insert_and_read_back_preserves_fields() {
        let pool = test_pool().await;
        let mut item = SourceItem::new("Papel sulfite A4", "RESMA", ItemSource::Pncp);
        item.quantity = Some(10.0);
        item.unit_price = Some(25.9);
        item.source_reference = Some("PNCP-2026-001".to_string());
        item.price_date = Some(chrono::NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        item.region = Some("SP".to_string());
        item.pre_classified_code = Some("CATMAT-12345".to_string());

        insert_item(&pool, &item).await.unwrap();
        let found = find_by_id(&pool, item.id).await.unwrap().unwrap();

        assert_eq!(found.description, "Papel sulfite A4");
        assert_eq!(found.source, ItemSource::Pncp);
        assert_eq!(found.quantity, Some(10.0));
        assert_eq!(found.price_date, item.price_date);
        assert_eq!(found.pre_classified_code.as_deref(), Some("CATMAT-12345"));
    }

    #[tokio::test]
    async fn recent_listing_orders_newest_first() {
        let pool = test_pool().await;
        let mut older = SourceItem::new("Item antigo", "UN", ItemSource::Manual);
        older.created_at = chrono::Utc::now() - chrono::Duration::minutes(5);
        let newer = SourceItem::new("Item novo", "UN", ItemSource::Manual);
        insert_item(&pool, &older).await.unwrap();
        insert_item(&pool, &newer).await.unwrap();

        let recent = list_recent(&pool, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, newer.id);

        let capped = list_recent(&pool, 1).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, newer.id);
    }

    #[tokio::test]
    async fn unclassified_listing_skips_items_with_records() {
        let pool = test_pool().await;
        let classified = SourceItem::new("Já processado", "UN", ItemSource::Manual);
        let pending = SourceItem::new("Aguardando", "UN", ItemSource::Manual);
        insert_item(&pool, &classified).await.unwrap();
        insert_item(&pool, &pending).await.unwrap();

        sqlx::query(
            r#"
            INSERT INTO normalized_records (
                id, original_item_id, normalized_description, normalized_unit,
                confidence, method, estimated_kind, created_at
            ) VALUES (?, ?, 'ja processado', 'UN', 1.0, 'SOURCE', 'MAT', ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(classified.id.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();

        let unclassified = list_unclassified(&pool, 10).await.unwrap();
        assert_eq!(unclassified.len(), 1);
        assert_eq!(unclassified[0].id, pending.id);
        assert_eq!(count_all(&pool).await.unwrap(), 2);
    }
}
