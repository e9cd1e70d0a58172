//! Settings database operations
//!
//! Key-value accessors for runtime configuration the operator can change
//! without restarting: completion-service credentials and model choice.

use precobase_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Get completion-service API key from database
pub async fn get_completion_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, "completion_api_key").await
}

/// Set completion-service API key in database
pub async fn set_completion_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, "completion_api_key", key).await
}

/// Get completion-service base URL from database
pub async fn get_completion_base_url(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, "completion_base_url").await
}

/// Get completion model name from database
pub async fn get_completion_model(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, "completion_model").await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn api_key_roundtrip() {
        let pool = test_pool().await;

        assert_eq!(get_completion_api_key(&pool).await.unwrap(), None);

        set_completion_api_key(&pool, "sk-test-123".to_string()).await.unwrap();
        assert_eq!(
            get_completion_api_key(&pool).await.unwrap(),
            Some("sk-test-123".to_string())
        );

        // Overwrite takes effect
        set_completion_api_key(&pool, "sk-test-456".to_string()).await.unwrap();
        assert_eq!(
            get_completion_api_key(&pool).await.unwrap(),
            Some("sk-test-456".to_string())
        );
    }

    #[tokio::test]
    async fn unset_keys_read_as_none() {
        let pool = test_pool().await;
        assert_eq!(get_completion_base_url(&pool).await.unwrap(), None);
        assert_eq!(get_completion_model(&pool).await.unwrap(), None);
    }
}
