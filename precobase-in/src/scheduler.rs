//! Scheduled batch normalization
//!
//! Fires the pipeline on a fixed cadence so freshly ingested source
//! items get normalized without anyone calling /pipeline/run.

use std::sync::Arc;
use std::time::Duration;

use sqlx::{Pool, Sqlite};
use tokio::time::interval;
use tracing::{error, info};

use crate::pipeline::{BatchOptions, NormalizationPipeline};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Hours between automatic batch runs (default: 24)
    pub interval_hours: u64,

    /// Enable the scheduled batch (default: true)
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_hours: 24,
            enabled: true,
        }
    }
}

impl SchedulerConfig {
    /// Load scheduler configuration from database settings, falling
    /// back to defaults for missing or unparseable values.
    pub async fn from_database(db: &Pool<Sqlite>) -> Self {
        let mut config = Self::default();

        if let Ok(enabled_str) = sqlx::query_scalar::<_, String>(
            "SELECT value FROM settings WHERE key = 'scheduler_enabled'",
        )
        .fetch_one(db)
        .await
        {
            config.enabled = enabled_str.to_lowercase() == "true";
        }

        if let Ok(hours_str) = sqlx::query_scalar::<_, String>(
            "SELECT value FROM settings WHERE key = 'scheduler_interval_hours'",
        )
        .fetch_one(db)
        .await
        {
            if let Ok(hours) = hours_str.parse::<u64>() {
                if hours > 0 {
                    config.interval_hours = hours;
                }
            }
        }

        config
    }
}

/// Spawn the scheduled batch task.
///
/// The first batch fires one full interval after startup. The pipeline
/// guard makes an overlap with a manually triggered batch a no-op.
pub fn spawn(config: SchedulerConfig, pipeline: Arc<NormalizationPipeline>) {
    if !config.enabled {
        info!("Batch scheduler disabled by configuration");
        return;
    }

    info!(
        interval_hours = config.interval_hours,
        "Starting batch scheduler"
    );

    tokio::spawn(async move {
        let mut timer = interval(Duration::from_secs(config.interval_hours * 3600));
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // interval yields immediately once; consume that tick so the
        // first batch waits a full cadence
        timer.tick().await;

        loop {
            timer.tick().await;

            info!("Scheduled normalization batch starting");
            match pipeline.run_batch(&BatchOptions::default()).await {
                Ok(outcome) => info!(
                    processed = outcome.processed,
                    successful = outcome.successful,
                    errors = outcome.errors,
                    low_confidence = outcome.low_confidence,
                    "Scheduled normalization batch finished"
                ),
                Err(e) => error!(error = %e, "Scheduled normalization batch failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval_hours, 24);
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn config_reads_settings_with_fallback() {
        let pool = test_pool().await;

        // Nothing set: defaults all the way
        let config = SchedulerConfig::from_database(&pool).await;
        assert_eq!(config.interval_hours, 24);
        assert!(config.enabled);

        sqlx::query("INSERT INTO settings (key, value) VALUES ('scheduler_enabled', 'false')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ('scheduler_interval_hours', '6')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let config = SchedulerConfig::from_database(&pool).await;
        assert_eq!(config.interval_hours, 6);
        assert!(!config.enabled);

        // Zero hours is rejected, default kept
        sqlx::query("UPDATE settings SET value = '0' WHERE key = 'scheduler_interval_hours'")
            .execute(&pool)
            .await
            .unwrap();
        let config = SchedulerConfig::from_database(&pool).await;
        assert_eq!(config.interval_hours, 24);
    }
}
