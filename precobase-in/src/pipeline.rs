//! Batch normalization pipeline
//!
//! Orchestrates extract + classify + persist for unprocessed source items.
//! One batch runs at a time per process: a second caller gets an immediate
//! all-zero outcome instead of queuing. Per-item failures are recorded in
//! the outcome and never abort the batch.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use precobase_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::db;
use crate::db::records::ReviewQueueEntry;
use crate::features::{normalize_unit, FeatureExtractor};
use crate::models::{ClassificationMethod, NormalizedRecord, SourceItem};
use crate::similarity;

pub const DEFAULT_BATCH_SIZE: i64 = 100;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_REPROCESS_LIMIT: i64 = 100;

/// Knobs for one batch run
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub batch_size: i64,
    /// Records below this confidence are flagged for review
    pub confidence_threshold: f64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Counters for one batch run. All zero when the batch was skipped
/// because another one was already running.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub processed: u64,
    pub successful: u64,
    pub errors: u64,
    /// Successfully persisted but flagged for review
    pub low_confidence: u64,
    pub error_details: Vec<ItemError>,
}

/// One failed item inside an otherwise-continuing batch
#[derive(Debug, Clone, Serialize)]
pub struct ItemError {
    pub item_id: Uuid,
    pub error: String,
}

/// Field overrides a reviewer can apply to a record
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub category_code: Option<String>,
    pub description: Option<String>,
}

/// Corpus-wide pipeline counters
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatistics {
    pub total_items: i64,
    /// Source items with no normalized record yet
    pub pending: i64,
    pub processed: i64,
    pub review_pending: i64,
    pub review_completed: i64,
    pub average_confidence: f64,
    pub by_method: BTreeMap<String, i64>,
}

/// Releases the single-flight flag on every exit path
struct BatchGuard<'a>(&'a AtomicBool);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Extract-classify-persist orchestrator over one database
pub struct NormalizationPipeline {
    db: SqlitePool,
    classifier: Classifier,
    extractor: FeatureExtractor,
    batch_running: AtomicBool,
}

impl NormalizationPipeline {
    pub fn new(db: SqlitePool, classifier: Classifier) -> Self {
        Self {
            db,
            classifier,
            extractor: FeatureExtractor::default(),
            batch_running: AtomicBool::new(false),
        }
    }

    pub fn is_batch_running(&self) -> bool {
        self.batch_running.load(Ordering::SeqCst)
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Source items awaiting normalization, most recent first
    pub async fn list_unprocessed(&self, limit: i64) -> Result<Vec<SourceItem>> {
        db::source_items::list_unclassified(&self.db, limit).await
    }

    /// Normalize the next batch of unprocessed items. No-op (all-zero
    /// outcome) when a batch is already in flight.
    pub async fn run_batch(&self, options: &BatchOptions) -> Result<BatchOutcome> {
        if self.batch_running.swap(true, Ordering::SeqCst) {
            info!("Normalization batch already running, skipping this trigger");
            return Ok(BatchOutcome::default());
        }
        let _guard = BatchGuard(&self.batch_running);

        let items = self.list_unprocessed(options.batch_size).await?;
        info!(count = items.len(), "Starting normalization batch");

        let mut outcome = BatchOutcome::default();
        for item in items {
            outcome.processed += 1;
            match self.process_one(&item, options.confidence_threshold).await {
                Ok(record) => {
                    outcome.successful += 1;
                    if record.requires_review {
                        outcome.low_confidence += 1;
                    }
                }
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "Item failed, batch continues");
                    outcome.errors += 1;
                    outcome.error_details.push(ItemError { item_id: item.id, error: e.to_string() });
                }
            }
        }

        info!(
            processed = outcome.processed,
            successful = outcome.successful,
            errors = outcome.errors,
            low_confidence = outcome.low_confidence,
            "Normalization batch complete"
        );
        Ok(outcome)
    }

    /// Normalize a single item and persist the result. Returns the
    /// existing record untouched when the item was already processed.
    pub async fn process_one(
        &self,
        item: &SourceItem,
        confidence_threshold: f64,
    ) -> Result<NormalizedRecord> {
        if let Some(existing) = db::records::find_by_original_item(&self.db, item.id).await? {
            debug!(item_id = %item.id, "Item already normalized, keeping existing record");
            return Ok(existing);
        }

        let started = Instant::now();
        let features = self.extractor.extract(item);
        let classification = self.classifier.classify(item).await;
        let requires_review = classification.requires_review(confidence_threshold);

        let record = NormalizedRecord {
            id: Uuid::new_v4(),
            original_item_id: item.id,
            category_id: classification.category.as_ref().map(|c| c.id),
            normalized_description: features.cleaned_description,
            normalized_unit: normalize_unit(&item.unit),
            normalized_price: normalized_price(item),
            confidence: classification.confidence,
            method: classification.method,
            requires_review,
            manually_reviewed: false,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            keywords: features.keywords,
            estimated_kind: features.estimated_kind,
            processing_time_ms: started.elapsed().as_millis() as i64,
            created_at: Utc::now(),
        };

        db::records::insert_record(&self.db, &record).await?;
        if let Some(category) = &classification.category {
            db::categories::adjust_item_count(&self.db, category.id, 1).await?;
        }

        debug!(
            item_id = %item.id,
            record_id = %record.id,
            confidence = record.confidence,
            method = record.method.as_str(),
            "Item normalized"
        );
        Ok(record)
    }

    /// Re-run classification for records that came out below `threshold`.
    /// Each record is deleted and rebuilt from its source item under a
    /// fresh id; `original_item_id` stays stable. Manually reviewed
    /// records are never touched. Shares the single-flight guard with
    /// `run_batch`.
    pub async fn reprocess_low_confidence(
        &self,
        confidence_threshold: f64,
        limit: i64,
    ) -> Result<BatchOutcome> {
        if self.batch_running.swap(true, Ordering::SeqCst) {
            info!("Normalization batch already running, skipping reprocess");
            return Ok(BatchOutcome::default());
        }
        let _guard = BatchGuard(&self.batch_running);

        let records =
            db::records::list_low_confidence(&self.db, confidence_threshold, limit).await?;
        info!(count = records.len(), "Reprocessing low-confidence records");

        let mut outcome = BatchOutcome::default();
        for record in records {
            outcome.processed += 1;
            match self.reprocess_record(&record, confidence_threshold).await {
                Ok(new_record) => {
                    outcome.successful += 1;
                    if new_record.requires_review {
                        outcome.low_confidence += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        record_id = %record.id,
                        item_id = %record.original_item_id,
                        error = %e,
                        "Reprocess failed, batch continues"
                    );
                    outcome.errors += 1;
                    outcome.error_details.push(ItemError {
                        item_id: record.original_item_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = outcome.processed,
            successful = outcome.successful,
            errors = outcome.errors,
            "Reprocess complete"
        );
        Ok(outcome)
    }

    async fn reprocess_record(
        &self,
        record: &NormalizedRecord,
        confidence_threshold: f64,
    ) -> Result<NormalizedRecord> {
        let item = db::source_items::find_by_id(&self.db, record.original_item_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "source item {} for record {}",
                    record.original_item_id, record.id
                ))
            })?;

        db::records::delete_record(&self.db, record.id).await?;
        if let Some(category_id) = record.category_id {
            db::categories::adjust_item_count(&self.db, category_id, -1).await?;
        }

        self.process_one(&item, confidence_threshold).await
    }

    /// Apply a human review decision: overwrite the targeted fields and
    /// stamp the record as reviewed at full confidence.
    pub async fn review_manually(
        &self,
        record_id: Uuid,
        changes: &ReviewChanges,
        reviewer_id: &str,
        notes: Option<String>,
    ) -> Result<NormalizedRecord> {
        let mut record = db::records::find_by_id(&self.db, record_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("normalized record {}", record_id)))?;

        if let Some(code) = changes.category_code.as_deref() {
            let category = db::categories::find_by_code(&self.db, code)
                .await?
                .ok_or_else(|| Error::NotFound(format!("category {}", code)))?;

            if record.category_id != Some(category.id) {
                if let Some(old_id) = record.category_id {
                    db::categories::adjust_item_count(&self.db, old_id, -1).await?;
                }
                db::categories::adjust_item_count(&self.db, category.id, 1).await?;
                record.category_id = Some(category.id);
            }
        }

        if let Some(description) = changes.description.as_deref() {
            record.normalized_description = similarity::normalize(description);
        }

        record.confidence = 1.0;
        record.method = ClassificationMethod::Manual;
        record.manually_reviewed = true;
        record.requires_review = false;
        record.reviewed_by = Some(reviewer_id.to_string());
        record.reviewed_at = Some(Utc::now());
        record.review_notes = notes;

        db::records::update_record(&self.db, &record).await?;
        info!(record_id = %record.id, reviewer = reviewer_id, "Record manually reviewed");
        Ok(record)
    }

    /// Records awaiting human review, worst confidence first
    pub async fn list_for_review(&self, limit: i64, offset: i64) -> Result<Vec<ReviewQueueEntry>> {
        db::records::list_for_review(&self.db, limit, offset).await
    }

    pub async fn statistics(&self) -> Result<PipelineStatistics> {
        let total_items = db::source_items::count_all(&self.db).await?;
        let aggregates = db::records::aggregates(&self.db).await?;
        let by_method: BTreeMap<String, i64> =
            db::records::count_by_method(&self.db).await?.into_iter().collect();

        Ok(PipelineStatistics {
            total_items,
            pending: (total_items - aggregates.total).max(0),
            processed: aggregates.total,
            review_pending: aggregates.review_pending,
            review_completed: aggregates.review_completed,
            average_confidence: aggregates.average_confidence,
            by_method,
        })
    }
}

/// Unit price as published, else derived from total and quantity
fn normalized_price(item: &SourceItem) -> Option<f64> {
    item.unit_price.or_else(|| match (item.total_value, item.quantity) {
        (Some(total), Some(quantity)) if quantity > 0.0 => Some(total / quantity),
        _ => None,
    })
}
