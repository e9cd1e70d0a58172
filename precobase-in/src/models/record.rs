//! Classification outcomes and persisted normalized records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::{Category, CategoryKind};

/// How a record's category assignment was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationMethod {
    /// Trusted pre-classification carried by the source feed
    #[serde(rename = "SOURCE")]
    Source,
    /// External completion-service classification
    #[serde(rename = "EXTERNAL_CLASSIFIER")]
    ExternalClassifier,
    /// Lexical similarity fallback after a hallucinated code
    #[serde(rename = "SIMILARITY")]
    Similarity,
    /// Human reviewer decision
    #[serde(rename = "MANUAL")]
    Manual,
}

impl ClassificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMethod::Source => "SOURCE",
            ClassificationMethod::ExternalClassifier => "EXTERNAL_CLASSIFIER",
            ClassificationMethod::Similarity => "SIMILARITY",
            ClassificationMethod::Manual => "MANUAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SOURCE" => Some(ClassificationMethod::Source),
            "EXTERNAL_CLASSIFIER" => Some(ClassificationMethod::ExternalClassifier),
            "SIMILARITY" => Some(ClassificationMethod::Similarity),
            "MANUAL" => Some(ClassificationMethod::Manual),
            _ => None,
        }
    }
}

/// Outcome of classifying one source item
///
/// Invariants upheld by the classifier: `method == Source` implies
/// `confidence == 1.0`, and `category == None` implies `confidence <= 0.3`.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub category: Option<Category>,
    /// Confidence in the assignment, in [0, 1]
    pub confidence: f64,
    pub method: ClassificationMethod,
}

impl ClassificationResult {
    /// Review-gate decision for a given confidence threshold
    pub fn requires_review(&self, threshold: f64) -> bool {
        self.confidence < threshold || self.category.is_none()
    }
}

/// A normalized item, persisted one-to-one with its source item
///
/// Mutated only by manual review; reprocessing replaces the whole row
/// under a fresh id while keeping `original_item_id` stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: Uuid,
    /// Source item this record normalizes, unique across the table
    pub original_item_id: Uuid,
    pub category_id: Option<Uuid>,
    pub normalized_description: String,
    pub normalized_unit: String,
    /// Unit price, falling back to total/quantity when the feed
    /// published only totals
    pub normalized_price: Option<f64>,
    pub confidence: f64,
    pub method: ClassificationMethod,
    pub requires_review: bool,
    pub manually_reviewed: bool,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub keywords: Vec<String>,
    pub estimated_kind: CategoryKind,
    pub processing_time_ms: i64,
    pub created_at: DateTime<Utc>,
}
