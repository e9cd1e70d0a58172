//! Item classification against the CATMAT/CATSER taxonomy
//!
//! Resolution order: trust the feed's pre-classification when it points at
//! an active category, otherwise ask the completion service to pick from
//! candidate categories of the estimated kind. Hallucinated codes fall
//! back to lexical similarity over category names. `classify` never
//! errors: every failure degrades to an unclassified low-confidence
//! result the review queue will catch.

pub mod completion;

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db;
use crate::features::{FeatureExtractor, ItemFeatures};
use crate::models::{Category, ClassificationMethod, ClassificationResult, SourceItem};
use crate::similarity::{FindOptions, SimilarityEngine};

use completion::{CompletionRequest, CompletionService};

/// Confidence for a trusted source pre-classification
const CONFIDENCE_SOURCE: f64 = 1.0;
/// Confidence when the service picked one of the offered candidates
const CONFIDENCE_CODE_MATCH: f64 = 0.85;
/// Confidence for a similarity-ranked replacement of a hallucinated code
const CONFIDENCE_SIMILARITY_FALLBACK: f64 = 0.5;
/// Confidence when no category could be assigned
const CONFIDENCE_NO_MATCH: f64 = 0.3;
/// Confidence after a completion failure
const CONFIDENCE_FAILURE: f64 = 0.0;

/// Classifier-intrinsic review threshold. The pipeline recomputes the
/// review flag with its own (stricter) threshold; this one only matters
/// to direct callers of `classify`.
pub const DEFAULT_REVIEW_THRESHOLD: f64 = 0.5;

/// How many candidate categories the prompt offers
const CANDIDATE_LIMIT: i64 = 50;
/// How many name-search hits the fallback ranks
const FALLBACK_LIMIT: i64 = 50;
/// How many keywords seed the fallback name search
const FALLBACK_KEYWORDS: usize = 3;

const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: u32 = 16;

/// First taxonomy code anywhere in the (uppercased) reply
static RESPONSE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"CAT(?:MAT|SER)-\d+").unwrap());

/// Assigns taxonomy categories to source items
pub struct Classifier {
    db: SqlitePool,
    completion: Arc<dyn CompletionService>,
    extractor: FeatureExtractor,
    engine: SimilarityEngine,
}

impl Classifier {
    pub fn new(db: SqlitePool, completion: Arc<dyn CompletionService>) -> Self {
        Self {
            db,
            completion,
            extractor: FeatureExtractor::default(),
            engine: SimilarityEngine::default(),
        }
    }

    /// Classify one item. Infallible: lookup and completion failures
    /// degrade to `{None, 0.0}` rather than erroring.
    pub async fn classify(&self, item: &SourceItem) -> ClassificationResult {
        if let Some(code) = item.pre_classified_code.as_deref() {
            match db::categories::find_by_code(&self.db, code).await {
                Ok(Some(category)) if category.active => {
                    debug!(item_id = %item.id, code = %code, "Trusting source pre-classification");
                    return ClassificationResult {
                        category: Some(category),
                        confidence: CONFIDENCE_SOURCE,
                        method: ClassificationMethod::Source,
                    };
                }
                Ok(_) => {
                    debug!(item_id = %item.id, code = %code,
                        "Pre-classified code unknown or inactive, classifying from scratch");
                }
                Err(e) => {
                    warn!(item_id = %item.id, error = %e,
                        "Pre-classification lookup failed, classifying from scratch");
                }
            }
        }

        let features = self.extractor.extract(item);

        let candidates = match db::categories::find_by_kind_active(
            &self.db,
            features.estimated_kind,
            CANDIDATE_LIMIT,
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "Candidate lookup failed");
                return failure_result(CONFIDENCE_FAILURE);
            }
        };

        if candidates.is_empty() {
            debug!(item_id = %item.id, kind = %features.estimated_kind.as_str(),
                "No active candidate categories, leaving item unclassified");
            return failure_result(CONFIDENCE_NO_MATCH);
        }

        let request = build_prompt(&features, &candidates);
        let response = match self.completion.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "Completion call failed");
                return failure_result(CONFIDENCE_FAILURE);
            }
        };

        let reply = response.trim().to_uppercase();
        let Some(code) = extract_code(&reply) else {
            // Covers the UNKNOWN sentinel and free-text refusals alike
            debug!(item_id = %item.id, reply = %reply, "No taxonomy code in reply");
            return failure_result(CONFIDENCE_NO_MATCH);
        };

        if let Some(category) = candidates.iter().find(|c| c.code == code) {
            debug!(item_id = %item.id, code = %code, "Completion picked a candidate");
            return ClassificationResult {
                category: Some(category.clone()),
                confidence: CONFIDENCE_CODE_MATCH,
                method: ClassificationMethod::ExternalClassifier,
            };
        }

        info!(item_id = %item.id, code = %code,
            "Completion returned a code outside the candidate list, trying similarity fallback");
        self.similarity_fallback(&features).await
    }

    /// Deterministic replacement for hallucinated codes: rank categories
    /// whose name mentions a top keyword by composite similarity to the
    /// cleaned description, best match wins at reduced confidence.
    async fn similarity_fallback(&self, features: &ItemFeatures) -> ClassificationResult {
        let terms: Vec<String> =
            features.keywords.iter().take(FALLBACK_KEYWORDS).cloned().collect();

        let candidates =
            match db::categories::search_by_name_contains(&self.db, &terms, FALLBACK_LIMIT).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(error = %e, "Fallback name search failed");
                    return failure_result(CONFIDENCE_NO_MATCH);
                }
            };

        let ranked = self.engine.find_similar(
            &features.cleaned_description,
            &candidates,
            |c: &Category| c.name.as_str(),
            &FindOptions { threshold: 0.0, max_results: 1 },
        );

        match ranked.first() {
            Some(best) => {
                info!(code = %best.candidate.code, score = best.score,
                    "Similarity fallback selected a category");
                ClassificationResult {
                    category: Some(best.candidate.clone()),
                    confidence: CONFIDENCE_SIMILARITY_FALLBACK,
                    method: ClassificationMethod::Similarity,
                }
            }
            None => failure_result(CONFIDENCE_NO_MATCH),
        }
    }
}

fn failure_result(confidence: f64) -> ClassificationResult {
    ClassificationResult {
        category: None,
        confidence,
        method: ClassificationMethod::ExternalClassifier,
    }
}

fn extract_code(reply: &str) -> Option<String> {
    RESPONSE_CODE_RE.find(reply).map(|m| m.as_str().to_string())
}

fn build_prompt(features: &ItemFeatures, candidates: &[Category]) -> CompletionRequest {
    let candidate_lines = candidates
        .iter()
        .map(|c| format!("{} - {}", c.code, c.name))
        .collect::<Vec<_>>()
        .join("\n");

    let system_prompt = "Você é um classificador de itens de compras públicas brasileiras. \
        Responda APENAS com o código da categoria (formato CATMAT-NNNNN ou CATSER-NNNNN) \
        que melhor descreve o item, ou UNKNOWN se nenhuma categoria se aplicar."
        .to_string();

    let user_prompt = format!(
        "Item: {}\nPalavras-chave: {}\nUnidade: {}\n\nCategorias candidatas:\n{}",
        features.cleaned_description,
        features.keywords.join(", "),
        features.unit,
        candidate_lines,
    );

    CompletionRequest {
        system_prompt,
        user_prompt,
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}
