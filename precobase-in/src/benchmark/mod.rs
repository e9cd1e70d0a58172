//! Offline accuracy benchmark for the classifier
//!
//! Runs labeled cases through the same `classify` path production uses
//! and aggregates accuracy per dimension. Grouping accuracy measures
//! whether differently-worded listings of the same product land on the
//! same category, independent of whether that category is the labeled
//! one.

pub mod cases;
pub mod export;

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::classifier::Classifier;
use crate::features::{normalize_unit, FeatureExtractor};
use crate::models::{CategoryKind, ClassificationMethod, ItemSource, SourceItem};

pub use cases::{builtin_cases, load_from_file, BenchmarkCase};

/// Accuracy targets the summary verdict is judged against
pub const CATEGORY_ACCURACY_TARGET: f64 = 0.85;
pub const KIND_ACCURACY_TARGET: f64 = 0.95;
pub const GROUP_ACCURACY_TARGET: f64 = 0.80;

/// Outcome of one benchmark case
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub case_id: String,
    pub description: String,
    pub expected_category: Option<String>,
    pub actual_category: Option<String>,
    pub category_correct: bool,
    pub expected_kind: CategoryKind,
    pub actual_kind: CategoryKind,
    pub kind_correct: bool,
    pub expected_unit: String,
    pub actual_unit: String,
    pub unit_correct: bool,
    pub confidence: f64,
    pub method: ClassificationMethod,
    pub latency_ms: i64,
    pub group_id: Option<String>,
}

/// Aggregated benchmark metrics plus the per-case detail
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub total_cases: usize,
    pub category_accuracy: f64,
    pub kind_accuracy: f64,
    pub unit_accuracy: f64,
    pub group_accuracy: f64,
    /// Category accuracy over cases labeled Material (1.0 when none)
    pub material_category_accuracy: f64,
    /// Category accuracy over cases labeled Service (1.0 when none)
    pub service_category_accuracy: f64,
    pub average_confidence: f64,
    pub average_latency_ms: f64,
    pub cases: Vec<CaseResult>,
}

/// Pass/fail verdict with a formatted report
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkSummary {
    pub category_pass: bool,
    pub kind_pass: bool,
    pub group_pass: bool,
    pub passed: bool,
    pub report: String,
}

/// Run `cases` (optionally narrowed to `case_ids`) through the
/// classifier. Infallible like `classify` itself: failures show up as
/// unclassified low-confidence results, not errors.
pub async fn run(
    classifier: &Classifier,
    extractor: &FeatureExtractor,
    cases: &[BenchmarkCase],
    case_ids: Option<&[String]>,
) -> BenchmarkResult {
    let selected: Vec<&BenchmarkCase> = match case_ids {
        Some(ids) if !ids.is_empty() => {
            cases.iter().filter(|c| ids.contains(&c.id)).collect()
        }
        _ => cases.iter().collect(),
    };

    info!(total = selected.len(), "Running classification benchmark");

    let mut results = Vec::with_capacity(selected.len());
    for case in selected {
        results.push(run_case(classifier, extractor, case).await);
    }
    aggregate(results)
}

async fn run_case(
    classifier: &Classifier,
    extractor: &FeatureExtractor,
    case: &BenchmarkCase,
) -> CaseResult {
    let mut item = SourceItem::new(&case.description, &case.unit, ItemSource::Manual);
    item.quantity = case.quantity;
    item.unit_price = case.unit_price;
    item.pre_classified_code = case.pre_classified_code.clone();

    let started = Instant::now();
    let classification = classifier.classify(&item).await;
    let latency_ms = started.elapsed().as_millis() as i64;

    let actual_category = classification.category.as_ref().map(|c| c.code.clone());
    let actual_kind = extractor.extract(&item).estimated_kind;
    let actual_unit = normalize_unit(&case.unit);

    CaseResult {
        case_id: case.id.clone(),
        description: case.description.clone(),
        category_correct: actual_category == case.expected_category,
        expected_category: case.expected_category.clone(),
        actual_category,
        kind_correct: actual_kind == case.expected_kind,
        expected_kind: case.expected_kind,
        actual_kind,
        unit_correct: actual_unit == case.expected_unit,
        expected_unit: case.expected_unit.clone(),
        actual_unit,
        confidence: classification.confidence,
        method: classification.method,
        latency_ms,
        group_id: case.group_id.clone(),
    }
}

fn aggregate(results: Vec<CaseResult>) -> BenchmarkResult {
    let total = results.len();

    let category_hits = results.iter().filter(|r| r.category_correct).count();
    let kind_hits = results.iter().filter(|r| r.kind_correct).count();
    let unit_hits = results.iter().filter(|r| r.unit_correct).count();

    let confidence_sum: f64 = results.iter().map(|r| r.confidence).sum();
    let latency_sum: f64 = results.iter().map(|r| r.latency_ms as f64).sum();

    BenchmarkResult {
        total_cases: total,
        category_accuracy: overall_ratio(category_hits, total),
        kind_accuracy: overall_ratio(kind_hits, total),
        unit_accuracy: overall_ratio(unit_hits, total),
        group_accuracy: group_accuracy(&results),
        material_category_accuracy: subset_accuracy(&results, CategoryKind::Material),
        service_category_accuracy: subset_accuracy(&results, CategoryKind::Service),
        average_confidence: if total == 0 { 0.0 } else { confidence_sum / total as f64 },
        average_latency_ms: if total == 0 { 0.0 } else { latency_sum / total as f64 },
        cases: results,
    }
}

/// Zero cases count as zero accuracy so an empty run can never pass
fn overall_ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Category accuracy over the cases labeled `kind`; vacuously 1.0 when
/// the run has none of them
fn subset_accuracy(results: &[CaseResult], kind: CategoryKind) -> f64 {
    let subset: Vec<&CaseResult> = results.iter().filter(|r| r.expected_kind == kind).collect();
    if subset.is_empty() {
        return 1.0;
    }
    let hits = subset.iter().filter(|r| r.category_correct).count();
    hits as f64 / subset.len() as f64
}

/// Mean over groups of the share of cases landing on the group's most
/// common resulting category. Ungrouped cases don't participate; no
/// groups at all scores 1.0.
fn group_accuracy(results: &[CaseResult]) -> f64 {
    let mut groups: BTreeMap<&str, Vec<&Option<String>>> = BTreeMap::new();
    for result in results {
        if let Some(group_id) = result.group_id.as_deref() {
            groups.entry(group_id).or_default().push(&result.actual_category);
        }
    }
    if groups.is_empty() {
        return 1.0;
    }

    let mut agreement_sum = 0.0;
    for outcomes in groups.values() {
        let mut counts: BTreeMap<Option<&str>, usize> = BTreeMap::new();
        for outcome in outcomes {
            *counts.entry(outcome.as_deref()).or_default() += 1;
        }
        let dominant = counts.values().copied().max().unwrap_or(0);
        agreement_sum += dominant as f64 / outcomes.len() as f64;
    }
    agreement_sum / groups.len() as f64
}

/// Judge a result against the fixed accuracy targets
pub fn summary(result: &BenchmarkResult) -> BenchmarkSummary {
    let category_pass = result.category_accuracy >= CATEGORY_ACCURACY_TARGET;
    let kind_pass = result.kind_accuracy >= KIND_ACCURACY_TARGET;
    let group_pass = result.group_accuracy >= GROUP_ACCURACY_TARGET;
    let passed = category_pass && kind_pass && group_pass;

    let report = format!(
        "Benchmark: {} cases\n\
         Category accuracy: {:.1}% (target {:.0}%) [{}]\n\
         Kind accuracy: {:.1}% (target {:.0}%) [{}]\n\
         Group accuracy: {:.1}% (target {:.0}%) [{}]\n\
         Unit accuracy: {:.1}%\n\
         Average confidence: {:.2}\n\
         Verdict: {}",
        result.total_cases,
        result.category_accuracy * 100.0,
        CATEGORY_ACCURACY_TARGET * 100.0,
        pass_label(category_pass),
        result.kind_accuracy * 100.0,
        KIND_ACCURACY_TARGET * 100.0,
        pass_label(kind_pass),
        result.group_accuracy * 100.0,
        GROUP_ACCURACY_TARGET * 100.0,
        pass_label(group_pass),
        result.unit_accuracy * 100.0,
        result.average_confidence,
        pass_label(passed),
    );

    BenchmarkSummary { category_pass, kind_pass, group_pass, passed, report }
}

fn pass_label(pass: bool) -> &'static str {
    if pass {
        "PASS"
    } else {
        "FAIL"
    }
}
