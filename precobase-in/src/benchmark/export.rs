//! Benchmark result exporters
//!
//! Pretty JSON for archiving full runs and a flat CSV (one row per case)
//! for spreadsheet review. CSV fields containing separators are quoted
//! with embedded quotes doubled.

use precobase_common::{Error, Result};

use super::{BenchmarkResult, CaseResult};

const CSV_HEADER: &str = "case_id,description,expected_category,actual_category,category_correct,\
expected_kind,actual_kind,kind_correct,expected_unit,actual_unit,unit_correct,\
confidence,method,latency_ms,group_id";

pub fn to_json(result: &BenchmarkResult) -> Result<String> {
    serde_json::to_string_pretty(result)
        .map_err(|e| Error::Internal(format!("benchmark JSON export: {}", e)))
}

pub fn to_csv(result: &BenchmarkResult) -> String {
    let mut out = String::with_capacity(result.cases.len() * 128 + CSV_HEADER.len());
    out.push_str(CSV_HEADER);
    out.push('\n');
    for case in &result.cases {
        out.push_str(&csv_row(case));
        out.push('\n');
    }
    out
}

fn csv_row(case: &CaseResult) -> String {
    [
        csv_field(&case.case_id),
        csv_field(&case.description),
        csv_field(case.expected_category.as_deref().unwrap_or("")),
        csv_field(case.actual_category.as_deref().unwrap_or("")),
        case.category_correct.to_string(),
        case.expected_kind.as_str().to_string(),
        case.actual_kind.as_str().to_string(),
        case.kind_correct.to_string(),
        csv_field(&case.expected_unit),
        csv_field(&case.actual_unit),
        case.unit_correct.to_string(),
        format!("{:.4}", case.confidence),
        case.method.as_str().to_string(),
        case.latency_ms.to_string(),
        csv_field(case.group_id.as_deref().unwrap_or("")),
    ]
    .join(",")
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
