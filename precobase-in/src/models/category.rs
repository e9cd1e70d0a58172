//! Category taxonomy types
//!
//! Categories mirror the Brazilian federal procurement catalogs: CATMAT for
//! materials, CATSER for services. Codes follow the `CAT(MAT|SER)-<digits>`
//! shape and carry their kind in the prefix.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anchored pattern for taxonomy codes (e.g. `CATMAT-44122`, `CATSER-25917`)
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^CAT(MAT|SER)-\d+$").unwrap());

/// Which side of the taxonomy a category (or item) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    #[serde(rename = "MAT")]
    Material,
    #[serde(rename = "SER")]
    Service,
}

impl CategoryKind {
    /// Database/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Material => "MAT",
            CategoryKind::Service => "SER",
        }
    }

    /// Parse the database representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MAT" => Some(CategoryKind::Material),
            "SER" => Some(CategoryKind::Service),
            _ => None,
        }
    }

    /// Catalog prefix used in taxonomy codes
    pub fn code_prefix(&self) -> &'static str {
        match self {
            CategoryKind::Material => "CATMAT",
            CategoryKind::Service => "CATSER",
        }
    }
}

/// A node of the procurement category taxonomy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    /// Taxonomy code, unique (e.g. `CATMAT-44122`)
    pub code: String,
    pub name: String,
    pub kind: CategoryKind,
    /// Code of the parent node, None for roots
    pub parent_code: Option<String>,
    /// Depth in the taxonomy tree, roots at 1
    pub level: i64,
    /// Search keywords associated with this category
    pub keywords: Vec<String>,
    /// Units of measure commonly seen on items of this category
    pub common_units: Vec<String>,
    pub active: bool,
    /// Denormalized count of normalized records assigned here,
    /// maintained atomically by the pipeline
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// New active leaf category with generated id
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: CategoryKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            kind,
            parent_code: None,
            level: 1,
            keywords: Vec::new(),
            common_units: Vec::new(),
            active: true,
            item_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `code` has the `CAT(MAT|SER)-<digits>` shape
    pub fn is_valid_code(code: &str) -> bool {
        CODE_RE.is_match(code)
    }

    /// Kind implied by a taxonomy code prefix, None for malformed codes
    pub fn kind_of_code(code: &str) -> Option<CategoryKind> {
        let caps = CODE_RE.captures(code)?;
        CategoryKind::parse(&caps[1])
    }
}
