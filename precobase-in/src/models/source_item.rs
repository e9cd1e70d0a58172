//! Raw procurement items as delivered by the ingestion feeds
//!
//! Source items are read-only input to the pipeline: once fetched from a
//! feed they are never mutated, only referenced by normalized records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which procurement feed an item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemSource {
    /// Portal Nacional de Contratações Públicas
    #[serde(rename = "PNCP")]
    Pncp,
    /// Comprasnet / SIASG federal purchasing system
    #[serde(rename = "COMPRASNET")]
    Comprasnet,
    /// Painel de Preços price panel
    #[serde(rename = "PAINEL_PRECOS")]
    PainelPrecos,
    /// Hand-entered item
    #[serde(rename = "MANUAL")]
    Manual,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSource::Pncp => "PNCP",
            ItemSource::Comprasnet => "COMPRASNET",
            ItemSource::PainelPrecos => "PAINEL_PRECOS",
            ItemSource::Manual => "MANUAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PNCP" => Some(ItemSource::Pncp),
            "COMPRASNET" => Some(ItemSource::Comprasnet),
            "PAINEL_PRECOS" => Some(ItemSource::PainelPrecos),
            "MANUAL" => Some(ItemSource::Manual),
            _ => None,
        }
    }
}

/// A raw item row from one of the procurement feeds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: Uuid,
    /// Free-text description as published by the buying entity
    pub description: String,
    /// Unit of measure as published, often inconsistent across feeds
    pub unit: String,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub total_value: Option<f64>,
    pub source: ItemSource,
    /// Feed-specific reference (notice number, contract id, ...)
    pub source_reference: Option<String>,
    pub price_date: Option<NaiveDate>,
    /// Brazilian state/region code of the buying entity
    pub region: Option<String>,
    /// Taxonomy code already assigned upstream, trusted when it
    /// resolves to an active category
    pub pre_classified_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SourceItem {
    /// Minimal item with generated id, used by ingestion and fixtures
    pub fn new(description: impl Into<String>, unit: impl Into<String>, source: ItemSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            unit: unit.into(),
            quantity: None,
            unit_price: None,
            total_value: None,
            source,
            source_reference: None,
            price_date: None,
            region: None,
            pre_classified_code: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_roundtrips_through_db_representation() {
        for source in [
            ItemSource::Pncp,
            ItemSource::Comprasnet,
            ItemSource::PainelPrecos,
            ItemSource::Manual,
        ] {
            assert_eq!(ItemSource::parse(source.as_str()), Some(source));
        }
        assert_eq!(ItemSource::parse("FTP"), None);
    }
}
