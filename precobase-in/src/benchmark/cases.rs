//! Labeled benchmark cases
//!
//! A built-in fixture set of real-world-shaped procurement items plus a
//! loader for external JSON case files. Group ids mark cases describing
//! the same underlying product in different feed spellings.

use std::path::Path;

use precobase_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::models::CategoryKind;

/// One labeled benchmark input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkCase {
    pub id: String,
    pub description: String,
    pub unit: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub pre_classified_code: Option<String>,
    /// Expected taxonomy code, None for items that should stay
    /// unclassified
    #[serde(default)]
    pub expected_category: Option<String>,
    pub expected_unit: String,
    pub expected_kind: CategoryKind,
    /// Cases sharing a group id describe the same product
    #[serde(default)]
    pub group_id: Option<String>,
}

fn case(
    id: &str,
    description: &str,
    unit: &str,
    expected_category: &str,
    expected_unit: &str,
    expected_kind: CategoryKind,
    group_id: Option<&str>,
) -> BenchmarkCase {
    BenchmarkCase {
        id: id.to_string(),
        description: description.to_string(),
        unit: unit.to_string(),
        quantity: None,
        unit_price: None,
        pre_classified_code: None,
        expected_category: Some(expected_category.to_string()),
        expected_unit: expected_unit.to_string(),
        expected_kind,
        group_id: group_id.map(|g| g.to_string()),
    }
}

/// The fixture dataset shipped with the harness
pub fn builtin_cases() -> Vec<BenchmarkCase> {
    use CategoryKind::{Material, Service};

    let mut cases = vec![
        case(
            "papel-a4-resma",
            "Papel sulfite A4 branco, resma com 500 folhas, 75g/m2",
            "RESMA",
            "CATMAT-24328",
            "RM",
            Material,
            Some("papel-a4"),
        ),
        case(
            "papel-a4-pacote",
            "PAPEL A4 SULFITE BRANCO - PCT C/ 500 FLS 75 GRS",
            "PACOTE",
            "CATMAT-24328",
            "PCT",
            Material,
            Some("papel-a4"),
        ),
        case(
            "papel-a4-caixa",
            "Papel A4 tipo Chamex ou similar, caixa com 10 resmas",
            "CAIXA",
            "CATMAT-24328",
            "CX",
            Material,
            Some("papel-a4"),
        ),
        case(
            "caneta-azul-un",
            "Caneta esferográfica azul, escrita média, corpo sextavado",
            "UNIDADE",
            "CATMAT-30177",
            "UN",
            Material,
            Some("caneta-esferografica"),
        ),
        case(
            "caneta-azul-cx",
            "CANETA ESFEROGRAFICA AZUL CX C/ 50 UNIDADES",
            "CX",
            "CATMAT-30177",
            "CX",
            Material,
            Some("caneta-esferografica"),
        ),
        case(
            "notebook-i5",
            "Notebook com processador Intel Core i5, 8GB RAM, SSD 256GB",
            "UNIDADE",
            "CATMAT-44122",
            "UN",
            Material,
            Some("notebook-corporativo"),
        ),
        case(
            "notebook-i5-dell",
            "NOTEBOOK DELL INSPIRON 15, I5, 8GB, SSD 256GB, WINDOWS 11",
            "UN",
            "CATMAT-44122",
            "UN",
            Material,
            Some("notebook-corporativo"),
        ),
        case(
            "toner-laserjet",
            "Toner para impressora HP LaserJet, preto, original",
            "UNIDADE",
            "CATMAT-57123",
            "UN",
            Material,
            None,
        ),
        case(
            "alcool-70",
            "Álcool etílico 70%, frasco com 1 litro",
            "FRASCO",
            "CATMAT-38472",
            "FR",
            Material,
            None,
        ),
        case(
            "cafe-torrado",
            "Café torrado e moído, pacote 500g",
            "PACOTE",
            "CATMAT-12055",
            "PCT",
            Material,
            None,
        ),
        case(
            "detergente-neutro",
            "Detergente líquido neutro, frasco 500ml",
            "FRASCO",
            "CATMAT-39814",
            "FR",
            Material,
            None,
        ),
        case(
            "limpeza-predial",
            "Serviço de limpeza e conservação predial, posto diurno",
            "MÊS",
            "CATSER-25917",
            "MES",
            Service,
            None,
        ),
        case(
            "vigilancia-armada",
            "Serviço de vigilância armada 24 horas",
            "MÊS",
            "CATSER-23959",
            "MES",
            Service,
            None,
        ),
        case(
            "manutencao-ar",
            "Serviço de manutenção preventiva e corretiva de ar condicionado split",
            "SERVIÇO",
            "CATSER-25401",
            "SV",
            Service,
            None,
        ),
        case(
            "locacao-multifuncional",
            "Locação mensal de multifuncional monocromática, franquia 10.000 páginas",
            "MÊS",
            "CATSER-26336",
            "MES",
            Service,
            None,
        ),
    ];

    // A couple of cases carry commercial fields for price normalization
    cases[0].quantity = Some(10.0);
    cases[0].unit_price = Some(25.9);
    cases[9].quantity = Some(50.0);
    cases[9].unit_price = Some(18.4);
    cases
}

/// Load cases from a JSON array file
pub fn load_from_file(path: &Path) -> Result<Vec<BenchmarkCase>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::InvalidInput(format!("benchmark case file {}: {}", path.display(), e)))
}
