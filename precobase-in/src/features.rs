//! Feature extraction from raw item descriptions
//!
//! Turns a free-text source item into the transient `ItemFeatures` the
//! classifier prompts with: cleaned description, ranked keywords, a
//! material-or-service estimate and the published commercial fields.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::lexicon::Lexicon;
use crate::models::{CategoryKind, SourceItem};
use crate::similarity;

/// Ordered unique keywords are capped at this many entries
const MAX_KEYWORDS: usize = 20;

/// Brazilian unit-of-measure spellings mapped to canonical codes.
/// Keys are normalized (uppercase, no diacritics).
static UNIT_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        ("UN", &["UNIDADE", "UNIDADES", "UNID", "UND", "UNI", "UN"]),
        ("CX", &["CAIXA", "CAIXAS", "CX"]),
        ("PCT", &["PACOTE", "PACOTES", "PCT", "PCTE"]),
        ("PC", &["PECA", "PECAS", "PC"]),
        ("KG", &["QUILO", "QUILOS", "QUILOGRAMA", "QUILOGRAMAS", "KILO", "KG"]),
        ("G", &["GRAMA", "GRAMAS", "G", "GR"]),
        ("L", &["LITRO", "LITROS", "LT", "L"]),
        ("ML", &["MILILITRO", "MILILITROS", "ML"]),
        ("M", &["METRO", "METROS", "MT", "M"]),
        ("M2", &["METRO QUADRADO", "METROS QUADRADOS", "M2"]),
        ("M3", &["METRO CUBICO", "METROS CUBICOS", "M3"]),
        ("CM", &["CENTIMETRO", "CENTIMETROS", "CM"]),
        ("RM", &["RESMA", "RESMAS", "RM"]),
        ("FR", &["FRASCO", "FRASCOS", "FR"]),
        ("GL", &["GALAO", "GALOES", "GL"]),
        ("RL", &["ROLO", "ROLOS", "RL", "BOBINA"]),
        ("PAR", &["PAR", "PARES"]),
        ("KIT", &["KIT", "KITS", "CONJUNTO", "JOGO"]),
        ("SC", &["SACO", "SACOS", "SC"]),
        ("H", &["HORA", "HORAS", "HR", "HS", "H"]),
        ("MES", &["MES", "MESES"]),
        ("DIARIA", &["DIARIA", "DIARIAS"]),
        ("ANO", &["ANO", "ANOS"]),
        ("SV", &["SERVICO", "SERVICOS", "SERV", "SV"]),
    ];
    let mut aliases = HashMap::new();
    for (canonical, spellings) in table {
        for spelling in *spellings {
            aliases.insert(*spelling, *canonical);
        }
    }
    aliases
});

/// Canonical unit code for a published unit-of-measure string.
/// Total: unknown units pass through normalized and uppercased, blank
/// units become "UN".
pub fn normalize_unit(unit: &str) -> String {
    let key = similarity::normalize(unit).to_uppercase();
    if key.is_empty() {
        return "UN".to_string();
    }
    match UNIT_ALIASES.get(key.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        // Unknown spellings pass through in the same canonical form
        None => key,
    }
}

/// Transient features feeding the classifier prompt, never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFeatures {
    pub cleaned_description: String,
    /// Ordered, unique, stop-word-free tokens of length > 2, capped at 20
    pub keywords: Vec<String>,
    /// Unit as published; canonicalized separately by `normalize_unit`
    pub unit: String,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub estimated_kind: CategoryKind,
}

/// Deterministic description-to-features projection over a `Lexicon`
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    lexicon: Arc<Lexicon>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(Lexicon::shared())
    }
}

impl FeatureExtractor {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn extract(&self, item: &SourceItem) -> ItemFeatures {
        let cleaned_description = similarity::normalize(&item.description);
        let keywords = self.keywords(&cleaned_description);
        let estimated_kind = self.estimate_kind(&cleaned_description, &keywords);
        ItemFeatures {
            cleaned_description,
            keywords,
            unit: item.unit.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            estimated_kind,
        }
    }

    fn keywords(&self, cleaned: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for token in cleaned.split_whitespace() {
            if token.chars().count() <= 2 || self.lexicon.is_filtered_keyword(token) {
                continue;
            }
            if seen.insert(token) {
                keywords.push(token.to_string());
                if keywords.len() == MAX_KEYWORDS {
                    break;
                }
            }
        }
        keywords
    }

    /// Count indicator terms in the cleaned text; service wins only on a
    /// strict majority, ties default to material
    fn estimate_kind(&self, cleaned: &str, keywords: &[String]) -> CategoryKind {
        let haystack = format!("{} {}", cleaned, keywords.join(" "));
        let service_hits = count_hits(&haystack, self.lexicon.service_indicators());
        let material_hits = count_hits(&haystack, self.lexicon.material_indicators());
        if service_hits > material_hits {
            CategoryKind::Service
        } else {
            CategoryKind::Material
        }
    }
}

fn count_hits(haystack: &str, terms: &[String]) -> usize {
    terms.iter().filter(|term| haystack.contains(term.as_str())).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemSource;

    fn extract(description: &str, unit: &str) -> ItemFeatures {
        let item = SourceItem::new(description, unit, ItemSource::Manual);
        FeatureExtractor::default().extract(&item)
    }

    #[test]
    fn keywords_are_ordered_unique_and_filtered() {
        let features = extract("CANETA esferográfica azul, caneta escrita média, marca conhecida", "CX");
        // "azul" and "media" are filler, "marca" is boilerplate, duplicates collapse
        assert_eq!(features.keywords, vec!["caneta", "esferografica", "escrita", "conhecida"]);
    }

    #[test]
    fn keywords_cap_at_twenty() {
        let description = (0..40).map(|i| format!("palavra{i:02}")).collect::<Vec<_>>().join(" ");
        let features = extract(&description, "UN");
        assert_eq!(features.keywords.len(), 20);
        assert_eq!(features.keywords[0], "palavra00");
    }

    #[test]
    fn kind_estimate_prefers_material_on_tie() {
        let features = extract("Fornecimento avulso sem pista de tipo", "UN");
        // No indicators on either side
        assert_eq!(features.estimated_kind, CategoryKind::Material);
    }

    #[test]
    fn kind_estimate_detects_services() {
        let features = extract("Serviço de manutenção preventiva de ar condicionado", "H");
        assert_eq!(features.estimated_kind, CategoryKind::Service);
    }

    #[test]
    fn kind_estimate_detects_materials() {
        let features = extract("Notebook com processador i5 e 8GB RAM", "UN");
        assert_eq!(features.estimated_kind, CategoryKind::Material);
    }

    #[test]
    fn normalize_unit_maps_common_spellings() {
        assert_eq!(normalize_unit("UNIDADE"), "UN");
        assert_eq!(normalize_unit("unidade"), "UN");
        assert_eq!(normalize_unit("Cx."), "CX");
        assert_eq!(normalize_unit("PEÇA"), "PC");
        assert_eq!(normalize_unit("Galão"), "GL");
        assert_eq!(normalize_unit("mês"), "MES");
        assert_eq!(normalize_unit("METRO QUADRADO"), "M2");
    }

    #[test]
    fn normalize_unit_is_total() {
        assert_eq!(normalize_unit(""), "UN");
        assert_eq!(normalize_unit("   "), "UN");
        assert_eq!(normalize_unit("Bombona 50L"), "BOMBONA 50L");
        assert_eq!(normalize_unit("fardo"), "FARDO");
    }
}
