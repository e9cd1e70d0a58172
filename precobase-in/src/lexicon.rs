//! Portuguese word lists driving tokenization and kind estimation
//!
//! The lists live here as plain configuration data; the similarity engine
//! and feature extractor are pure algorithms over whatever `Lexicon` they
//! are handed. All entries are stored pre-normalized (lowercase, no
//! diacritics) so membership tests run on normalized text directly.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Function words and procurement boilerplate dropped before token
/// comparison. Tokens of length <= 2 are dropped unconditionally, so the
/// short function words here are listed for completeness.
const STOP_WORDS: &[&str] = &[
    "de", "da", "do", "das", "dos", "em", "no", "na", "nos", "nas", "para", "por", "com", "sem",
    "sob", "sobre", "um", "uma", "uns", "umas", "ou", "que", "ao", "aos", "tipo", "marca",
    "modelo", "conforme", "referencia", "especificacao", "especificacoes", "similar",
    "aproximadamente", "minimo", "minima", "maximo", "maxima", "unidade", "embalagem", "item",
    "descricao", "qualidade",
];

/// Descriptive filler dropped from extracted keywords on top of the stop
/// words: colors, sizes, generic quality markers.
const FILLER_WORDS: &[&str] = &[
    "branco", "branca", "preto", "preta", "azul", "vermelho", "vermelha", "verde", "amarelo",
    "amarela", "cinza", "grande", "medio", "media", "pequeno", "pequena", "novo", "nova",
    "original", "generico", "generica", "primeira", "linha", "padrao", "comum", "diversos",
    "diversas",
];

/// Terms suggesting the item contracts a service
const SERVICE_INDICATORS: &[&str] = &[
    "servico", "servicos", "manutencao", "instalacao", "locacao", "consultoria", "assessoria",
    "treinamento", "capacitacao", "limpeza", "vigilancia", "transporte", "mao de obra", "reparo",
    "conserto", "suporte", "hospedagem", "contratacao", "prestacao", "execucao",
];

/// Terms suggesting the item buys a material
const MATERIAL_INDICATORS: &[&str] = &[
    "papel", "caneta", "lapis", "caderno", "toner", "cartucho", "tinta", "cabo", "notebook",
    "computador", "impressora", "monitor", "teclado", "mouse", "mesa", "cadeira", "armario",
    "detergente", "sabao", "alcool", "luva", "mascara", "copo", "garrafa", "cafe", "acucar",
    "arroz", "feijao", "oleo", "leite", "medicamento", "seringa", "gaze", "cimento", "areia",
    "tijolo", "madeira", "parafuso", "lampada", "pilha", "bateria", "pneu", "combustivel",
    "gasolina", "envelope", "grampeador", "resma",
];

static DEFAULT_LEXICON: Lazy<Arc<Lexicon>> = Lazy::new(|| Arc::new(Lexicon::default()));

/// Word lists consumed by the similarity engine and the feature extractor
#[derive(Debug, Clone)]
pub struct Lexicon {
    stop_words: HashSet<String>,
    filler_words: HashSet<String>,
    service_indicators: Vec<String>,
    material_indicators: Vec<String>,
}

impl Lexicon {
    pub fn new(
        stop_words: impl IntoIterator<Item = String>,
        filler_words: impl IntoIterator<Item = String>,
        service_indicators: Vec<String>,
        material_indicators: Vec<String>,
    ) -> Self {
        Self {
            stop_words: stop_words.into_iter().collect(),
            filler_words: filler_words.into_iter().collect(),
            service_indicators,
            material_indicators,
        }
    }

    /// Process-wide shared instance of the default lists
    pub fn shared() -> Arc<Lexicon> {
        DEFAULT_LEXICON.clone()
    }

    /// Dropped from similarity token sets
    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    /// Dropped from extracted keywords (stop words plus filler)
    pub fn is_filtered_keyword(&self, token: &str) -> bool {
        self.stop_words.contains(token) || self.filler_words.contains(token)
    }

    pub fn service_indicators(&self) -> &[String] {
        &self.service_indicators
    }

    pub fn material_indicators(&self) -> &[String] {
        &self.material_indicators
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(
            STOP_WORDS.iter().map(|s| s.to_string()),
            FILLER_WORDS.iter().map(|s| s.to_string()),
            SERVICE_INDICATORS.iter().map(|s| s.to_string()).collect(),
            MATERIAL_INDICATORS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_words_are_a_subset_of_filtered_keywords() {
        let lexicon = Lexicon::default();
        assert!(lexicon.is_stop_word("marca"));
        assert!(lexicon.is_filtered_keyword("marca"));
        // Filler applies to keywords only
        assert!(!lexicon.is_stop_word("azul"));
        assert!(lexicon.is_filtered_keyword("azul"));
        assert!(!lexicon.is_filtered_keyword("caneta"));
    }

    #[test]
    fn entries_are_pre_normalized() {
        let lexicon = Lexicon::default();
        for term in lexicon
            .service_indicators()
            .iter()
            .chain(lexicon.material_indicators().iter())
        {
            assert_eq!(term, &crate::similarity::normalize(term), "term {term:?}");
        }
    }
}
