//! Database fixtures
//!
//! In-memory pools seeded with a small taxonomy and source items.

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use precobase_in::classifier::completion::CompletionService;
use precobase_in::classifier::Classifier;
use precobase_in::db;
use precobase_in::models::{Category, CategoryKind, ItemSource, SourceItem};
use precobase_in::pipeline::NormalizationPipeline;

/// In-memory pool with all tables created
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    db::init_tables(&pool).await.expect("init tables");
    pool
}

/// Seed the standard test taxonomy. Mirrors a slice of the real
/// CATMAT/CATSER tree so classifier candidates look realistic.
pub async fn seed_taxonomy(pool: &SqlitePool) {
    let mut categories = vec![
        material("CATMAT-24328", "Papel sulfite A4", &["papel", "sulfite", "resma"]),
        material("CATMAT-30177", "Caneta esferográfica", &["caneta", "esferografica"]),
        material("CATMAT-44122", "Notebook", &["notebook", "computador", "portatil"]),
        material("CATMAT-57123", "Toner para impressora", &["toner", "cartucho"]),
        material("CATMAT-38472", "Álcool etílico 70%", &["alcool", "etilico"]),
        material("CATMAT-12055", "Café torrado e moído", &["cafe", "torrado", "moido"]),
        material("CATMAT-39814", "Detergente neutro", &["detergente", "liquido"]),
        service("CATSER-25917", "Limpeza e conservação predial", &["limpeza", "conservacao"]),
        service("CATSER-23959", "Vigilância armada", &["vigilancia", "seguranca"]),
        service("CATSER-25401", "Manutenção de ar condicionado", &["manutencao", "ar", "condicionado"]),
        service("CATSER-26336", "Locação de multifuncional", &["locacao", "multifuncional"]),
    ];

    // One retired category: valid code, never offered as a candidate
    let mut inactive = material("CATMAT-99001", "Fita de impressora matricial", &["fita"]);
    inactive.active = false;
    categories.push(inactive);

    for category in &categories {
        db::categories::upsert_category(pool, category)
            .await
            .expect("seed category");
    }
}

fn material(code: &str, name: &str, keywords: &[&str]) -> Category {
    let mut category = Category::new(code, name, CategoryKind::Material);
    category.keywords = keywords.iter().map(|k| k.to_string()).collect();
    category
}

fn service(code: &str, name: &str, keywords: &[&str]) -> Category {
    let mut category = Category::new(code, name, CategoryKind::Service);
    category.keywords = keywords.iter().map(|k| k.to_string()).collect();
    category
}

/// Insert one source item and return it
pub async fn seed_item(pool: &SqlitePool, description: &str, unit: &str) -> SourceItem {
    let item = SourceItem::new(description, unit, ItemSource::Pncp);
    db::source_items::insert_item(pool, &item)
        .await
        .expect("seed item");
    item
}

/// Insert a pre-classified source item and return it
pub async fn seed_pre_classified_item(
    pool: &SqlitePool,
    description: &str,
    unit: &str,
    code: &str,
) -> SourceItem {
    let mut item = SourceItem::new(description, unit, ItemSource::Comprasnet);
    item.pre_classified_code = Some(code.to_string());
    db::source_items::insert_item(pool, &item)
        .await
        .expect("seed pre-classified item");
    item
}

/// Classifier wired to a mock completion service
pub fn classifier_with(pool: &SqlitePool, completion: Arc<dyn CompletionService>) -> Classifier {
    Classifier::new(pool.clone(), completion)
}

/// Pipeline wired to a mock completion service
pub fn pipeline_with(
    pool: &SqlitePool,
    completion: Arc<dyn CompletionService>,
) -> NormalizationPipeline {
    NormalizationPipeline::new(pool.clone(), classifier_with(pool, completion))
}
