//! Domain model types for item normalization
//!
//! Persistent rows (`SourceItem`, `Category`, `NormalizedRecord`) and the
//! transient classification types that flow between the extractor, the
//! classifier and the pipeline.

pub mod category;
pub mod record;
pub mod source_item;

pub use category::{Category, CategoryKind};
pub use record::{ClassificationMethod, ClassificationResult, NormalizedRecord};
pub use source_item::{ItemSource, SourceItem};
