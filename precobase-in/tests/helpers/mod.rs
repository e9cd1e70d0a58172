//! Test helper utilities
//!
//! Shared fixtures and mocks for the precobase-in integration suites.

// Each test binary compiles this module separately and uses a subset.
#![allow(dead_code)]

pub mod db_fixtures;
pub mod mocks;

pub use db_fixtures::{
    classifier_with, create_test_pool, pipeline_with, seed_item, seed_pre_classified_item,
    seed_taxonomy,
};
pub use mocks::{GatedCompletion, ScriptedCompletion, TimeoutCompletion, UniformCompletion};
