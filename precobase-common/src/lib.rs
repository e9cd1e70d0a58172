//! # Precobase Common Library
//!
//! Shared code for all Precobase modules including:
//! - Common error type and result alias
//! - TOML configuration loading and data-dir resolution
//! - SQLite connection pool bootstrap

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
