//! Shared types, error model, and configuration for medsource.
//!
//! This crate is the foundation depended on by all other medsource crates.
//! It provides:
//! - [`MedSourceError`]: the unified error type
//! - Domain types ([`SideEffectRecord`], [`ScrapedDocument`])
//! - Configuration ([`AppConfig`], [`ScrapeConfig`], config loading)
//! - The FAERS code [`legend`] used when presenting structured rows

pub mod config;
pub mod error;
pub mod legend;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, OpenRouterConfig, ScrapeConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key, validate_api_key,
};
pub use error::{MedSourceError, Result};
pub use types::{
    DOCUMENT_TEXT_CAP, MEDICATION_COLUMN, STRUCTURED_SOURCE_TAG, SIDE_EFFECT_COLUMN,
    ScrapedDocument, SideEffectRecord, normalize_phrase, truncate_chars,
};
