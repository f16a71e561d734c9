//! Shared types, error model, and configuration for ReleaseQA.
//!
//! This crate is the foundation depended on by all other ReleaseQA crates.
//! It provides:
//! - [`ReleaseQaError`] — the unified error type
//! - Domain types ([`SourceRecord`], [`TrainingEntry`], [`QaPair`])
//! - Configuration ([`AppConfig`], [`GenerateConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CurateConfig, DefaultsConfig, GenerateConfig, ParaphraseConfig, PruneRule,
    QuestionOverrides, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ReleaseQaError, Result};
pub use types::{
    ChatMessage, DEFAULT_SYSTEM_PROMPT, QaPair, Role, SourceRecord, TrainingEntry,
    UNKNOWN_SHEET_ID,
};
