//! Shared types, error model, and configuration for rankpages.
//!
//! This crate is the foundation depended on by all other rankpages crates.
//! It provides:
//! - [`RankPagesError`] — the unified error type
//! - Domain types ([`Record`], [`PromptTemplate`], [`RunContext`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChatConfig, MissingTablePolicy, OutputConfig, RetryConfig, SourceConfig,
    config_dir, config_file_path, init_config, init_config_in, load_config, load_config_from,
    validate_api_key,
};
pub use error::{RankPagesError, Result};
pub use types::{
    FIELD_NAMES, PromptTemplate, Record, RecordFields, RunContext, TemplatePart,
    default_prompts, page_file_name, page_stem, sanitize_name,
};
