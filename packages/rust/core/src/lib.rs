//! Core pipeline orchestration for rankpages.
//!
//! This crate ties together source extraction, prompt rendering, chat calls
//! and markdown output into the end-to-end [`pipeline::run`] workflow.

pub mod generator;
pub mod pipeline;
pub mod prompt;

pub use generator::{GenerateSettings, GenerateSummary, generate_pages};
pub use pipeline::{
    LoadedRecords, ProgressReporter, RunConfig, RunSummary, SilentProgress, SourceSettings,
    load_records, run,
};
pub use prompt::{render_prompt, validate_prompts, validate_template};
