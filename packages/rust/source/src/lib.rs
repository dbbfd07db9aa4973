//! Source page fetching and ranking table extraction.
//!
//! This crate provides:
//! - [`SourceFetcher`] — the single HTTP GET for the ranking page
//! - [`extract_records`] — converts the identified table into [`Record`]s
//!
//! [`Record`]: rankpages_shared::Record

pub mod fetch;
pub mod table;

pub use fetch::SourceFetcher;
pub use table::{COLUMNS, extract_records, skip_rows};
