//! End-to-end pipeline: fetch → extract → skip → generate pages → index.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use rankpages_chat::{ChatService, RetryPolicy};
use rankpages_markdown::{INDEX_FILE_NAME, render_index, render_index_page, write_page_atomic};
use rankpages_shared::{
    AppConfig, MissingTablePolicy, PromptTemplate, RankPagesError, Record, Result, RunContext,
};
use rankpages_source::{SourceFetcher, extract_records, skip_rows};

use crate::generator::{GenerateSettings, generate_pages};
use crate::prompt::validate_prompts;

/// Where records come from and how many to drop.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Page holding the ranking table.
    pub url: Url,
    /// `id` attribute of the table.
    pub table_id: String,
    /// Leading rows excluded from generation.
    pub skip_rows: usize,
    /// What to do when the table is absent.
    pub missing_table: MissingTablePolicy,
    /// Timeout of the single source GET.
    pub timeout: Duration,
}

impl SourceSettings {
    /// Build from the `[source]` config section.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let url = Url::parse(&config.source.url).map_err(|e| {
            RankPagesError::config(format!("invalid source url '{}': {e}", config.source.url))
        })?;

        Ok(Self {
            url,
            table_id: config.source.table_id.clone(),
            skip_rows: config.source.skip_rows,
            missing_table: config.source.missing_table,
            timeout: Duration::from_secs(config.source.timeout_secs),
        })
    }
}

/// Configuration for [`run`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: SourceSettings,
    pub generate: GenerateSettings,
    /// Section prompts, in page order.
    pub prompts: Vec<PromptTemplate>,
    /// Layout of the index page front matter.
    pub index_layout: String,
    /// Persist the index table as `index.md` in the output directory.
    pub write_index: bool,
    /// Date stamped into every page name.
    pub ctx: RunContext,
}

impl RunConfig {
    /// Resolve a loaded [`AppConfig`] into run settings.
    pub fn from_app_config(config: &AppConfig, ctx: RunContext) -> Result<Self> {
        Ok(Self {
            source: SourceSettings::from_app_config(config)?,
            generate: GenerateSettings {
                output_dir: PathBuf::from(&config.output.dir),
                layout: config.output.layout.clone(),
                model: config.chat.model.clone(),
                timeout: Duration::from_secs(config.chat.timeout_secs),
                retry: RetryPolicy::from(&config.retry),
            },
            prompts: config.prompts.clone(),
            index_layout: config.output.index_layout.clone(),
            write_index: config.output.write_index,
            ctx,
        })
    }
}

/// Records read from the source, after skipping.
#[derive(Debug, Clone)]
pub struct LoadedRecords {
    /// Rows found in the table before skipping.
    pub extracted: usize,
    /// Rows left for generation.
    pub records: Vec<Record>,
}

/// Result of [`run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// `false` when the table was missing and the run was skipped.
    pub table_found: bool,
    pub records_extracted: usize,
    pub records_generated: usize,
    /// Written page paths, in record order.
    pub pages: Vec<PathBuf>,
    /// Index table over the generated records.
    pub index_markdown: Option<String>,
    /// Set when the index page was written.
    pub index_path: Option<PathBuf>,
    pub chat_calls: usize,
    /// Failed chat attempts across the run.
    pub retries: u32,
    pub elapsed: Duration,
}

impl RunSummary {
    fn skipped(elapsed: Duration) -> Self {
        Self {
            table_found: false,
            records_extracted: 0,
            records_generated: 0,
            pages: Vec::new(),
            index_markdown: None,
            index_path: None,
            chat_calls: 0,
            retries: 0,
            elapsed,
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the number of records to generate is known.
    fn records_found(&self, total: usize);
    /// Called before a record's sections are requested.
    fn record_started(&self, name: &str, current: usize, total: usize);
    /// Called after a record's page is written.
    fn record_finished(&self, name: &str, path: &Path);
    /// Called after every failed chat attempt.
    fn chat_retry(&self, failures: u32, error: &str, next_delay: Option<Duration>);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn records_found(&self, _total: usize) {}
    fn record_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn record_finished(&self, _name: &str, _path: &Path) {}
    fn chat_retry(&self, _failures: u32, _error: &str, _next_delay: Option<Duration>) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Fetch the source page and extract its records.
///
/// Returns `None` when the table is missing and the policy is
/// [`MissingTablePolicy::Skip`].
#[instrument(skip_all, fields(url = %source.url, table_id = %source.table_id))]
pub async fn load_records(source: &SourceSettings) -> Result<Option<LoadedRecords>> {
    let fetcher = SourceFetcher::new(source.timeout)?;
    let html = fetcher.fetch(&source.url).await?;

    let records = match extract_records(&html, &source.url, &source.table_id) {
        Ok(records) => records,
        Err(RankPagesError::TableNotFound { table_id })
            if source.missing_table == MissingTablePolicy::Skip =>
        {
            warn!(%table_id, "table not found in source page, nothing to generate");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let extracted = records.len();
    let records = skip_rows(records, source.skip_rows);

    info!(
        extracted,
        skipped = extracted - records.len(),
        remaining = records.len(),
        "records loaded"
    );

    Ok(Some(LoadedRecords { extracted, records }))
}

/// Run the full pipeline.
///
/// 1. Validate prompt templates
/// 2. Fetch the source page and extract records
/// 3. Drop the first `skip_rows` records
/// 4. Generate one page per record
/// 5. Render the index (and write it when configured)
#[instrument(skip_all, fields(url = %config.source.url, date = %config.ctx.date))]
pub async fn run<C: ChatService>(
    config: &RunConfig,
    chat: &C,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();

    // --- Phase 1: Templates ---
    validate_prompts(&config.prompts)?;

    // --- Phase 2: Source ---
    progress.phase("Fetching source table");
    let Some(loaded) = load_records(&config.source).await? else {
        let summary = RunSummary::skipped(start.elapsed());
        progress.done(&summary);
        return Ok(summary);
    };

    // --- Phase 3: Pages ---
    progress.phase("Generating pages");
    progress.records_found(loaded.records.len());

    let generated = generate_pages(
        &loaded.records,
        &config.prompts,
        chat,
        &config.generate,
        &config.ctx,
        progress,
    )
    .await?;

    // --- Phase 4: Index ---
    progress.phase("Rendering index");
    let table = render_index(&loaded.records, &config.ctx);

    let index_path = if config.write_index {
        let page = render_index_page(&config.index_layout, &table);
        Some(write_page_atomic(
            &config.generate.output_dir,
            INDEX_FILE_NAME,
            &page,
        )?)
    } else {
        None
    };

    let summary = RunSummary {
        table_found: true,
        records_extracted: loaded.extracted,
        records_generated: generated.pages.len(),
        pages: generated.pages,
        index_markdown: Some(table),
        index_path,
        chat_calls: generated.chat_calls,
        retries: generated.retries,
        elapsed: start.elapsed(),
    };

    progress.done(&summary);

    info!(
        records = summary.records_generated,
        chat_calls = summary.chat_calls,
        retries = summary.retries,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run complete"
    );

    Ok(summary)
}
