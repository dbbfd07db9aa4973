//! Page generation: one chat-augmented markdown page per record.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::{debug, info, instrument};

use rankpages_chat::{ChatRequest, ChatService, RetryObserver, RetryPolicy, complete_with_retry};
use rankpages_markdown::{PageBuilder, prepare_output_dir, write_page_atomic};
use rankpages_shared::{PromptTemplate, RankPagesError, Record, Result, RunContext, page_file_name};

use crate::pipeline::ProgressReporter;
use crate::prompt::{render_prompt, validate_prompts};

/// Settings for [`generate_pages`].
#[derive(Debug, Clone)]
pub struct GenerateSettings {
    /// Directory receiving the pages; created if absent.
    pub output_dir: PathBuf,
    /// Front-matter layout of each page.
    pub layout: String,
    /// Model identifier passed to the chat service.
    pub model: String,
    /// Per-attempt chat timeout.
    pub timeout: Duration,
    /// Retry policy for each chat call.
    pub retry: RetryPolicy,
}

/// What [`generate_pages`] produced.
#[derive(Debug, Clone, Default)]
pub struct GenerateSummary {
    /// Written page paths, in record order.
    pub pages: Vec<PathBuf>,
    /// Successful chat calls.
    pub chat_calls: usize,
    /// Failed chat attempts that were retried or gave up.
    pub retries: u32,
}

/// Forwards retry notifications to the progress reporter and counts them.
struct ProgressRetryObserver<'a> {
    progress: &'a dyn ProgressReporter,
    failures: AtomicU32,
}

impl RetryObserver for ProgressRetryObserver<'_> {
    fn on_failure(&self, failures: u32, error: &RankPagesError, next_delay: Option<Duration>) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.progress
            .chat_retry(failures, &error.to_string(), next_delay);
    }
}

/// Generate one page per record, strictly in order.
///
/// For each record every prompt is rendered and sent to `chat`; the answers
/// become the page sections in prompt order. A page is written only once all
/// of its sections are present. Template errors abort before any chat call.
#[instrument(skip_all, fields(records = records.len(), prompts = prompts.len()))]
pub async fn generate_pages<C: ChatService>(
    records: &[Record],
    prompts: &[PromptTemplate],
    chat: &C,
    settings: &GenerateSettings,
    ctx: &RunContext,
    progress: &dyn ProgressReporter,
) -> Result<GenerateSummary> {
    validate_prompts(prompts)?;
    prepare_output_dir(&settings.output_dir)?;

    let observer = ProgressRetryObserver {
        progress,
        failures: AtomicU32::new(0),
    };
    let mut summary = GenerateSummary::default();
    let total = records.len();

    for (i, record) in records.iter().enumerate() {
        progress.record_started(&record.language, i + 1, total);

        let mut page = PageBuilder::new(&settings.layout, record);

        for prompt in prompts {
            let request = ChatRequest {
                prompt: render_prompt(prompt, record)?,
                model: settings.model.clone(),
                timeout: settings.timeout,
            };

            debug!(record = %record.language, section = %prompt.title, "requesting section");
            let text = complete_with_retry(chat, &request, &settings.retry, &observer).await?;
            summary.chat_calls += 1;

            page.push_section(&prompt.title, &text);
        }

        let file_name = page_file_name(ctx, &record.language);
        let path = write_page_atomic(&settings.output_dir, &file_name, &page.finish())?;

        progress.record_finished(&record.language, &path);
        summary.pages.push(path);
    }

    summary.retries = observer.failures.load(Ordering::Relaxed);

    info!(
        pages = summary.pages.len(),
        chat_calls = summary.chat_calls,
        retries = summary.retries,
        "page generation complete"
    );

    Ok(summary)
}
