//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rankpages_chat::ChatClient;
use rankpages_core::pipeline::{
    ProgressReporter, RunConfig, RunSummary, SourceSettings, load_records,
};
use rankpages_markdown::render_index;
use rankpages_shared::{AppConfig, RunContext, init_config, load_config, validate_api_key};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// rankpages: ranking table in, chat-augmented markdown pages out.
#[derive(Parser)]
#[command(
    name = "rankpages",
    version,
    about = "Scrape a ranking table and generate one chat-augmented markdown page per row.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the table, generate every page and render the index.
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory for the pages.
        #[arg(short, long)]
        out: Option<String>,

        /// Chat model identifier.
        #[arg(short, long)]
        model: Option<String>,

        /// Also write the index table to index.md.
        #[arg(long)]
        write_index: bool,
    },

    /// Print the index table without generating pages.
    Index {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for the `[source]` config section.
#[derive(Args, Debug, Default)]
pub(crate) struct SourceArgs {
    /// Page holding the ranking table.
    #[arg(long)]
    pub url: Option<String>,

    /// Number of leading rows to leave out.
    #[arg(long)]
    pub skip: Option<usize>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

impl SourceArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.url {
            config.source.url = url.clone();
        }
        if let Some(skip) = self.skip {
            config.source.skip_rows = skip;
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "rankpages=info",
        1 => "rankpages=debug",
        _ => "rankpages=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            source,
            out,
            model,
            write_index,
        } => cmd_run(&source, out, model, write_index).await,
        Command::Index { source } => cmd_index(&source).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    source: &SourceArgs,
    out: Option<String>,
    model: Option<String>,
    write_index: bool,
) -> Result<()> {
    let mut config = load_config()?;
    source.apply(&mut config);
    if let Some(out) = out {
        config.output.dir = out;
    }
    if let Some(model) = model {
        config.chat.model = model;
    }
    config.output.write_index |= write_index;
    config.validate()?;

    // Fail on a missing key before touching the network.
    let api_key = validate_api_key(&config)?;
    let chat = ChatClient::from_config(&config.chat, api_key)?;

    let run_config = RunConfig::from_app_config(&config, RunContext::today())?;

    info!(
        url = %run_config.source.url,
        out = %run_config.generate.output_dir.display(),
        model = %run_config.generate.model,
        "generating pages"
    );

    let reporter = CliProgress::new();
    let summary = rankpages_core::pipeline::run(&run_config, &chat, &reporter).await?;

    if !summary.table_found {
        println!(
            "Table '{}' not found at {}; nothing generated.",
            run_config.source.table_id, run_config.source.url
        );
        return Ok(());
    }

    println!();
    println!("  Pages generated!");
    println!(
        "  Records:  {} of {} (skipped {})",
        summary.records_generated,
        summary.records_extracted,
        summary.records_extracted - summary.records_generated
    );
    println!("  Chat:     {} calls, {} retries", summary.chat_calls, summary.retries);
    println!("  Output:   {}", run_config.generate.output_dir.display());
    if let Some(path) = &summary.index_path {
        println!("  Index:    {}", path.display());
    }
    println!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_index(source: &SourceArgs) -> Result<()> {
    let mut config = load_config()?;
    source.apply(&mut config);
    config.validate()?;

    let settings = SourceSettings::from_app_config(&config)?;

    match load_records(&settings).await? {
        Some(loaded) => {
            println!("{}", render_index(&loaded.records, &RunContext::today()));
        }
        None => {
            warn!(table_id = %settings.table_id, "no index rendered");
            println!(
                "Table '{}' not found at {}.",
                settings.table_id, settings.url
            );
        }
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a spinner while fetching, then a bar over records.
struct CliProgress {
    bar: ProgressBar,
    /// Receives the retry counter lines; stdout outside tests.
    out: Mutex<Box<dyn Write + Send>>,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        bar.enable_steady_tick(Duration::from_millis(80));
        Self::with_output(bar, Box::new(std::io::stdout()))
    }

    fn with_output(bar: ProgressBar, out: Box<dyn Write + Send>) -> Self {
        Self {
            bar,
            out: Mutex::new(out),
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn records_found(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            self.bar.set_style(style.progress_chars("=> "));
        }
    }

    fn record_started(&self, name: &str, _current: usize, _total: usize) {
        self.bar.set_message(name.to_string());
    }

    fn record_finished(&self, _name: &str, _path: &Path) {
        self.bar.inc(1);
    }

    fn chat_retry(&self, failures: u32, _error: &str, _next_delay: Option<Duration>) {
        // The bar draws on stderr; clear it while the counter goes to stdout.
        self.bar.suspend(|| {
            if let Ok(mut out) = self.out.lock() {
                let _ = writeln!(out, "number of failures: {failures}");
                let _ = out.flush();
            }
        });
    }

    fn done(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}
