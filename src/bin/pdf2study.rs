//! CLI binary for pdf2study.
//!
//! A thin shim over the library crate: load `config.yaml`, apply flag
//! overrides, run the batch and print a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2study::pipeline::ocr::TesseractOcr;
use pdf2study::{
    load_file_config, run_batch, BatchReport, Collaborators, JsonStrictness, PipelineConfig,
    PipelineProgressCallback, ProgressCallback, RenderFormat,
};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar, reset for every PDF of the batch.
/// Pages complete out of order, so each line carries its page number.
struct CliProgressCallback {
    bar: ProgressBar,
    dropped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let cb = Arc::new(Self {
            bar: ProgressBar::new(0),
            dropped: AtomicUsize::new(0),
        });
        cb.show_spinner();
        cb.bar.enable_steady_tick(Duration::from_millis(80));
        cb
    }

    /// Spinner shown while the next PDF renders.
    fn show_spinner(&self) {
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        self.bar.set_style(spinner_style);
        self.bar.set_prefix("Rendering");
        self.bar.set_message("rasterising pages…");
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Studying");
        self.dropped.store(0, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_pdf_start(&self, pdf_path: &Path, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{} ({total_pages} pages)", file_name(pdf_path)))
        ));
    }

    fn on_page_complete(&self, page_number: usize, total_pages: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}",
            green("✓"),
            page_number,
            total_pages
        ));
        self.bar.inc(1);
    }

    fn on_page_dropped(&self, page_number: usize, total_pages: usize, reason: String) {
        self.dropped.fetch_add(1, Ordering::SeqCst);

        let msg = if reason.chars().count() > 80 {
            let cut: String = reason.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            reason
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            yellow("–"),
            page_number,
            total_pages,
            dim(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_pdf_complete(&self, pdf_path: &Path, total_pages: usize, success_count: usize) {
        if total_pages == 0 {
            self.bar.println(format!(
                "{} {}: no pages rendered",
                red("✘"),
                file_name(pdf_path)
            ));
            self.show_spinner();
            return;
        }

        let dropped = self.dropped.load(Ordering::SeqCst);
        self.bar.println(format!(
            "{} {}: {}/{} pages with study material{}",
            if success_count == 0 { red("✘") } else { green("✔") },
            file_name(pdf_path),
            bold(&success_count.to_string()),
            total_pages,
            if dropped > 0 {
                format!("  ({} dropped)", dropped)
            } else {
                String::new()
            }
        ));
        self.show_spinner();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process every PDF listed by config.yaml
  pdf2study

  # Another config file, overwriting results of a previous run
  pdf2study --config lectures.yaml --replace

  # Quicker rendering at lower zoom, German OCR
  pdf2study --zoom 4 --language deu

  # Reject LLM replies that wrap the JSON in prose
  pdf2study --strict-json

CONFIG FILE (YAML):
  pdf_path: ~/lectures               directory scanned for *.pdf
  language: eng                      tesseract language code
  path_to_directory: ~/lectures/img  rendered page images
  results_folder: results            output.json
  summary_folder: results/summaries  summaries.json
  flashcard_folder: results/cards    flashcards.json
  query_folder: results/queries      search_queries.json
  # optional: zoom, image_format, concurrency, render_concurrency,
  #   page_timeout_secs, json_strictness, replace_results, provider,
  #   model, temperature, max_tokens, search_timeout_secs, log_file

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Log filter, e.g. pdf2study=debug

REQUIREMENTS:
  tesseract must be on PATH, with the language data for --language.
  libpdfium must be in PDFIUM_LIB_PATH, the working directory, or the
  system library path.
"#;

/// Generate summaries, flashcards and image links from PDF lecture notes.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2study",
    version,
    about = "Generate summaries, flashcards and image links from PDFs",
    long_about = "Render every page of every PDF in a directory, OCR it with tesseract, and ask \
an LLM for a summary, flashcards and an image search query. Results are written as JSON.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, env = "PDF2STUDY_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Directory scanned for PDFs (overrides `pdf_path`).
    #[arg(long, env = "PDF2STUDY_PDF_DIR")]
    pdf_dir: Option<String>,

    /// Tesseract language code (overrides `language`).
    #[arg(long, env = "PDF2STUDY_LANGUAGE")]
    language: Option<String>,

    /// Render scale factor; 10 is slow but gives the best OCR.
    #[arg(long, env = "PDF2STUDY_ZOOM")]
    zoom: Option<f32>,

    /// Page image format.
    #[arg(long, env = "PDF2STUDY_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Concurrent page workers.
    #[arg(short = 'j', long, env = "PDF2STUDY_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Concurrent page renders.
    #[arg(long, env = "PDF2STUDY_RENDER_CONCURRENCY")]
    render_concurrency: Option<usize>,

    /// Per-page timeout in seconds.
    #[arg(long, env = "PDF2STUDY_PAGE_TIMEOUT")]
    page_timeout: Option<u64>,

    /// Only accept LLM replies that are exactly one JSON object.
    #[arg(long, env = "PDF2STUDY_STRICT_JSON")]
    strict_json: bool,

    /// Delete an existing results folder before writing.
    #[arg(long, env = "PDF2STUDY_REPLACE")]
    replace: bool,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (default: gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2STUDY_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "PDF2STUDY_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Also write logs to this file (overrides `log_file`).
    #[arg(long, env = "PDF2STUDY_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "PDF2STUDY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2STUDY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2STUDY_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for RenderFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => RenderFormat::Png,
            FormatArg::Jpeg => RenderFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Config file ──────────────────────────────────────────────────────
    let file = load_file_config(&cli.config)
        .await
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| file.log_file.as_deref().map(pdf2study::config::expand_home));

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level console logs; the log file keeps them.
    let show_progress = !cli.quiet && !cli.no_progress;
    let console_level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    init_logging(console_level, if cli.verbose { "debug" } else { "info" }, log_file.as_deref())?;
    info!(path = %cli.config.display(), "Configuration file loaded");

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        file.into_builder(),
        progress.clone().map(|cb| cb as ProgressCallback),
    )?;

    if !TesseractOcr::new().is_available().await {
        warn!("tesseract was not found on PATH; every page will fail OCR");
    }

    let services =
        Collaborators::from_config(&config).context("Failed to initialise the LLM provider")?;

    // ── Run batch ────────────────────────────────────────────────────────
    let batch = run_batch(&config, &services).await;

    if let Some(ref cb) = progress {
        cb.finish();
    }
    if !cli.quiet {
        print_summary(&config, &batch);
    }

    if !batch.failed.is_empty() {
        anyhow::bail!("{} PDF(s) could not be processed", batch.failed.len());
    }
    Ok(())
}

/// Console layer plus an optional plain-text file layer.
///
/// `RUST_LOG`, when set, overrides both levels.
fn init_logging(console_level: &str, file_level: &str, log_file: Option<&Path>) -> Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(file_level));
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();
    Ok(())
}

/// Apply CLI overrides on top of the file configuration.
fn build_config(
    cli: &Cli,
    mut builder: pdf2study::PipelineConfigBuilder,
    progress: Option<ProgressCallback>,
) -> Result<PipelineConfig> {
    if let Some(ref dir) = cli.pdf_dir {
        builder = builder.pdf_dir(dir);
    }
    if let Some(ref lang) = cli.language {
        builder = builder.language(lang.clone());
    }
    if let Some(z) = cli.zoom {
        builder = builder.zoom(z);
    }
    if let Some(f) = cli.format {
        builder = builder.image_format(f.into());
    }
    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(n) = cli.render_concurrency {
        builder = builder.render_concurrency(n);
    }
    if let Some(s) = cli.page_timeout {
        builder = builder.page_timeout_secs(s);
    }
    if cli.strict_json {
        builder = builder.json_strictness(JsonStrictness::Strict);
    }
    if cli.replace {
        builder = builder.replace_results(true);
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p.clone());
    }
    if let Some(ref m) = cli.model {
        builder = builder.model(m.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(config: &PipelineConfig, batch: &BatchReport) {
    if batch.reports.is_empty() && batch.failed.is_empty() {
        eprintln!(
            "{} No PDF files found in {}",
            red("✘"),
            config.pdf_dir.display()
        );
        return;
    }

    for r in &batch.reports {
        let mark = if !r.persisted {
            red("✘")
        } else if r.skipped_pages + r.failed_pages > 0 {
            cyan("⚠")
        } else {
            green("✔")
        };
        eprintln!(
            "{}  {}  {}/{} pages  {} skipped  {} failed  {}ms",
            mark,
            bold(&file_name(&r.pdf_path)),
            r.processed_pages,
            r.rendered_pages,
            r.skipped_pages,
            r.failed_pages,
            r.duration_ms,
        );
        if !r.persisted && r.rendered_pages > 0 {
            eprintln!(
                "   {}",
                dim("results were not written; see the log (use --replace to overwrite)")
            );
        }
    }
    for (path, err) in &batch.failed {
        eprintln!("{}  {}  {}", red("✘"), bold(&file_name(path)), red(err));
    }

    eprintln!(
        "   {} pages of study material  →  {}",
        batch.processed_pages(),
        bold(&config.results_dir.display().to_string())
    );
}
