//! CLI binary for mealplan-extract.
//!
//! A thin shell over [`mealplan_extract::Session`]: one-shot mode runs the
//! pipeline for a single PDF and prints the requested views; `--interactive`
//! keeps the session open and reads commands from stdin.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mealplan_extract::{
    notes_table, render_text, weekly_table, ApiKey, ExtractionConfig, Extractor,
    LabelLanguage, Labels, MealPlanError, PipelineObserver, SchemaValidation, Session, Stage,
    Table,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── Stage status reporting ───────────────────────────────────────────────────

/// Spinner while a remote call runs, one status line per stage outcome.
struct CliObserver {
    show_progress: bool,
    quiet: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    fn new(show_progress: bool, quiet: bool) -> Self {
        Self {
            show_progress,
            quiet,
            spinner: Mutex::new(None),
        }
    }

    fn start_spinner(&self, msg: &'static str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(msg);
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(old) = slot.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn stop_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn line(&self, msg: String) {
        if !self.quiet {
            eprintln!("{msg}");
        }
    }
}

impl PipelineObserver for CliObserver {
    fn on_stage_start(&self, stage: Stage) {
        let msg = match stage {
            Stage::Parsing => "Parsing the PDF with LlamaParse…",
            Stage::Extraction => "Extracting the meal plan…",
        };
        if self.show_progress && !self.quiet {
            self.start_spinner(msg);
        } else {
            self.line(format!("{} {}", cyan("◆"), msg));
        }
    }

    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        self.stop_spinner();
        let msg = match stage {
            Stage::Parsing => format!("PDF parsed ({output_len} bytes of markdown)"),
            Stage::Extraction => format!("Meal plan extracted ({output_len} days)"),
        };
        self.line(format!("{} {}", green("✓"), msg));
    }

    fn on_stage_cached(&self, stage: Stage) {
        self.line(format!("{} {}", dim("·"), dim(&format!("{stage}: using cached result"))));
    }

    fn on_stage_error(&self, stage: Stage, error: &MealPlanError) {
        self.stop_spinner();
        let what = match stage {
            Stage::Parsing => "PDF parsing failed",
            Stage::Extraction => "Meal-plan extraction failed",
        };
        // Errors are shown even in quiet mode.
        eprintln!("{} {}: {}", red("✗"), bold(what), error);
        if let Some(raw) = error.raw_response() {
            eprintln!("{}", dim("Response received (may be truncated):"));
            eprintln!("{raw}");
        }
    }
}

// ── CLI ──────────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Weekly table, notes and text report for one PDF
  mealplan piano.pdf

  # Only the weekly table, as TSV for pasting into a spreadsheet
  mealplan piano.pdf --show plan > settimana.tsv

  # Italian labels, Markdown tables, also show the parsed markdown
  mealplan piano.pdf --labels it --table-format markdown --show markdown,plan,notes

  # Validated JSON
  mealplan piano.pdf --show json -o piano.json

  # Interactive session (open, run, plan, notes, report, reset, …)
  mealplan --interactive

ENVIRONMENT VARIABLES:
  LLAMA_CLOUD_API_KEY   LlamaParse API key
  OPENAI_API_KEY        OpenAI API key
  MEALPLAN_MODEL        Override the extraction model
  RUST_LOG              Override the log filter (e.g. mealplan_extract=debug)
"#;

/// Extract structured weekly meal plans from PDF diet sheets.
#[derive(Parser, Debug)]
#[command(
    name = "mealplan",
    version,
    about = "Extract structured weekly meal plans from PDF diet sheets",
    long_about = "Parse a PDF meal plan with LlamaParse, structure it with an OpenAI model, \
and print it as a weekly table, a notes table and a plain-text report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "interactive")]
    input: Option<String>,

    /// Keep the session open and read commands from stdin.
    #[arg(short, long)]
    interactive: bool,

    /// LlamaParse API key.
    #[arg(long, env = "LLAMA_CLOUD_API_KEY", hide_env_values = true)]
    llama_api_key: Option<String>,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Extraction model.
    #[arg(long, env = "MEALPLAN_MODEL", default_value = mealplan_extract::config::DEFAULT_MODEL)]
    model: String,

    /// Document language hint for the parser.
    #[arg(long, env = "MEALPLAN_LANGUAGE", default_value = "it")]
    language: String,

    /// Multimodal model LlamaParse reads the pages with.
    #[arg(long, env = "MEALPLAN_VENDOR_MODEL", default_value = mealplan_extract::config::DEFAULT_VENDOR_MODEL)]
    vendor_model: String,

    /// Use LlamaParse's own text parser instead of a multimodal model.
    #[arg(long)]
    no_vendor_model: bool,

    /// Max output tokens for the extraction call.
    #[arg(long, env = "MEALPLAN_MAX_TOKENS", default_value_t = 8000)]
    max_tokens: usize,

    /// Accept model output with missing meals or lists, filling the gaps.
    #[arg(long, env = "MEALPLAN_LENIENT")]
    lenient: bool,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "MEALPLAN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Views to print, comma separated.
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [Section::Plan, Section::Notes, Section::Report]
    )]
    show: Vec<Section>,

    /// Wording of headers and markers.
    #[arg(long, value_enum, default_value = "en")]
    labels: LabelsArg,

    /// Table layout.
    #[arg(long, value_enum, default_value = "tsv")]
    table_format: TableFormat,

    /// Write the views to this file instead of stdout (one-shot mode).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "MEALPLAN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEALPLAN_VERBOSE")]
    verbose: bool,

    /// Suppress status output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    /// Raw markdown returned by the parser.
    Markdown,
    /// Weekly plan table.
    Plan,
    /// Notes table.
    Notes,
    /// Plain-text report.
    Report,
    /// Validated meal plan as JSON.
    Json,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LabelsArg {
    En,
    It,
}

impl From<LabelsArg> for LabelLanguage {
    fn from(v: LabelsArg) -> Self {
        match v {
            LabelsArg::En => LabelLanguage::English,
            LabelsArg::It => LabelLanguage::Italian,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TableFormat {
    Tsv,
    Markdown,
}

/// How views are rendered; shared by both modes.
struct View {
    labels: &'static Labels,
    table_format: TableFormat,
}

impl View {
    fn table(&self, table: &Table) -> String {
        match self.table_format {
            TableFormat::Tsv => table.to_tsv(),
            TableFormat::Markdown => table.to_markdown(),
        }
    }

    /// Render one section, or explain why it is not available yet.
    fn section(&self, session: &Session, section: Section) -> Result<String> {
        if section == Section::Markdown {
            return Ok(match session.markdown() {
                Some(md) => md.to_string(),
                None => "No markdown yet: parse a document first.".to_string(),
            });
        }
        let Some(plan) = session.plan() else {
            return Ok("No meal plan yet: run the extraction first.".to_string());
        };
        Ok(match section {
            Section::Notes => self.table(&notes_table(plan, self.labels)),
            Section::Report => render_text(plan, self.labels),
            Section::Json => {
                serde_json::to_string_pretty(plan).context("Failed to serialise meal plan")?
            }
            Section::Plan | Section::Markdown => self.table(&weekly_table(plan, self.labels)),
        })
    }

    fn title(section: Section) -> &'static str {
        match section {
            Section::Markdown => "Extracted markdown",
            Section::Plan => "Weekly meal plan",
            Section::Notes => "Notes and advice",
            Section::Report => "Meal plan report",
            Section::Json => "Meal plan JSON",
        }
    }

    /// All requested sections; titles only when more than one is shown.
    fn sections(&self, session: &Session, sections: &[Section]) -> Result<String> {
        let mut out = String::new();
        for (i, &section) in sections.iter().enumerate() {
            if sections.len() > 1 {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&format!("── {} ──\n", Self::title(section)));
            }
            let body = self.section(session, section)?;
            out.push_str(&body);
            if !body.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(out)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the user all the feedback that matters, so library
    // logs stay at ERROR unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;
    let session = Session::new(Extractor::new(config));
    let observer = CliObserver::new(show_progress && !cli.verbose, cli.quiet);
    let view = View {
        labels: Labels::for_language(cli.labels.into()),
        table_format: cli.table_format,
    };

    if cli.interactive {
        return interactive(session, &cli, &view, &observer).await;
    }

    let input = cli.input.as_deref().context("No input PDF given")?;
    one_shot(session, input, &cli, &view, &observer).await
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .model(&cli.model)
        .language(&cli.language)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout)
        .schema_validation(if cli.lenient {
            SchemaValidation::Lenient
        } else {
            SchemaValidation::Strict
        })
        .vendor_model((!cli.no_vendor_model).then(|| cli.vendor_model.clone()));

    if let Some(ref key) = cli.llama_api_key {
        builder = builder.parse_api_key(key);
    }
    if let Some(ref key) = cli.openai_api_key {
        builder = builder.llm_api_key(key);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

async fn one_shot(
    mut session: Session,
    input: &str,
    cli: &Cli,
    view: &View,
    observer: &CliObserver,
) -> Result<()> {
    let document = session
        .extractor()
        .load_document(input)
        .await
        .context("Failed to load PDF")?;
    session.upload(document);

    let outcome = session.run(observer).await.map(|_| ());

    // Whatever was produced is still shown; on failure the markdown is the
    // only thing left to inspect.
    let sections: Vec<Section> = match &outcome {
        Ok(()) => cli.show.clone(),
        Err(_) => cli
            .show
            .iter()
            .copied()
            .filter(|s| *s == Section::Markdown)
            .collect(),
    };
    if !sections.is_empty() {
        let text = view.sections(&session, &sections)?;
        match cli.output {
            Some(ref path) => {
                tokio::fs::write(path, text)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if !cli.quiet {
                    eprintln!("{} wrote {}", green("✔"), bold(&path.display().to_string()));
                }
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?;
            }
        }
    }

    outcome.context("Meal-plan extraction failed")
}

const SHELL_HELP: &str = "Commands:
  open <path|url>    load a PDF and run the pipeline
  run                run (or retry) the pending stages
  markdown           show the parsed markdown
  plan               show the weekly plan table
  notes              show the notes table
  report             show the plain-text report
  json               show the meal plan as JSON
  status             show the session state
  key parse <KEY>    set the LlamaParse API key
  key llm <KEY>      set the OpenAI API key
  reset              discard the document and all results
  help               show this help
  quit               leave";

async fn interactive(mut session: Session, cli: &Cli, view: &View, observer: &CliObserver) -> Result<()> {
    eprintln!("{}", bold("mealplan interactive session"));
    eprintln!("{}", dim(SHELL_HELP));

    if let Some(ref input) = cli.input {
        open(&mut session, input, observer).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", cyan("mealplan>"));
        io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            "open" | "upload" if !arg.is_empty() => open(&mut session, arg, observer).await,
            "open" | "upload" => eprintln!("usage: open <path|url>"),
            "run" => {
                if let Err(e) = session.run(observer).await {
                    tracing::debug!("run failed: {e:?}");
                }
            }
            "markdown" | "plan" | "notes" | "report" | "json" => {
                let section = match command {
                    "markdown" => Section::Markdown,
                    "plan" => Section::Plan,
                    "notes" => Section::Notes,
                    "report" => Section::Report,
                    _ => Section::Json,
                };
                match view.section(&session, section) {
                    Ok(text) => println!("{}", text.trim_end()),
                    Err(e) => eprintln!("{} {e:#}", red("✗")),
                }
            }
            "status" => print_status(&session),
            "key" => set_key(&mut session, arg),
            "reset" => {
                session.reset();
                eprintln!("{} session cleared", green("✓"));
            }
            "help" | "?" => eprintln!("{SHELL_HELP}"),
            "quit" | "exit" | "q" => break,
            other => eprintln!("unknown command '{other}' (type 'help')"),
        }
    }

    Ok(())
}

/// Load a document into the session and run the pipeline. Errors are
/// reported, never propagated, so the shell keeps running.
async fn open(session: &mut Session, input: &str, observer: &CliObserver) {
    let document = match session.extractor().load_document(input).await {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{} {}", red("✗"), e);
            return;
        }
    };
    let name = document.name.clone();
    let size = document.bytes.len();
    if session.upload(document) {
        eprintln!("{} {} (same document, cached results kept)", green("✓"), bold(&name));
    } else {
        eprintln!("{} {} ({} bytes)", green("✓"), bold(&name), size);
    }
    if let Err(e) = session.run(observer).await {
        tracing::debug!("run failed: {e:?}");
    }
}

fn set_key(session: &mut Session, arg: &str) {
    let (which, value) = match arg.split_once(char::is_whitespace) {
        Some((w, v)) => (w, v.trim()),
        None => (arg, ""),
    };
    let key = ApiKey::new(value);
    let configured = key.is_some();
    match which {
        "parse" | "llama" => session.set_parse_key(key),
        "llm" | "openai" => session.set_llm_key(key),
        _ => {
            eprintln!("usage: key parse <KEY> | key llm <KEY>");
            return;
        }
    }
    if configured {
        eprintln!("{} {which} key set", green("✓"));
    } else {
        eprintln!("{} {which} key cleared", cyan("⚠"));
    }
}

fn print_status(session: &Session) {
    let config = session.extractor().config();
    let document = session
        .document()
        .map(|d| format!("{} ({} bytes)", d.name, d.bytes.len()))
        .unwrap_or_else(|| "none".to_string());
    let key_state = |set: bool| if set { green("set") } else { red("missing") };

    eprintln!("State:         {}", bold(&session.state().to_string()));
    eprintln!("Document:      {document}");
    eprintln!(
        "Markdown:      {}",
        session
            .markdown()
            .map(|m| format!("{} bytes", m.len()))
            .unwrap_or_else(|| "none".to_string())
    );
    eprintln!(
        "Meal plan:     {}",
        session
            .plan()
            .map(|p| format!("{} days, {} notes", p.days.len(), p.notes.len()))
            .unwrap_or_else(|| "none".to_string())
    );
    eprintln!("LlamaParse key: {}", key_state(config.parse_api_key.is_some()));
    eprintln!("OpenAI key:     {}", key_state(config.llm_api_key.is_some()));
    eprintln!("Model:          {}", config.model);
}
