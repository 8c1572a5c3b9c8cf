//! CLI binary for unipdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AssemblyConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use unipdf::pipeline::cover::today_label;
use unipdf::{
    assemble_to_file, generate_cover_text, inspect, load_source, suggested_filename,
    AssemblyConfig, AssemblyProgressCallback, CoverPageSpec, FileOutcome, LeadExtractor,
    ProgressCallback, FALLBACK_COVER_TEXT,
};

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

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the file list plus a log line
/// per file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_assembly_start` tells us how many files there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading files…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Merging");
    }
}

impl AssemblyProgressCallback for CliProgressCallback {
    fn on_assembly_start(&self, total_files: usize, has_cover: bool) {
        self.activate_bar(total_files);
        let cover = if has_cover { " behind a cover page" } else { "" };
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Merging {total_files} file(s){cover}…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, pages: usize) {
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{pages} page(s)")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim("(placeholder page)"),
        ));
        self.bar.inc(1);
    }

    fn on_assembly_complete(&self, total_pages: usize, placeholders: usize) {
        self.bar.finish_and_clear();
        if placeholders == 0 {
            eprintln!("{} {} pages assembled", green("✔"), bold(&total_pages.to_string()));
        } else {
            eprintln!(
                "{} {} pages assembled  ({} file(s) replaced by placeholders)",
                cyan("⚠"),
                bold(&total_pages.to_string()),
                red(&placeholders.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge images and PDFs, in order, into one A4 PDF
  unipdf photo.png contract.pdf scan.jpg -o dossier.pdf

  # Add a cover page with body text from a file
  unipdf --cover-title "Relatório Mensal" --cover-text intro.txt *.pdf

  # Generate the cover text with an LLM from a short description
  unipdf --cover-title "Proposta" --cover-description "Proposta comercial para o cliente" a.pdf

  # Merge from URLs
  unipdf https://example.com/a.pdf https://example.com/b.png -o merged.pdf

  # Page counts and sizes only (no merge)
  unipdf --inspect-only a.pdf b.png

  # Extract contact leads from text files
  unipdf --leads contacts.txt export.csv --json

BEHAVIOUR:
  Every output page is A4. Images are scaled to fit with a 20 pt margin.
  A PDF that cannot be copied is rebuilt, then redrawn; if all three
  strategies fail, a placeholder page naming the file is inserted and the
  merge continues. With no -o, the file is named after the cover title
  (or "documento.pdf") in the current directory.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (cover text only)
  ANTHROPIC_API_KEY       Anthropic API key (cover text only)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  UNIPDF_*                Every flag, e.g. UNIPDF_MARGIN=30
"#;

/// Merge PDFs and images into one A4 PDF.
#[derive(Parser, Debug)]
#[command(
    name = "unipdf",
    version,
    about = "Merge PDFs and images into one A4 PDF with an optional cover page",
    long_about = "Merge PDF, JPEG and PNG files (local paths or URLs) into a single PDF \
where every page is A4. Damaged PDFs are repaired where possible and otherwise replaced \
by a placeholder page. An optional cover page can carry text written by an LLM.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs, merged in this order.
    inputs: Vec<String>,

    /// Write the PDF here instead of `<title>.pdf` in the current directory.
    #[arg(short, long, env = "UNIPDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Cover page title. Also names the output file.
    #[arg(long, env = "UNIPDF_COVER_TITLE")]
    cover_title: Option<String>,

    /// Text file with the cover body (paragraphs separated by newlines).
    #[arg(long, env = "UNIPDF_COVER_TEXT", conflicts_with = "cover_description")]
    cover_text: Option<PathBuf>,

    /// Short description; the cover body is generated from it by an LLM.
    #[arg(long, env = "UNIPDF_COVER_DESCRIPTION")]
    cover_description: Option<String>,

    /// Date printed in the cover footer. Default: today (dd/mm/yyyy).
    #[arg(long, env = "UNIPDF_DATE_LABEL")]
    date_label: Option<String>,

    /// Product name printed in the cover footer.
    #[arg(long, env = "UNIPDF_PRODUCT_LABEL", default_value = "UniPDF")]
    product_label: String,

    /// Margin around images and redrawn pages, in points.
    #[arg(long, env = "UNIPDF_MARGIN", default_value_t = 20.0)]
    margin: f32,

    /// Write streams uncompressed.
    #[arg(long, env = "UNIPDF_NO_COMPRESS")]
    no_compress: bool,

    /// LLM model ID for cover text (e.g. gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file containing a custom system prompt for cover text.
    #[arg(long, env = "UNIPDF_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print page count, size and media type of each input; no merge.
    #[arg(long, conflicts_with = "leads")]
    inspect_only: bool,

    /// Treat inputs as text files and print the contact leads found in them.
    #[arg(long)]
    leads: bool,

    /// Farthest line distance a lead borrows a missing field from.
    #[arg(long, env = "UNIPDF_LEAD_WINDOW", default_value_t = 2)]
    lead_window: usize,

    /// Output structured JSON instead of text.
    #[arg(long, env = "UNIPDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "UNIPDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "UNIPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "UNIPDF_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "UNIPDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Cover-text LLM call timeout in seconds.
    #[arg(long, env = "UNIPDF_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

impl Cli {
    fn wants_cover(&self) -> bool {
        self.cover_title.is_some() || self.cover_text.is_some() || self.cover_description.is_some()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.leads && !cli.inspect_only;
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

    // ── Leads mode ───────────────────────────────────────────────────────
    if cli.leads {
        return print_leads(&cli).await;
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn AssemblyProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let mut infos = Vec::with_capacity(cli.inputs.len());
        for input in &cli.inputs {
            let info = inspect(input, &config)
                .await
                .with_context(|| format!("Failed to inspect {input}"))?;
            infos.push(info);
        }
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&infos).context("Failed to serialize source info")?
            );
        } else {
            for info in &infos {
                let pages = info
                    .page_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "unreadable".to_string());
                println!("File:         {}", info.name);
                println!("Media type:   {}", info.media_type);
                println!("Size:         {} bytes", info.size_bytes);
                println!("Pages:        {}", pages);
                println!();
            }
        }
        return Ok(());
    }

    // ── Load sources, in order ───────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let file = load_source(input, config.download_timeout_secs)
            .await
            .with_context(|| format!("Failed to load {input}"))?;
        files.push(file);
    }

    // ── Cover ────────────────────────────────────────────────────────────
    let cover = if cli.wants_cover() {
        Some(build_cover(&cli, &config).await?)
    } else {
        None
    };

    // ── Run assembly ─────────────────────────────────────────────────────
    let output_path = cli.output.clone().unwrap_or_else(|| {
        let title = cli.cover_title.as_deref().unwrap_or("");
        PathBuf::from(suggested_filename(
            title,
            &config.default_filename,
            config.max_filename_len,
        ))
    });

    let doc = assemble_to_file(files, cover, &output_path, &config)
        .await
        .context("Assembly failed")?;

    if cli.json {
        let report = serde_json::json!({
            "path": output_path,
            "document": doc,
            "stats": doc.stats(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        let stats = doc.stats();
        if !show_progress {
            for report in &doc.files {
                match &report.outcome {
                    FileOutcome::Imported { pages, strategy } => {
                        eprintln!("  {} {}  {} page(s) via {}", green("✓"), report.name, pages, strategy)
                    }
                    FileOutcome::Placeholder { error } => {
                        eprintln!("  {} {}  {}", red("✗"), report.name, error)
                    }
                }
            }
        }
        eprintln!(
            "{}  {} pages  {} bytes  →  {}",
            if stats.placeholder_files == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.total_pages,
            stats.output_bytes,
            bold(&output_path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `AssemblyConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AssemblyConfig> {
    let mut builder = AssemblyConfig::builder()
        .margin(cli.margin)
        .product_label(cli.product_label.clone())
        .compress(!cli.no_compress)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Cover page from the title, a body file or a generated body.
async fn build_cover(cli: &Cli, config: &AssemblyConfig) -> Result<CoverPageSpec> {
    let title = cli.cover_title.clone().unwrap_or_default();
    let body = if let Some(ref path) = cli.cover_text {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read cover text from {:?}", path))?
    } else if let Some(ref description) = cli.cover_description {
        match generate_cover_text(&title, description, config).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{e}");
                if !cli.quiet {
                    eprintln!("{} cover text unavailable: {}", cyan("⚠"), dim(&e.to_string()));
                }
                FALLBACK_COVER_TEXT.to_string()
            }
        }
    } else {
        String::new()
    };
    let date = cli.date_label.clone().unwrap_or_else(today_label);
    Ok(CoverPageSpec::new(title, body, date))
}

/// `--leads`: read every input as text and list the contacts found.
async fn print_leads(cli: &Cli) -> Result<()> {
    let extractor = LeadExtractor::new(cli.lead_window);
    let mut all = Vec::new();
    for input in &cli.inputs {
        let text = tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {input}"))?;
        let leads = extractor.extract(&text);
        if !cli.json && !cli.quiet {
            eprintln!("{} {}  {} lead(s)", cyan("◆"), bold(input), leads.len());
        }
        all.extend(leads.into_iter().map(|lead| (input.clone(), lead)));
    }

    if cli.json {
        let rows: Vec<_> = all
            .iter()
            .map(|(source, lead)| serde_json::json!({ "source": source, "lead": lead }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialise leads")?
        );
    } else {
        for (source, lead) in &all {
            println!(
                "{}\t{}\t{}\t{}",
                lead.name.as_deref().unwrap_or("-"),
                lead.phone.as_deref().unwrap_or("-"),
                lead.email.as_deref().unwrap_or("-"),
                format!("{source}:{}", lead.line),
            );
        }
    }
    Ok(())
}
