//! Assembly entry points.
//!
//! [`assemble_blocking`] is the whole pipeline as a plain function: cover
//! first, then every file in input order, then serialisation. [`assemble`]
//! runs it on a blocking worker so async callers are never stalled by the
//! PDF work. Nothing is kept between calls.

use crate::config::AssemblyConfig;
use crate::error::AssembleError;
use crate::output::{suggested_filename, AssembledDocument, FileOutcome, FileReport};
use crate::pipeline::cover::{layout_cover, CoverPageSpec};
use crate::pipeline::document::OutputDocument;
use crate::pipeline::ingest::{ingest, pdf_page_count};
use crate::pipeline::input::{load_source, SourceFile, SourceKind};
use crate::pipeline::llm::{self, LlmTextGenerator};
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Model used when a provider is named without one.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Merge `files` (in order) behind an optional cover into one PDF.
///
/// # Returns
/// `Ok(AssembledDocument)` whenever the merged file could be serialised,
/// even if some files became placeholder pages (see
/// [`AssembledDocument::files`]). The document always has at least one page.
///
/// # Errors
/// Only fatal problems: serialisation of the final document failed, or the
/// worker task died.
///
/// # Example
/// ```rust,no_run
/// use unipdf::{assemble, AssemblyConfig, CoverPageSpec, SourceFile};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let files = vec![
///     SourceFile::from_path("photo.png")?,
///     SourceFile::from_path("contract.pdf")?,
/// ];
/// let cover = CoverPageSpec::new("Relatório", "Documentos do cliente.", "17/10/2026");
/// let doc = assemble(files, Some(cover), &AssemblyConfig::default()).await?;
/// std::fs::write(&doc.filename, &doc.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn assemble(
    files: Vec<SourceFile>,
    cover: Option<CoverPageSpec>,
    config: &AssemblyConfig,
) -> Result<AssembledDocument, AssembleError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || assemble_blocking(&files, cover.as_ref(), &config))
        .await
        .map_err(|e| AssembleError::Internal(format!("Assembly task failed: {e}")))?
}

/// Synchronous form of [`assemble`]; runs on the calling thread.
pub fn assemble_blocking(
    files: &[SourceFile],
    cover: Option<&CoverPageSpec>,
    config: &AssemblyConfig,
) -> Result<AssembledDocument, AssembleError> {
    let start = Instant::now();
    let total = files.len();
    info!(
        "Starting assembly: {} file(s), cover: {}",
        total,
        if cover.is_some() { "yes" } else { "no" }
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_assembly_start(total, cover.is_some());
    }

    let mut out = OutputDocument::new(config.page_size);

    // ── Step 1: Cover ────────────────────────────────────────────────────
    let cover_pages = match cover {
        Some(spec) => {
            let pages = layout_cover(spec, &config.cover, config.page_size, &config.product_label);
            for page in &pages {
                out.add_text_page(page.operations());
            }
            debug!("Cover laid out on {} page(s)", pages.len());
            pages.len()
        }
        None => 0,
    };

    // ── Step 2: Files, strictly in input order ───────────────────────────
    let mut reports = Vec::with_capacity(total);
    for (index, file) in files.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(index + 1, total, &file.name);
        }
        let outcome = ingest(&mut out, file, config);
        match &outcome {
            FileOutcome::Imported { pages, strategy } => {
                debug!("{}: {} page(s) via {}", file.name, pages, strategy);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_complete(index + 1, total, *pages);
                }
            }
            FileOutcome::Placeholder { error } => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_error(index + 1, total, &error.to_string());
                }
            }
        }
        reports.push(FileReport {
            index,
            name: file.name.clone(),
            kind: file.kind,
            outcome,
        });
    }

    // ── Step 3: Never emit an empty document ─────────────────────────────
    if out.page_count() == 0 {
        debug!("No pages produced; adding a blank page");
        out.add_blank_page();
    }
    let page_count = out.page_count();

    // ── Step 4: Serialise ────────────────────────────────────────────────
    let bytes = out
        .finish(config.compress)
        .map_err(|e| AssembleError::SerializationFailed {
            detail: e.to_string(),
        })?;

    let title = cover.map(|c| c.title.as_str()).unwrap_or("");
    let filename = suggested_filename(title, &config.default_filename, config.max_filename_len);

    let doc = AssembledDocument {
        bytes,
        filename,
        page_count,
        cover_pages,
        files: reports,
    };
    let stats = doc.stats();
    info!(
        "Assembly complete: {} page(s), {} placeholder(s), {} bytes in {}ms",
        stats.total_pages,
        stats.placeholder_files,
        stats.output_bytes,
        start.elapsed().as_millis()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_assembly_complete(stats.total_pages, stats.placeholder_files);
    }
    Ok(doc)
}

/// Assemble and write the result to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn assemble_to_file(
    files: Vec<SourceFile>,
    cover: Option<CoverPageSpec>,
    output_path: impl AsRef<Path>,
    config: &AssemblyConfig,
) -> Result<AssembledDocument, AssembleError> {
    let doc = assemble(files, cover, config).await?;
    let path = output_path.as_ref();

    // Atomic write: write to temp, then rename
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AssembleError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &doc.bytes)
        .await
        .map_err(|e| AssembleError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| AssembleError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!("Wrote {} ({} bytes)", path.display(), doc.bytes.len());
    Ok(doc)
}

/// Generate cover body text for `description` with the configured provider.
///
/// Provider resolution is the only fatal step. Once a provider exists, a
/// failed, slow or empty reply yields [`llm::FALLBACK_COVER_TEXT`].
pub async fn generate_cover_text(
    title: &str,
    description: &str,
    config: &AssemblyConfig,
) -> Result<String, AssembleError> {
    let provider = resolve_provider(config).await?;
    let generator = LlmTextGenerator::new(provider, config);
    Ok(llm::generate_cover_text(&generator, title, description, config).await)
}

/// What [`inspect`] reports about one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub media_type: String,
    pub size_bytes: usize,
    /// 1 for images; `None` for a PDF that could not be parsed.
    pub page_count: Option<usize>,
}

impl SourceInfo {
    pub fn of(file: &SourceFile) -> Self {
        let page_count = match file.kind {
            SourceKind::Image(_) => Some(1),
            SourceKind::Pdf => pdf_page_count(&file.bytes),
        };
        Self {
            name: file.name.clone(),
            media_type: file.media_type.clone(),
            size_bytes: file.size_bytes(),
            page_count,
        }
    }
}

/// Load one input and describe it without assembling anything.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input: impl AsRef<str>,
    config: &AssemblyConfig,
) -> Result<SourceInfo, AssembleError> {
    let file = load_source(input.as_ref(), config.download_timeout_secs).await?;
    tokio::task::spawn_blocking(move || SourceInfo::of(&file))
        .await
        .map_err(|e| AssembleError::Internal(format!("Inspect task failed: {e}")))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Instantiate a named provider with the given model.
fn create_llm_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, AssembleError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AssembleError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the API key is
///    read from the provider's usual environment variable.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured only when both are set.
/// 4. **`OPENAI_API_KEY`** present: OpenAI with the configured model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
async fn resolve_provider(config: &AssemblyConfig) -> Result<Arc<dyn LLMProvider>, AssembleError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_llm_provider(name, model);
    }

    // 3) EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL when both set
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_llm_provider(&prov, &model);
        }
    }

    // 4) OpenAI wins over other detected keys
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_llm_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AssembleError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::AssemblyProgressCallback;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl AssemblyProgressCallback for Recorder {
        fn on_assembly_start(&self, total_files: usize, has_cover: bool) {
            self.push(format!("start {total_files} {has_cover}"));
        }
        fn on_file_start(&self, index: usize, total: usize, name: &str) {
            self.push(format!("file {index}/{total} {name}"));
        }
        fn on_file_complete(&self, index: usize, _total: usize, pages: usize) {
            self.push(format!("ok {index} {pages}"));
        }
        fn on_file_error(&self, index: usize, _total: usize, _error: &str) {
            self.push(format!("err {index}"));
        }
        fn on_assembly_complete(&self, total_pages: usize, placeholders: usize) {
            self.push(format!("done {total_pages} {placeholders}"));
        }
    }

    impl Recorder {
        fn push(&self, e: String) {
            self.events.lock().unwrap().push(e);
        }
    }

    fn png_file(name: &str) -> SourceFile {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        SourceFile::from_bytes(name, "image/png", buf.into_inner()).unwrap()
    }

    #[test]
    fn empty_input_yields_one_blank_page() {
        let doc = assemble_blocking(&[], None, &AssemblyConfig::default()).unwrap();
        assert_eq!(doc.page_count, 1);
        assert_eq!(doc.cover_pages, 0);
        assert_eq!(doc.filename, "documento.pdf");
        let parsed = lopdf::Document::load_mem(&doc.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn cover_title_names_the_file() {
        let cover = CoverPageSpec::new("Relatório Mensal", "Texto.", "01/02/2026");
        let doc = assemble_blocking(&[], Some(&cover), &AssemblyConfig::default()).unwrap();
        assert_eq!(doc.page_count, 1);
        assert_eq!(doc.cover_pages, 1);
        assert_eq!(doc.filename, "relatorio-mensal.pdf");
    }

    #[test]
    fn progress_events_follow_input_order() {
        let recorder = Arc::new(Recorder::default());
        let config = AssemblyConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        let bad = SourceFile::from_bytes("bad.png", "image/png", b"nope".to_vec()).unwrap();
        let files = vec![png_file("a.png"), bad];

        let doc = assemble_blocking(&files, None, &config).unwrap();
        assert_eq!(doc.page_count, 2);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start 2 false",
                "file 1/2 a.png",
                "ok 1 1",
                "file 2/2 bad.png",
                "err 2",
                "done 2 1",
            ]
        );
    }

    #[test]
    fn source_info_for_images_and_bad_pdfs() {
        let info = SourceInfo::of(&png_file("a.png"));
        assert_eq!(info.page_count, Some(1));
        assert_eq!(info.media_type, "image/png");

        let junk = SourceFile::from_bytes("x.pdf", "application/pdf", b"%PDF-1.4 junk".to_vec())
            .unwrap();
        assert_eq!(SourceInfo::of(&junk).page_count, None);
    }
}
