//! # unipdf
//!
//! Merge PDFs, JPEGs and PNGs into one uniformly sized A4 PDF, optionally
//! behind a generated cover page.
//!
//! Source PDFs come from scanners, exporters and mail attachments, and many
//! are slightly broken. Each PDF is tried with progressively more invasive
//! strategies, and a file that defeats all of them is replaced by a visible
//! placeholder page instead of aborting the merge. The result is always a
//! valid PDF with at least one page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files + optional cover
//!  │
//!  ├─ 1. Cover     title, divider, wrapped body, footer (paginated)
//!  ├─ 2. Sanitize  trim bytes outside %PDF- … %%EOF
//!  ├─ 3. Ingest    image → 1 page; PDF → structural copy
//!  │                               → rebuild then copy
//!  │                               → render and embed
//!  │                               → placeholder page
//!  ├─ 4. Normalise every page to A4 (fit, centre, fold rotation)
//!  └─ 5. Output    serialised PDF + per-file report + filename
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use unipdf::{assemble_to_file, AssemblyConfig, CoverPageSpec, SourceFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let files = vec![
//!         SourceFile::from_path("photo.png")?,
//!         SourceFile::from_path("contract.pdf")?,
//!     ];
//!     let cover = CoverPageSpec::dated_today("Relatório", "Documentos do cliente.");
//!     let config = AssemblyConfig::default();
//!     let doc = assemble_to_file(files, Some(cover), "out/relatorio.pdf", &config).await?;
//!     eprintln!("{} pages, {} placeholder(s)",
//!         doc.page_count,
//!         doc.stats().placeholder_files);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `unipdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! unipdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Cover Text
//!
//! [`generate_cover_text`] asks an LLM (via `edgequake-llm`) for two or three
//! formal paragraphs from a short description. It makes one call and falls
//! back to a fixed sentence on any failure. Assembly never needs a provider.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod config;
pub mod error;
pub mod leads;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{
    assemble, assemble_blocking, assemble_to_file, generate_cover_text, inspect, SourceInfo,
};
pub use config::{AssemblyConfig, AssemblyConfigBuilder};
pub use error::{AssembleError, FailureReason, FileError};
pub use leads::{extract_leads, Lead, LeadExtractor};
pub use output::{suggested_filename, AssembledDocument, AssemblyStats, FileOutcome, FileReport};
pub use pipeline::cover::{CoverLayout, CoverPageSpec};
pub use pipeline::geometry::PageSize;
pub use pipeline::input::{load_source, ImageFormat, SourceFile, SourceKind};
pub use pipeline::llm::{TextGenerator, FALLBACK_COVER_TEXT};
pub use progress::{AssemblyProgressCallback, NoopProgressCallback, ProgressCallback};
