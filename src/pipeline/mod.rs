//! Pipeline stages for assembling one PDF from many sources.
//!
//! Each submodule implements one step. The stages share a single
//! accumulator, [`document::OutputDocument`], which is threaded through the
//! cover and every file in order; nothing else holds state.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ sanitize ──▶ ingest ──────────────▶ document ──▶ bytes
//! (path/URL) (trim)      (copy / rebuild /       (page tree,
//!                         render, or image)       fonts, xref)
//!                              ▲
//! llm ──▶ postprocess ──▶ cover ┘
//! (text)   (cleanup)      (layout)
//! ```
//!
//! 1. [`input`]    — load a path, URL or byte buffer into a `SourceFile`
//! 2. [`sanitize`] — drop bytes outside `%PDF-` … `%%EOF`
//! 3. [`ingest`]   — turn one file into pages: images directly, PDFs through
//!    a three-strategy ladder, failures into a placeholder page
//! 4. [`geometry`] — fit-to-page placement and rotation-aware transforms
//! 5. [`encode`]   — decode JPEG/PNG into embeddable samples
//! 6. [`cover`]    — word-wrapped cover layout, paginated on overflow
//! 7. [`fonts`]    — Helvetica metrics and WinAnsi text encoding
//! 8. [`document`] — the output accumulator and its serialisation
//! 9. [`llm`] and [`postprocess`] — optional cover-text generation, the
//!    only stage with network I/O

pub mod cover;
pub mod document;
pub mod encode;
pub mod fonts;
pub mod geometry;
pub mod ingest;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod sanitize;
