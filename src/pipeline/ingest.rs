//! Source ingestion: one [`SourceFile`] → pages appended to the output.
//!
//! Images take a single path: decode, fit, draw. PDFs go through an ordered
//! list of strategies, each tried only when every earlier one failed:
//!
//! 1. `structural-copy`: parse permissively and copy the page objects as they
//!    are. Content streams are never decoded, so this tolerates the widest
//!    range of damaged-but-parseable files.
//! 2. `rebuild-then-copy`: rebuild the page tree and cross-reference table
//!    in memory, then copy from the rebuilt bytes.
//! 3. `render-and-embed`: decode every page's content, wrap it in a Form
//!    XObject and draw that onto a fresh page. Fails on exotic compression,
//!    which is why it runs last.
//!
//! Every strategy produces a self-contained [`PageBatch`]; the output is only
//! touched when a strategy succeeds. If every strategy fails (or an image will
//! not decode) a single placeholder page names the file instead.

use crate::config::AssemblyConfig;
use crate::error::{FailureReason, FileError};
use crate::output::FileOutcome;
use crate::pipeline::cover::wrap_text;
use crate::pipeline::document::{box_object, matrix_operands, text_ops, OutputDocument, PageBatch};
use crate::pipeline::encode::encode_image;
use crate::pipeline::fonts::Font;
use crate::pipeline::geometry::{fit_to_page, normalise_rotation, page_transform, SourceBox};
use crate::pipeline::input::{ImageFormat, SourceFile, SourceKind};
use crate::pipeline::sanitize::sanitize;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a single PDF strategy gave up.
#[derive(Debug, Error)]
enum StrategyError {
    /// The bytes could not be parsed as a PDF at all.
    #[error("parse failed: {0}")]
    Parse(String),
    /// Parsed, but the page tree or a page object is unusable.
    #[error("bad structure: {0}")]
    Structure(String),
    /// A content stream uses a filter that could not be decoded.
    #[error("content decode failed: {0}")]
    ContentDecode(String),
}

type PdfStrategy = fn(&[u8], u32, &AssemblyConfig) -> Result<PageBatch, StrategyError>;

const PDF_STRATEGIES: [(&str, PdfStrategy); 3] = [
    ("structural-copy", structural_copy),
    ("rebuild-then-copy", rebuild_then_copy),
    ("render-and-embed", render_and_embed),
];

/// Inheritable page attributes (ISO 32000-1 §7.7.3.4).
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Object types that belong to the source document, not to its pages.
const DOCUMENT_LEVEL_TYPES: [&str; 5] = ["Catalog", "Pages", "Outlines", "XRef", "ObjStm"];

/// Append the pages for `file` to `out`, or a placeholder if it cannot be read.
///
/// Never fails: per-file problems are reported in the returned outcome.
pub fn ingest(out: &mut OutputDocument, file: &SourceFile, config: &AssemblyConfig) -> FileOutcome {
    let result = match file.kind {
        SourceKind::Image(format) => ingest_image(out, file, format, config),
        SourceKind::Pdf => ingest_pdf(out, file, config),
    };

    match result {
        Ok((pages, strategy)) => FileOutcome::Imported {
            pages,
            strategy: strategy.to_string(),
        },
        Err(error) => {
            warn!("{error}; inserting placeholder page");
            add_placeholder_page(out, &error);
            FileOutcome::Placeholder { error }
        }
    }
}

fn ingest_image(
    out: &mut OutputDocument,
    file: &SourceFile,
    format: ImageFormat,
    config: &AssemblyConfig,
) -> Result<(usize, &'static str), FileError> {
    let failed = |detail: String| FileError::ImageDecodeFailed {
        name: file.name.clone(),
        detail,
    };
    let image = encode_image(&file.bytes, format).map_err(|e| failed(e.to_string()))?;
    let placement = fit_to_page(
        image.width as f32,
        image.height as f32,
        out.page_size(),
        config.margin,
    )
    .ok_or_else(|| failed(format!("degenerate size {}x{}", image.width, image.height)))?;

    out.add_image_page(
        &image,
        placement.x,
        placement.y,
        placement.width,
        placement.height,
    );
    debug!("{}: image placed at scale {:.3}", file.name, placement.scale);
    Ok((1, "image"))
}

fn ingest_pdf(
    out: &mut OutputDocument,
    file: &SourceFile,
    config: &AssemblyConfig,
) -> Result<(usize, &'static str), FileError> {
    let bytes = sanitize(&file.bytes);
    if bytes.len() != file.bytes.len() {
        debug!(
            "{}: trimmed {} bytes outside the PDF markers",
            file.name,
            file.bytes.len() - bytes.len()
        );
    }
    let start_id = out.next_object_id();

    let attempts = PDF_STRATEGIES
        .iter()
        .map(|(name, strategy)| (*name, move || strategy(bytes, start_id, config)));

    match first_success(attempts) {
        Ok((strategy, batch)) => {
            let pages = batch.pages.len();
            out.commit(batch);
            debug!("{}: {} page(s) via {}", file.name, pages, strategy);
            Ok((pages, strategy))
        }
        Err(failures) => {
            let attempts = failures.len();
            let (reason, detail) = match failures.last() {
                Some((_, StrategyError::ContentDecode(d))) => {
                    (FailureReason::UnsupportedCompression, d.clone())
                }
                Some((_, e)) => (FailureReason::Corrupted, e.to_string()),
                None => (FailureReason::Corrupted, "no strategy ran".to_string()),
            };
            Err(FileError::PdfUnreadable {
                name: file.name.clone(),
                attempts,
                reason,
                detail,
            })
        }
    }
}

/// Run `attempts` in order and return the first success with its name.
///
/// On total failure every `(name, error)` pair is returned, in order.
fn first_success<T, E, F>(
    attempts: impl IntoIterator<Item = (&'static str, F)>,
) -> Result<(&'static str, T), Vec<(&'static str, E)>>
where
    F: FnOnce() -> Result<T, E>,
    E: fmt::Display,
{
    let mut failures = Vec::new();
    for (name, attempt) in attempts {
        match attempt() {
            Ok(value) => return Ok((name, value)),
            Err(e) => {
                debug!(strategy = name, error = %e, "strategy failed");
                failures.push((name, e));
            }
        }
    }
    Err(failures)
}

// ── Strategies ───────────────────────────────────────────────────────────

fn structural_copy(
    bytes: &[u8],
    start_id: u32,
    config: &AssemblyConfig,
) -> Result<PageBatch, StrategyError> {
    let mut doc = load_permissive(bytes)?;
    let page_ids = tree_page_ids(&doc)?;
    for id in &page_ids {
        flatten_inherited(&mut doc, *id)?;
    }
    doc.renumber_objects_with(start_id);
    let page_ids = page_ids_checked(&doc, page_ids.len())?;

    for id in &page_ids {
        normalise_copied_page(&mut doc, *id, config)?;
    }
    Ok(into_batch(doc, page_ids))
}

fn rebuild_then_copy(
    bytes: &[u8],
    start_id: u32,
    config: &AssemblyConfig,
) -> Result<PageBatch, StrategyError> {
    let mut doc = load_permissive(bytes)?;

    // Walk the tree if it works, otherwise take every page object by id.
    let mut ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if ids.is_empty() {
        ids = doc
            .objects
            .iter()
            .filter(|(_, o)| matches!(o.type_name(), Ok("Page")))
            .map(|(id, _)| *id)
            .collect();
    }
    if ids.is_empty() {
        return Err(StrategyError::Structure("no page objects found".into()));
    }
    for id in &ids {
        flatten_inherited(&mut doc, *id)?;
    }

    let pages_id = doc.new_object_id();
    for id in &ids {
        page_dict_mut(&mut doc, *id)?.set("Parent", Object::Reference(pages_id));
    }
    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(ids.iter().map(|id| Object::Reference(*id)).collect()));
    pages.set("Count", Object::Integer(ids.len() as i64));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer = Dictionary::new();
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.renumber_objects();
    let mut rebuilt = Vec::new();
    doc.save_to(&mut rebuilt)
        .map_err(|e| StrategyError::Structure(format!("rebuild failed: {e}")))?;
    debug!("rebuilt document: {} bytes, {} pages", rebuilt.len(), ids.len());

    structural_copy(&rebuilt, start_id, config)
}

fn render_and_embed(
    bytes: &[u8],
    start_id: u32,
    config: &AssemblyConfig,
) -> Result<PageBatch, StrategyError> {
    let mut doc = load_permissive(bytes)?;
    let page_ids = tree_page_ids(&doc)?;
    for id in &page_ids {
        flatten_inherited(&mut doc, *id)?;
    }
    doc.renumber_objects_with(start_id);
    let page_ids = page_ids_checked(&doc, page_ids.len())?;

    for id in &page_ids {
        redraw_page(&mut doc, *id, config)?;
    }
    Ok(into_batch(doc, page_ids))
}

// ── Page rewriting ───────────────────────────────────────────────────────

/// Fit a copied page to the output size by bracketing its existing content
/// streams with a `q … cm` / `Q` pair.
///
/// The prefix clips to the source box, since the crop box is dropped.
fn normalise_copied_page(
    doc: &mut Document,
    page_id: ObjectId,
    config: &AssemblyConfig,
) -> Result<(), StrategyError> {
    let (source, rotate) = page_geometry(doc, page_id, config)?;
    let transform = page_transform(source, rotate, config.page_size, config.copy_margin)
        .ok_or_else(|| StrategyError::Structure(format!("page {page_id:?} has an empty box")))?;

    if !transform.is_identity() {
        let contents = content_refs(doc, page_id)?;
        let prefix = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("cm", matrix_operands(transform.matrix)),
                Operation::new(
                    "re",
                    vec![
                        Object::Real(source.x0),
                        Object::Real(source.y0),
                        Object::Real(source.x1 - source.x0),
                        Object::Real(source.y1 - source.y0),
                    ],
                ),
                Operation::new("W", vec![]),
                Operation::new("n", vec![]),
            ],
        };
        let prefix_id = doc.add_object(Stream::new(Dictionary::new(), encode_ops(prefix)?));
        let suffix_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

        let mut wrapped = Vec::with_capacity(contents.len() + 2);
        wrapped.push(Object::Reference(prefix_id));
        wrapped.extend(contents.into_iter().map(Object::Reference));
        wrapped.push(Object::Reference(suffix_id));
        page_dict_mut(doc, page_id)?.set("Contents", Object::Array(wrapped));
    }

    let page = page_dict_mut(doc, page_id)?;
    page.set("MediaBox", box_object(config.page_size.media_box()));
    for key in [&b"CropBox"[..], b"TrimBox", b"BleedBox", b"ArtBox", b"Rotate"] {
        page.remove(key);
    }
    Ok(())
}

/// Replace a page with a fresh one that draws the decoded original as a
/// Form XObject.
fn redraw_page(
    doc: &mut Document,
    page_id: ObjectId,
    config: &AssemblyConfig,
) -> Result<(), StrategyError> {
    let (source, rotate) = page_geometry(doc, page_id, config)?;
    let transform = page_transform(source, rotate, config.page_size, config.margin)
        .ok_or_else(|| StrategyError::Structure(format!("page {page_id:?} has an empty box")))?;

    let mut content = Vec::new();
    for id in content_refs(doc, page_id)? {
        let stream = doc
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|e| StrategyError::Structure(format!("content {id:?}: {e}")))?;
        let decoded = if stream.dict.has(b"Filter") {
            stream
                .decompressed_content()
                .map_err(|e| StrategyError::ContentDecode(format!("content {id:?}: {e}")))?
        } else {
            stream.content.clone()
        };
        content.extend_from_slice(&decoded);
        content.push(b'\n');
    }
    Content::decode(&content)
        .map_err(|e| StrategyError::Structure(format!("page {page_id:?} content: {e}")))?;

    let resources = page_dict_mut(doc, page_id)?
        .get(b"Resources")
        .cloned()
        .unwrap_or_else(|_| Object::Dictionary(Dictionary::new()));

    let mut form = Dictionary::new();
    form.set("Type", Object::Name(b"XObject".to_vec()));
    form.set("Subtype", Object::Name(b"Form".to_vec()));
    form.set("BBox", box_object([source.x0, source.y0, source.x1, source.y1]));
    form.set("Resources", resources);
    let form_id = doc.add_object(Stream::new(form, content));

    let draw = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("cm", matrix_operands(transform.matrix)),
            Operation::new("Do", vec![Object::Name(b"Pg0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), encode_ops(draw)?));

    let mut xobjects = Dictionary::new();
    xobjects.set("Pg0", Object::Reference(form_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("MediaBox", box_object(config.page_size.media_box()));
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));
    doc.objects.insert(page_id, Object::Dictionary(page));
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Load a PDF, ignoring encryption that needs no user password.
fn load_permissive(bytes: &[u8]) -> Result<Document, StrategyError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| StrategyError::Parse(e.to_string()))?;
    if doc.is_encrypted() {
        if let Err(e) = doc.decrypt("") {
            debug!("empty-password decryption failed ({e}); using structure as-is");
        }
        doc.trailer.remove(b"Encrypt");
    }
    Ok(doc)
}

/// Page count of a PDF buffer, or `None` if no strategy could parse it.
pub fn pdf_page_count(bytes: &[u8]) -> Option<usize> {
    let doc = load_permissive(sanitize(bytes)).ok()?;
    let n = doc.get_pages().len();
    (n > 0).then_some(n)
}

fn tree_page_ids(doc: &Document) -> Result<Vec<ObjectId>, StrategyError> {
    let ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if ids.is_empty() {
        return Err(StrategyError::Structure("page tree is empty".into()));
    }
    Ok(ids)
}

/// Page ids after renumbering; the count must not have changed.
fn page_ids_checked(doc: &Document, expected: usize) -> Result<Vec<ObjectId>, StrategyError> {
    let ids = tree_page_ids(doc)?;
    if ids.len() != expected {
        return Err(StrategyError::Structure(format!(
            "page count changed from {expected} to {} while renumbering",
            ids.len()
        )));
    }
    Ok(ids)
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, StrategyError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| StrategyError::Structure(format!("page {page_id:?}: {e}")))
}

/// Look `key` up on the page, then on each ancestor.
fn resolve_inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    // Bounded to survive /Parent cycles.
    for _ in 0..64 {
        let dict = doc.get_object(current).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Copy inherited attributes onto the page itself so it no longer depends on
/// the source page tree.
fn flatten_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), StrategyError> {
    let inherited: Vec<(&[u8], Object)> = INHERITABLE
        .iter()
        .filter_map(|key| resolve_inherited(doc, page_id, key).map(|v| (*key, v.clone())))
        .collect();
    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in inherited {
        if !page.has(key) {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn read_box(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<SourceBox> {
    let arr = resolve(doc, page.get(key).ok()?).as_array().ok()?;
    let v: Vec<f32> = arr.iter().filter_map(|o| number(resolve(doc, o))).collect();
    match v.as_slice() {
        [a, b, c, d] => Some(SourceBox::from_corners(*a, *b, *c, *d)),
        _ => None,
    }
}

/// Visible box (CropBox, else MediaBox, else the output size) and rotation.
fn page_geometry(
    doc: &Document,
    page_id: ObjectId,
    config: &AssemblyConfig,
) -> Result<(SourceBox, u16), StrategyError> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| StrategyError::Structure(format!("page {page_id:?}: {e}")))?;
    let media = read_box(doc, page, b"MediaBox");
    let source = read_box(doc, page, b"CropBox")
        .or(media)
        .unwrap_or_else(|| {
            let [x0, y0, x1, y1] = config.page_size.media_box();
            SourceBox::from_corners(x0, y0, x1, y1)
        });
    let rotate = page
        .get(b"Rotate")
        .ok()
        .and_then(|o| resolve(doc, o).as_i64().ok())
        .map(normalise_rotation)
        .unwrap_or(0);
    Ok((source, rotate))
}

/// Content stream ids of a page, in drawing order.
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<ObjectId>, StrategyError> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| StrategyError::Structure(format!("page {page_id:?}: {e}")))?;
    let contents = match page.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()),
    };
    let items: Vec<&Object> = match contents {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.iter().collect(),
            Ok(_) => return Ok(vec![*id]),
            Err(e) => return Err(StrategyError::Structure(format!("contents {id:?}: {e}"))),
        },
        Object::Array(arr) => arr.iter().collect(),
        _ => {
            return Err(StrategyError::Structure(
                "/Contents is neither a stream nor an array".into(),
            ))
        }
    };
    items
        .into_iter()
        .map(|o| {
            o.as_reference()
                .map_err(|e| StrategyError::Structure(format!("/Contents entry: {e}")))
        })
        .collect()
}

fn encode_ops(content: Content) -> Result<Vec<u8>, StrategyError> {
    content
        .encode()
        .map_err(|e| StrategyError::Structure(format!("encode content: {e}")))
}

/// Everything the pages need, minus the source's document-level objects.
fn into_batch(doc: Document, pages: Vec<ObjectId>) -> PageBatch {
    let max_id = doc.max_id;
    let objects = doc
        .objects
        .into_iter()
        .filter(|(_, obj)| match obj.type_name() {
            Ok(t) => !DOCUMENT_LEVEL_TYPES.contains(&t),
            Err(_) => true,
        })
        .collect();
    PageBatch {
        objects,
        pages,
        max_id,
    }
}

// ── Placeholder ──────────────────────────────────────────────────────────

const PLACEHOLDER_HEADING: &str = "File could not be processed";

/// Append one page stating that `error`'s file could not be included.
pub fn add_placeholder_page(out: &mut OutputDocument, error: &FileError) {
    let page = out.page_size();
    let left = 60.0;
    let width = page.width - 2.0 * left;
    let mut y = page.height - 140.0;
    let mut ops = Vec::new();

    for line in wrap_text(PLACEHOLDER_HEADING, Font::Bold, 18.0, width) {
        ops.extend(text_ops(&line, Font::Bold, 18.0, left, y, None));
        y -= 27.0;
    }
    y -= 12.0;
    for line in wrap_text(error.file_name(), Font::Regular, 12.0, width) {
        ops.extend(text_ops(&line, Font::Regular, 12.0, left, y, None));
        y -= 18.0;
    }
    y -= 6.0;
    for line in wrap_text(error.reason().describe(), Font::Regular, 11.0, width) {
        ops.extend(text_ops(&line, Font::Regular, 11.0, left, y, Some(0.35)));
        y -= 16.5;
    }
    out.add_text_page(ops);
}
