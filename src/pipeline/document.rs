//! The in-progress output document.
//!
//! [`OutputDocument`] is the accumulator threaded through the assembly loop.
//! Each stage either appends a finished page (image, text, blank) or commits
//! a [`PageBatch`] of pages imported from a source PDF. Nothing else mutates
//! it, so the effect of every step is visible as a change in
//! [`OutputDocument::page_count`] and the underlying object table.

use crate::pipeline::fonts::{encode_win_ansi, Font};
use crate::pipeline::geometry::{Matrix, PageSize};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use tracing::debug;

/// Pages imported from one source PDF, not yet part of the output.
///
/// All object ids are already renumbered above the accumulator's current
/// maximum, so committing is a plain insert.
#[derive(Debug, Default)]
pub struct PageBatch {
    pub objects: BTreeMap<ObjectId, Object>,
    /// Page dictionaries in source order.
    pub pages: Vec<ObjectId>,
    pub max_id: u32,
}

/// Decoded raster ready to be placed as an image XObject.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub encoding: ImageEncoding,
}

#[derive(Debug, Clone)]
pub enum ImageEncoding {
    /// Baseline JPEG bytes, stored as-is with `/DCTDecode`.
    Jpeg(Vec<u8>),
    /// 8-bit RGB samples with an optional 8-bit alpha plane.
    Rgb { samples: Vec<u8>, alpha: Option<Vec<u8>> },
}

/// Output PDF under construction.
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    page_size: PageSize,
    fonts: Option<ObjectId>,
}

impl OutputDocument {
    pub fn new(page_size: PageSize) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            page_size,
            fonts: None,
        }
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// First object id a [`PageBatch`] may use.
    pub fn next_object_id(&self) -> u32 {
        self.doc.max_id + 1
    }

    /// Append every page of `batch`, in order.
    pub fn commit(&mut self, batch: PageBatch) {
        let PageBatch {
            objects,
            pages,
            max_id,
        } = batch;
        for (id, object) in objects {
            self.doc.objects.insert(id, object);
        }
        for page_id in &pages {
            if let Ok(Object::Dictionary(dict)) = self.doc.get_object_mut(*page_id) {
                dict.set("Parent", Object::Reference(self.pages_id));
            }
        }
        debug!(pages = pages.len(), "committed imported pages");
        self.kids.extend(pages);
        self.doc.max_id = self.doc.max_id.max(max_id);
    }

    /// Append a page with no content.
    pub fn add_blank_page(&mut self) -> ObjectId {
        self.add_page(Vec::new(), Dictionary::new())
    }

    /// Append a page drawing `image` into the rectangle `(x, y, w, h)`.
    pub fn add_image_page(&mut self, image: &EmbeddedImage, x: f32, y: f32, w: f32, h: f32) -> ObjectId {
        let image_id = self.add_image_xobject(image);

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new("cm", matrix_operands([w, 0.0, 0.0, h, x, y])),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ];
        self.add_page(ops, resources)
    }

    /// Append a page drawing the Form XObject `form` with `matrix`.
    pub fn add_form_page(&mut self, form: ObjectId, matrix: Matrix) -> ObjectId {
        let mut xobjects = Dictionary::new();
        xobjects.set("Pg0", Object::Reference(form));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new("cm", matrix_operands(matrix)),
            Operation::new("Do", vec![Object::Name(b"Pg0".to_vec())]),
            Operation::new("Q", vec![]),
        ];
        self.add_page(ops, resources)
    }

    /// Append a page whose content uses the shared Helvetica fonts.
    pub fn add_text_page(&mut self, ops: Vec<Operation>) -> ObjectId {
        let fonts = self.font_resources();
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Reference(fonts));
        self.add_page(ops, resources)
    }

    /// Insert an arbitrary object, e.g. a Form XObject, and return its id.
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    fn add_page(&mut self, ops: Vec<Operation>, resources: Dictionary) -> ObjectId {
        let content = Content { operations: ops };
        // Encoding only fails on writer I/O errors, which a Vec never produces.
        let bytes = content.encode().unwrap_or_default();
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), bytes));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set("MediaBox", box_object(self.page_size.media_box()));
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));

        let page_id = self.doc.add_object(page);
        self.kids.push(page_id);
        page_id
    }

    fn add_image_xobject(&mut self, image: &EmbeddedImage) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(image.width as i64));
        dict.set("Height", Object::Integer(image.height as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));

        let stream = match &image.encoding {
            ImageEncoding::Jpeg(bytes) => {
                dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
                Stream::new(dict, bytes.clone()).with_compression(false)
            }
            ImageEncoding::Rgb { samples, alpha } => {
                if let Some(alpha) = alpha {
                    let mask_id = self.add_alpha_mask(image.width, image.height, alpha);
                    dict.set("SMask", Object::Reference(mask_id));
                }
                compressed(Stream::new(dict, samples.clone()))
            }
        };
        self.doc.add_object(stream)
    }

    fn add_alpha_mask(&mut self, width: u32, height: u32, alpha: &[u8]) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(width as i64));
        dict.set("Height", Object::Integer(height as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        self.doc.add_object(compressed(Stream::new(dict, alpha.to_vec())))
    }

    /// Shared `/Font` dictionary, created on first use.
    fn font_resources(&mut self) -> ObjectId {
        if let Some(id) = self.fonts {
            return id;
        }
        let mut fonts = Dictionary::new();
        for font in [Font::Regular, Font::Bold] {
            let mut dict = Dictionary::new();
            dict.set("Type", Object::Name(b"Font".to_vec()));
            dict.set("Subtype", Object::Name(b"Type1".to_vec()));
            dict.set("BaseFont", Object::Name(font.base_font().as_bytes().to_vec()));
            dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
            let font_id = self.doc.add_object(dict);
            fonts.set(font.resource_name(), Object::Reference(font_id));
        }
        let id = self.doc.add_object(fonts);
        self.fonts = Some(id);
        id
    }

    /// Close the page tree and serialise.
    pub fn finish(mut self, compress: bool) -> Result<Vec<u8>, lopdf::Error> {
        let count = self.kids.len() as i64;
        let kids = self.kids.iter().map(|id| Object::Reference(*id)).collect();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", Object::Integer(count));
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        if compress {
            self.doc.compress();
        }

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }
}

fn compressed(mut stream: Stream) -> Stream {
    // Leaves the stream uncompressed if deflate fails.
    let _ = stream.compress();
    stream
}

/// `[x0 y0 x1 y1]` as a PDF array.
pub fn box_object(b: [f32; 4]) -> Object {
    Object::Array(b.iter().map(|v| Object::Real(*v)).collect())
}

/// Operands for a `cm` operator.
pub fn matrix_operands(m: Matrix) -> Vec<Object> {
    m.iter().map(|v| Object::Real(*v)).collect()
}

/// `BT /F size Tf x y Td (text) Tj ET`, with optional gray fill.
pub fn text_ops(text: &str, font: Font, size: f32, x: f32, y: f32, gray: Option<f32>) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(7);
    ops.push(Operation::new("BT", vec![]));
    if let Some(g) = gray {
        ops.push(Operation::new("g", vec![Object::Real(g)]));
    }
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.resource_name().as_bytes().to_vec()), Object::Real(size)],
    ));
    ops.push(Operation::new("Td", vec![Object::Real(x), Object::Real(y)]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reload(bytes: &[u8]) -> Document {
        Document::load_mem(bytes).expect("output must parse")
    }

    #[test]
    fn blank_page_document_is_valid() {
        let mut out = OutputDocument::new(PageSize::A4);
        out.add_blank_page();
        let bytes = out.finish(true).expect("serialise");
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(reload(&bytes).get_pages().len(), 1);
    }

    #[test]
    fn pages_keep_insertion_order() {
        let mut out = OutputDocument::new(PageSize::A4);
        let first = out.add_text_page(text_ops("one", Font::Regular, 12.0, 50.0, 700.0, None));
        let second = out.add_blank_page();
        assert_eq!(out.page_count(), 2);
        assert_eq!(out.kids, vec![first, second]);
    }

    #[test]
    fn text_pages_share_one_font_dictionary() {
        let mut out = OutputDocument::new(PageSize::A4);
        out.add_text_page(text_ops("a", Font::Regular, 12.0, 0.0, 0.0, None));
        let fonts = out.fonts;
        out.add_text_page(text_ops("b", Font::Bold, 12.0, 0.0, 0.0, None));
        assert!(fonts.is_some());
        assert_eq!(out.fonts, fonts);
    }

    #[test]
    fn image_page_references_image_and_mask() {
        let mut out = OutputDocument::new(PageSize::A4);
        let image = EmbeddedImage {
            width: 2,
            height: 1,
            encoding: ImageEncoding::Rgb {
                samples: vec![255, 0, 0, 0, 255, 0],
                alpha: Some(vec![255, 128]),
            },
        };
        out.add_image_page(&image, 20.0, 20.0, 100.0, 50.0);
        let bytes = out.finish(false).expect("serialise");
        let doc = reload(&bytes);
        let images = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| matches!(s.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image"))
            .count();
        assert_eq!(images, 2, "colour image plus soft mask");
    }

    #[test]
    fn commit_sets_parent_and_advances_ids() {
        let mut out = OutputDocument::new(PageSize::A4);
        let start = out.next_object_id();
        let page_id = (start, 0);
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("MediaBox", box_object(PageSize::A4.media_box()));
        let mut batch = PageBatch::default();
        batch.objects.insert(page_id, Object::Dictionary(page));
        batch.pages.push(page_id);
        batch.max_id = start;

        out.commit(batch);
        assert_eq!(out.page_count(), 1);
        assert!(out.next_object_id() > start);
        let bytes = out.finish(true).expect("serialise");
        assert_eq!(reload(&bytes).get_pages().len(), 1);
    }
}
