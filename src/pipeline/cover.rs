//! Cover page layout.
//!
//! A cover is a title (bold, centred), a thin divider, the word-wrapped body
//! text and a small gray footer. Layout is computed first as plain data
//! ([`CoverPage`]) and only then turned into content-stream operations, so
//! positions can be asserted on directly.
//!
//! Body text that does not fit above the footer continues on further cover
//! pages that repeat the footer but not the title.

use crate::pipeline::document::text_ops;
use crate::pipeline::fonts::Font;
use crate::pipeline::geometry::PageSize;
use lopdf::content::Operation;
use lopdf::Object;
use serde::{Deserialize, Serialize};

/// What to print on the cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverPageSpec {
    pub title: String,
    /// Paragraphs separated by `\n`. Rendered verbatim, only wrapped.
    pub body_text: String,
    pub date_label: String,
}

impl CoverPageSpec {
    pub fn new(
        title: impl Into<String>,
        body_text: impl Into<String>,
        date_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body_text: body_text.into(),
            date_label: date_label.into(),
        }
    }

    /// Cover dated with today's local date (`dd/mm/yyyy`).
    pub fn dated_today(title: impl Into<String>, body_text: impl Into<String>) -> Self {
        Self::new(title, body_text, today_label())
    }
}

/// Today's local date as printed in the cover footer.
pub fn today_label() -> String {
    chrono::Local::now().format(DATE_LABEL_FORMAT).to_string()
}

/// `strftime` pattern for cover dates.
pub const DATE_LABEL_FORMAT: &str = "%d/%m/%Y";

/// Sizes and offsets for the cover, in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLayout {
    pub title_size: f32,
    pub body_size: f32,
    pub footer_size: f32,
    /// Baseline-to-baseline distance as a multiple of the font size.
    pub line_spacing: f32,
    /// Left and right margin of the printable width.
    pub side_margin: f32,
    /// Distance from the top edge to the first title baseline.
    pub title_offset: f32,
    /// Distance from the bottom edge to the footer baseline.
    pub footer_offset: f32,
}

impl Default for CoverLayout {
    fn default() -> Self {
        Self {
            title_size: 22.0,
            body_size: 12.0,
            footer_size: 9.0,
            line_spacing: 1.5,
            side_margin: 50.0,
            title_offset: 90.0,
            footer_offset: 30.0,
        }
    }
}

/// One positioned run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverLine {
    pub text: String,
    pub font: Font,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub gray: Option<f32>,
}

/// Horizontal rule from `x0` to `x1` at height `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divider {
    pub x0: f32,
    pub x1: f32,
    pub y: f32,
}

/// A laid-out cover page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoverPage {
    pub lines: Vec<CoverLine>,
    pub divider: Option<Divider>,
}

impl CoverPage {
    /// Content-stream operations drawing this page.
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::new();
        if let Some(d) = self.divider {
            ops.extend([
                Operation::new("q", vec![]),
                Operation::new("G", vec![Object::Real(0.75)]),
                Operation::new("w", vec![Object::Real(0.75)]),
                Operation::new("m", vec![Object::Real(d.x0), Object::Real(d.y)]),
                Operation::new("l", vec![Object::Real(d.x1), Object::Real(d.y)]),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ]);
        }
        for line in &self.lines {
            ops.extend(text_ops(&line.text, line.font, line.size, line.x, line.y, line.gray));
        }
        ops
    }
}

/// Greedily pack the words of `text` into lines no wider than `max_width`.
///
/// A word that is wider than `max_width` on its own is split between
/// characters. Whitespace is collapsed.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if font.text_width(&candidate, size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if font.text_width(word, size) <= max_width {
            current = word.to_string();
        } else {
            let mut pieces = break_word(word, font, size, max_width);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn break_word(word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in word.chars() {
        piece.push(c);
        if piece.chars().count() > 1 && font.text_width(&piece, size) > max_width {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Lay out `spec` on one or more pages of `page` size.
///
/// The first page carries the title and divider; every page carries the
/// footer `"{date_label} · {product_label}"`.
pub fn layout_cover(
    spec: &CoverPageSpec,
    layout: &CoverLayout,
    page: PageSize,
    product_label: &str,
) -> Vec<CoverPage> {
    let left = layout.side_margin;
    let width = (page.width - 2.0 * layout.side_margin).max(1.0);
    let body_lead = layout.body_size * layout.line_spacing;
    let title_lead = layout.title_size * layout.line_spacing;
    let body_floor = layout.footer_offset + layout.footer_size + body_lead;

    let mut first = CoverPage::default();
    let mut y = page.height - layout.title_offset;
    for line in wrap_text(&spec.title, Font::Bold, layout.title_size, width) {
        let w = Font::Bold.text_width(&line, layout.title_size);
        first.lines.push(CoverLine {
            text: line,
            font: Font::Bold,
            size: layout.title_size,
            x: (page.width - w) / 2.0,
            y,
            gray: None,
        });
        y -= title_lead;
    }
    let divider_y = y + title_lead - layout.title_size * 0.8;
    first.divider = Some(Divider {
        x0: left,
        x1: page.width - layout.side_margin,
        y: divider_y,
    });

    let mut pages = vec![first];
    let mut y = divider_y - 2.0 * body_lead;
    let continuation_top = page.height - layout.side_margin - layout.body_size;

    let paragraphs = spec
        .body_text
        .split('\n')
        .map(str::trim)
        .filter(|p| !p.is_empty());
    for (i, paragraph) in paragraphs.enumerate() {
        if i > 0 {
            y -= body_lead;
        }
        for line in wrap_text(paragraph, Font::Regular, layout.body_size, width) {
            if y < body_floor {
                pages.push(CoverPage::default());
                y = continuation_top;
            }
            if let Some(current) = pages.last_mut() {
                current.lines.push(CoverLine {
                    text: line,
                    font: Font::Regular,
                    size: layout.body_size,
                    x: left,
                    y,
                    gray: None,
                });
            }
            y -= body_lead;
        }
    }

    let footer = format!("{} \u{00B7} {}", spec.date_label.trim(), product_label);
    let footer_w = Font::Regular.text_width(&footer, layout.footer_size);
    for p in &mut pages {
        p.lines.push(CoverLine {
            text: footer.clone(),
            font: Font::Regular,
            size: layout.footer_size,
            x: (page.width - footer_w) / 2.0,
            y: layout.footer_offset,
            gray: Some(0.5),
        });
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(body: &str) -> CoverPageSpec {
        CoverPageSpec::new("Relatório", body, "17/10/2026")
    }

    #[test]
    fn today_label_is_day_month_year() {
        let label = today_label();
        assert!(chrono::NaiveDate::parse_from_str(&label, DATE_LABEL_FORMAT).is_ok(), "{label}");
        assert_eq!(CoverPageSpec::dated_today("t", "b").date_label.len(), 10);
    }

    #[test]
    fn wrap_never_exceeds_width() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod \
                    tempor incididunt ut labore et dolore magna aliqua.";
        let lines = wrap_text(text, Font::Regular, 12.0, 150.0);
        assert!(lines.len() > 1);
        for l in &lines {
            assert!(Font::Regular.text_width(l, 12.0) <= 150.0, "too wide: {l}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn wrap_accounts_for_full_width_dashes() {
        let text = "O relatório \u{2014} preparado para a diretoria \u{2014} reúne contratos, \
                    propostas e anexos \u{2014} todos revisados \u{2014} numa ordem única \
                    \u{2014} sem lacunas \u{2014} e com páginas normalizadas \u{2014} A4.";
        let max = 595.28 - 2.0 * 50.0;
        let size = 14.0;
        let lines = wrap_text(text, Font::Regular, size, max);
        assert!(lines.len() > 1);
        for l in &lines {
            let dashes = l.matches('\u{2014}').count() as f32;
            let rest = l.replace('\u{2014}', "");
            let drawn = dashes * size + Font::Regular.text_width(&rest, size);
            assert!(drawn <= max + 1e-3, "{drawn} pt > {max} pt: {l}");
        }
    }

    #[test]
    fn wrap_is_greedy() {
        // Each line must be full: the first word of the next line would not fit.
        let text = "aa bb cc dd ee ff gg hh ii jj kk ll mm nn oo pp";
        let max = 60.0;
        let lines = wrap_text(text, Font::Regular, 12.0, max);
        for pair in lines.windows(2) {
            let next_word = pair[1].split(' ').next().unwrap_or_default();
            let joined = format!("{} {}", pair[0], next_word);
            assert!(Font::Regular.text_width(&joined, 12.0) > max);
        }
    }

    #[test]
    fn long_words_are_broken() {
        let word = "x".repeat(200);
        let lines = wrap_text(&word, Font::Regular, 12.0, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for l in &lines {
            assert!(Font::Regular.text_width(l, 12.0) <= 100.0);
        }
    }

    #[test]
    fn empty_text_wraps_to_nothing() {
        assert!(wrap_text("   \n ", Font::Regular, 12.0, 100.0).is_empty());
    }

    #[test]
    fn short_cover_is_one_page_with_title_divider_footer() {
        let pages = layout_cover(
            &spec("Primeiro parágrafo.\n\nSegundo parágrafo."),
            &CoverLayout::default(),
            PageSize::A4,
            "UniPDF",
        );
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert!(page.divider.is_some());

        let title = &page.lines[0];
        assert_eq!(title.font, Font::Bold);
        let centre = title.x + Font::Bold.text_width(&title.text, title.size) / 2.0;
        assert!((centre - PageSize::A4.width / 2.0).abs() < 0.01);

        let footer = page.lines.last().expect("footer");
        assert_eq!(footer.text, "17/10/2026 \u{00B7} UniPDF");
        assert_eq!(footer.gray, Some(0.5));
        assert_eq!(footer.y, 30.0);
    }

    #[test]
    fn paragraphs_are_separated_by_a_blank_line() {
        let layout = CoverLayout::default();
        let pages = layout_cover(&spec("One.\nTwo."), &layout, PageSize::A4, "UniPDF");
        let body: Vec<_> = pages[0]
            .lines
            .iter()
            .filter(|l| l.font == Font::Regular && l.gray.is_none())
            .collect();
        assert_eq!(body.len(), 2);
        let gap = body[0].y - body[1].y;
        assert!((gap - 2.0 * layout.body_size * layout.line_spacing).abs() < 0.01);
    }

    #[test]
    fn overflowing_body_continues_on_more_pages() {
        let paragraph = "Texto formal de apresentação do documento. ".repeat(20);
        let body = vec![paragraph; 12].join("\n");
        let layout = CoverLayout::default();
        let pages = layout_cover(&spec(&body), &layout, PageSize::A4, "UniPDF");
        assert!(pages.len() > 1);

        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.divider.is_some(), i == 0);
            assert!(page.lines.iter().any(|l| l.gray == Some(0.5)), "page {i} lacks footer");
            let floor = layout.footer_offset + layout.footer_size;
            for line in page.lines.iter().filter(|l| l.gray.is_none()) {
                assert!(line.y > floor, "page {i}: line at {} overlaps footer", line.y);
                assert!(line.y < PageSize::A4.height);
            }
        }
        assert!(pages[1..].iter().all(|p| p.lines.iter().all(|l| l.font == Font::Regular)));
    }

    #[test]
    fn operations_contain_divider_and_text() {
        let pages = layout_cover(&spec("Body"), &CoverLayout::default(), PageSize::A4, "UniPDF");
        let ops = pages[0].operations();
        assert!(ops.iter().any(|o| o.operator == "S"));
        assert_eq!(ops.iter().filter(|o| o.operator == "Tj").count(), 3);
    }
}
