//! Standard-14 Helvetica metrics and WinAnsi text encoding.
//!
//! Cover and placeholder pages use the two base fonts every PDF viewer must
//! provide, so nothing is embedded. Widths are the AFM advance widths in
//! 1/1000 em, looked up by the WinAnsi byte that is actually drawn.

use unicode_normalization::UnicodeNormalization;

/// Font used for a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// Resource name used in page content streams.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    /// PostScript base font name.
    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }

    fn ascii_widths(&self) -> &'static [u16; 95] {
        match self {
            Font::Regular => &HELVETICA_32_126,
            Font::Bold => &HELVETICA_BOLD_32_126,
        }
    }

    fn high_widths(&self) -> &'static [u16; 128] {
        match self {
            Font::Regular => &HELVETICA_128_255,
            Font::Bold => &HELVETICA_BOLD_128_255,
        }
    }

    /// Advance width of `text` at `size` points, as encoded by
    /// [`encode_win_ansi`].
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|b| self.byte_units(b) as u32)
            .sum();
        units as f32 * size / 1000.0
    }

    fn byte_units(&self, code: u8) -> u16 {
        match code {
            32..=126 => self.ascii_widths()[(code - 32) as usize],
            128..=255 => self.high_widths()[(code - 128) as usize],
            _ => 0,
        }
    }
}

const HELVETICA_32_126: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_32_126: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

// WinAnsi 0x80..=0xFF. Codes WinAnsi leaves undefined (0x81, 0x8D, 0x8F,
// 0x90, 0x9D) are never produced by the encoder and are zero.
const HELVETICA_128_255: [u16; 128] = [
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, //
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667, //
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, //
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, //
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, //
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, //
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

const HELVETICA_BOLD_128_255: [u16; 128] = [
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, //
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667, //
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333, //
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611, //
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, //
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, //
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278, //
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// Letters and punctuation that have no ASCII compatibility decomposition.
fn fold_special(c: char) -> Option<&'static str> {
    let folded = match c {
        'Æ' => "AE",
        'æ' => "ae",
        'Œ' => "OE",
        'œ' => "oe",
        'Ø' => "O",
        'ø' => "o",
        'Ł' => "L",
        'ł' => "l",
        'Đ' | 'Ð' => "D",
        'đ' | 'ð' => "d",
        'Þ' => "Th",
        'þ' => "th",
        'ß' => "ss",
        'ı' => "i",
        '\u{2018}' | '\u{2019}' | '\u{201A}' => "'",
        '\u{201C}' | '\u{201D}' | '\u{201E}' => "\"",
        '\u{2013}' | '\u{2014}' => "-",
        '\u{00B7}' | '\u{2022}' => ".",
        _ => return None,
    };
    Some(folded)
}

/// Append the ASCII transliteration of `c` to `out`.
///
/// Compatibility decomposition strips accents (`ń` → `n`, `ș` → `s`) and
/// expands ligatures; anything left without an ASCII form is dropped.
fn push_folded(c: char, out: &mut String) {
    if (' '..='~').contains(&c) {
        out.push(c);
    } else if c.is_whitespace() {
        out.push(' ');
    } else if let Some(folded) = fold_special(c) {
        out.push_str(folded);
    } else {
        out.extend(c.nfkd().filter(|d| (' '..='~').contains(d)));
    }
}

/// ASCII transliteration of `text`.
///
/// Used for filename slugs and for characters WinAnsi cannot encode.
pub fn fold_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_folded(c, &mut out);
    }
    out
}

/// Encode `text` for a `Tj` string under WinAnsiEncoding.
///
/// Latin-1 maps directly; the typographic punctuation WinAnsi places in
/// 0x80..0x9F is mapped explicitly; everything else is folded or becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut folded = String::new();
    for c in text.chars() {
        let code = c as u32;
        let byte = match c {
            _ if (0x20..=0x7E).contains(&code) || (0xA0..=0xFF).contains(&code) => code as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            'Š' => 0x8A,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            'š' => 0x9A,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => {
                folded.clear();
                push_folded(c, &mut folded);
                if folded.is_empty() {
                    bytes.push(b'?');
                } else {
                    bytes.extend_from_slice(folded.as_bytes());
                }
                continue;
            }
        };
        bytes.push(byte);
    }
    bytes
}
