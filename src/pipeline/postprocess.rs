//! Post-processing: deterministic cleanup of generated cover text.
//!
//! The cover renderer prints text verbatim, so anything the model adds for a
//! Markdown viewer (fences, `#` headings, `**bold**`, bullets) would show up
//! literally on the page. These rules strip that markup without touching
//! the words.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence regex
//! sees the raw output; blank-line collapsing runs last so lines emptied by
//! earlier rules are folded too.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw model output.
///
/// Rules (applied in order):
/// 1. Strip outer code fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Remove heading markers and list bullets at line start
/// 5. Remove emphasis markers (`**`, `__`, `*x*`, `_x_`, backticks)
/// 6. Trim every line and collapse runs of blank lines to one
pub fn clean_cover_text(input: &str) -> String {
    let s = strip_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = strip_line_markers(&s);
    let s = strip_emphasis(&s);
    collapse_blank_lines(&s)
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

fn strip_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Heading markers and bullets ──────────────────────────────────────

static RE_LINE_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:#{1,6}[ \t]+|[-*+•][ \t]+|>[ \t]?)").unwrap());

fn strip_line_markers(input: &str) -> String {
    RE_LINE_MARKERS.replace_all(input, "").into_owned()
}

// ── Rule 5: Emphasis ─────────────────────────────────────────────────────────

static RE_STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\*\*|__)(.+?)(\*\*|__)").unwrap());
static RE_EM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w*])[*_]([^*_\s][^*_]*?)[*_]([^\w*]|$)").unwrap());

fn strip_emphasis(input: &str) -> String {
    let s = RE_STRONG.replace_all(input, "$2");
    let s = RE_EM.replace_all(&s, "$1$2$3");
    s.replace('`', "")
}

// ── Rule 6: Collapse blank lines ─────────────────────────────────────────────

fn collapse_blank_lines(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in input.lines().map(str::trim) {
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_unchanged() {
        let text = "Primeiro parágrafo.\n\nSegundo parágrafo.";
        assert_eq!(clean_cover_text(text), text);
    }

    #[test]
    fn fences_are_stripped() {
        let input = "```text\nCorpo do texto.\n```";
        assert_eq!(clean_cover_text(input), "Corpo do texto.");
    }

    #[test]
    fn crlf_and_blank_runs_are_normalised() {
        let input = "\r\n\r\nA.\r\n\r\n\r\n\r\nB.\r\n\r\n";
        assert_eq!(clean_cover_text(input), "A.\n\nB.");
    }

    #[test]
    fn markdown_markers_are_removed() {
        let input = "# Título\n\n- **Importante**: texto _enfatizado_ e `código`.";
        assert_eq!(clean_cover_text(input), "Título\n\nImportante: texto enfatizado e código.");
    }

    #[test]
    fn snake_case_words_survive() {
        assert_eq!(clean_cover_text("campo nome_completo"), "campo nome_completo");
    }

    #[test]
    fn invisible_characters_are_removed() {
        assert_eq!(clean_cover_text("ol\u{200B}á\u{FEFF}"), "olá");
    }

    #[test]
    fn whitespace_only_becomes_empty() {
        assert_eq!(clean_cover_text(" \n\t\n "), "");
    }
}
