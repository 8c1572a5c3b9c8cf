//! Assembly results: the merged bytes plus what happened to each file.

use crate::error::FileError;
use crate::pipeline::fonts::fold_to_ascii;
use crate::pipeline::input::SourceKind;
use serde::{Deserialize, Serialize};

/// The merged PDF and its per-file report.
///
/// Produced once per assembly; nothing is retained by the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledDocument {
    /// Complete PDF file contents.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Suggested download name, e.g. `relatorio-mensal.pdf`.
    pub filename: String,
    /// Pages in the output, cover included. Always ≥ 1.
    pub page_count: usize,
    /// Leading pages that belong to the cover (0 when none was requested).
    pub cover_pages: usize,
    pub files: Vec<FileReport>,
}

impl AssembledDocument {
    pub fn stats(&self) -> AssemblyStats {
        let placeholders = self
            .files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Placeholder { .. }))
            .count();
        AssemblyStats {
            total_files: self.files.len(),
            imported_files: self.files.len() - placeholders,
            placeholder_files: placeholders,
            content_pages: self.page_count - self.cover_pages,
            total_pages: self.page_count,
            output_bytes: self.bytes.len(),
        }
    }
}

/// What happened to one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// 0-indexed position in the input list.
    pub index: usize,
    pub name: String,
    pub kind: SourceKind,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Pages were appended; `strategy` names the path that produced them
    /// (`image`, `structural-copy`, `rebuild-then-copy`, `render-and-embed`).
    Imported { pages: usize, strategy: String },
    /// One placeholder page stands in for the file.
    Placeholder { error: FileError },
}

impl FileOutcome {
    /// Output pages contributed by this file.
    pub fn pages(&self) -> usize {
        match self {
            FileOutcome::Imported { pages, .. } => *pages,
            FileOutcome::Placeholder { .. } => 1,
        }
    }
}

/// Summary counts for logging and the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    pub total_files: usize,
    pub imported_files: usize,
    pub placeholder_files: usize,
    pub content_pages: usize,
    pub total_pages: usize,
    pub output_bytes: usize,
}

/// Derive a download filename from a title.
///
/// Lower-cases, folds Latin accents to ASCII, turns runs of whitespace,
/// `-` and `_` into a single `-`, drops every other character, truncates to
/// `max_len` characters and trims separators from both ends. Falls back to
/// `default` when nothing is left. `.pdf` is appended.
pub fn suggested_filename(title: &str, default: &str, max_len: usize) -> String {
    let mut stem = String::new();
    let mut pending_sep = false;
    for c in fold_to_ascii(title).chars() {
        if c.is_ascii_whitespace() || c == '-' || c == '_' {
            pending_sep = !stem.is_empty();
            continue;
        }
        if !c.is_ascii_alphanumeric() {
            continue;
        }
        if pending_sep {
            stem.push('-');
            pending_sep = false;
        }
        stem.push(c.to_ascii_lowercase());
    }

    let mut stem: String = stem.chars().take(max_len).collect();
    while stem.ends_with('-') {
        stem.pop();
    }
    if stem.is_empty() {
        stem = default.to_string();
    }
    format!("{stem}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureReason;

    #[test]
    fn filename_is_slugged() {
        assert_eq!(
            suggested_filename("Relatório Mensal: Vendas & Leads!", "documento", 50),
            "relatorio-mensal-vendas-leads.pdf"
        );
        assert_eq!(suggested_filename("  a__b -- c  ", "documento", 50), "a-b-c.pdf");
    }

    #[test]
    fn filename_folds_central_european_letters() {
        assert_eq!(
            suggested_filename("Relatório Kraków Gdańsk Łódź Brașov Ærø", "documento", 80),
            "relatorio-krakow-gdansk-lodz-brasov-aero.pdf"
        );
        assert_eq!(
            suggested_filename("Žilina – Đakovo – Straße", "documento", 80),
            "zilina-dakovo-strasse.pdf"
        );
    }

    #[test]
    fn filename_only_has_permitted_characters() {
        let name = suggested_filename("Ünïcødé ✓ «quotes» 日本 #42", "documento", 50);
        let stem = name.trim_end_matches(".pdf");
        assert!(stem
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert!(!stem.starts_with('-') && !stem.ends_with('-'));
    }

    #[test]
    fn filename_is_truncated() {
        let name = suggested_filename(&"palavra ".repeat(30), "documento", 20);
        let stem = name.trim_end_matches(".pdf");
        assert!(stem.len() <= 20);
        assert!(!stem.ends_with('-'));
    }

    #[test]
    fn filename_falls_back_to_default() {
        assert_eq!(suggested_filename("", "documento", 50), "documento.pdf");
        assert_eq!(suggested_filename("!!! ??? ✓", "documento", 50), "documento.pdf");
        assert_eq!(suggested_filename("日本語", "merged", 50), "merged.pdf");
    }

    #[test]
    fn stats_count_outcomes() {
        let doc = AssembledDocument {
            bytes: vec![0; 10],
            filename: "x.pdf".into(),
            page_count: 5,
            cover_pages: 1,
            files: vec![
                FileReport {
                    index: 0,
                    name: "a.pdf".into(),
                    kind: SourceKind::Pdf,
                    outcome: FileOutcome::Imported {
                        pages: 3,
                        strategy: "structural-copy".into(),
                    },
                },
                FileReport {
                    index: 1,
                    name: "b.pdf".into(),
                    kind: SourceKind::Pdf,
                    outcome: FileOutcome::Placeholder {
                        error: FileError::PdfUnreadable {
                            name: "b.pdf".into(),
                            attempts: 3,
                            reason: FailureReason::Corrupted,
                            detail: "eof".into(),
                        },
                    },
                },
            ],
        };
        let s = doc.stats();
        assert_eq!(s.imported_files, 1);
        assert_eq!(s.placeholder_files, 1);
        assert_eq!(s.content_pages, 4);
        assert_eq!(s.output_bytes, 10);
        assert_eq!(doc.files[1].outcome.pages(), 1);
    }
}
