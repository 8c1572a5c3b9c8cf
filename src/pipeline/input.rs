//! Input intake: turn a path, URL or byte buffer into a [`SourceFile`].
//!
//! The declared media type is decided here, once. Downstream stages only
//! branch on [`SourceKind`], never on type strings. Bytes are held in an
//! `Arc<[u8]>` so the blocking assembly task can read them without copying,
//! and nothing in the pipeline ever writes to them.

use crate::error::AssembleError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Raster formats accepted as source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub(crate) fn codec(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// What a source file is, decided from its declared media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "format")]
pub enum SourceKind {
    Image(ImageFormat),
    Pdf,
}

impl SourceKind {
    /// Parse a media type such as `application/pdf` or `image/png; q=1`.
    ///
    /// Case-insensitive; parameters are ignored. `None` for anything that is
    /// not PDF, JPEG or PNG.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(SourceKind::Pdf),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(SourceKind::Image(ImageFormat::Jpeg)),
            "image/png" => Some(SourceKind::Image(ImageFormat::Png)),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Image(ImageFormat::Jpeg) => "jpeg",
            SourceKind::Image(ImageFormat::Png) => "png",
        }
    }
}

/// Media type implied by a file extension, if it is one we accept.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// One input to be merged.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Stable for the session; used by callers for list operations.
    pub id: Uuid,
    /// Display name, used only in messages and placeholder pages.
    pub name: String,
    pub media_type: String,
    pub kind: SourceKind,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    /// Build a source file from bytes and a declared media type.
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self, AssembleError> {
        let name = name.into();
        let media_type = media_type.into();
        let kind = SourceKind::from_media_type(&media_type).ok_or_else(|| {
            AssembleError::UnsupportedMediaType {
                name: name.clone(),
                media_type: media_type.clone(),
            }
        })?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            media_type,
            kind,
            bytes: bytes.into(),
        })
    }

    /// Read a local file, taking the media type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AssembleError> {
        let path = path.as_ref();
        let bytes = read_local(path)?;
        let name = display_name(path);
        let media_type = media_type_for_path(path).ok_or_else(|| {
            AssembleError::UnsupportedMediaType {
                name: name.clone(),
                media_type: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{e}"))
                    .unwrap_or_else(|| "(no extension)".to_string()),
            }
        })?;
        debug!("Loaded local file: {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(name, media_type, bytes)
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_local(path: &Path) -> Result<Vec<u8>, AssembleError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => AssembleError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => AssembleError::FileNotFound {
            path: path.to_path_buf(),
        },
    })
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local path or an http(s) URL as a [`SourceFile`].
pub async fn load_source(input: &str, timeout_secs: u64) -> Result<SourceFile, AssembleError> {
    if is_url(input) {
        download(input, timeout_secs).await
    } else if input.trim().is_empty() {
        Err(AssembleError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        let path = PathBuf::from(input);
        tokio::task::spawn_blocking(move || SourceFile::from_path(path))
            .await
            .map_err(|e| AssembleError::Internal(format!("Intake task panicked: {e}")))?
    }
}

async fn download(url: &str, timeout_secs: u64) -> Result<SourceFile, AssembleError> {
    info!("Downloading source from: {}", url);
    let failed = |reason: String| AssembleError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let parsed = reqwest::Url::parse(url).map_err(|_| AssembleError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(parsed.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            AssembleError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let name = filename_from_url(&parsed);
    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| SourceKind::from_media_type(v).is_some())
        .map(str::to_string);
    let media_type = header_type
        .or_else(|| media_type_for_path(Path::new(&name)).map(str::to_string))
        .ok_or_else(|| AssembleError::UnsupportedMediaType {
            name: name.clone(),
            media_type: response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
        })?;

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} ({} bytes, {})", name, bytes.len(), media_type);

    SourceFile::from_bytes(name, media_type, bytes.to_vec())
}

/// Last non-empty path segment, or a generic name.
fn filename_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn media_types_are_parsed_loosely() {
        assert_eq!(SourceKind::from_media_type("application/pdf"), Some(SourceKind::Pdf));
        assert_eq!(
            SourceKind::from_media_type("IMAGE/JPG"),
            Some(SourceKind::Image(ImageFormat::Jpeg))
        );
        assert_eq!(
            SourceKind::from_media_type("image/png; charset=binary"),
            Some(SourceKind::Image(ImageFormat::Png))
        );
        assert_eq!(SourceKind::from_media_type("image/gif"), None);
        assert_eq!(SourceKind::from_media_type(""), None);
    }

    #[test]
    fn extensions_map_to_media_types() {
        assert_eq!(media_type_for_path(Path::new("a/B.PDF")), Some("application/pdf"));
        assert_eq!(media_type_for_path(Path::new("scan.jpeg")), Some("image/jpeg"));
        assert_eq!(media_type_for_path(Path::new("notes.txt")), None);
        assert_eq!(media_type_for_path(Path::new("README")), None);
    }

    #[test]
    fn unsupported_media_type_is_rejected_at_intake() {
        let err = SourceFile::from_bytes("x.gif", "image/gif", b"GIF89a".to_vec()).unwrap_err();
        assert!(matches!(err, AssembleError::UnsupportedMediaType { .. }));
    }

    #[test]
    fn from_bytes_assigns_unique_ids() {
        let a = SourceFile::from_bytes("a.pdf", "application/pdf", b"%PDF-".to_vec()).unwrap();
        let b = SourceFile::from_bytes("a.pdf", "application/pdf", b"%PDF-".to_vec()).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.size_bytes(), 5);
        assert_eq!(a.kind, SourceKind::Pdf);
    }

    #[test]
    fn from_path_reads_and_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.PNG");
        std::fs::write(&path, b"\x89PNG").unwrap();
        let file = SourceFile::from_path(&path).unwrap();
        assert_eq!(file.name, "photo.PNG");
        assert_eq!(file.kind, SourceKind::Image(ImageFormat::Png));

        let missing = SourceFile::from_path(dir.path().join("nope.pdf")).unwrap_err();
        assert!(matches!(missing, AssembleError::FileNotFound { .. }));
    }

    #[test]
    fn url_filename_uses_last_segment() {
        let url = reqwest::Url::parse("https://x.test/files/contract.pdf?dl=1").unwrap();
        assert_eq!(filename_from_url(&url), "contract.pdf");
        let bare = reqwest::Url::parse("https://x.test/").unwrap();
        assert_eq!(filename_from_url(&bare), "download");
    }
}
