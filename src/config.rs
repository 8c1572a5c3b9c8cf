//! Configuration types for document assembly.
//!
//! All assembly behaviour is controlled through [`AssemblyConfig`], built via
//! its [`AssemblyConfigBuilder`]. One struct holds every knob, so a config can
//! be shared with the blocking assembly task, logged, and compared between
//! runs.

use crate::error::AssembleError;
use crate::pipeline::cover::CoverLayout;
use crate::pipeline::geometry::PageSize;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for one assembly run.
///
/// Built via [`AssemblyConfig::builder()`] or using
/// [`AssemblyConfig::default()`].
///
/// # Example
/// ```rust
/// use unipdf::AssemblyConfig;
///
/// let config = AssemblyConfig::builder()
///     .margin(30.0)
///     .product_label("Acme CRM")
///     .build()
///     .unwrap();
/// assert_eq!(config.margin, 30.0);
/// ```
#[derive(Clone)]
pub struct AssemblyConfig {
    /// Size of every output page. Default: A4 (595.28 × 841.89 pt).
    pub page_size: PageSize,

    /// Margin around images and re-drawn PDF pages, in points. Default: 20.
    pub margin: f32,

    /// Margin around structurally copied PDF pages, in points. Default: 0.
    ///
    /// Copied pages are already laid out for print, so by default they are
    /// only scaled to the output page size.
    pub copy_margin: f32,

    /// Cover page font sizes and offsets.
    pub cover: CoverLayout,

    /// Product name printed in the cover footer. Default: "UniPDF".
    pub product_label: String,

    /// Filename stem used when the cover title yields nothing usable.
    /// Default: "documento".
    pub default_filename: String,

    /// Maximum length of the filename stem, in characters. Default: 50.
    pub max_filename_len: usize,

    /// Flate-compress unfiltered streams before writing. Default: true.
    pub compress: bool,

    /// LLM model identifier for cover text, e.g. "gpt-4.1-nano".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for cover text. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens for cover text. Default: 1024.
    pub max_tokens: usize,

    /// Custom system prompt for cover text. If None, uses built-in default.
    pub system_prompt: Option<String>,

    /// Timeout for the single cover-text call in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin: 20.0,
            copy_margin: 0.0,
            cover: CoverLayout::default(),
            product_label: "UniPDF".to_string(),
            default_filename: "documento".to_string(),
            max_filename_len: 50,
            compress: true,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 1024,
            system_prompt: None,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AssemblyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyConfig")
            .field("page_size", &self.page_size)
            .field("margin", &self.margin)
            .field("copy_margin", &self.copy_margin)
            .field("cover", &self.cover)
            .field("product_label", &self.product_label)
            .field("default_filename", &self.default_filename)
            .field("max_filename_len", &self.max_filename_len)
            .field("compress", &self.compress)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AssemblyProgressCallback>"),
            )
            .finish()
    }
}

impl AssemblyConfig {
    /// Create a new builder for `AssemblyConfig`.
    pub fn builder() -> AssemblyConfigBuilder {
        AssemblyConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AssemblyConfig`].
#[derive(Debug)]
pub struct AssemblyConfigBuilder {
    config: AssemblyConfig,
}

impl AssemblyConfigBuilder {
    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn margin(mut self, pt: f32) -> Self {
        self.config.margin = pt;
        self
    }

    pub fn copy_margin(mut self, pt: f32) -> Self {
        self.config.copy_margin = pt;
        self
    }

    pub fn cover_layout(mut self, layout: CoverLayout) -> Self {
        self.config.cover = layout;
        self
    }

    pub fn product_label(mut self, label: impl Into<String>) -> Self {
        self.config.product_label = label.into();
        self
    }

    pub fn default_filename(mut self, stem: impl Into<String>) -> Self {
        self.config.default_filename = stem.into();
        self
    }

    pub fn max_filename_len(mut self, n: usize) -> Self {
        self.config.max_filename_len = n;
        self
    }

    pub fn compress(mut self, v: bool) -> Self {
        self.config.compress = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AssemblyConfig, AssembleError> {
        let c = &self.config;
        if !(c.page_size.width > 0.0 && c.page_size.height > 0.0) {
            return Err(AssembleError::InvalidConfig(format!(
                "Page size must be positive, got {} × {}",
                c.page_size.width, c.page_size.height
            )));
        }
        for (name, m) in [("margin", c.margin), ("copy margin", c.copy_margin)] {
            if !(m >= 0.0) {
                return Err(AssembleError::InvalidConfig(format!(
                    "The {name} must be non-negative, got {m}"
                )));
            }
            if 2.0 * m >= c.page_size.width.min(c.page_size.height) {
                return Err(AssembleError::InvalidConfig(format!(
                    "The {name} of {m} pt leaves no drawable area"
                )));
            }
        }
        if 2.0 * c.cover.side_margin >= c.page_size.width {
            return Err(AssembleError::InvalidConfig(
                "Cover side margin leaves no printable width".into(),
            ));
        }
        if c.max_filename_len == 0 {
            return Err(AssembleError::InvalidConfig(
                "Maximum filename length must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = AssemblyConfig::builder().build().expect("defaults build");
        assert_eq!(c.page_size, PageSize::A4);
        assert_eq!(c.margin, 20.0);
        assert_eq!(c.copy_margin, 0.0);
        assert_eq!(c.product_label, "UniPDF");
        assert_eq!(c.default_filename, "documento");
        assert!(c.compress);
    }

    #[test]
    fn negative_or_oversized_margins_are_rejected() {
        assert!(AssemblyConfig::builder().margin(-1.0).build().is_err());
        assert!(AssemblyConfig::builder().margin(f32::NAN).build().is_err());
        assert!(AssemblyConfig::builder().copy_margin(400.0).build().is_err());
    }

    #[test]
    fn degenerate_page_size_is_rejected() {
        let err = AssemblyConfig::builder()
            .page_size(PageSize::new(0.0, 100.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, AssembleError::InvalidConfig(_)));
    }

    #[test]
    fn setters_clamp() {
        let c = AssemblyConfig::builder()
            .temperature(9.0)
            .max_tokens(0)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_tokens, 1);
    }

    #[test]
    fn zero_filename_length_is_rejected() {
        assert!(AssemblyConfig::builder().max_filename_len(0).build().is_err());
    }

    #[test]
    fn debug_hides_provider() {
        let s = format!("{:?}", AssemblyConfig::default());
        assert!(s.contains("AssemblyConfig"));
        assert!(s.contains("product_label"));
    }

    #[test]
    fn debug_lists_prompt_and_timeouts() {
        let config = AssemblyConfig::builder()
            .system_prompt("Escreva em tom formal.")
            .api_timeout_secs(42)
            .download_timeout_secs(7)
            .build()
            .unwrap();
        let s = format!("{config:?}");
        assert!(s.contains("system_prompt: Some(\"Escreva em tom formal.\")"), "{s}");
        assert!(s.contains("api_timeout_secs: 42"), "{s}");
        assert!(s.contains("download_timeout_secs: 7"), "{s}");
    }
}
