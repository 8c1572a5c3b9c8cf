//! Progress-callback trait for per-file assembly events.
//!
//! Inject an [`Arc<dyn AssemblyProgressCallback>`] via
//! [`crate::config::AssemblyConfigBuilder::progress_callback`] to be told
//! as each source file is imported or replaced by a placeholder page.
//!
//! # Example
//!
//! ```rust
//! use unipdf::{AssemblyConfig, AssemblyProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl AssemblyProgressCallback for PageCounter {
//!     fn on_file_complete(&self, _index: usize, _total: usize, pages: usize) {
//!         self.pages.fetch_add(pages, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter { pages: AtomicUsize::new(0) });
//!
//! let config = AssemblyConfig::builder()
//!     .progress_callback(counter as Arc<dyn AssemblyProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the assembler as it works through the file list.
///
/// Files are processed one at a time in input order, so events arrive in
/// order too. The trait is `Send + Sync` because assembly runs on a
/// blocking worker thread. All methods default to no-ops.
pub trait AssemblyProgressCallback: Send + Sync {
    /// Called once before the cover and the first file.
    ///
    /// # Arguments
    /// * `total_files` — number of source files
    /// * `has_cover`   — whether a cover page will be rendered
    fn on_assembly_start(&self, total_files: usize, has_cover: bool) {
        let _ = (total_files, has_cover);
    }

    /// Called before a file is ingested.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the input list
    /// * `total` — number of source files
    /// * `name`  — display name of the file
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a file's pages were appended.
    fn on_file_complete(&self, index: usize, total: usize, pages: usize) {
        let _ = (index, total, pages);
    }

    /// Called when a file was replaced by a placeholder page.
    ///
    /// # Arguments
    /// * `error` — human-readable failure description
    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every file has been handled.
    ///
    /// # Arguments
    /// * `total_pages` — pages in the output, cover included
    /// * `placeholders` — files that became placeholder pages
    fn on_assembly_complete(&self, total_pages: usize, placeholders: usize) {
        let _ = (total_pages, placeholders);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AssemblyProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AssemblyConfig`].
pub type ProgressCallback = Arc<dyn AssemblyProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl AssemblyProgressCallback for Recorder {
        fn on_file_start(&self, index: usize, total: usize, name: &str) {
            self.events.lock().unwrap().push(format!("start {index}/{total} {name}"));
        }

        fn on_file_error(&self, index: usize, _total: usize, _error: &str) {
            self.events.lock().unwrap().push(format!("error {index}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_assembly_start(2, true);
        cb.on_file_start(1, 2, "a.pdf");
        cb.on_file_complete(1, 2, 3);
        cb.on_file_error(2, 2, "corrupted");
        cb.on_assembly_complete(5, 1);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Arc::new(Recorder::default());
        let cb: ProgressCallback = rec.clone();
        cb.on_file_start(1, 2, "a.pdf");
        cb.on_file_complete(1, 2, 1);
        cb.on_file_error(2, 2, "bad");
        assert_eq!(*rec.events.lock().unwrap(), vec!["start 1/2 a.pdf", "error 2"]);
    }
}
