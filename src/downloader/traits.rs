// Seams between the orchestration core and its collaborators

use std::sync::Arc;

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{ExtractorOptions, MediaInfo, ProgressEvent, RawProgress};

/// Hook invoked synchronously by the extraction engine during downloads.
pub type ProgressHook = Arc<dyn Fn(RawProgress) + Send + Sync>;

/// The extraction-engine contract: metadata-only extraction and combined
/// extract+download, both driven by an option bag.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Extract metadata without downloading
    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractorOptions,
    ) -> Result<MediaInfo, DownloadError>;

    /// Extract and download, invoking `hook` repeatedly with raw progress
    async fn download(
        &self,
        url: &str,
        options: &ExtractorOptions,
        hook: ProgressHook,
    ) -> Result<(), DownloadError>;
}

/// Callback surface back to the caller (the GUI adapter). Both methods are
/// invoked synchronously from worker context; implementations must marshal
/// to their UI thread themselves and must not block.
pub trait EventSink: Send + Sync {
    fn progress(&self, event: ProgressEvent);
    fn log(&self, line: &str);
}

/// Sink that drops everything; useful as a default and in tests.
pub struct NullSink;

impl EventSink for NullSink {
    fn progress(&self, _event: ProgressEvent) {}
    fn log(&self, _line: &str) {}
}
