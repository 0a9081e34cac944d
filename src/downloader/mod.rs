// Download core: validation, tool probing, cookie handling, and the
// orchestrator that drives the extraction engine.

pub mod cookies;
pub mod errors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod traits;
pub mod utils;
pub mod validators;
pub mod ytdlp;

pub use cookies::{AuthConfig, Browser, CookieSource, CookieStore, ExportError};
pub use errors::DownloadError;
pub use models::{
    DownloadRequest, ExtractorOptions, MediaInfo, Phase, ProgressEvent, QualityTier, RawProgress,
};
pub use orchestrator::DownloadEngine;
pub use tools::{FfmpegProbe, ToolAvailability};
pub use traits::{EventSink, MediaExtractor, NullSink, ProgressHook};
pub use validators::{ValidationError, validate_url};
pub use ytdlp::YtDlpExtractor;
