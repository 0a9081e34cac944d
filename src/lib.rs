//! Core library for a YouTube downloader desktop app: URL and input
//! validation, quality presets mapped to declarative format selectors,
//! FFmpeg detection, browser-cookie authentication, persisted settings,
//! and an async orchestrator that drives yt-dlp and relays progress.

pub mod config;
pub mod downloader;
pub mod platform;

pub use config::{Settings, SettingsStore};
pub use downloader::{
    CookieStore, DownloadEngine, DownloadError, DownloadRequest, FfmpegProbe, Phase,
    ProgressEvent, QualityTier, ValidationError, YtDlpExtractor,
};
