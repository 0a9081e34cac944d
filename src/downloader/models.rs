// Common data models for the download core

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::validators;

/// The four fixed download presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    /// Best available video + audio, H.264/AAC preferred
    Best,
    /// Capped at 1080 vertical resolution
    High1080,
    /// Capped at 720 vertical resolution
    High720,
    /// Audio only, extracted to MP3
    AudioOnly,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Best,
        QualityTier::High1080,
        QualityTier::High720,
        QualityTier::AudioOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Best => "best",
            QualityTier::High1080 => "1080p",
            QualityTier::High720 => "720p",
            QualityTier::AudioOnly => "audio",
        }
    }

    /// Parse the canonical tier name. Exact match only: case variants and
    /// anything outside the four fixed presets are rejected.
    pub fn from_name(name: &str) -> Option<QualityTier> {
        match name {
            "best" => Some(QualityTier::Best),
            "1080p" => Some(QualityTier::High1080),
            "720p" => Some(QualityTier::High720),
            "audio" => Some(QualityTier::AudioOnly),
            _ => None,
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, QualityTier::AudioOnly)
    }
}

/// A validated download request. Construction runs the input validators, so
/// an instance always carries a recognized single-video URL and a usable
/// destination.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    url: String,
    destination: PathBuf,
    quality: QualityTier,
}

impl DownloadRequest {
    pub fn new(
        url: &str,
        destination: impl Into<PathBuf>,
        quality: QualityTier,
    ) -> Result<Self, validators::ValidationError> {
        validators::validate_url(url)?;
        let destination = destination.into();
        validators::validate_output_directory(&destination.to_string_lossy())?;
        Ok(Self {
            url: url.trim().to_string(),
            destination,
            quality,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn destination(&self) -> &PathBuf {
        &self.destination
    }

    pub fn quality(&self) -> QualityTier {
        self.quality
    }
}

/// Download lifecycle phase carried on every progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Extracting,
    Downloading,
    Finished,
    Failed,
}

/// Progress information relayed to the UI adapter. Events are delivered
/// synchronously and never buffered; a slow consumer sees the latest value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub percent: f32,
    pub status: String,
}

impl ProgressEvent {
    pub fn new(phase: Phase, percent: f32, status: impl Into<String>) -> Self {
        Self {
            phase,
            percent,
            status: status.into(),
        }
    }
}

/// Metadata record returned by the extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    /// Duration in seconds, when the extractor reports one
    pub duration: Option<u64>,
    /// Age/access restriction indicator; nonzero means anonymous access
    /// is likely blocked
    pub age_limit: u32,
}

/// Raw progress payload produced by the extraction engine's hook during the
/// download phase.
#[derive(Debug, Clone)]
pub enum RawProgress {
    Downloading {
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
        total_bytes_estimate: Option<u64>,
        /// Bytes per second
        speed: Option<f64>,
    },
    Finished {
        filename: String,
    },
    Error,
}

/// Authentication directive handed to the extraction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    /// Pull live cookies from an installed browser
    FromBrowser(super::cookies::Browser),
    /// Read a portable cookie jar file
    FromFile(PathBuf),
}

/// Post-processing step appended after the download completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    /// Convert/remux the merged output into a standard container
    ConvertVideo { container: String },
    /// Extract the audio track and encode it at a fixed target bitrate
    ExtractAudio { codec: String, bitrate: String },
}

/// Option bag accepted by the extraction engine. Mirrors the library's
/// option set: format selector, output template, auth directive,
/// post-processing chain, and behavior flags.
#[derive(Debug, Clone, Default)]
pub struct ExtractorOptions {
    /// Declarative format selector expression
    pub format: Option<String>,
    /// Full output path template, e.g. `/downloads/%(title)s.%(ext)s`
    pub output_template: Option<String>,
    /// Force the merged output into this container
    pub merge_output_format: Option<String>,
    pub postprocessors: Vec<PostProcessor>,
    pub cookies: Option<CookieDirective>,
    /// When set, the engine persists its cookie jar to this path as a side
    /// effect (used by the browser export flow)
    pub cookie_jar_out: Option<PathBuf>,
    pub skip_download: bool,
    pub extract_flat: bool,
    pub quiet: bool,
    pub no_warnings: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_names_round_trip() {
        for tier in QualityTier::ALL {
            assert_eq!(QualityTier::from_name(tier.as_str()), Some(tier));
        }
    }

    #[test]
    fn tier_parse_is_exact() {
        assert_eq!(QualityTier::from_name("Best"), None);
        assert_eq!(QualityTier::from_name("AUDIO"), None);
        assert_eq!(QualityTier::from_name(""), None);
        assert_eq!(QualityTier::from_name("480p"), None);
    }

    #[test]
    fn request_rejects_bad_url() {
        let dir = tempfile::tempdir().unwrap();
        let result = DownloadRequest::new("not a url", dir.path(), QualityTier::Best);
        assert!(result.is_err());
    }

    #[test]
    fn request_accepts_valid_input() {
        let dir = tempfile::tempdir().unwrap();
        let request = DownloadRequest::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            dir.path(),
            QualityTier::High720,
        )
        .unwrap();
        assert_eq!(request.quality(), QualityTier::High720);
        assert_eq!(request.url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
