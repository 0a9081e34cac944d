// FFmpeg detection and capability gating.
//
// Availability is a cached fact for the process lifetime: computed at most
// once unless a forced recheck is requested, held in an explicit cache slot
// with an invalidation method.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::models::QualityTier;
use super::utils::run_output_with_timeout;

/// Guide shown when the transcoder is missing.
pub const INSTALLATION_GUIDE_URL: &str = "https://ffmpeg.org/download.html";

const PROBE_TIMEOUT_SECS: u64 = 5;

/// Cached probe result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAvailability {
    pub available: bool,
    pub version: Option<String>,
}

/// Seam over the actual subprocess invocation, so availability logic is
/// testable without an ffmpeg install.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    /// Run the binary with its version flag and return stdout
    async fn query_version(&self) -> Result<String, String>;

    /// PATH-search fallback when the invocation itself fails
    fn found_in_path(&self) -> bool;
}

/// Probes the real `ffmpeg` binary.
pub struct SystemFfmpeg;

#[async_trait]
impl VersionProbe for SystemFfmpeg {
    async fn query_version(&self) -> Result<String, String> {
        let output = run_output_with_timeout(
            "ffmpeg",
            vec!["-version".to_string()],
            PROBE_TIMEOUT_SECS,
        )
        .await?;
        if !output.status.success() {
            return Err(format!("ffmpeg exited with {}", output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn found_in_path(&self) -> bool {
        let exe = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
        std::env::var_os("PATH")
            .map(|paths| {
                std::env::split_paths(&paths).any(|dir| dir.join(exe).is_file())
            })
            .unwrap_or(false)
    }
}

pub struct FfmpegProbe {
    probe: Box<dyn VersionProbe>,
    cached: Mutex<Option<ToolAvailability>>,
}

impl FfmpegProbe {
    pub fn new() -> Self {
        Self::with_probe(Box::new(SystemFfmpeg))
    }

    pub fn with_probe(probe: Box<dyn VersionProbe>) -> Self {
        Self {
            probe,
            cached: Mutex::new(None),
        }
    }

    /// Current availability, computing it on first use. `force` discards the
    /// cached value and probes again.
    pub async fn check(&self, force: bool) -> ToolAvailability {
        if !force {
            if let Some(cached) = self.cached.lock().unwrap().clone() {
                return cached;
            }
        }

        let result = match self.probe.query_version().await {
            Ok(stdout) => ToolAvailability {
                available: true,
                version: parse_version(&stdout),
            },
            Err(err) => {
                tracing::debug!("ffmpeg version query failed: {}", err);
                ToolAvailability {
                    available: self.probe.found_in_path(),
                    version: None,
                }
            }
        };

        *self.cached.lock().unwrap() = Some(result.clone());
        result
    }

    pub async fn is_available(&self, force: bool) -> bool {
        self.check(force).await.available
    }

    pub async fn version(&self) -> Option<String> {
        self.check(false).await.version
    }

    /// Drop the cached result; the next query probes again.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap() = None;
    }

    /// Whether the recommended path for a tier relies on the transcoder.
    /// Advisory only: every tier benefits from merging or conversion, so the
    /// current policy answers true across the board.
    pub fn requires_tool(&self, _tier: QualityTier) -> bool {
        true
    }

    /// One-line status for UI display.
    pub async fn status_text(&self) -> String {
        let availability = self.check(false).await;
        if availability.available {
            match availability.version {
                Some(v) => format!("FFmpeg: Available (v{})", v),
                None => "FFmpeg: Available".to_string(),
            }
        } else {
            "FFmpeg: Not Found".to_string()
        }
    }

    /// General warning shown when the transcoder is missing.
    pub fn warning_message(&self) -> String {
        "FFmpeg is not detected on your system.\n\n\
         FFmpeg is required for:\n\
         - High-quality video downloads (1080p, Best Available)\n\
         - Audio-only downloads (MP3 conversion)\n\
         - Merging video and audio streams\n\n\
         Some basic downloads might still work, but for full functionality, \
         please install FFmpeg.\n\n\
         Would you like to see installation instructions?"
            .to_string()
    }

    /// Warning for a specific tier whose recommended path needs the tool.
    /// The caller offers three outcomes: proceed anyway, view the install
    /// guide, or cancel.
    pub fn quality_warning_message(&self, tier: QualityTier) -> String {
        format!(
            "The selected quality '{}' requires FFmpeg, which is not installed.\n\n\
             You can:\n\
             - Install FFmpeg and try again (Recommended)\n\
             - Continue anyway (may fail or download lower quality)\n\
             - Cancel and change quality settings\n\n\
             Do you want to see FFmpeg installation instructions?",
            tier.as_str()
        )
    }
}

impl Default for FfmpegProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the version token out of the first line of `ffmpeg -version` output,
/// e.g. "ffmpeg version 6.1.1 Copyright ..." -> "6.1.1".
fn parse_version(stdout: &str) -> Option<String> {
    let first_line = stdout.lines().next()?;
    if !first_line.contains("ffmpeg version") {
        return None;
    }
    first_line.split_whitespace().nth(2).map(|s| s.to_string())
}
