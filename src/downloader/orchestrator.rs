// Download orchestration: request -> option bag -> two-phase engine run.
//
// Phase one extracts metadata (title, duration, restriction indicator),
// phase two performs the combined extract+download while relaying engine
// progress to the caller. Every attempt ends in exactly one terminal
// progress event so the caller's busy indicator is never left hanging.

use std::fs;
use std::sync::Arc;

use super::cookies::{CookieSource, CookieStore};
use super::errors::{is_restriction_error, DownloadError};
use super::format_selector;
use super::models::{
    DownloadRequest, ExtractorOptions, MediaInfo, Phase, ProgressEvent, RawProgress,
};
use super::traits::{EventSink, MediaExtractor, ProgressHook};
use super::utils::{format_duration, to_mb};

pub struct DownloadEngine {
    extractor: Arc<dyn MediaExtractor>,
    cookies: Arc<CookieStore>,
    sink: Arc<dyn EventSink>,
}

impl DownloadEngine {
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        cookies: Arc<CookieStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            extractor,
            cookies,
            sink,
        }
    }

    /// Metadata-only probe with the current authentication derivation.
    pub async fn extract_info(&self, url: &str) -> Result<MediaInfo, DownloadError> {
        let options = ExtractorOptions {
            cookies: self.cookies.derive_options(),
            quiet: true,
            no_warnings: true,
            ..Default::default()
        };
        self.extractor.extract_info(url, &options).await
    }

    /// Run a download to completion. Returns true on success; every failure
    /// is logged, classified, and collapsed into false so the caller can
    /// always re-enable its controls.
    pub async fn download(&self, request: &DownloadRequest) -> bool {
        // Remediation advice depends on whether auth was on for this attempt,
        // snapshotted before anything runs.
        let auth_enabled = self.cookies.is_enabled();

        match self.run(request).await {
            Ok(()) => true,
            Err(DownloadError::Download(message)) => {
                self.sink
                    .progress(ProgressEvent::new(Phase::Failed, 0.0, "Download failed"));
                self.sink.log(&format!("Download Error: {}", message));
                if is_restriction_error(&message) {
                    self.log_restriction_remediation(auth_enabled);
                }
                false
            }
            Err(err) => {
                self.sink
                    .progress(ProgressEvent::new(Phase::Failed, 0.0, "Error occurred"));
                self.sink.log(&format!("Error: {}", err));
                false
            }
        }
    }

    async fn run(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        fs::create_dir_all(request.destination())?;

        // Auth options are captured here, once; edits made while the
        // download is in flight do not affect this request.
        let options = self.build_options(request);
        let auth = self.cookies.snapshot();

        self.sink.progress(ProgressEvent::new(
            Phase::Extracting,
            0.0,
            "Extracting video information...",
        ));
        self.sink.log("Extracting video information...");

        if auth.enabled {
            match auth.source {
                CookieSource::Browser => self.sink.log(&format!(
                    "Attempting to use cookies from {} browser...",
                    auth.browser.as_str()
                )),
                CookieSource::File => self.sink.log("Attempting to use cookies from file..."),
            }
        }

        let info = self.extractor.extract_info(request.url(), &options).await?;
        self.sink.log(&format!("Title: {}", info.title));
        if let Some(duration) = info.duration {
            self.sink
                .log(&format!("Duration: {}", format_duration(duration)));
        }
        if info.age_limit > 0 {
            self.sink
                .log(&format!("Age restriction detected: {}+", info.age_limit));
            if !auth.enabled {
                // Advisory only; the download proceeds regardless.
                self.sink.log(
                    "Warning: This video is age-restricted. \
                     Consider enabling cookies for better success rate.",
                );
            }
        }

        self.sink.progress(ProgressEvent::new(
            Phase::Downloading,
            0.0,
            "Starting download...",
        ));
        self.sink.log("Starting download...");

        let sink = self.sink.clone();
        let hook: ProgressHook = Arc::new(move |raw| relay_progress(sink.as_ref(), raw));
        self.extractor.download(request.url(), &options, hook).await?;

        self.sink.progress(ProgressEvent::new(
            Phase::Finished,
            100.0,
            "Completed successfully!",
        ));
        self.sink.log("Download completed successfully!");
        if !request.quality().is_audio() {
            self.sink
                .log("Video saved in H.264 format for maximum compatibility!");
        }
        Ok(())
    }

    fn build_options(&self, request: &DownloadRequest) -> ExtractorOptions {
        let tier = request.quality();
        ExtractorOptions {
            format: Some(format_selector::format_for(tier).to_string()),
            output_template: Some(format!(
                "{}/%(title)s.%(ext)s",
                request.destination().display()
            )),
            merge_output_format: format_selector::merge_container_for(tier).map(String::from),
            postprocessors: format_selector::postprocessors_for(tier),
            cookies: self.cookies.derive_options(),
            quiet: true,
            no_warnings: true,
            ..Default::default()
        }
    }

    fn log_restriction_remediation(&self, auth_enabled: bool) {
        let bar = "=".repeat(50);
        self.sink.log(&format!("\n{}", bar));
        if !auth_enabled {
            self.sink
                .log("SUGGESTION: This appears to be an age-restricted video.");
            self.sink
                .log("Try enabling 'Use cookies for age-restricted videos' above.");
            self.sink
                .log("This will use your browser's login session to bypass the restriction.");
        } else {
            self.sink
                .log("Cookie authentication failed. This could be due to:");
            self.sink
                .log("1. You're not logged into YouTube in your browser");
            self.sink.log("2. Your browser cookies are outdated");
            self.sink
                .log("3. The selected browser doesn't have YouTube cookies");
            self.sink
                .log("Try logging into YouTube in your browser and retry.");
        }
        self.sink.log(&bar);
    }
}

/// Map a raw engine progress payload to a UI-facing event.
///
/// Percent uses the exact total when known, the estimate otherwise, and 0
/// when neither is available (the status string still shows downloaded
/// bytes). Estimated totals are prefixed with `~`.
pub fn relay_progress(sink: &dyn EventSink, raw: RawProgress) {
    match raw {
        RawProgress::Downloading {
            downloaded_bytes,
            total_bytes,
            total_bytes_estimate,
            speed,
        } => {
            let downloaded_mb = to_mb(downloaded_bytes);
            let (percent, mut status) = if let Some(total) = total_bytes {
                let percent = downloaded_bytes as f64 / total as f64 * 100.0;
                (
                    percent,
                    format!(
                        "Downloading: {:.1}% ({:.1}MB / {:.1}MB)",
                        percent,
                        downloaded_mb,
                        to_mb(total)
                    ),
                )
            } else if let Some(estimate) = total_bytes_estimate {
                let percent = downloaded_bytes as f64 / estimate as f64 * 100.0;
                (
                    percent,
                    format!(
                        "Downloading: {:.1}% ({:.1}MB / ~{:.1}MB)",
                        percent,
                        downloaded_mb,
                        to_mb(estimate)
                    ),
                )
            } else {
                (0.0, format!("Downloading: {:.1}MB", downloaded_mb))
            };

            if let Some(speed) = speed {
                status.push_str(&format!(" - {:.1} MB/s", speed / (1024.0 * 1024.0)));
            }

            sink.progress(ProgressEvent::new(
                Phase::Downloading,
                percent as f32,
                status,
            ));
        }
        RawProgress::Finished { filename } => {
            sink.progress(ProgressEvent::new(
                Phase::Downloading,
                100.0,
                "Download finished - Processing...",
            ));
            sink.log(&format!("Downloaded: {}", filename));
        }
        RawProgress::Error => {
            sink.progress(ProgressEvent::new(Phase::Failed, 0.0, "Download failed"));
        }
    }
}
