// Authentication-cookie management.
//
// Owns the AuthConfig state machine: off / browser-derived / file-derived.
// Downloads read a derived directive snapshot; the only external mutation is
// the browser export flow flipping the source to File on success.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::config::Settings;

use super::models::{CookieDirective, ExtractorOptions, Phase, ProgressEvent};
use super::traits::{EventSink, MediaExtractor};
use super::validators;

/// Always-public video used to drive the engine's cookie extraction without
/// downloading anything.
const EXPORT_REFERENCE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Grace period for the engine to finish writing the jar file.
const EXPORT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Browsers the extraction engine can pull live cookies from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Firefox,
    Edge,
    Safari,
    Opera,
}

impl Browser {
    pub const ALL: [Browser; 5] = [
        Browser::Chrome,
        Browser::Firefox,
        Browser::Edge,
        Browser::Safari,
        Browser::Opera,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "edge",
            Browser::Safari => "safari",
            Browser::Opera => "opera",
        }
    }

    pub fn from_name(name: &str) -> Option<Browser> {
        match name.to_lowercase().as_str() {
            "chrome" => Some(Browser::Chrome),
            "firefox" => Some(Browser::Firefox),
            "edge" => Some(Browser::Edge),
            "safari" => Some(Browser::Safari),
            "opera" => Some(Browser::Opera),
            _ => None,
        }
    }
}

pub fn is_browser_supported(name: &str) -> bool {
    Browser::from_name(name).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSource {
    Browser,
    File,
}

/// The authentication configuration. Held exclusively by `CookieStore`.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    pub source: CookieSource,
    pub browser: Browser,
    pub file_path: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source: CookieSource::Browser,
            browser: Browser::Chrome,
            file_path: None,
        }
    }
}

/// Failure classes of the browser export flow.
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// Precondition failure, distinct from extraction trouble
    #[error("Unsupported browser: {0}")]
    UnsupportedBrowser(String),

    /// The engine raised during extraction
    #[error("{0}")]
    Extraction(String),

    /// Extraction finished but no nonempty jar file appeared
    #[error("Cookie file was not created or is empty")]
    FileNotWritten,
}

pub struct CookieStore {
    config: Mutex<AuthConfig>,
    sink: Arc<dyn EventSink>,
}

impl CookieStore {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            config: Mutex::new(AuthConfig::default()),
            sink,
        }
    }

    /// Replace the configuration. Pure mutation, no I/O.
    pub fn configure(
        &self,
        enabled: bool,
        source: CookieSource,
        browser: Browser,
        file_path: Option<PathBuf>,
    ) {
        let mut config = self.config.lock().unwrap();
        *config = AuthConfig {
            enabled,
            source,
            browser,
            file_path,
        };
    }

    /// Point-in-time copy of the configuration.
    pub fn snapshot(&self) -> AuthConfig {
        self.config.lock().unwrap().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.lock().unwrap().enabled
    }

    /// Initialize from persisted settings. An unrecognized browser name falls
    /// back to the default with a warning rather than failing startup.
    pub fn load_from_settings(&self, settings: &Settings) {
        let browser = match Browser::from_name(&settings.browser_choice) {
            Some(b) => b,
            None => {
                tracing::warn!(
                    "unrecognized browser_choice {:?}, falling back to chrome",
                    settings.browser_choice
                );
                Browser::Chrome
            }
        };
        let source = if settings.cookie_source == "file" {
            CookieSource::File
        } else {
            CookieSource::Browser
        };
        let file_path = if settings.cookie_file_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&settings.cookie_file_path))
        };
        self.configure(settings.use_cookies, source, browser, file_path);
    }

    /// Write the current configuration back into a settings mapping.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        let config = self.snapshot();
        settings.use_cookies = config.enabled;
        settings.cookie_source = match config.source {
            CookieSource::Browser => "browser".to_string(),
            CookieSource::File => "file".to_string(),
        };
        settings.browser_choice = config.browser.as_str().to_string();
        settings.cookie_file_path = config
            .file_path
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
    }

    /// Materialize the configuration into an engine directive.
    ///
    /// A missing or empty cookie file degrades to unauthenticated operation:
    /// a warning goes to the sink and no directive is derived, so the
    /// download proceeds rather than failing fast.
    pub fn derive_options(&self) -> Option<CookieDirective> {
        let config = self.snapshot();
        if !config.enabled {
            return None;
        }
        match config.source {
            CookieSource::Browser => {
                self.sink.log(&format!(
                    "Using cookies from {} browser",
                    config.browser.as_str()
                ));
                Some(CookieDirective::FromBrowser(config.browser))
            }
            CookieSource::File => {
                let path = config.file_path.as_deref().unwrap_or(Path::new(""));
                match validators::validate_cookie_file(&path.to_string_lossy()) {
                    Ok(()) => {
                        self.sink
                            .log(&format!("Using cookies from file: {}", path.display()));
                        Some(CookieDirective::FromFile(path.to_path_buf()))
                    }
                    Err(_) => {
                        self.sink
                            .log("Warning: Cookie file not found or not specified");
                        None
                    }
                }
            }
        }
    }

    /// Export the named browser's cookies to a portable jar file.
    ///
    /// Drives the engine against a fixed public URL with skip-download set;
    /// the engine persists the jar as a side effect. On success the
    /// configuration switches to the File source pointing at the new jar.
    pub async fn export_from_browser(
        &self,
        extractor: &dyn MediaExtractor,
        browser_name: &str,
        destination: &Path,
    ) -> Result<(), ExportError> {
        let browser = Browser::from_name(browser_name)
            .ok_or_else(|| ExportError::UnsupportedBrowser(browser_name.to_string()))?;

        self.sink.progress(ProgressEvent::new(
            Phase::Extracting,
            0.0,
            format!("Extracting cookies from {}...", browser.as_str()),
        ));
        self.sink
            .log(&format!("Exporting cookies from {}...", browser.as_str()));

        let options = ExtractorOptions {
            cookies: Some(CookieDirective::FromBrowser(browser)),
            cookie_jar_out: Some(destination.to_path_buf()),
            skip_download: true,
            extract_flat: true,
            ..Default::default()
        };

        if let Err(err) = extractor.extract_info(EXPORT_REFERENCE_URL, &options).await {
            let message = err.to_string();
            self.sink.progress(ProgressEvent::new(
                Phase::Failed,
                0.0,
                "Cookie export failed",
            ));
            self.sink.log(&format!("Error exporting cookies: {}", message));
            return Err(ExportError::Extraction(message));
        }

        // Give the engine a moment to finish writing the jar file.
        tokio::time::sleep(EXPORT_SETTLE_DELAY).await;

        let size = std::fs::metadata(destination).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            self.sink.progress(ProgressEvent::new(
                Phase::Failed,
                0.0,
                "Cookie export failed",
            ));
            self.sink
                .log("Error exporting cookies: Cookie file was not created or is empty");
            return Err(ExportError::FileNotWritten);
        }

        self.sink.progress(ProgressEvent::new(
            Phase::Finished,
            100.0,
            "Cookies exported successfully!",
        ));
        self.sink
            .log(&format!("Cookies exported to: {}", destination.display()));
        self.sink.log(&format!("Cookie file size: {} bytes", size));

        // The one cross-component mutation: downloads now use the new jar.
        {
            let mut config = self.config.lock().unwrap();
            config.browser = browser;
            config.source = CookieSource::File;
            config.file_path = Some(destination.to_path_buf());
        }

        Ok(())
    }

    /// Remediation text for a failed export.
    pub fn export_remediation(&self, error_text: &str) -> String {
        let browser = self.snapshot().browser;
        let name = browser.as_str();
        if error_text.to_lowercase().contains("browser") {
            format!(
                "Failed to export cookies from {name}:\n\n\
                 Common solutions:\n\
                 1. Make sure {name} is installed\n\
                 2. Make sure you're logged into YouTube in {name}\n\
                 3. Close {name} completely and try again\n\
                 4. Try a different browser\n\n\
                 Error details: {error_text}"
            )
        } else {
            format!("Failed to export cookies:\n{error_text}")
        }
    }
}
