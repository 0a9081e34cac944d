// yt-dlp subprocess implementation of the extraction-engine contract.
//
// Metadata comes from `--dump-json`; downloads stream structured progress
// lines produced by `--progress-template` and are parsed into RawProgress
// for the orchestrator's relay.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use super::errors::DownloadError;
use super::models::{
    CookieDirective, ExtractorOptions, MediaInfo, PostProcessor, RawProgress,
};
use super::traits::{MediaExtractor, ProgressHook};
use super::utils::hidden_command;

/// Structured progress line marker. Fields are pipe-separated; yt-dlp
/// renders unavailable fields as "NA".
const PROGRESS_TEMPLATE: &str =
    "download:PROGRESS|%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.speed)s|%(progress.filename)s";

// Find the yt-dlp executable in common install locations, then PATH.
fn find_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp",
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
    ];

    for path in common_paths {
        if Path::new(path).exists() {
            return path.to_string();
        }
    }

    let exe = if cfg!(windows) { "yt-dlp.exe" } else { "yt-dlp" };
    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(exe);
            if candidate.is_file() {
                return candidate.to_string_lossy().to_string();
            }
        }
    }

    // Last resort: hope it's in PATH
    "yt-dlp".to_string()
}

fn cookie_args(options: &ExtractorOptions) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(jar) = &options.cookie_jar_out {
        args.push("--cookies".to_string());
        args.push(jar.to_string_lossy().to_string());
    }
    match &options.cookies {
        Some(CookieDirective::FromBrowser(browser)) => {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.as_str().to_string());
        }
        Some(CookieDirective::FromFile(path)) => {
            // The jar-out path doubles as the read path; avoid passing
            // --cookies twice.
            if options.cookie_jar_out.is_none() {
                args.push("--cookies".to_string());
                args.push(path.to_string_lossy().to_string());
            }
        }
        None => {}
    }
    args
}

fn build_info_args(url: &str, options: &ExtractorOptions) -> Vec<String> {
    let mut args = vec![
        "--dump-json".to_string(),
        "--no-playlist".to_string(),
        "--skip-download".to_string(),
    ];
    if options.quiet {
        args.push("-q".to_string());
    }
    if options.no_warnings {
        args.push("--no-warnings".to_string());
    }
    if options.extract_flat {
        args.push("--flat-playlist".to_string());
    }
    args.extend(cookie_args(options));
    args.push(url.to_string());
    args
}

fn build_download_args(url: &str, options: &ExtractorOptions) -> Vec<String> {
    let mut args = vec!["--no-playlist".to_string(), "--newline".to_string()];
    args.push("--progress-template".to_string());
    args.push(PROGRESS_TEMPLATE.to_string());

    if let Some(format) = &options.format {
        args.push("-f".to_string());
        args.push(format.clone());
    }
    if let Some(template) = &options.output_template {
        args.push("-o".to_string());
        args.push(template.clone());
    }
    if let Some(container) = &options.merge_output_format {
        args.push("--merge-output-format".to_string());
        args.push(container.clone());
    }
    if options.no_warnings {
        args.push("--no-warnings".to_string());
    }

    for step in &options.postprocessors {
        match step {
            PostProcessor::ConvertVideo { container } => {
                args.push("--recode-video".to_string());
                args.push(container.clone());
            }
            PostProcessor::ExtractAudio { codec, bitrate } => {
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push(codec.clone());
                args.push("--audio-quality".to_string());
                args.push(format!("{}K", bitrate));
            }
        }
    }

    args.extend(cookie_args(options));
    args.push(url.to_string());
    args
}

fn parse_na_u64(field: &str) -> Option<u64> {
    // Byte counters can arrive as floats
    field.parse::<f64>().ok().map(|v| v as u64)
}

/// Parse one structured progress line. Returns None for lines that are not
/// progress output.
fn parse_progress_line(line: &str) -> Option<RawProgress> {
    let payload = line.trim().strip_prefix("PROGRESS|")?;
    let fields: Vec<&str> = payload.split('|').collect();
    if fields.len() < 6 {
        return None;
    }

    match fields[0] {
        "downloading" => Some(RawProgress::Downloading {
            downloaded_bytes: parse_na_u64(fields[1]).unwrap_or(0),
            total_bytes: parse_na_u64(fields[2]),
            total_bytes_estimate: parse_na_u64(fields[3]),
            speed: fields[4].parse::<f64>().ok(),
        }),
        "finished" => Some(RawProgress::Finished {
            filename: fields[5].to_string(),
        }),
        "error" => Some(RawProgress::Error),
        _ => None,
    }
}

fn parse_media_info(stdout: &[u8]) -> Result<MediaInfo, DownloadError> {
    let raw = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| DownloadError::Parse(format!("Failed to parse JSON: {}", e)))?;

    Ok(MediaInfo {
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        duration: json["duration"].as_f64().map(|d| d as u64),
        age_limit: json["age_limit"].as_u64().unwrap_or(0) as u32,
    })
}

fn classify_failure(stderr: &str) -> DownloadError {
    let message = stderr.trim().to_string();
    if message.contains("not found") || message.contains("No such file") {
        return DownloadError::ToolNotFound(message);
    }
    // Everything the engine itself reports is the distinguished
    // download-class failure; the raw text feeds remediation heuristics.
    DownloadError::Download(message)
}

pub struct YtDlpExtractor {
    binary: String,
}

impl YtDlpExtractor {
    pub fn new() -> Self {
        Self {
            binary: find_ytdlp(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractorOptions,
    ) -> Result<MediaInfo, DownloadError> {
        let args = build_info_args(url, options);
        tracing::debug!("running {} {:?}", self.binary, args);

        let output = hidden_command(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                DownloadError::Execution(format!("Failed to start {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }
        parse_media_info(&output.stdout)
    }

    async fn download(
        &self,
        url: &str,
        options: &ExtractorOptions,
        hook: ProgressHook,
    ) -> Result<(), DownloadError> {
        let args = build_download_args(url, options);
        tracing::debug!("running {} {:?}", self.binary, args);

        let mut child = hidden_command(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DownloadError::Execution(format!("Failed to start {}: {}", self.binary, e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Execution("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Execution("Failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(raw) = parse_progress_line(&line) {
                hook(raw);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::Execution(format!("Process error: {}", e)))?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(classify_failure(&stderr_output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::cookies::Browser;
    use crate::downloader::models::QualityTier;
    use crate::downloader::format_selector;
    use std::path::PathBuf;

    fn video_options(tier: QualityTier) -> ExtractorOptions {
        ExtractorOptions {
            format: Some(format_selector::format_for(tier).to_string()),
            output_template: Some("/downloads/%(title)s.%(ext)s".to_string()),
            merge_output_format: format_selector::merge_container_for(tier).map(String::from),
            postprocessors: format_selector::postprocessors_for(tier),
            no_warnings: true,
            ..Default::default()
        }
    }

    #[test]
    fn download_args_for_video_tier() {
        let args = build_download_args(
            "https://youtu.be/dQw4w9WgXcQ",
            &video_options(QualityTier::High1080),
        );
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--newline".to_string()));
        assert!(args.contains(&"--merge-output-format".to_string()));
        assert!(args.contains(&"mp4".to_string()));
        assert!(args.contains(&"--recode-video".to_string()));
        assert!(!args.contains(&"-x".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn download_args_for_audio_tier() {
        let args = build_download_args(
            "https://youtu.be/dQw4w9WgXcQ",
            &video_options(QualityTier::AudioOnly),
        );
        assert!(args.contains(&"-x".to_string()));
        assert!(args.contains(&"--audio-format".to_string()));
        assert!(args.contains(&"mp3".to_string()));
        assert!(args.contains(&"192K".to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
        assert!(!args.contains(&"--recode-video".to_string()));
    }

    #[test]
    fn cookie_directives_map_to_flags() {
        let mut options = video_options(QualityTier::Best);
        options.cookies = Some(CookieDirective::FromBrowser(Browser::Safari));
        let args = build_download_args("u", &options);
        let pos = args
            .iter()
            .position(|a| a == "--cookies-from-browser")
            .unwrap();
        assert_eq!(args[pos + 1], "safari");

        options.cookies = Some(CookieDirective::FromFile(PathBuf::from("/tmp/jar.txt")));
        let args = build_download_args("u", &options);
        let pos = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[pos + 1], "/tmp/jar.txt");
    }

    #[test]
    fn export_options_combine_jar_out_with_browser() {
        let options = ExtractorOptions {
            cookies: Some(CookieDirective::FromBrowser(Browser::Chrome)),
            cookie_jar_out: Some(PathBuf::from("/tmp/out.txt")),
            skip_download: true,
            extract_flat: true,
            ..Default::default()
        };
        let args = build_info_args("https://youtu.be/dQw4w9WgXcQ", &options);
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.contains(&"--flat-playlist".to_string()));
        assert!(args.contains(&"--cookies".to_string()));
        assert!(args.contains(&"--cookies-from-browser".to_string()));
    }

    #[test]
    fn info_args_are_metadata_only() {
        let options = ExtractorOptions {
            no_warnings: true,
            ..Default::default()
        };
        let args = build_info_args("https://youtu.be/dQw4w9WgXcQ", &options);
        assert!(args.contains(&"--dump-json".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.contains(&"--no-warnings".to_string()));
        assert!(!args.contains(&"--newline".to_string()));
    }

    #[test]
    fn progress_line_downloading() {
        let line = "PROGRESS|downloading|1048576|10485760|NA|524288.0|video.mp4.part";
        match parse_progress_line(line).unwrap() {
            RawProgress::Downloading {
                downloaded_bytes,
                total_bytes,
                total_bytes_estimate,
                speed,
            } => {
                assert_eq!(downloaded_bytes, 1_048_576);
                assert_eq!(total_bytes, Some(10_485_760));
                assert_eq!(total_bytes_estimate, None);
                assert_eq!(speed, Some(524_288.0));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn progress_line_with_estimate_only() {
        let line = "PROGRESS|downloading|2097152.0|NA|8388608.0|NA|clip.webm";
        match parse_progress_line(line).unwrap() {
            RawProgress::Downloading {
                total_bytes,
                total_bytes_estimate,
                speed,
                ..
            } => {
                assert_eq!(total_bytes, None);
                assert_eq!(total_bytes_estimate, Some(8_388_608));
                assert_eq!(speed, None);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn progress_line_finished_carries_filename() {
        let line = "PROGRESS|finished|10485760|10485760|NA|NA|My Video.mp4";
        match parse_progress_line(line).unwrap() {
            RawProgress::Finished { filename } => assert_eq!(filename, "My Video.mp4"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn non_progress_lines_are_ignored() {
        assert!(parse_progress_line("[download] Destination: foo.mp4").is_none());
        assert!(parse_progress_line("").is_none());
        assert!(parse_progress_line("PROGRESS|bogus|1|2|3|4|5").is_none());
    }

    #[test]
    fn media_info_parsing() {
        let json = br#"{"title": "Never Gonna Give You Up", "duration": 213.0, "age_limit": 0}"#;
        let info = parse_media_info(json).unwrap();
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.duration, Some(213));
        assert_eq!(info.age_limit, 0);
    }

    #[test]
    fn media_info_defaults_for_missing_fields() {
        let info = parse_media_info(br#"{"age_limit": 18}"#).unwrap();
        assert_eq!(info.title, "Unknown");
        assert_eq!(info.duration, None);
        assert_eq!(info.age_limit, 18);
    }

    #[test]
    fn media_info_rejects_garbage() {
        assert!(matches!(
            parse_media_info(b"not json"),
            Err(DownloadError::Parse(_))
        ));
    }

    #[test]
    fn failure_classification() {
        assert!(matches!(
            classify_failure("yt-dlp: command not found"),
            DownloadError::ToolNotFound(_)
        ));
        assert!(matches!(
            classify_failure("ERROR: Sign in to confirm your age"),
            DownloadError::Download(_)
        ));
    }
}
