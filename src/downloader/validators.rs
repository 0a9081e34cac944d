// Input validation: URLs, paths, quality tiers, cookie files.
//
// Pure classification over raw user input. The only I/O here is filesystem
// existence/writability checks for path-valued inputs.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::models::QualityTier;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a URL")]
    EmptyUrl,
    #[error("Please enter a valid YouTube URL")]
    InvalidUrl,
    #[error("Playlist URLs are not supported yet")]
    PlaylistUrl,
    #[error("Please enter a directory path")]
    EmptyPath,
    #[error("Directory is not writable")]
    DirectoryNotWritable,
    #[error("Cannot create directory at this path")]
    DirectoryNotCreatable,
    #[error("Please select a cookie file")]
    EmptyCookiePath,
    #[error("Cookie file does not exist")]
    CookieFileMissing,
    #[error("Cookie file is empty")]
    CookieFileEmpty,
    #[error("Invalid quality. Must be one of: best, 1080p, 720p, audio")]
    InvalidQuality,
}

lazy_static! {
    static ref VIDEO_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)^(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})").unwrap(),
        Regex::new(r"(?i)^(?:https?://)?(?:www\.)?youtube\.com/embed/([a-zA-Z0-9_-]{11})").unwrap(),
        Regex::new(r"(?i)^(?:https?://)?youtu\.be/([a-zA-Z0-9_-]{11})").unwrap(),
        Regex::new(r"(?i)^(?:https?://)?(?:www\.)?youtube\.com/v/([a-zA-Z0-9_-]{11})").unwrap(),
        Regex::new(r"(?i)^(?:https?://)?(?:m\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})").unwrap(),
    ];
    static ref PLAYLIST_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)^(?:https?://)?(?:www\.)?youtube\.com/playlist\?list=([a-zA-Z0-9_-]+)").unwrap(),
        Regex::new(r"(?i)^(?:https?://)?(?:www\.)?youtube\.com/watch\?.*list=([a-zA-Z0-9_-]+)").unwrap(),
    ];
}

fn matches_video(url: &str) -> bool {
    VIDEO_PATTERNS.iter().any(|p| p.is_match(url))
}

fn matches_playlist(url: &str) -> bool {
    PLAYLIST_PATTERNS.iter().any(|p| p.is_match(url))
}

/// Classify a raw URL string.
///
/// Playlist rejection takes precedence: a watch URL carrying both a video id
/// and a `list=` query parameter is rejected as a playlist, since downloading
/// it would not do what the address implies.
pub fn validate_url(raw: &str) -> Result<(), ValidationError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    if !matches_video(url) && !matches_playlist(url) {
        return Err(ValidationError::InvalidUrl);
    }
    if matches_playlist(url) {
        return Err(ValidationError::PlaylistUrl);
    }
    Ok(())
}

/// Pull the 11-character video id out of a recognized single-video URL.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let url = raw.trim();
    for pattern in VIDEO_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(url) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

/// Outcome of a successful output-directory validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryStatus {
    /// Directory exists and is writable
    Exists,
    /// Directory is absent but its parent is writable, so it will be created
    WillBeCreated,
}

fn dir_is_writable(path: &Path) -> bool {
    // No portable access(2) in std; probe with a throwaway file instead.
    let probe = path.join(format!(".tubedl_write_probe_{}", std::process::id()));
    match fs::OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

/// Validate a destination directory for downloads.
pub fn validate_output_directory(raw: &str) -> Result<DirectoryStatus, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    let path = Path::new(trimmed);

    if path.is_dir() {
        if dir_is_writable(path) {
            return Ok(DirectoryStatus::Exists);
        }
        return Err(ValidationError::DirectoryNotWritable);
    }
    if path.exists() {
        // Exists but is not a directory
        return Err(ValidationError::DirectoryNotCreatable);
    }

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            if parent.is_dir() && dir_is_writable(parent) {
                Ok(DirectoryStatus::WillBeCreated)
            } else {
                Err(ValidationError::DirectoryNotCreatable)
            }
        }
        // Bare relative name: created under the working directory
        _ => Ok(DirectoryStatus::WillBeCreated),
    }
}

/// Validate a quality tier name against the four fixed presets.
pub fn validate_quality(raw: &str) -> Result<QualityTier, ValidationError> {
    QualityTier::from_name(raw).ok_or(ValidationError::InvalidQuality)
}

/// Validate a cookie jar path: must exist, be a regular file, and be nonempty.
pub fn validate_cookie_file(raw: &str) -> Result<(), ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyCookiePath);
    }
    let path = Path::new(trimmed);
    let meta = fs::metadata(path).map_err(|_| ValidationError::CookieFileMissing)?;
    if !meta.is_file() {
        return Err(ValidationError::CookieFileMissing);
    }
    if meta.len() == 0 {
        return Err(ValidationError::CookieFileEmpty);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accepts_all_video_url_shapes() {
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://youtube.com/watch?v=dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
        ];
        for url in urls {
            assert_eq!(validate_url(url), Ok(()), "should accept {}", url);
        }
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!(validate_url(""), Err(ValidationError::EmptyUrl));
        assert_eq!(validate_url("   "), Err(ValidationError::EmptyUrl));
        assert_eq!(validate_url("not a url"), Err(ValidationError::InvalidUrl));
        assert_eq!(
            validate_url("https://vimeo.com/12345"),
            Err(ValidationError::InvalidUrl)
        );
        // Too-short video id
        assert_eq!(
            validate_url("https://www.youtube.com/watch?v=short"),
            Err(ValidationError::InvalidUrl)
        );
    }

    #[test]
    fn rejects_playlists_with_specific_reason() {
        assert_eq!(
            validate_url("https://www.youtube.com/playlist?list=PLabc123_xyz"),
            Err(ValidationError::PlaylistUrl)
        );
    }

    #[test]
    fn watch_url_with_list_param_counts_as_playlist() {
        // Documented precedence: the list= parameter wins over the video id.
        assert_eq!(
            validate_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLabc123"),
            Err(ValidationError::PlaylistUrl)
        );
    }

    #[test]
    fn video_id_extraction() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(extract_video_id("https://example.com"), None);
    }

    #[test]
    fn quality_accepts_exactly_four_tiers() {
        assert_eq!(validate_quality("best"), Ok(QualityTier::Best));
        assert_eq!(validate_quality("1080p"), Ok(QualityTier::High1080));
        assert_eq!(validate_quality("720p"), Ok(QualityTier::High720));
        assert_eq!(validate_quality("audio"), Ok(QualityTier::AudioOnly));
        for bad in ["", "Best", "AUDIO", "480p", "bestest"] {
            assert_eq!(
                validate_quality(bad),
                Err(ValidationError::InvalidQuality),
                "should reject {:?}",
                bad
            );
        }
    }

    #[test]
    fn output_directory_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().to_string_lossy().to_string();
        assert_eq!(
            validate_output_directory(&existing),
            Ok(DirectoryStatus::Exists)
        );

        let child = dir.path().join("new_subdir");
        assert_eq!(
            validate_output_directory(&child.to_string_lossy()),
            Ok(DirectoryStatus::WillBeCreated)
        );

        let orphan = dir.path().join("missing_parent").join("child");
        assert_eq!(
            validate_output_directory(&orphan.to_string_lossy()),
            Err(ValidationError::DirectoryNotCreatable)
        );

        assert_eq!(
            validate_output_directory(""),
            Err(ValidationError::EmptyPath)
        );
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_directory_is_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        let result = validate_output_directory(&locked.to_string_lossy());
        // Root ignores mode bits; skip the assertion when running privileged.
        if nix_is_unprivileged() {
            assert_eq!(result, Err(ValidationError::DirectoryNotWritable));
        }

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    fn nix_is_unprivileged() -> bool {
        !std::path::Path::new("/proc/self").exists()
            || std::fs::metadata("/proc/self")
                .map(|m| {
                    use std::os::unix::fs::MetadataExt;
                    m.uid() != 0
                })
                .unwrap_or(true)
    }

    #[test]
    fn cookie_file_matrix() {
        assert_eq!(
            validate_cookie_file(""),
            Err(ValidationError::EmptyCookiePath)
        );
        assert_eq!(
            validate_cookie_file("/definitely/not/here.txt"),
            Err(ValidationError::CookieFileMissing)
        );

        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.txt");
        std::fs::File::create(&empty).unwrap();
        assert_eq!(
            validate_cookie_file(&empty.to_string_lossy()),
            Err(ValidationError::CookieFileEmpty)
        );

        let full = dir.path().join("cookies.txt");
        let mut f = std::fs::File::create(&full).unwrap();
        writeln!(f, "# Netscape HTTP Cookie File").unwrap();
        assert_eq!(validate_cookie_file(&full.to_string_lossy()), Ok(()));
    }
}
