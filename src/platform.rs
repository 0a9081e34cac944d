// Desktop integration helpers: revealing downloaded files in the system
// file manager and picking a sensible default destination.

use std::path::{Path, PathBuf};

use crate::downloader::utils::hidden_command;

/// The user's Downloads directory, falling back to a relative `downloads`
/// folder when the platform does not report one.
pub fn default_download_folder() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("./downloads"))
}

fn opener_for_folder() -> &'static str {
    if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

/// Open `path` in the platform file manager. Returns false when the path
/// does not exist or the opener could not be spawned.
pub async fn open_folder(path: &Path) -> bool {
    if !path.is_dir() {
        tracing::warn!("cannot open folder, not a directory: {:?}", path);
        return false;
    }
    spawn_opener(path).await
}

/// Open a single file with its default application.
pub async fn open_file(path: &Path) -> bool {
    if !path.is_file() {
        tracing::warn!("cannot open file, does not exist: {:?}", path);
        return false;
    }
    spawn_opener(path).await
}

async fn spawn_opener(path: &Path) -> bool {
    let opener = opener_for_folder();
    match hidden_command(opener).arg(path).spawn() {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!("failed to spawn {}: {}", opener, err);
            false
        }
    }
}
