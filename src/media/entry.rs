//! Files and folders as they are exposed to browsers and players. Nothing
//! here is persisted; every listing reads the filesystem again.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::media::mime::{self, MediaKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub path: PathBuf,
    pub name: String,
    pub kind: MediaKind,
    pub size: u64,
    pub mime: &'static str,
}

impl MediaEntry {
    pub fn container(path: PathBuf) -> Self {
        let name = display_name(&path);
        Self {
            path,
            name,
            kind: MediaKind::Container,
            size: 0,
            mime: "inode/directory",
        }
    }

    pub fn file(path: PathBuf, size: u64) -> Self {
        let (kind, mime) = mime::classify(&path);
        let name = display_name(&path);
        Self { path, name, kind, size, mime }
    }

    /// Filename without its extension, used as the DIDL-Lite title.
    pub fn title(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Last path component, or the whole path for filesystem roots like `C:\`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Subfolders followed by files, each group sorted by name ignoring case.
/// Entries whose metadata cannot be read are left out.
pub fn list_directory(dir: &Path) -> std::io::Result<Vec<MediaEntry>> {
    let mut folders = Vec::new();
    let mut files = Vec::new();
    for dirent in std::fs::read_dir(dir)? {
        let Ok(dirent) = dirent else { continue };
        let Ok(meta) = dirent.metadata() else { continue };
        if meta.is_dir() {
            folders.push(MediaEntry::container(dirent.path()));
        } else if meta.is_file() {
            files.push(MediaEntry::file(dirent.path(), meta.len()));
        }
    }
    folders.sort_by_key(|e| e.name.to_lowercase());
    files.sort_by_key(|e| e.name.to_lowercase());
    folders.extend(files);
    Ok(folders)
}

/// Every media file below `dir`. Subtrees that cannot be read (permission
/// denied, vanished while walking) are skipped.
pub fn walk_media(dir: &Path) -> Vec<MediaEntry> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && mime::is_media(e.path()))
        .filter_map(|e| {
            let size = e.metadata().ok()?.len();
            Some(MediaEntry::file(e.into_path(), size))
        })
        .collect()
}

/// Human-readable size: B, KB, MB, GB, TB with up to two decimals.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[unit])
}
