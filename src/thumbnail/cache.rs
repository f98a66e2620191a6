//! On-disk thumbnail cache: `<cache-dir>/<sha256(path)>.jpg`.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};

pub const MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const MAX_BYTES: u64 = 500 * 1024 * 1024;

/// Stable key for a source file: lowercase hex SHA-256 of its absolute path.
pub fn cache_key(source: &Path) -> String {
    let digest = Sha256::digest(source.to_string_lossy().as_bytes());
    hex::encode(digest)
}

pub fn cache_path(cache_dir: &Path, source: &Path) -> PathBuf {
    cache_dir.join(format!("{}.jpg", cache_key(source)))
}

/// Cached bytes for `source`, if any. Read errors count as a miss.
pub async fn read(cache_dir: &Path, source: &Path) -> Option<Vec<u8>> {
    tokio::fs::read(cache_path(cache_dir, source)).await.ok()
}

/// Best-effort store; a failed write only costs a regeneration later.
pub async fn write(cache_dir: &Path, source: &Path, bytes: &[u8]) {
    if let Err(e) = tokio::fs::create_dir_all(cache_dir).await {
        tracing::debug!("thumbnail cache dir unavailable: {}", e);
        return;
    }
    if let Err(e) = tokio::fs::write(cache_path(cache_dir, source), bytes).await {
        tracing::debug!("thumbnail cache write failed: {}", e);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvictionReport {
    pub removed: usize,
    pub remaining_bytes: u64,
}

struct CachedFile {
    path: PathBuf,
    len: u64,
    accessed: SystemTime,
}

/// One eviction pass over `cache_dir`.
///
/// Files last written more than `max_age` ago are deleted first. If the rest
/// still adds up to more than `max_bytes`, files are deleted in order of
/// oldest last access until the total drops below `max_bytes`. Nothing is
/// touched when the directory is already within both bounds.
pub fn evict(cache_dir: &Path, max_age: Duration, max_bytes: u64) -> std::io::Result<EvictionReport> {
    let now = SystemTime::now();
    let mut report = EvictionReport::default();
    let mut kept = Vec::new();

    for dirent in std::fs::read_dir(cache_dir)? {
        let Ok(dirent) = dirent else { continue };
        let Ok(meta) = dirent.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(now);
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            match std::fs::remove_file(dirent.path()) {
                Ok(()) => report.removed += 1,
                Err(e) => tracing::debug!("could not remove stale thumbnail: {}", e),
            }
            continue;
        }
        kept.push(CachedFile {
            path: dirent.path(),
            len: meta.len(),
            accessed: meta.accessed().unwrap_or(modified),
        });
    }

    let mut total: u64 = kept.iter().map(|f| f.len).sum();
    if total > max_bytes {
        kept.sort_by_key(|f| f.accessed);
        for file in &kept {
            if std::fs::remove_file(&file.path).is_ok() {
                report.removed += 1;
                total -= file.len;
                if total < max_bytes {
                    break;
                }
            }
        }
    }

    report.remaining_bytes = total;
    Ok(report)
}

/// Runs [`evict`] with the default bounds on a blocking thread, detached from
/// the caller.
pub fn spawn_eviction(cache_dir: PathBuf) {
    tokio::task::spawn_blocking(move || {
        if !cache_dir.is_dir() {
            return;
        }
        match evict(&cache_dir, MAX_AGE, MAX_BYTES) {
            Ok(report) => tracing::info!(
                "thumbnail cache cleaned: {} removed, {} MB in use",
                report.removed,
                report.remaining_bytes / 1024 / 1024
            ),
            Err(e) => tracing::warn!("thumbnail cache cleanup failed: {}", e),
        }
    });
}
