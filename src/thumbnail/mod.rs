//! Small JPEG previews for the browse UI and `albumArtURI`.

pub mod cache;
pub mod generate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;

use generate::SourceKind;

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("source file does not exist")]
    SourceMissing,

    #[error("no thumbnail for this file type")]
    Unsupported,

    #[error("no embedded artwork")]
    NoArtwork,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),

    #[error("snapshot failed: {0}")]
    Snapshot(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Looks up and fills the thumbnail cache.
///
/// Video snapshots spawn an external process and are gated to one at a time;
/// everything else runs fully concurrently. Two requests racing on the same
/// uncached file both generate and the later write wins, which is harmless as
/// the output is deterministic.
#[derive(Debug, Clone)]
pub struct ThumbnailService {
    cache_dir: PathBuf,
    ffmpeg: PathBuf,
    video_gate: Arc<Semaphore>,
}

impl ThumbnailService {
    pub fn new(cache_dir: PathBuf, ffmpeg: PathBuf) -> Self {
        Self {
            cache_dir,
            ffmpeg,
            video_gate: Arc::new(Semaphore::new(1)),
        }
    }

    pub async fn get_thumbnail(&self, source: &Path) -> Result<Vec<u8>, ThumbnailError> {
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(ThumbnailError::SourceMissing);
        }

        if let Some(bytes) = cache::read(&self.cache_dir, source).await {
            tracing::debug!("thumbnail cache hit");
            return Ok(bytes);
        }

        let bytes = match SourceKind::of(source).ok_or(ThumbnailError::Unsupported)? {
            SourceKind::Image => generate::image_thumbnail(source).await?,
            SourceKind::Audio => generate::audio_artwork(source).await?,
            SourceKind::Video => {
                let _permit = self
                    .video_gate
                    .acquire()
                    .await
                    .map_err(|e| ThumbnailError::Snapshot(e.to_string()))?;
                generate::video_snapshot(&self.ffmpeg, source).await?
            }
        };

        cache::write(&self.cache_dir, source, &bytes).await;
        Ok(bytes)
    }
}
