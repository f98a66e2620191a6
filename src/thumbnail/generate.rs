//! Producing preview bytes for each kind of source file.

use std::path::Path;
use std::process::Stdio;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use lofty::prelude::*;
use tokio::process::Command;

use super::ThumbnailError;

pub const IMAGE_WIDTH: u32 = 200;
pub const VIDEO_WIDTH: u32 = 300;
const JPEG_QUALITY: u8 = 85;
const SNAPSHOT_OFFSET_SECS: &str = "5";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Image,
    Audio,
    Video,
}

impl SourceKind {
    /// Which pipeline handles a file, by lowercase extension. `None` means no
    /// thumbnail is ever produced for it.
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "bmp" | "webp" => Some(SourceKind::Image),
            "mp3" | "flac" | "ogg" | "m4a" => Some(SourceKind::Audio),
            "mp4" | "mkv" | "avi" | "mov" | "webm" => Some(SourceKind::Video),
            _ => None,
        }
    }
}

/// Decode, scale to `width` keeping the aspect ratio, re-encode as JPEG.
pub fn resize_to_width(bytes: &[u8], width: u32) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let height = (u64::from(img.height()) * u64::from(width) / u64::from(img.width().max(1))).max(1);
    let resized = img.resize_exact(width, height as u32, FilterType::Triangle);
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
    Ok(out)
}

/// Image sources fall back to the untouched file when they cannot be decoded.
pub async fn image_thumbnail(path: &Path) -> Result<Vec<u8>, ThumbnailError> {
    let original = tokio::fs::read(path).await?;
    let resized = tokio::task::spawn_blocking(move || {
        let result = resize_to_width(&original, IMAGE_WIDTH);
        (result, original)
    })
    .await?;
    match resized {
        (Ok(bytes), _) => Ok(bytes),
        (Err(e), original) => {
            tracing::warn!("image resize failed, sending original: {}", e);
            Ok(original)
        }
    }
}

fn read_embedded_art(path: &Path) -> Result<Vec<u8>, ThumbnailError> {
    let tagged = lofty::read_from_path(path)?;
    tagged
        .primary_tag()
        .or_else(|| tagged.first_tag())
        .and_then(|tag| tag.pictures().first())
        .map(|picture| picture.data().to_vec())
        .ok_or(ThumbnailError::NoArtwork)
}

/// First picture embedded in the audio file's tags.
pub async fn audio_artwork(path: &Path) -> Result<Vec<u8>, ThumbnailError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_embedded_art(&path)).await?
}

/// Grab one frame five seconds in with `ffmpeg`, then scale it down. The
/// temporary frame file is removed whatever happens.
pub async fn video_snapshot(ffmpeg: &Path, path: &Path) -> Result<Vec<u8>, ThumbnailError> {
    let frame = std::env::temp_dir().join(format!("localstream_{}.jpg", uuid::Uuid::new_v4()));
    let result = capture_frame(ffmpeg, path, &frame).await;
    if let Err(e) = tokio::fs::remove_file(&frame).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!("could not remove snapshot temp file: {}", e);
        }
    }
    result
}

async fn capture_frame(ffmpeg: &Path, source: &Path, frame: &Path) -> Result<Vec<u8>, ThumbnailError> {
    let output = Command::new(ffmpeg)
        .args(["-hide_banner", "-loglevel", "error", "-ss", SNAPSHOT_OFFSET_SECS, "-i"])
        .arg(source)
        .args(["-frames:v", "1", "-y"])
        .arg(frame)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ThumbnailError::Snapshot(format!("cannot run {}: {}", ffmpeg.display(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ThumbnailError::Snapshot(stderr.trim().to_string()));
    }

    let captured = tokio::fs::read(frame).await?;
    let resized = tokio::task::spawn_blocking(move || resize_to_width(&captured, VIDEO_WIDTH)).await??;
    Ok(resized)
}
