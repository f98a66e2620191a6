//! Zip export. The archive is written on a blocking thread into an in-memory
//! pipe whose read half is the response body, so nothing is staged on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio_util::io::{ReaderStream, SyncIoBridge};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::authority::has_parent_token;
use crate::error::{AppError, AppResult};
use crate::http::state::AppState;
use crate::http::upload::sanitize_file_name;
use crate::media::entry::{self, display_name};
use crate::media::mime::MediaKind;

const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct ZipQuery {
    pub path: Option<String>,
    /// `|`-separated file names inside `path`.
    pub files: Option<String>,
}

/// Files to pack: the named subset, or every regular file directly in the
/// folder when no subset is given.
fn select_files(folder: &Path, files: Option<&str>) -> std::io::Result<Vec<PathBuf>> {
    match files.filter(|f| !f.is_empty()) {
        Some(list) => Ok(list
            .split('|')
            .filter_map(sanitize_file_name)
            .map(|name| folder.join(name))
            .collect()),
        None => Ok(entry::list_directory(folder)?
            .into_iter()
            .filter(|e| e.kind != MediaKind::Container)
            .map(|e| e.path)
            .collect()),
    }
}

/// Write every still-present regular file into a streamed zip.
pub fn write_archive<W: Write>(out: W, files: &[PathBuf]) -> zip::result::ZipResult<()> {
    let mut zip = ZipWriter::new_stream(out);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    for path in files {
        // vanished or replaced since listing
        let Ok(mut source) = std::fs::File::open(path) else {
            continue;
        };
        if !source.metadata().map(|m| m.is_file()).unwrap_or(false) {
            continue;
        }
        zip.start_file(display_name(path), options)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    let mut stream = zip.finish()?;
    stream.flush()?;
    Ok(())
}

/// GET /zip?path=<folder>[&files=a|b]
pub async fn serve_zip(
    State(state): State<AppState>,
    Query(query): Query<ZipQuery>,
) -> AppResult<Response> {
    let raw = query.path.unwrap_or_default();
    if raw.is_empty() || has_parent_token(Path::new(&raw)) {
        return Err(AppError::BadRequest("missing or invalid folder"));
    }
    let folder = state.authority.authorize(Path::new(&raw))?;
    if !folder.is_dir() {
        return Err(AppError::NotFound);
    }
    let files = select_files(&folder, query.files.as_deref())?;
    tracing::info!("zipping {} file(s) from {}", files.len(), folder.display());

    let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
    let bridge = SyncIoBridge::new(writer);
    tokio::task::spawn_blocking(move || {
        if let Err(e) = write_archive(bridge, &files) {
            // usually the client went away mid-download
            tracing::debug!("zip stream ended early: {}", e);
        }
    });

    let disposition = format!(
        "attachment; filename=\"Download_{}.zip\"",
        chrono::Local::now().format("%Y%m%d%H%M%S")
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(reader)),
    )
        .into_response())
}
