use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use http_range_header::parse_range_header;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::http::state::AppState;
use crate::media::{content_id, entry, mime};

// DLNA.ORG_OP=01: byte seek supported, time seek not supported
// DLNA.ORG_CI=0: content is not transcoded
// DLNA.ORG_FLAGS: streaming + background transfer + connection stall + DLNA 1.5
pub const DLNA_CONTENT_FEATURES: &str =
    "DLNA.ORG_OP=01;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=01700000000000000000000000000000";
const DLNA_TRANSFER_MODE: &str = "Streaming";
const CHUNK_SIZE: usize = 64 * 1024;

struct ServedFile {
    path: PathBuf,
    size: u64,
    mime: &'static str,
    name: String,
}

/// Decode the id, check it against the shared roots, and make sure it is a
/// regular file. Undecodable ids are simply unknown.
async fn resolve_file(state: &AppState, id: &str) -> AppResult<ServedFile> {
    let path = content_id::decode(id).ok_or(AppError::NotFound)?;
    let path = state.authority.authorize(&path)?;
    let meta = tokio::fs::metadata(&path).await.map_err(|_| AppError::NotFound)?;
    if !meta.is_file() {
        return Err(AppError::NotFound);
    }
    Ok(ServedFile {
        mime: mime::mime_for(&path),
        name: entry::display_name(&path),
        size: meta.len(),
        path,
    })
}

/// `inline; filename="..."`, switching to the RFC 5987 form for names that
/// cannot go into a header verbatim.
fn content_disposition(name: &str) -> HeaderValue {
    let plain = format!("inline; filename=\"{name}\"");
    if name.is_ascii() && !name.contains('"') {
        if let Ok(value) = HeaderValue::from_str(&plain) {
            return value;
        }
    }
    let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    let encoded = encoded.replace('+', "%20");
    HeaderValue::from_str(&format!("inline; filename*=UTF-8''{encoded}"))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

fn dlna_headers(file: &ServedFile, length: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(file.mime));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&file.name));
    headers.insert(
        HeaderName::from_static("transfermode.dlna.org"),
        HeaderValue::from_static(DLNA_TRANSFER_MODE),
    );
    headers.insert(
        HeaderName::from_static("contentfeatures.dlna.org"),
        HeaderValue::from_static(DLNA_CONTENT_FEATURES),
    );
    headers
}

/// Last-byte position written in the first range of the header, if any.
/// Suffix ranges (`bytes=-n`) carry a length, not a position.
fn explicit_end(range: &str) -> Option<u64> {
    let first = range.trim().strip_prefix("bytes=")?.split(',').next()?;
    let (start, end) = first.split_once('-')?;
    if start.trim().is_empty() {
        return None;
    }
    end.trim().parse().ok()
}

/// Byte span to send for a request, inclusive on both ends.
///
/// `None` means a plain 200 with the whole file. A Range header always
/// produces a span: the first range when it lies inside the file, otherwise
/// the whole file. An end past EOF counts as out of bounds and is not
/// clamped. Streaming clients send speculative ranges, so a bad range is
/// never an error.
pub fn requested_span(range: Option<&str>, size: u64) -> Option<(u64, u64)> {
    let range = range?;
    if size == 0 {
        return None;
    }
    let first = parse_range_header(range)
        .ok()
        .and_then(|parsed| parsed.validate(size).ok())
        .and_then(|ranges| ranges.into_iter().next())
        .filter(|_| explicit_end(range).map_or(true, |end| end < size));
    match first {
        Some(r) => Some((*r.start(), *r.end())),
        None => {
            tracing::debug!("unusable range {:?}, sending whole file", range);
            Some((0, size - 1))
        }
    }
}

/// HEAD /file/{id}: headers only, the file is not opened.
pub async fn serve_file_head(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let file = resolve_file(&state, &id).await?;
    Ok((StatusCode::OK, dlna_headers(&file, file.size)).into_response())
}

/// GET /file/{id}: stream the file, or one byte range of it.
pub async fn serve_file_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req_headers: HeaderMap,
) -> AppResult<Response> {
    let file = resolve_file(&state, &id).await?;
    let range = req_headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());

    let mut handle = tokio::fs::File::open(&file.path).await?;

    let Some((start, end)) = requested_span(range, file.size) else {
        tracing::info!("serving {} ({} bytes)", file.name, file.size);
        let headers = dlna_headers(&file, file.size);
        let body = Body::from_stream(ReaderStream::with_capacity(handle, CHUNK_SIZE));
        return Ok((StatusCode::OK, headers, body).into_response());
    };

    let length = end - start + 1;
    handle.seek(std::io::SeekFrom::Start(start)).await?;
    tracing::debug!("serving {} bytes {}-{}/{}", file.name, start, end, file.size);

    let mut headers = dlna_headers(&file, length);
    let content_range = format!("bytes {}-{}/{}", start, end, file.size);
    headers.insert(
        header::CONTENT_RANGE,
        HeaderValue::from_str(&content_range)
            .map_err(|e| AppError::Internal(e.to_string()))?,
    );

    let body = Body::from_stream(ReaderStream::with_capacity(handle.take(length), CHUNK_SIZE));
    Ok((StatusCode::PARTIAL_CONTENT, headers, body).into_response())
}
