use std::path::{Path, PathBuf};

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::authority::has_parent_token;
use crate::error::{AppError, AppResult};
use crate::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub path: Option<String>,
}

/// Reduce a client-supplied filename to its last component. Empty names and
/// dot entries are refused.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

fn suffixed_name(name: &str, attempt: u32) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
    let suffix = if attempt > 1 {
        format!("{stamp}_{attempt}")
    } else {
        stamp.to_string()
    };
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}_{}.{}",
            stem.to_string_lossy(),
            suffix,
            ext.to_string_lossy()
        ),
        _ => format!("{name}_{suffix}"),
    }
}

/// Create `name` inside `folder` without ever replacing an existing file. On
/// collision a timestamp suffix is added before the extension.
pub async fn create_unique(folder: &Path, name: &str) -> std::io::Result<(PathBuf, tokio::fs::File)> {
    let mut attempt = 0u32;
    loop {
        let candidate = if attempt == 0 {
            folder.join(name)
        } else {
            folder.join(suffixed_name(name, attempt))
        };
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 16 => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// POST /upload?path=<folder>
///
/// Each multipart part carrying a filename is streamed straight to disk.
pub async fn upload_files(
    State(state): State<AppState>,
    Query(query): Query<FolderQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, String)> {
    let raw = query.path.unwrap_or_default();
    if raw.is_empty() || has_parent_token(Path::new(&raw)) {
        tracing::warn!("upload blocked: invalid destination");
        return Err(AppError::Forbidden);
    }
    let folder = state.authority.authorize(Path::new(&raw))?;
    if !tokio::fs::metadata(&folder).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(AppError::NotFound);
    }
    let mut multipart = multipart.map_err(|_| AppError::UnsupportedMediaType)?;

    let mut saved = Vec::new();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("malformed multipart body"))?
    {
        let Some(name) = field.file_name().and_then(sanitize_file_name) else {
            continue;
        };
        let (dest, mut file) = create_unique(&folder, &name).await?;

        let written = async {
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| AppError::BadRequest("upload interrupted"))?
            {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<(), AppError>(())
        }
        .await;

        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(e);
        }
        tracing::info!("uploaded {}", dest.display());
        saved.push(crate::media::entry::display_name(&dest));
    }

    Ok((StatusCode::OK, format!("uploaded {} file(s): {}", saved.len(), saved.join(", "))))
}
