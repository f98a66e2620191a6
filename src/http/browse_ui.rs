//! Self-contained HTML pages for browsing shared folders from a web browser.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;

use crate::authority::{has_parent_token, PathAuthority};
use crate::error::{AppError, AppResult};
use crate::http::soap::xml_escape as html_escape;
use crate::http::state::AppState;
use crate::media::content_id;
use crate::media::entry::{self, format_size, MediaEntry};
use crate::media::mime::MediaKind;

const PAGE_STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #f0f2f5; margin: 0; padding: 20px 20px 80px; }
.header { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 10px; margin-bottom: 20px; }
h1 { margin: 0; font-size: 1.5rem; word-break: break-all; }
.btn { padding: 8px 14px; border: none; border-radius: 5px; cursor: pointer; color: #fff; text-decoration: none; display: inline-flex; gap: 5px; }
.btn-primary { background: #007bff; } .btn-secondary { background: #6c757d; } .btn-success { background: #28a745; }
.item { background: #fff; border-radius: 8px; box-shadow: 0 1px 3px rgba(0,0,0,.1); overflow: hidden; position: relative; cursor: pointer; }
.list { display: flex; flex-direction: column; gap: 10px; }
.list .item { display: flex; align-items: center; gap: 15px; padding: 10px; }
.list .preview { display: none; }
.list .details { flex-grow: 1; display: flex; align-items: center; justify-content: space-between; min-width: 0; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 15px; }
.grid .item { display: flex; flex-direction: column; aspect-ratio: 3/4; }
.grid .icon { display: none; }
.grid .check { position: absolute; top: 8px; left: 8px; }
.grid .preview { flex-grow: 1; background: #eee center/cover; display: flex; justify-content: center; align-items: center; font-size: 3em; }
.grid .details { padding: 10px; display: flex; flex-direction: column; gap: 8px; }
.name { color: #333; font-weight: 500; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; display: block; text-decoration: none; }
.meta { color: #888; font-size: .85em; }
.actions { display: flex; gap: 5px; }
#selection { position: fixed; bottom: 0; left: 0; right: 0; background: #333; color: #fff; padding: 15px; display: none; justify-content: space-between; align-items: center; }
"#;

const PAGE_SCRIPT: &str = r#"
const folder = document.body.dataset.path;
function toggleView() {
  const c = document.getElementById('entries');
  const mode = c.classList.contains('grid') ? 'list' : 'grid';
  c.className = mode;
  localStorage.setItem('viewMode', mode);
}
function updateSelection() {
  const n = document.querySelectorAll('.check:checked').length;
  document.getElementById('selection').style.display = n > 0 ? 'flex' : 'none';
  document.getElementById('selCount').innerText = n + ' selected';
}
function downloadSelected() {
  const names = Array.from(document.querySelectorAll('.check:checked')).map(c => c.value);
  if (names.length === 0) return;
  window.location = '/zip?path=' + folder + '&files=' + encodeURIComponent(names.join('|'));
}
function downloadAll() { window.location = '/zip?path=' + folder; }
function handleUpload(input) {
  if (input.files.length === 0) return;
  const form = new FormData();
  for (const f of input.files) form.append('files', f);
  fetch('/upload?path=' + folder, { method: 'POST', body: form })
    .then(r => { if (!r.ok) throw new Error(r.status); window.location.reload(); })
    .catch(() => alert('Upload failed'));
}
const saved = localStorage.getItem('viewMode');
if (saved) document.getElementById('entries').className = saved;
"#;

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub path: Option<String>,
}

fn url_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn folder_link(path: &Path) -> String {
    format!("/?path={}", url_encode(&path.to_string_lossy()))
}

fn icon(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Container => "📁",
        MediaKind::Video => "🎬",
        MediaKind::Audio => "🎵",
        MediaKind::Image => "🖼️",
        MediaKind::Other => "📄",
    }
}

fn page_head(title: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>{}</title><style>{}</style></head>",
        html_escape(title),
        PAGE_STYLE
    )
}

/// The landing page: one link per shared folder that exists.
pub fn render_virtual_root(authority: &PathAuthority) -> String {
    let mut html = page_head("Shared folders");
    html.push_str("<body><div class=\"header\"><h1>🖥️ Shared folders</h1></div><div class=\"list\">");
    let roots = authority.resolve_virtual_root();
    for root in &roots {
        let link = folder_link(&root.path);
        let _ = write!(
            html,
            "<div class=\"item\" onclick=\"window.location='{link}'\"><span class=\"icon\">💽</span>\
<div class=\"details\"><a class=\"name\" href=\"{link}\">{name}</a><span class=\"meta\">{path}</span></div></div>",
            link = html_escape(&link),
            name = html_escape(&root.name),
            path = html_escape(&root.path.to_string_lossy()),
        );
    }
    html.push_str("</div>");
    if authority.roots().is_empty() {
        html.push_str("<p>No folders are shared yet.</p>");
    }
    html.push_str("</body></html>");
    html
}

fn folder_entry(html: &mut String, link: &str, name: &str, meta: &str, symbol: &str) {
    let _ = write!(
        html,
        "<div class=\"item\" onclick=\"window.location='{link}'\"><div class=\"preview\">{symbol}</div>\
<span class=\"icon\">{symbol}</span><div class=\"details\"><div><a class=\"name\" href=\"{link}\">{name}</a>\
<span class=\"meta\">{meta}</span></div></div></div>",
        link = html_escape(link),
        name = html_escape(name),
    );
}

fn file_entry(html: &mut String, file: &MediaEntry) {
    let id = content_id::encode(&file.path);
    let url = format!("/file/{id}");
    let preview = if file.kind.is_media() {
        format!("<div class=\"preview\" style=\"background-image:url('/thumb/{id}')\"></div>")
    } else {
        format!("<div class=\"preview\">{}</div>", icon(file.kind))
    };
    let _ = write!(
        html,
        "<div class=\"item\"><input type=\"checkbox\" class=\"check\" value=\"{value}\" \
onclick=\"event.stopPropagation(); updateSelection()\">{preview}<span class=\"icon\">{icon}</span>\
<div class=\"details\"><div style=\"min-width:0\"><a class=\"name\" href=\"{url}\" target=\"_blank\">{name}</a>\
<span class=\"meta\">{size}</span></div><div class=\"actions\">\
<a class=\"btn btn-primary\" href=\"{url}\" target=\"_blank\" title=\"Play\">▶</a>\
<a class=\"btn btn-secondary\" href=\"{url}\" download title=\"Download\">⬇</a></div></div></div>",
        value = html_escape(&file.name),
        preview = preview,
        icon = icon(file.kind),
        url = url,
        name = html_escape(&file.name),
        size = format_size(file.size),
    );
}

/// Listing of one shared folder with upload, zip and per-file actions.
pub fn render_folder(authority: &PathAuthority, folder: &Path, entries: &[MediaEntry]) -> String {
    let title = entry::display_name(folder);
    let mut html = page_head(&title);
    let _ = write!(
        html,
        "<body data-path=\"{path}\"><div class=\"header\"><h1>📂 {title}</h1><div class=\"actions\">\
<input type=\"file\" id=\"picker\" multiple style=\"display:none\" onchange=\"handleUpload(this)\">\
<button class=\"btn btn-success\" onclick=\"document.getElementById('picker').click()\">⬆️ Upload</button>\
<button class=\"btn btn-primary\" onclick=\"downloadAll()\">📦 Zip</button>\
<button class=\"btn btn-secondary\" onclick=\"toggleView()\">👁 View</button></div></div>\
<div id=\"entries\" class=\"list\">",
        path = html_escape(&url_encode(&folder.to_string_lossy())),
        title = html_escape(&title),
    );

    let up_link = match folder.parent() {
        Some(parent) if authority.is_allowed(parent) => folder_link(parent),
        _ => "/".to_string(),
    };
    folder_entry(&mut html, &up_link, "..", "Go up", "⬆️");

    for e in entries {
        match e.kind {
            MediaKind::Container => {
                folder_entry(&mut html, &folder_link(&e.path), &e.name, "Folder", icon(e.kind))
            }
            _ => file_entry(&mut html, e),
        }
    }

    let _ = write!(
        html,
        "</div><div id=\"selection\"><span id=\"selCount\">0 selected</span>\
<button class=\"btn btn-success\" onclick=\"downloadSelected()\">📦 Download Selected</button></div>\
<script>{PAGE_SCRIPT}</script></body></html>"
    );
    html
}

/// GET /?path=<folder>
///
/// No path, or one carrying `..`, shows the virtual root. Folders outside the
/// shared roots are indistinguishable from missing ones.
pub async fn serve_page(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> AppResult<Html<String>> {
    let requested = query
        .path
        .filter(|p| !p.is_empty() && !has_parent_token(Path::new(p)))
        .map(PathBuf::from);

    let Some(folder) = requested else {
        return Ok(Html(render_virtual_root(&state.authority)));
    };

    let folder = state.authority.authorize(&folder).map_err(|_| AppError::NotFound)?;
    let authority = state.authority.clone();
    let page = tokio::task::spawn_blocking(move || {
        let entries = entry::list_directory(&folder).map_err(|_| AppError::NotFound)?;
        Ok::<_, AppError>(render_folder(&authority, &folder, &entries))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Html(page))
}
