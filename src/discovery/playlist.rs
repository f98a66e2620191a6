use std::fmt::Write as _;
use std::path::PathBuf;

use super::RemoteEntry;

/// Extended M3U for every entry that has a media URL.
pub fn render_m3u(entries: &[RemoteEntry]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for entry in entries {
        let Some(url) = entry.url.as_deref() else { continue };
        let title = entry.title.replace(['\r', '\n'], " ");
        let _ = writeln!(out, "#EXTINF:-1,{title}");
        let _ = writeln!(out, "{url}");
    }
    out
}

/// Write the playlist to the temp directory for an external player.
pub async fn write_m3u(entries: &[RemoteEntry]) -> std::io::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!(
        "localstream_{}.m3u",
        chrono::Utc::now().timestamp_millis()
    ));
    tokio::fs::write(&path, render_m3u(entries)).await?;
    Ok(path)
}
