use std::path::Path;

/// What a browsable entry is, as far as players are concerned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Container,
    Video,
    Audio,
    Image,
    Other,
}

impl MediaKind {
    /// Kind follows the MIME prefix.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video/") {
            MediaKind::Video
        } else if mime.starts_with("audio/") {
            MediaKind::Audio
        } else if mime.starts_with("image/") {
            MediaKind::Image
        } else {
            MediaKind::Other
        }
    }

    pub fn is_media(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Audio | MediaKind::Image)
    }

    /// UPnP class for a DIDL-Lite element of this kind.
    pub fn upnp_class(self) -> &'static str {
        match self {
            MediaKind::Container => "object.container.storageFolder",
            MediaKind::Video => "object.item.videoItem",
            MediaKind::Audio => "object.item.audioItem",
            MediaKind::Image => "object.item.imageItem",
            MediaKind::Other => "object.item",
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    Some(path.extension()?.to_str()?.to_ascii_lowercase())
}

/// Content-Type for a file, matched case-insensitively on the extension.
pub fn mime_for(path: &Path) -> &'static str {
    let Some(ext) = extension(path) else {
        return "application/octet-stream";
    };
    match ext.as_str() {
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "wmv" => "video/x-ms-wmv",

        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",

        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",

        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "zip" => "application/zip",
        "html" | "htm" => "text/html",

        _ => "application/octet-stream",
    }
}

/// Classify a file into its kind and MIME type.
pub fn classify(path: &Path) -> (MediaKind, &'static str) {
    let mime = mime_for(path);
    (MediaKind::from_mime(mime), mime)
}

/// Files that show up as ContentDirectory items and get thumbnails in the UI.
pub fn is_media(path: &Path) -> bool {
    classify(path).0.is_media()
}
