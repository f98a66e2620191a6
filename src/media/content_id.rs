//! Opaque ids for ContentDirectory objects and `/file`, `/thumb` URLs.
//!
//! An id is the absolute path, UTF-8 encoded, as unpadded URL-safe base64.
//! `"0"` is the virtual root and never decodes to a path.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

pub const ROOT_ID: &str = "0";

pub fn encode(path: &Path) -> String {
    URL_SAFE_NO_PAD.encode(path.to_string_lossy().as_bytes())
}

/// `None` for the root id, malformed base64, or non-UTF-8 payloads.
pub fn decode(id: &str) -> Option<PathBuf> {
    if id == ROOT_ID {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(id.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok().map(PathBuf::from)
}
