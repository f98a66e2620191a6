//! The security boundary: only paths under a configured shared root are
//! ever touched on disk.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::AppError;
use crate::media::entry::MediaEntry;

#[derive(Debug, Clone)]
pub struct PathAuthority {
    roots: Arc<Vec<PathBuf>>,
}

impl PathAuthority {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots: Arc::new(roots) }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// True iff `path` starts with one of the shared roots, compared as
    /// strings ignoring case.
    pub fn is_allowed(&self, path: &Path) -> bool {
        let candidate = path.to_string_lossy().to_lowercase();
        self.roots
            .iter()
            .any(|root| candidate.starts_with(&root.to_string_lossy().to_lowercase()))
    }

    /// Gate every filesystem access goes through. Rejects traversal tokens as
    /// well as paths outside the roots.
    pub fn authorize(&self, path: &Path) -> Result<PathBuf, AppError> {
        if has_parent_token(path) || !self.is_allowed(path) {
            tracing::debug!("rejected path outside shared folders");
            return Err(AppError::Forbidden);
        }
        Ok(path.to_path_buf())
    }

    /// One container entry per shared root that still exists on disk.
    pub fn resolve_virtual_root(&self) -> Vec<MediaEntry> {
        self.roots
            .iter()
            .filter(|root| root.is_dir())
            .map(|root| MediaEntry::container(root.clone()))
            .collect()
    }
}

pub fn has_parent_token(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}
