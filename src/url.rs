//! Mapping between public URLs and filesystem paths.
//!
//! Where a site serves its uploads from is a deployment detail, not part of
//! the cache. Callers inject a [`UrlMapper`]; [`SiteRootMapper`] covers the
//! common case of a base URL mounted on a document root:
//!
//! ```text
//! https://example.org/wp-content/uploads/photo.jpg
//! └──── base_url ────┘└──────── relative ────────┘
//!                     ↕
//! /var/www/html/      wp-content/uploads/photo.jpg
//! └──── root ──┘
//! ```

use std::path::{Component, Path, PathBuf};

/// Bidirectional URL ↔ path resolution.
pub trait UrlMapper: Sync {
    /// Filesystem path for a public URL, or `None` if the URL is not served
    /// from local files.
    fn url_to_path(&self, url: &str) -> Option<PathBuf>;

    /// Public URL for a filesystem path, or `None` if the path is outside the
    /// served tree.
    fn path_to_url(&self, path: &Path) -> Option<String>;
}

/// Prefix mapping from a base URL onto a document root.
#[derive(Debug, Clone)]
pub struct SiteRootMapper {
    base_url: String,
    root: PathBuf,
}

impl SiteRootMapper {
    /// `base_url` is normalized to end with exactly one `/`.
    pub fn new(base_url: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        base_url.push('/');
        Self {
            base_url,
            root: root.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl UrlMapper for SiteRootMapper {
    fn url_to_path(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(&self.base_url)?;
        // Query strings and fragments never name a file
        let relative = relative.split(['?', '#']).next().unwrap_or_default();
        if relative.is_empty() {
            return None;
        }

        let mut path = self.root.clone();
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return None;
            }
            path.push(segment);
        }
        Some(path)
    }

    fn path_to_url(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(s) => segments.push(s.to_str()?),
                _ => return None,
            }
        }
        if segments.is_empty() {
            return None;
        }
        Some(format!("{}{}", self.base_url, segments.join("/")))
    }
}
