//! Centralized source → derivative filename mapping.
//!
//! A derivative always lives next to its source and shares its stem; only
//! the extension changes:
//!
//! - `uploads/2024/photo.JPG` → `uploads/2024/photo.webp`
//! - `logo.png` → `logo.webp`
//! - `anim.gif` → no derivative
//!
//! Everything here is a pure path transformation. Nothing touches the
//! filesystem, so the same input always yields the same output.
//!
//! ## Stem collisions
//!
//! `photo.jpg` and `photo.png` in one directory both map to `photo.webp`.
//! Whichever is converted first owns the derivative and later requests for
//! the other source get it as a cache hit. The mapping assumes at most one
//! source per stem per directory.

use crate::imaging::DerivativeFormat;
use std::path::{Path, PathBuf};

/// Extensions eligible for a derivative, lowercase, with their MIME type.
const SOURCE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
];

fn mime_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    SOURCE_EXTENSIONS
        .iter()
        .find(|(known, _)| ext.eq_ignore_ascii_case(known))
        .map(|(_, mime)| *mime)
}

/// Whether `path` has an extension a derivative can be made from.
pub fn is_eligible(path: &Path) -> bool {
    mime_for_extension(path).is_some()
}

/// An original image as supplied by the caller.
///
/// The MIME type is inferred from the extension only and is `None` for
/// anything other than JPEG or PNG. The real encoded format is sniffed later
/// by the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImageRef {
    path: PathBuf,
    mime_type: Option<&'static str>,
}

impl SourceImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = mime_for_extension(&path);
        Self { path, mime_type }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        self.mime_type
    }
}

/// Where the derivative of a source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeRef {
    path: PathBuf,
    format: DerivativeFormat,
}

impl DerivativeRef {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DerivativeFormat {
        self.format
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Map a source to its derivative path, or `None` if no derivative applies.
pub fn derive_path(source: &SourceImageRef, format: DerivativeFormat) -> Option<DerivativeRef> {
    source.mime_type?;
    Some(DerivativeRef {
        path: source.path.with_extension(format.extension()),
        format,
    })
}
