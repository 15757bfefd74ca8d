//! Parameter types for derivative conversion.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between the [`cache`](crate::cache) manager (which decides
//! whether a derivative must be created) and the
//! [`backend`](super::backend) (which does the pixel work). Keeping them
//! separate lets tests swap in a recording converter without touching the
//! cache logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (0–100, default 80). Clamped on construction.
//! - [`DerivativeFormat`]: The encoded format of a derivative (WebP or AVIF).
//! - [`ConvertParams`]: Full specification for one conversion: source, output, format, quality, optional size cap.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality setting for lossy derivative encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Encoded format of a derivative file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeFormat {
    #[default]
    WebP,
    Avif,
}

impl DerivativeFormat {
    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    pub(crate) fn image_format(self) -> ImageFormat {
        match self {
            Self::WebP => ImageFormat::WebP,
            Self::Avif => ImageFormat::Avif,
        }
    }
}

/// Parameters for a single source → derivative conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: DerivativeFormat,
    pub quality: Quality,
    /// Longest allowed edge. Larger sources are downscaled, smaller ones are
    /// never upscaled.
    pub max_edge: Option<u32>,
}
