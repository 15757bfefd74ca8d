//! Content sniffing for source images.
//!
//! The file extension decides whether a derivative *applies*; the encoded
//! bytes decide how it is *decoded*. A `.png` that is really a JPEG is
//! decoded as a JPEG, and a `.jpg` holding garbage is rejected here rather
//! than failing halfway through a decode.

use super::backend::ConversionError;
use image::{ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Pixel format of a source, as detected from its header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Jpeg,
    Png,
    Unsupported,
}

impl SourceKind {
    pub fn from_format(format: Option<ImageFormat>) -> Self {
        match format {
            Some(ImageFormat::Jpeg) => Self::Jpeg,
            Some(ImageFormat::Png) => Self::Png,
            _ => Self::Unsupported,
        }
    }

    /// Sniff an in-memory header.
    pub fn from_bytes(header: &[u8]) -> Self {
        Self::from_format(image::guess_format(header).ok())
    }

    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Jpeg => Some("image/jpeg"),
            Self::Png => Some("image/png"),
            Self::Unsupported => None,
        }
    }
}

/// Open `path` and detect its format from content alone.
///
/// The reader starts with no format hint, so the extension is never
/// consulted. The returned reader is positioned at the start of the file and
/// ready to decode.
///
/// Failing to open the file is an I/O error. Once open, a header that cannot
/// be read is treated like an unrecognized one.
pub fn open_sniffed(
    path: &Path,
) -> Result<(SourceKind, ImageReader<BufReader<File>>), ConversionError> {
    let file = File::open(path)?;
    let reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(|e| {
            ConversionError::UnsupportedFormat(format!(
                "{}: cannot read header: {}",
                path.display(),
                e
            ))
        })?;
    let kind = SourceKind::from_format(reader.format());
    Ok((kind, reader))
}
