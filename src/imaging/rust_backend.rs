//! Pure Rust conversion pipeline plus libwebp for the lossy WebP encode.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Sniff | `image::ImageReader::with_guessed_format` (header bytes only) |
//! | Decode (JPEG, PNG) | `image` crate decoders |
//! | Palette / grey → truecolor | `DynamicImage::into_rgb8` / `into_rgba8` |
//! | Downscale | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → WebP | `webp::Encoder::encode_simple` (lossy, alpha plane kept) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Publish | `tempfile` in the destination dir, then atomic rename |
//!
//! Every buffer in the pipeline is owned by a local, so decode and encode
//! memory is released on every exit path, success or not.

use super::backend::{ConversionError, ImageConverter};
use super::calculations::fit_within;
use super::params::{ConvertParams, DerivativeFormat, Quality};
use super::sniff::{SourceKind, open_sniffed};
use image::codecs::avif::AvifEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use std::io::Write;
use std::path::Path;

/// Production converter.
///
/// See the [module docs](self) for the crate-to-step mapping.
pub struct RustConverter;

impl RustConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoded source pixels, normalized for the encoder.
///
/// JPEG has no alpha and stays RGB. PNG is always expanded to RGBA so that
/// palette, greyscale and tRNS transparency all reach the encoder as a real
/// alpha channel.
enum Pixels {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl Pixels {
    fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Rgb(buf) => buf.dimensions(),
            Self::Rgba(buf) => buf.dimensions(),
        }
    }

    fn downscale(self, max_edge: Option<u32>) -> Self {
        let Some((w, h)) = max_edge.and_then(|edge| fit_within(self.dimensions(), edge)) else {
            return self;
        };
        match self {
            Self::Rgb(buf) => Self::Rgb(imageops::resize(&buf, w, h, FilterType::Lanczos3)),
            Self::Rgba(buf) => Self::Rgba(imageops::resize(&buf, w, h, FilterType::Lanczos3)),
        }
    }
}

/// Sniff and decode a source image.
fn decode(path: &Path) -> Result<Pixels, ConversionError> {
    let (kind, reader) = open_sniffed(path)?;
    let decode_failed =
        |e: image::ImageError| ConversionError::Decode(format!("{}: {}", path.display(), e));

    match kind {
        SourceKind::Jpeg => Ok(Pixels::Rgb(reader.decode().map_err(decode_failed)?.into_rgb8())),
        SourceKind::Png => Ok(Pixels::Rgba(
            reader.decode().map_err(decode_failed)?.into_rgba8(),
        )),
        SourceKind::Unsupported => Err(ConversionError::UnsupportedFormat(format!(
            "{} is not a JPEG or PNG",
            path.display()
        ))),
    }
}

/// Lossy WebP via libwebp. RGBA input keeps its alpha plane.
fn encode_webp(pixels: &Pixels, quality: Quality) -> Result<Vec<u8>, ConversionError> {
    let (w, h) = pixels.dimensions();
    let encoder = match pixels {
        Pixels::Rgb(buf) => webp::Encoder::from_rgb(buf.as_raw(), w, h),
        Pixels::Rgba(buf) => webp::Encoder::from_rgba(buf.as_raw(), w, h),
    };
    let memory = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| ConversionError::Encode(format!("WebP encode failed: {e:?}")))?;
    Ok(memory.to_vec())
}

/// AVIF via rav1e (speed 6 for reasonable throughput).
fn encode_avif(pixels: &Pixels, quality: Quality) -> Result<Vec<u8>, ConversionError> {
    let (w, h) = pixels.dimensions();
    let mut bytes = Vec::new();
    // rav1e has no quality 0
    let encoder =
        AvifEncoder::new_with_speed_quality(&mut bytes, 6, quality.value().clamp(1, 100) as u8);
    let written = match pixels {
        Pixels::Rgb(buf) => encoder.write_image(buf.as_raw(), w, h, ExtendedColorType::Rgb8),
        Pixels::Rgba(buf) => encoder.write_image(buf.as_raw(), w, h, ExtendedColorType::Rgba8),
    };
    written.map_err(|e| ConversionError::Encode(format!("AVIF encode failed: {e}")))?;
    Ok(bytes)
}

/// Write `bytes` to a temp file beside `output`, then rename it into place.
///
/// Readers see either no file or the complete file. On any error the temp
/// file is dropped, which deletes it.
fn publish(bytes: &[u8], output: &Path) -> Result<(), ConversionError> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".derivative-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(output).map_err(|e| ConversionError::Io(e.error))?;
    Ok(())
}

impl ImageConverter for RustConverter {
    fn supports(&self, format: DerivativeFormat) -> bool {
        match format {
            // libwebp is linked in unconditionally
            DerivativeFormat::WebP => true,
            DerivativeFormat::Avif => format.image_format().writing_enabled(),
        }
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), ConversionError> {
        let pixels = decode(&params.source)?.downscale(params.max_edge);

        let bytes = match params.format {
            DerivativeFormat::WebP => encode_webp(&pixels, params.quality)?,
            DerivativeFormat::Avif => encode_avif(&pixels, params.quality)?,
        };
        drop(pixels);

        if bytes.is_empty() {
            return Err(ConversionError::Encode(format!(
                "{} encoder produced no output",
                params.format.extension()
            )));
        }
        publish(&bytes, &params.output)
    }
}
