//! Image conversion: sniff, decode, normalize, encode, publish.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Sniff** | `image::ImageReader::with_guessed_format` |
//! | **Decode** | `image` JPEG/PNG decoders |
//! | **Downscale** | Lanczos3 (optional, `max_edge`) |
//! | **Encode** | libwebp (WebP) or rav1e (AVIF) |
//! | **Publish** | temp file + atomic rename |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a conversion
//! - **Sniff**: Content-based source format detection
//! - **Backend**: [`ImageConverter`] trait + [`RustConverter`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;
pub mod sniff;

pub use backend::{ConversionError, ImageConverter};
pub use calculations::fit_within;
pub use params::{ConvertParams, DerivativeFormat, Quality};
pub use rust_backend::RustConverter;
pub use sniff::SourceKind;
