//! Image converter trait and shared error type.
//!
//! The [`ImageConverter`] trait defines the two things the cache needs from
//! an encoder: a capability query and a conversion.
//!
//! The production implementation is
//! [`RustConverter`](super::rust_backend::RustConverter). Tests use the
//! recording `MockConverter` defined below.

use super::params::{ConvertParams, DerivativeFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Trait for derivative converters.
///
/// `convert` must either publish a complete file at `params.output` or leave
/// nothing there. It must never modify `params.source`.
pub trait ImageConverter: Sync {
    /// Whether this environment can encode `format` at all.
    fn supports(&self, format: DerivativeFormat) -> bool;

    /// Decode `params.source` and write the encoded derivative.
    fn convert(&self, params: &ConvertParams) -> Result<(), ConversionError>;
}
