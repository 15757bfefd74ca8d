//! Derivative cache: existence check, convert on miss, typed outcome.
//!
//! Encoding is the expensive part of serving an image. This module makes
//! sure it happens at most once per source: the first request converts and
//! publishes the derivative next to the source, every later request finds it
//! with a single `stat`.
//!
//! # Design
//!
//! The cache is **path-addressed**: the derivative's location is a pure
//! function of the source path ([`derive_path`]), so the filesystem itself is
//! the index. There is no manifest to load, no lock, and nothing is ever
//! evicted. A derivative made from an older version of a source stays in
//! place until someone deletes it.
//!
//! A request resolves, in order:
//!
//! 1. Encoder unavailable for the configured format → `Unsupported`
//! 2. Source extension not JPEG/PNG → `Unsupported`
//! 3. Derivative already on disk as a regular file → `AlreadyExists`
//! 4. Source missing → `Failed(MissingSource)`
//! 5. Parent directory created (idempotent), converter invoked → `Created`
//!    or `Failed`
//!
//! ## Races
//!
//! Steps 3 and 5 are a check-then-act pair. Two concurrent callers can both
//! miss and both convert. Conversion is deterministic and the converter
//! publishes by atomic rename, so the second write replaces the first with
//! equivalent bytes and no reader ever sees a partial file.
//!
//! ## Failures
//!
//! [`DerivativeCache::get_or_create`] never returns an error and never
//! panics; every branch resolves to a [`ConversionOutcome`]. Callers are
//! expected to serve the original image on anything but `Created` or
//! `AlreadyExists`.

use crate::config::DerivativesConfig;
use crate::imaging::{
    ConversionError, ConvertParams, DerivativeFormat, ImageConverter, Quality, RustConverter,
};
use crate::naming::{DerivativeRef, SourceImageRef, derive_path};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Why a conversion did not produce a derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    MissingSource,
    UnsupportedFormat(String),
    Decode(String),
    Encode(String),
    Io(String),
}

impl FailureReason {
    /// Environment failures (directory creation, writes) as opposed to
    /// problems with the image itself.
    pub fn is_environmental(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSource => write!(f, "source missing"),
            Self::UnsupportedFormat(msg) => write!(f, "unsupported format: {msg}"),
            Self::Decode(msg) => write!(f, "decode failed: {msg}"),
            Self::Encode(msg) => write!(f, "encode failed: {msg}"),
            Self::Io(msg) => write!(f, "filesystem error: {msg}"),
        }
    }
}

impl From<ConversionError> for FailureReason {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Io(e) => Self::Io(e.to_string()),
            ConversionError::UnsupportedFormat(msg) => Self::UnsupportedFormat(msg),
            ConversionError::Decode(msg) => Self::Decode(msg),
            ConversionError::Encode(msg) => Self::Encode(msg),
        }
    }
}

/// Result of a cache request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Created(DerivativeRef),
    AlreadyExists(DerivativeRef),
    Unsupported,
    Failed(FailureReason),
}

impl ConversionOutcome {
    /// The usable derivative, if there is one.
    pub fn derivative(&self) -> Option<&DerivativeRef> {
        match self {
            Self::Created(d) | Self::AlreadyExists(d) => Some(d),
            Self::Unsupported | Self::Failed(_) => None,
        }
    }

    pub fn into_derivative(self) -> Option<DerivativeRef> {
        match self {
            Self::Created(d) | Self::AlreadyExists(d) => Some(d),
            Self::Unsupported | Self::Failed(_) => None,
        }
    }
}

/// Creates derivatives on demand and reuses them afterwards.
pub struct DerivativeCache<C = RustConverter> {
    converter: C,
    format: DerivativeFormat,
    max_edge: Option<u32>,
}

impl DerivativeCache<RustConverter> {
    pub fn new(config: &DerivativesConfig) -> Self {
        Self::with_converter(RustConverter::new(), config)
    }
}

impl<C: ImageConverter> DerivativeCache<C> {
    /// Build a cache around a specific converter (allows testing with mock).
    pub fn with_converter(converter: C, config: &DerivativesConfig) -> Self {
        Self {
            converter,
            format: config.format,
            max_edge: config.max_edge,
        }
    }

    pub fn format(&self) -> DerivativeFormat {
        self.format
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Whether this environment can produce derivatives at all.
    pub fn is_available(&self) -> bool {
        self.converter.supports(self.format)
    }

    /// [`get_or_create`](Self::get_or_create) for a bare path.
    pub fn get_or_create_path(
        &self,
        path: impl AsRef<Path>,
        quality: Quality,
    ) -> ConversionOutcome {
        self.get_or_create(&SourceImageRef::new(path.as_ref()), quality)
    }

    /// Return the derivative for `source`, creating it if absent.
    pub fn get_or_create(&self, source: &SourceImageRef, quality: Quality) -> ConversionOutcome {
        if !self.is_available() {
            debug!(
                format = self.format.extension(),
                "derivative encoding unavailable"
            );
            return ConversionOutcome::Unsupported;
        }

        let Some(derivative) = derive_path(source, self.format) else {
            debug!(source = %source.path().display(), "no derivative for extension");
            return ConversionOutcome::Unsupported;
        };

        if derivative.path().is_file() {
            debug!(derivative = %derivative.path().display(), "cache hit");
            return ConversionOutcome::AlreadyExists(derivative);
        }

        if !source.path().is_file() {
            warn!(source = %source.path().display(), "source missing");
            return ConversionOutcome::Failed(FailureReason::MissingSource);
        }

        if let Some(parent) = derivative.path().parent().filter(|p| !p.as_os_str().is_empty()) {
            // create_dir_all treats a concurrently created directory as success
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(dir = %parent.display(), error = %e, "cannot create derivative directory");
                return ConversionOutcome::Failed(FailureReason::Io(e.to_string()));
            }
        }

        let params = ConvertParams {
            source: source.path().to_path_buf(),
            output: derivative.path().to_path_buf(),
            format: self.format,
            quality,
            max_edge: self.max_edge,
        };

        match self.converter.convert(&params) {
            Ok(()) => {
                info!(
                    source = %source.path().display(),
                    derivative = %derivative.path().display(),
                    quality = quality.value(),
                    "derivative created"
                );
                ConversionOutcome::Created(derivative)
            }
            Err(e) => {
                warn!(source = %source.path().display(), error = %e, "conversion failed");
                ConversionOutcome::Failed(e.into())
            }
        }
    }
}

/// Summary of cache behavior over many requests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub created: u32,
    pub unsupported: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn record(&mut self, outcome: &ConversionOutcome) {
        match outcome {
            ConversionOutcome::AlreadyExists(_) => self.hits += 1,
            ConversionOutcome::Created(_) => self.created += 1,
            ConversionOutcome::Unsupported => self.unsupported += 1,
            ConversionOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.hits + self.created + self.unsupported + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cached, {} created", self.hits, self.created)?;
        if self.unsupported > 0 {
            write!(f, ", {} skipped", self.unsupported)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " ({} total)", self.total())
    }
}
