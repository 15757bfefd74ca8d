//! Caller-facing entry point: public URL in, derivative URL out.
//!
//! This is what a gallery renderer talks to. It never sees paths,
//! [`ConversionOutcome`]s or encoder errors, only one of:
//!
//! - `Ok(Some(url))`: a derivative exists at `url`, serve it
//! - `Ok(None)`: no derivative for this image, serve the original
//! - `Err(_)`: the filesystem misbehaved; the caller decides whether that is
//!   worth surfacing
//!
//! [`DerivativeServer::url_or_original`] folds all three into a URL that is
//! always safe to emit.

use crate::cache::{ConversionOutcome, DerivativeCache};
use crate::config::CacheConfig;
use crate::imaging::{ImageConverter, Quality, RustConverter};
use crate::naming::SourceImageRef;
use crate::url::UrlMapper;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("filesystem error while creating derivative for {url}: {reason}")]
    Io { url: String, reason: String },
}

/// Resolves image URLs to derivative URLs through a [`DerivativeCache`].
pub struct DerivativeServer<M, C = RustConverter> {
    cache: DerivativeCache<C>,
    mapper: M,
    quality: Quality,
}

impl<M: UrlMapper> DerivativeServer<M, RustConverter> {
    pub fn new(mapper: M, config: &CacheConfig) -> Self {
        Self::with_cache(
            DerivativeCache::new(&config.derivatives),
            mapper,
            config.derivatives.quality(),
        )
    }
}

impl<M: UrlMapper, C: ImageConverter> DerivativeServer<M, C> {
    pub fn with_cache(cache: DerivativeCache<C>, mapper: M, quality: Quality) -> Self {
        Self {
            cache,
            mapper,
            quality,
        }
    }

    pub fn cache(&self) -> &DerivativeCache<C> {
        &self.cache
    }

    /// Derivative URL for `url` at the server's default quality.
    pub fn derivative_url(&self, url: &str) -> Result<Option<String>, ServeError> {
        self.derivative_url_with_quality(url, self.quality)
    }

    /// Derivative URL for `url` at an explicit quality.
    pub fn derivative_url_with_quality(
        &self,
        url: &str,
        quality: Quality,
    ) -> Result<Option<String>, ServeError> {
        let Some(path) = self.mapper.url_to_path(url) else {
            return Ok(None);
        };

        match self.cache.get_or_create(&SourceImageRef::new(path), quality) {
            ConversionOutcome::Created(d) | ConversionOutcome::AlreadyExists(d) => {
                Ok(self.mapper.path_to_url(d.path()))
            }
            ConversionOutcome::Failed(reason) if reason.is_environmental() => Err(ServeError::Io {
                url: url.to_string(),
                reason: reason.to_string(),
            }),
            ConversionOutcome::Unsupported | ConversionOutcome::Failed(_) => Ok(None),
        }
    }

    /// The derivative URL if one can be had, otherwise `url` unchanged.
    pub fn url_or_original(&self, url: &str) -> String {
        match self.derivative_url(url) {
            Ok(Some(derivative)) => derivative,
            Ok(None) => url.to_string(),
            Err(e) => {
                warn!(error = %e, "serving original image");
                url.to_string()
            }
        }
    }
}
