//! # Derivative Cache
//!
//! On-demand WebP (or AVIF) derivatives for JPEG and PNG images. The first
//! request for an image converts it and stores the result beside the
//! original; every later request reuses that file.
//!
//! # Architecture
//!
//! ```text
//! caller ─ url ─▶ serve ─▶ cache::get_or_create ─▶ naming::derive_path
//!                                  │                     (pure)
//!                                  ├─ hit  ─▶ AlreadyExists
//!                                  └─ miss ─▶ imaging::ImageConverter::convert
//!                                             sniff → decode → encode → publish
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Source → derivative path mapping, no I/O |
//! | [`cache`] | Existence check, convert on miss, [`ConversionOutcome`] |
//! | [`imaging`] | Content sniffing, decode, alpha normalization, encode, atomic publish |
//! | [`url`] | Injectable public URL ↔ filesystem path mapping |
//! | [`serve`] | URL-level entry point with fall-back-to-original semantics |
//! | [`warm`] | Parallel pre-generation over a directory tree |
//! | [`config`] | `config.toml` loading, merging, and validation |
//!
//! # Design Decisions
//!
//! ## The Filesystem Is The Index
//!
//! A derivative's path is a pure function of its source path, so "is it
//! cached?" is one `stat`. There is no manifest to keep consistent and
//! nothing to rebuild after a crash. The flip side is that derivatives are
//! never invalidated: replacing a source in place keeps serving the old
//! derivative until it is deleted by hand.
//!
//! ## Outcomes, Not Errors
//!
//! A missing source, a GIF, or a corrupt upload are routine on a live site.
//! [`DerivativeCache::get_or_create`] reports them as [`ConversionOutcome`]
//! values and never fails. Only [`serve`] distinguishes environmental
//! filesystem errors, and even there [`serve::DerivativeServer::url_or_original`]
//! always produces a URL that points at a real file.
//!
//! ## Atomic Publish
//!
//! Concurrent requests for the same fresh image may both convert it. The
//! converter encodes into a temp file in the destination directory and
//! renames it into place, so the race costs CPU but never exposes a
//! truncated file.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod serve;
pub mod url;
pub mod warm;

pub use cache::{CacheStats, ConversionOutcome, DerivativeCache, FailureReason};
pub use config::{CacheConfig, load_config};
pub use imaging::{DerivativeFormat, ImageConverter, Quality, RustConverter};
pub use naming::{DerivativeRef, SourceImageRef, derive_path};
pub use serve::{DerivativeServer, ServeError};
pub use url::{SiteRootMapper, UrlMapper};

#[cfg(test)]
pub(crate) mod test_helpers;
