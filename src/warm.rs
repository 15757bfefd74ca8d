//! Bulk warm-up: pre-generate derivatives for a whole upload tree.
//!
//! On-demand creation puts the first visitor of every image on the slow
//! path. Running [`warm`] after a bulk import (or on a schedule) moves that
//! cost offline. It goes through the exact same
//! [`DerivativeCache::get_or_create`] path as live requests, so derivatives
//! that already exist are cache hits and a warm-up can be rerun at any time.
//!
//! ## Parallel Processing
//!
//! Sources are converted in parallel on a dedicated [rayon](https://docs.rs/rayon)
//! pool sized by [`effective_threads`]. A dedicated pool (rather than the
//! global one) keeps the host application's own rayon work unaffected.

use crate::cache::{CacheStats, ConversionOutcome, DerivativeCache, FailureReason};
use crate::config::{ProcessingConfig, effective_threads};
use crate::imaging::{ImageConverter, Quality};
use crate::naming::{SourceImageRef, is_eligible};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum WarmError {
    #[error("Directory not found: {0}")]
    RootNotFound(PathBuf),
    #[error("Thread pool setup failed: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// What a warm-up run did.
#[derive(Debug, Default)]
pub struct WarmReport {
    pub stats: CacheStats,
    /// Sources that could not be converted, in path order.
    pub failures: Vec<(PathBuf, FailureReason)>,
}

/// Collect every eligible source under `root`, sorted.
///
/// Hidden files and directories (leading `.`) are skipped, which also skips
/// in-flight temp files from concurrent conversions. Unreadable entries are
/// logged and skipped.
pub fn collect_sources(root: &Path) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_eligible(e.path()))
        .map(|e| e.into_path())
        .collect();
    sources.sort();
    sources
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

/// Ensure a derivative exists for every eligible source under `root`.
pub fn warm<C: ImageConverter>(
    cache: &DerivativeCache<C>,
    root: &Path,
    quality: Quality,
    processing: &ProcessingConfig,
) -> Result<WarmReport, WarmError> {
    if !root.is_dir() {
        return Err(WarmError::RootNotFound(root.to_path_buf()));
    }

    let sources = collect_sources(root);
    let threads = effective_threads(processing);
    info!(
        root = %root.display(),
        sources = sources.len(),
        threads,
        "warming derivatives"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;
    let outcomes: Vec<_> = pool.install(|| {
        sources
            .par_iter()
            .map(|path| {
                let outcome = cache.get_or_create(&SourceImageRef::new(path.as_path()), quality);
                (path, outcome)
            })
            .collect()
    });

    let mut report = WarmReport::default();
    for (path, outcome) in outcomes {
        report.stats.record(&outcome);
        if let ConversionOutcome::Failed(reason) = outcome {
            report.failures.push((path.clone(), reason));
        }
    }

    info!(stats = %report.stats, "warm-up complete");
    Ok(report)
}
