//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the dimensions of a derivative capped at `max_edge` on its
/// longer edge, preserving aspect ratio.
///
/// Returns `None` when the original already fits, so callers skip the
/// resample entirely. Neither output edge is ever rounded down to zero.
///
/// # Examples
/// ```
/// # use derivative_cache::imaging::fit_within;
/// // 4000x3000 landscape capped at 2000px → 2000x1500
/// assert_eq!(fit_within((4000, 3000), 2000), Some((2000, 1500)));
///
/// // Already small enough
/// assert_eq!(fit_within((800, 600), 2000), None);
/// ```
pub fn fit_within(original: (u32, u32), max_edge: u32) -> Option<(u32, u32)> {
    let (orig_w, orig_h) = original;
    let longer_edge = orig_w.max(orig_h);

    if max_edge == 0 || longer_edge <= max_edge {
        return None;
    }

    let (w, h) = if orig_w >= orig_h {
        // Landscape or square
        let ratio = max_edge as f64 / orig_w as f64;
        (max_edge, (orig_h as f64 * ratio).round() as u32)
    } else {
        // Portrait
        let ratio = max_edge as f64 / orig_h as f64;
        ((orig_w as f64 * ratio).round() as u32, max_edge)
    };

    Some((w.max(1), h.max(1)))
}
