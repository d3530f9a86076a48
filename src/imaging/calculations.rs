//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the dimensions of an image bounded to `max_edge` on its longer side.
///
/// Images already within the bound are returned unchanged. Larger images are
/// scaled so the longer edge is exactly `max_edge`; the other edge scales by
/// the same ratio. Each edge is rounded independently, so the result may
/// drift from the source aspect ratio by up to half a pixel per edge.
///
/// # Examples
/// ```
/// # use tablon::imaging::bounded_dimensions;
/// assert_eq!(bounded_dimensions((4000, 2000), 1200), (1200, 600));
/// assert_eq!(bounded_dimensions((800, 600), 1200), (800, 600));
/// ```
pub fn bounded_dimensions(original: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let longer_edge = orig_w.max(orig_h);

    if longer_edge <= max_edge {
        return original;
    }

    let ratio = max_edge as f64 / longer_edge as f64;
    let scale = |edge: u32| ((edge as f64 * ratio).round() as u32).max(1);

    if orig_w >= orig_h {
        (max_edge, scale(orig_h))
    } else {
        (scale(orig_w), max_edge)
    }
}

/// Relative difference between the aspect ratios of two sizes.
///
/// Used to check that a downscale stayed within rounding tolerance.
pub fn aspect_drift(a: (u32, u32), b: (u32, u32)) -> f64 {
    let ratio_a = a.0 as f64 / a.1 as f64;
    let ratio_b = b.0 as f64 / b.1 as f64;
    ((ratio_a - ratio_b) / ratio_a).abs()
}
