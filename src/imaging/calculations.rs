//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Fit;

/// Calculate output dimensions for a resize bounded by `max_width`.
///
/// # Arguments
/// * `original` - Source dimensions `(width, height)`
/// * `max_width` - Width limit in pixels
/// * `fit` - How the source is fitted to the limit
///
/// # Returns
/// * `(width, height)` - Output dimensions. Equal to `original` when the
///   source already fits, since images are never upscaled.
///
/// ```text
/// (1200, 800), 600 → (600, 400)
/// (400, 300),  600 → (400, 300)
/// ```
pub fn fit_dimensions(original: (u32, u32), max_width: u32, fit: Fit) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    match fit {
        Fit::Inside => {
            if orig_w <= max_width || orig_w == 0 {
                return original;
            }
            let ratio = max_width as f64 / orig_w as f64;
            let height = ((orig_h as f64 * ratio).round() as u32).max(1);
            (max_width, height)
        }
    }
}

/// Scale a frame offset by the same ratio as the canvas.
pub fn scale_offset(offset: u32, original_extent: u32, new_extent: u32) -> u32 {
    if original_extent == 0 {
        return 0;
    }
    (offset as f64 * new_extent as f64 / original_extent as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_landscape_is_scaled_to_max_width() {
        assert_eq!(fit_dimensions((1200, 800), 600, Fit::Inside), (600, 400));
    }

    #[test]
    fn portrait_keeps_aspect_ratio() {
        // 1000x2000 → 600x1200
        assert_eq!(fit_dimensions((1000, 2000), 600, Fit::Inside), (600, 1200));
    }

    #[test]
    fn small_image_is_never_upscaled() {
        assert_eq!(fit_dimensions((400, 300), 600, Fit::Inside), (400, 300));
    }

    #[test]
    fn exact_width_is_unchanged() {
        assert_eq!(fit_dimensions((600, 1), 600, Fit::Inside), (600, 1));
    }

    #[test]
    fn rounding_of_odd_ratios() {
        // 1000x333 at 600 → 199.8 → 200
        assert_eq!(fit_dimensions((1000, 333), 600, Fit::Inside), (600, 200));
    }

    #[test]
    fn extreme_panorama_keeps_at_least_one_row() {
        assert_eq!(fit_dimensions((100_000, 10), 600, Fit::Inside), (600, 1));
    }

    #[test]
    fn aspect_ratio_preserved_within_a_pixel() {
        for (w, h) in [(1920, 1080), (4000, 3000), (1601, 997), (800, 2400)] {
            let (nw, nh) = fit_dimensions((w, h), 600, Fit::Inside);
            let expected = h as f64 * nw as f64 / w as f64;
            assert!((nh as f64 - expected).abs() <= 0.5, "{w}x{h} → {nw}x{nh}");
        }
    }

    #[test]
    fn scale_offset_halves_with_canvas() {
        assert_eq!(scale_offset(40, 200, 100), 20);
        assert_eq!(scale_offset(0, 200, 100), 0);
        assert_eq!(scale_offset(5, 0, 100), 0);
    }
}
