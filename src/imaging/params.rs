//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the image transform (which decides the constraint)
//! and the [`backend`](super::backend) (which does the pixel work), so the
//! backend can be swapped for a mock in tests.

/// How a source image is fitted to the size constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    /// Scale down until the image fits inside the bound, preserving aspect
    /// ratio. Never upscales.
    #[default]
    Inside,
}

/// Everything the backend needs for one resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub max_width: u32,
    pub fit: Fit,
    /// Keep every frame of animated formats (GIF).
    pub preserve_animation: bool,
}

impl ResizeParams {
    /// The fixed constraint used by the image transform.
    pub fn fit_inside(max_width: u32) -> Self {
        Self {
            max_width,
            fit: Fit::Inside,
            preserve_animation: true,
        }
    }
}
