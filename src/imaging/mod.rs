//! Image processing, pure Rust and statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** (PNG, JPEG, GIF) | `image` crate |
//! | **Resize** | `image::imageops::resize`, Lanczos3 |
//! | **Animated GIF** | `GifDecoder::into_frames` + `GifEncoder::encode_frames` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing the resize constraint
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, RasterFormat};
pub use calculations::fit_dimensions;
pub use params::{Fit, ResizeParams};
pub use rust_backend::RustBackend;

/// Vector formats are resolution independent and copied as-is.
pub fn is_vector(extension: &str) -> bool {
    extension.eq_ignore_ascii_case("svg")
}
