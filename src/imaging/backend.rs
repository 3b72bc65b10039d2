//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the resizer boundary: bytes in, bytes out.
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate and statically linked into the binary.

use super::params::ResizeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Raster formats the image transform hands to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
    Gif,
}

impl RasterFormat {
    /// Map a lowercased file extension to a raster format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

/// Trait for image processing backends.
///
/// `Sync` is required because one backend is shared by every concurrent
/// image transform.
pub trait ImageBackend: Sync {
    /// Resize encoded `source` bytes according to `params`, returning the
    /// re-encoded result in the same format.
    fn resize(
        &self,
        source: &[u8],
        format: RasterFormat,
        params: &ResizeParams,
    ) -> Result<Vec<u8>, BackendError>;
}
