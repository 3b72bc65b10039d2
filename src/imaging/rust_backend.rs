//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, GIF) | `image::load_from_memory_with_format` |
//! | Decode animated GIF | `GifDecoder::into_frames` (frames composited to full canvas) |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode | `DynamicImage::write_to` / `GifEncoder::encode_frames` |
//!
//! Images that already fit are returned byte-for-byte, so re-running a
//! build never re-encodes (and never degrades) small images.

use super::backend::{BackendError, ImageBackend, RasterFormat};
use super::calculations::{fit_dimensions, scale_offset};
use super::params::ResizeParams;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{AnimationDecoder, Frame, ImageDecoder, ImageFormat};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn image_format(format: RasterFormat) -> ImageFormat {
    match format {
        RasterFormat::Png => ImageFormat::Png,
        RasterFormat::Jpeg => ImageFormat::Jpeg,
        RasterFormat::Gif => ImageFormat::Gif,
    }
}

fn failed(context: &str, err: impl std::fmt::Display) -> BackendError {
    BackendError::ProcessingFailed(format!("{context}: {err}"))
}

/// Resize a single-frame image.
fn resize_still(
    source: &[u8],
    format: RasterFormat,
    params: &ResizeParams,
) -> Result<Vec<u8>, BackendError> {
    let format = image_format(format);
    let img = image::load_from_memory_with_format(source, format)
        .map_err(|e| failed("decode failed", e))?;

    let original = (img.width(), img.height());
    let (width, height) = fit_dimensions(original, params.max_width, params.fit);
    if (width, height) == original {
        return Ok(source.to_vec());
    }

    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, format)
        .map_err(|e| failed("encode failed", e))?;
    Ok(out.into_inner())
}

/// Resize every frame of an animated GIF, keeping delays and frame count.
fn resize_animation(source: &[u8], params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
    let decoder =
        GifDecoder::new(Cursor::new(source)).map_err(|e| failed("GIF decode failed", e))?;
    let canvas = decoder.dimensions();
    let (width, height) = fit_dimensions(canvas, params.max_width, params.fit);
    if (width, height) == canvas {
        return Ok(source.to_vec());
    }

    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| failed("GIF frame decode failed", e))?;

    let resized: Vec<Frame> = frames
        .into_iter()
        .map(|frame| {
            let left = scale_offset(frame.left(), canvas.0, width);
            let top = scale_offset(frame.top(), canvas.1, height);
            let delay = frame.delay();
            let buffer = frame.into_buffer();
            let frame_w = scale_offset(buffer.width(), canvas.0, width).max(1);
            let frame_h = scale_offset(buffer.height(), canvas.1, height).max(1);
            let scaled = image::imageops::resize(&buffer, frame_w, frame_h, FilterType::Lanczos3);
            Frame::from_parts(scaled, left, top, delay)
        })
        .collect();

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| failed("GIF encode failed", e))?;
        encoder
            .encode_frames(resized)
            .map_err(|e| failed("GIF encode failed", e))?;
    }
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn resize(
        &self,
        source: &[u8],
        format: RasterFormat,
        params: &ResizeParams,
    ) -> Result<Vec<u8>, BackendError> {
        match format {
            RasterFormat::Gif if params.preserve_animation => resize_animation(source, params),
            other => resize_still(source, other, params),
        }
    }
}
