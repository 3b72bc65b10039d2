//! Image transform.
//!
//! SVG is resolution independent and copied byte for byte. Rasters go
//! through the [`ImageBackend`](crate::imaging::ImageBackend) with a
//! fit-inside constraint of `max_image_width`; all GIF frames are kept.

use super::{ImageAction, Outcome, TransformContext, TransformError, read_error, write_error};
use crate::classify::FileNode;
use crate::imaging::{self, BackendError, RasterFormat, ResizeParams};
use crate::walk::DirectoryMapping;
use std::fs;

pub fn transform(
    node: &FileNode,
    dir: &DirectoryMapping,
    ctx: &TransformContext,
) -> Result<Outcome, TransformError> {
    let source = &node.absolute_path;
    let output = dir.destination_for(&node.file_name());
    let bytes = fs::read(source).map_err(read_error(source))?;

    let (bytes, action) = if imaging::is_vector(&node.extension) {
        (bytes, ImageAction::Copied)
    } else {
        let format = RasterFormat::from_extension(&node.extension)
            .ok_or_else(|| BackendError::UnsupportedFormat(node.extension.clone()))?;
        let params = ResizeParams::fit_inside(ctx.max_image_width);
        (ctx.images.resize(&bytes, format, &params)?, ImageAction::Resized)
    };

    fs::write(&output, bytes).map_err(write_error(&output))?;
    Ok(Outcome::Image { output, action })
}
