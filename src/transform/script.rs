//! Script transform: bundle an entry script into its mirrored directory.

use super::{Outcome, TransformContext, TransformError};
use crate::classify::FileNode;
use crate::walk::DirectoryMapping;

pub fn transform(
    node: &FileNode,
    dir: &DirectoryMapping,
    ctx: &TransformContext,
) -> Result<Outcome, TransformError> {
    ctx.bundler
        .bundle(&node.absolute_path, &dir.destination_path, &ctx.bundle_options)?;
    Ok(Outcome::Script {
        output_dir: dir.destination_path.clone(),
    })
}
