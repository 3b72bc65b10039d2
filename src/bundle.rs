//! Script bundling.
//!
//! The [`Bundler`] trait is the boundary to whatever turns an entry script
//! into a self-contained bundle. [`CommandBundler`] runs an external tool
//! (esbuild by default) with placeholder substitution:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{entry}` | entry script path |
//! | `{outdir}` | mirrored destination directory |
//! | `{extensions}` | comma-joined module resolution extensions |
//! | `{target}` | syntax lowering target |
//! | `{css_loader}` | `text` when stylesheets are inlined, else `file` |
//!
//! The child process gets a best-effort deadline: it is polled until it
//! exits and killed once the deadline passes.

use crate::config::BundlerConfig;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const STDERR_GRACE: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("bundler exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("bundler timed out after {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How an entry script is bundled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOptions {
    /// Extensions tried when resolving bare module imports.
    pub resolve_extensions: Vec<String>,
    /// Modern syntax is lowered to this target.
    pub target: String,
    /// Imported stylesheets are inlined as text.
    pub inline_styles: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            resolve_extensions: vec![".js".to_string()],
            target: "es2015".to_string(),
            inline_styles: true,
        }
    }
}

/// Bundles one entry script into `out_dir`.
///
/// `Sync` because one bundler serves every concurrent script transform.
pub trait Bundler: Sync {
    fn bundle(&self, entry: &Path, out_dir: &Path, options: &BundleOptions)
    -> Result<(), BundleError>;
}

/// Runs an external bundler command per entry.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandBundler {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &BundlerConfig) -> Self {
        Self::new(&config.program, config.args.clone(), config.timeout())
    }

    /// Arguments with every placeholder filled in.
    pub fn command_args(&self, entry: &Path, out_dir: &Path, options: &BundleOptions) -> Vec<String> {
        let entry = entry.to_string_lossy();
        let out_dir = out_dir.to_string_lossy();
        let extensions = options.resolve_extensions.join(",");
        let css_loader = if options.inline_styles { "text" } else { "file" };
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{entry}", &entry)
                    .replace("{outdir}", &out_dir)
                    .replace("{extensions}", &extensions)
                    .replace("{target}", &options.target)
                    .replace("{css_loader}", css_loader)
            })
            .collect()
    }

    fn wait_with_deadline(
        &self,
        child: &mut Child,
        deadline: Instant,
    ) -> Result<std::process::ExitStatus, BundleError> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                // The child may exit between try_wait and kill.
                let _ = child.kill();
                let _ = child.wait();
                return Err(BundleError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Bundler for CommandBundler {
    fn bundle(
        &self,
        entry: &Path,
        out_dir: &Path,
        options: &BundleOptions,
    ) -> Result<(), BundleError> {
        let mut child = Command::new(&self.program)
            .args(self.command_args(entry, out_dir, options))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BundleError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // A full stderr pipe would block the child; drain it concurrently.
        // Grandchildren inherit the pipe, so the reader is never joined.
        let (stderr_tx, stderr_rx) = mpsc::channel();
        if let Some(mut pipe) = child.stderr.take() {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                stderr_tx.send(buf).ok();
            });
        }

        let deadline = Instant::now() + self.timeout;
        let status = self.wait_with_deadline(&mut child, deadline);
        let stderr = match &status {
            Ok(_) => stderr_rx
                .recv_timeout(deadline.saturating_duration_since(Instant::now()) + STDERR_GRACE)
                .unwrap_or_default(),
            Err(_) => String::new(),
        };

        let status = status?;
        if status.success() {
            Ok(())
        } else {
            Err(BundleError::Failed {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}
