//! Build configuration.
//!
//! Configuration comes from three layers, later layers winning:
//!
//! 1. Stock defaults ([`BuildConfig::default`])
//! 2. `treepress.toml` in the source root (optional, sparse)
//! 3. Command-line flags (applied by the binary)
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! excluded_dirs = ["node_modules", ".git"]
//! layout = "nested-index"     # or "flat"
//! max_image_width = 600
//! # skeleton = "skeleton.html"
//! insertion_id = "content"
//!
//! [bundler]
//! program = "esbuild"
//! args = ["{entry}", "--bundle", "--resolve-extensions={extensions}", "--target={target}",
//!         "--loader:.css={css_loader}", "--outdir={outdir}"]
//! timeout_secs = 60
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the optional config file in the source root.
pub const CONFIG_FILE: &str = "treepress.toml";

/// Skeleton file picked up from the source root when none is configured.
pub const DEFAULT_SKELETON_FILE: &str = "skeleton.html";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Where each document's page is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// `notes/first.md` → `notes/first.html`
    Flat,
    /// `notes/first.md` → `notes/first/index.html`
    #[default]
    NestedIndex,
}

impl std::str::FromStr for Layout {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Layout::Flat),
            "nested-index" => Ok(Layout::NestedIndex),
            other => Err(ConfigError::Validation(format!(
                "unknown layout '{other}' (expected 'flat' or 'nested-index')"
            ))),
        }
    }
}

/// Build configuration loaded from `treepress.toml`.
///
/// Every field has a default; user files only list what they override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory names pruned from the walk wherever they appear.
    pub excluded_dirs: Vec<String>,
    /// Output layout for document pages.
    pub layout: Layout,
    /// Images wider than this are scaled down to fit.
    pub max_image_width: u32,
    /// Page skeleton, relative to the source root. When absent,
    /// `skeleton.html` is used if present, otherwise the built-in shell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<String>,
    /// `id` of the skeleton element that receives page content.
    pub insertion_id: String,
    /// Script bundler invocation.
    pub bundler: BundlerConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: vec!["node_modules".to_string(), ".git".to_string()],
            layout: Layout::default(),
            max_image_width: 600,
            skeleton: None,
            insertion_id: "content".to_string(),
            bundler: BundlerConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_image_width == 0 {
            return Err(ConfigError::Validation(
                "max_image_width must be greater than 0".into(),
            ));
        }
        if self.insertion_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "insertion_id must not be empty".into(),
            ));
        }
        if self
            .insertion_id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '&' | '<' | '>'))
        {
            return Err(ConfigError::Validation(format!(
                "insertion_id '{}' must not contain whitespace, quotes or &<>",
                self.insertion_id
            )));
        }
        if self.bundler.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bundler.program must not be empty".into(),
            ));
        }
        if self.bundler.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "bundler.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// External bundler command.
///
/// `{entry}`, `{outdir}`, `{extensions}`, `{target}` and `{css_loader}` in
/// `args` are filled in per run from the entry script, the mirrored
/// destination directory and the bundle options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundlerConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Best-effort limit on a single bundler run.
    pub timeout_secs: u64,
}

impl BundlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            program: "esbuild".to_string(),
            args: [
                "{entry}",
                "--bundle",
                "--resolve-extensions={extensions}",
                "--target={target}",
                "--loader:.css={css_loader}",
                "--outdir={outdir}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            timeout_secs: 60,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel transform workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BuildConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `treepress.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `treepress.toml` in the source root, on top of the
/// stock defaults.
pub fn load_config(source_root: &Path) -> Result<BuildConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(source_root)?)
}

/// Returns a fully-commented stock `treepress.toml`.
///
/// Printed by `treepress --print-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# treepress configuration
# =======================
# Place this file at the root of the content directory as treepress.toml.
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory names that are never descended into, wherever they appear.
excluded_dirs = ["node_modules", ".git"]

# Page layout for markdown documents:
#   "nested-index"  notes/first.md -> notes/first/index.html
#   "flat"          notes/first.md -> notes/first.html
# A document named index.md always becomes index.html in its directory.
layout = "nested-index"

# Images wider than this many pixels are scaled down (aspect preserved).
# Smaller images are never upscaled. Animated GIFs keep every frame.
max_image_width = 600

# Page skeleton, relative to the content directory. Defaults to
# skeleton.html when that file exists, otherwise a built-in shell.
# skeleton = "skeleton.html"

# id of the skeleton element whose contents are replaced by each page.
# No whitespace, quotes or &<> characters.
insertion_id = "content"

# ---------------------------------------------------------------------------
# Script bundling
# ---------------------------------------------------------------------------
[bundler]
# Command run once per .js entry. Placeholders:
#   {entry}       the source script
#   {outdir}      its mirrored output directory
#   {extensions}  module resolution extensions (".js")
#   {target}      syntax lowering target ("es2015")
#   {css_loader}  "text" to inline imported stylesheets
program = "esbuild"
args = [
    "{entry}",
    "--bundle",
    "--resolve-extensions={extensions}",
    "--target={target}",
    "--loader:.css={css_loader}",
    "--outdir={outdir}",
]

# Seconds before a bundler run is abandoned and reported as failed.
timeout_secs = 60

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = BuildConfig::default();
        assert_eq!(config.excluded_dirs, vec!["node_modules", ".git"]);
        assert_eq!(config.layout, Layout::NestedIndex);
        assert_eq!(config.max_image_width, 600);
        assert_eq!(config.skeleton, None);
        assert_eq!(config.insertion_id, "content");
        assert_eq!(config.bundler.program, "esbuild");
        assert_eq!(config.bundler.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn parse_partial_config() {
        let config: BuildConfig = toml::from_str("max_image_width = 320").unwrap();
        assert_eq!(config.max_image_width, 320);
        assert_eq!(config.layout, Layout::NestedIndex);
        assert_eq!(config.bundler.program, "esbuild");
    }

    #[test]
    fn parse_layout_values() {
        let flat: BuildConfig = toml::from_str(r#"layout = "flat""#).unwrap();
        assert_eq!(flat.layout, Layout::Flat);
        let nested: BuildConfig = toml::from_str(r#"layout = "nested-index""#).unwrap();
        assert_eq!(nested.layout, Layout::NestedIndex);
    }

    #[test]
    fn layout_from_str() {
        assert_eq!("flat".parse::<Layout>().unwrap(), Layout::Flat);
        assert_eq!(
            "nested-index".parse::<Layout>().unwrap(),
            Layout::NestedIndex
        );
        assert!("tree".parse::<Layout>().is_err());
    }

    #[test]
    fn unknown_layout_rejected() {
        let result: Result<BuildConfig, _> = toml::from_str(r#"layout = "tree""#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<BuildConfig, _> = toml::from_str("max_width = 10");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let toml = r#"
[bundler]
programme = "parcel"
"#;
        let result: Result<BuildConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.max_image_width, 600);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
layout = "flat"
excluded_dirs = ["vendor"]

[bundler]
timeout_secs = 5
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.layout, Layout::Flat);
        assert_eq!(config.excluded_dirs, vec!["vendor"]);
        assert_eq!(config.bundler.timeout_secs, 5);
        // Sibling keys in the same table keep their defaults
        assert_eq!(config.bundler.program, "esbuild");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "layout = [").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "max_image_width = 0").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_insertion_id() {
        let config = BuildConfig {
            insertion_id: "  ".to_string(),
            ..BuildConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_insertion_id_that_html_escapes() {
        for id in ["a&b", "x\"y", "it's", "<main>", "two words"] {
            let config = BuildConfig {
                insertion_id: id.to_string(),
                ..BuildConfig::default()
            };
            assert!(config.validate().is_err(), "{id} should be rejected");
        }
        let config = BuildConfig {
            insertion_id: "page-body_2".to_string(),
            ..BuildConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = BuildConfig::default();
        config.bundler.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(BuildConfig::default().validate().is_ok());
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_replaces_arrays() {
        let base: toml::Value = toml::from_str(r#"v = ["a", "b"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"v = ["c"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["v"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let parsed: BuildConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = BuildConfig::default();
        assert_eq!(parsed.excluded_dirs, defaults.excluded_dirs);
        assert_eq!(parsed.layout, defaults.layout);
        assert_eq!(parsed.max_image_width, defaults.max_image_width);
        assert_eq!(parsed.insertion_id, defaults.insertion_id);
        assert_eq!(parsed.bundler.args, defaults.bundler.args);
        assert_eq!(parsed.bundler.timeout_secs, defaults.bundler.timeout_secs);
    }

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        assert_eq!(effective_threads(&config), cores);
    }
}
