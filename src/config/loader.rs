// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{BatchConfig, RawBatchConfig};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

/// Load a batch file from the real filesystem without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBatchConfig> {
    load_from_path_with(&RealFileSystem, path)
}

/// Load a batch file through the given filesystem.
///
/// This only performs TOML deserialization; it does **not** check
/// references or dependencies. Use [`load_and_validate`] for that.
pub fn load_from_path_with(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawBatchConfig> {
    let path = path.as_ref();
    debug!(path = ?path, "loading batch file");

    let contents = fs.read_to_string(path)?;
    let config: RawBatchConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a batch file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - unknown repositories and dependencies,
///   - groups or tasks that would do nothing,
///   - dependency cycles between groups.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BatchConfig> {
    let raw = load_from_path(&path)?;
    BatchConfig::try_from(raw)
}

/// `Repobatch.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Repobatch.toml")
}
