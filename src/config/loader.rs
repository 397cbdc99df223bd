// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetflowError, Result};

/// Name of the config file looked up in the current directory when
/// `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Assetflow.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, validate it, and anchor all relative
/// paths at the file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::try_from(raw_config)?.with_project_dir(config_root_dir(path));
    Ok(config)
}

/// Resolve the effective configuration for a CLI invocation.
///
/// - An explicit path must exist.
/// - Without one, `Assetflow.toml` in the current directory is used if
///   present; otherwise the built-in defaults apply, rooted at the current
///   directory.
pub fn resolve(explicit: Option<&str>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        info!(config = %path, "loading config");
        return load_and_validate(path);
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default_path.is_file() {
        info!(config = %default_path.display(), "loading config");
        return load_and_validate(&default_path);
    }

    debug!("no {DEFAULT_CONFIG_FILE} found; using built-in defaults");
    let cwd = std::env::current_dir().map_err(AssetflowError::IoError)?;
    Ok(ConfigFile::try_from(RawConfigFile::default())?.with_project_dir(cwd))
}

/// Figure out the project directory for a config path.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetflow.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
