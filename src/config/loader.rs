// src/config/loader.rs

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetpipeError, Result};

/// Parse `Assetpipe.toml` without checking what it says.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| AssetpipeError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| AssetpipeError::ConfigSyntax {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse and validate: task names, `after` references, ordering cycles,
/// browser targets and the layout settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let cfg = ConfigFile::try_from(load_from_path(path)?)?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(cfg)
}

/// Like [`load_and_validate`], but a project without a config file builds
/// with the stock layout.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    match load_and_validate(path) {
        Err(AssetpipeError::ConfigRead { source, .. }) if source.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file; using the stock layout");
            ConfigFile::try_from(RawConfigFile::default())
        }
        other => other,
    }
}
