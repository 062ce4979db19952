//! Configuration file discovery and loading

use super::options::GeneratorOptions;
use crate::error::OpgenError;
use crate::result::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names, highest priority first
pub const CONFIG_FILE_NAMES: [&str; 2] = [".opgenrc.json", ".opgenrc.toml"];

/// Configuration loader for discovering and loading config files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Auto-discover config file by traversing upward from start_path
    ///
    /// Searches each directory for `.opgenrc.json`, then `.opgenrc.toml`,
    /// moving up the directory tree until a config is found or the
    /// filesystem root is reached.
    pub fn auto_discover(start_path: &Path) -> Result<Option<PathBuf>> {
        let mut current = start_path
            .canonicalize()
            .map_err(|e| OpgenError::io(start_path, e))?;

        loop {
            for filename in CONFIG_FILE_NAMES {
                let config_path = current.join(filename);
                if config_path.is_file() {
                    tracing::debug!("Found config: {}", config_path.display());
                    return Ok(Some(config_path));
                }
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Load configuration from a specific file
    ///
    /// Supports JSON (.json) and TOML (.toml). Relative paths inside the
    /// file are resolved against the file's directory.
    pub fn load_from_file(path: &Path) -> Result<GeneratorOptions> {
        let content = fs::read_to_string(path).map_err(|e| OpgenError::io(path, e))?;

        let mut options: GeneratorOptions = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                OpgenError::configuration(format!(
                    "Failed to load config from '{}': {e}",
                    path.display()
                ))
            })?,
            Some("toml") => toml::from_str(&content).map_err(|e| {
                OpgenError::configuration(format!(
                    "Failed to load config from '{}': {e}",
                    path.display()
                ))
            })?,
            _ => {
                return Err(OpgenError::configuration(format!(
                    "Unsupported config file extension for '{}' (expected .json or .toml)",
                    path.display()
                )));
            }
        };

        if let Some(base) = path.parent() {
            options.rebase(base);
        }
        options.validate()?;
        Ok(options)
    }

    /// Load config from path or auto-discover
    ///
    /// If a custom path is provided it must exist. Otherwise a config file is
    /// searched for upward from `start_dir` (or the current directory); when
    /// none is found the built-in defaults are used.
    pub fn load(custom_path: Option<&Path>, start_dir: Option<&Path>) -> Result<GeneratorOptions> {
        if let Some(path) = custom_path {
            if !path.exists() {
                return Err(OpgenError::configuration(format!(
                    "Config file not found: {}. Run 'opgen config init' to create one.",
                    path.display()
                )));
            }
            return Self::load_from_file(path);
        }

        let search_dir = start_dir.unwrap_or_else(|| Path::new("."));
        match Self::auto_discover(search_dir)? {
            Some(found) => Self::load_from_file(&found),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(GeneratorOptions::default())
            }
        }
    }
}
