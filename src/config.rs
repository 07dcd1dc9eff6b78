// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Runtime configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Workspace root all tool paths resolve against (default: current directory)
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Default log filter directive, overridden by `RUST_LOG` (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from standard paths or a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be parsed or a value has the
    /// wrong type.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // 1. Start with defaults
        builder = builder.set_default("log_level", default_log_level())?;

        // 2. Load from user config directory (~/.config/filepeek/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("filepeek").join("config.toml");
            if config_path.exists() {
                builder = builder.add_source(config::File::from(config_path));
            }
        }

        // 3. Load from explicit file if provided
        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path));
        }

        // 4. Load from environment variables (FILEPEEK_ROOT, FILEPEEK_LOG_LEVEL)
        builder = builder.add_source(config::Environment::with_prefix("FILEPEEK"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// The workspace root, falling back to the current directory.
    #[must_use]
    pub fn root_or_cwd(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.root.is_none());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.root_or_cwd(), PathBuf::from("."));
    }

    #[test]
    fn test_load_explicit_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("filepeek.toml");
        fs::write(&path, "root = \"/srv/workspace\"\nlog_level = \"debug\"\n")?;

        let config = Config::load(Some(path))?;
        assert_eq!(config.root, Some(PathBuf::from("/srv/workspace")));
        assert_eq!(config.log_level, "debug");
        Ok(())
    }

    #[test]
    fn test_load_rejects_malformed_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("broken.toml");
        fs::write(&path, "root = [\n")?;
        assert!(Config::load(Some(path)).is_err());
        Ok(())
    }
}
