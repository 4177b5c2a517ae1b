// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::error::ConfigError;

/// Where the relay's YAML document comes from.
pub trait ConfigSource {
    /// Human-readable origin, logged next to the config hash.
    fn origin(&self) -> String;

    fn read(&self) -> Result<String, ConfigError>;
}

/// `relay.yaml` on disk, as named by `--config` or `RELAY_CONFIG`.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<String, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound {
                path: self.path.clone(),
            },
            _ => ConfigError::Read {
                path: self.path.clone(),
                source: e,
            },
        })?;

        // serde_yaml would report an empty document as a missing `relay` key.
        if text.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "config file {} is empty",
                self.path.display()
            )));
        }
        Ok(text)
    }
}

/// YAML held in memory; tests and embedders use it to skip the filesystem.
#[derive(Debug, Clone)]
pub struct InlineSource {
    yaml: String,
}

impl InlineSource {
    pub fn new(yaml: impl Into<String>) -> Self {
        Self { yaml: yaml.into() }
    }
}

impl ConfigSource for InlineSource {
    fn origin(&self) -> String {
        "<inline>".to_string()
    }

    fn read(&self) -> Result<String, ConfigError> {
        Ok(self.yaml.clone())
    }
}
