// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// All errors that can occur during config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {} not found (pass --config or set RELAY_CONFIG)", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing required upstream setting \"{field}\"")]
    MissingField { field: &'static str },

    #[error("setting \"{field}\" references ${{{name}}}, which is not set in the environment")]
    UndefinedVariable { field: &'static str, name: String },
}
