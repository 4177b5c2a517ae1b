// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads relay.yaml, validates structure, resolves `${VAR}` interpolation
// from the environment, and computes a deterministic config hash.

mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::interpolate;
pub use loader::{compute_hash, load_config};
pub use source::{ConfigSource, FileSource, InlineSource};
pub use types::*;
