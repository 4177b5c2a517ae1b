// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

use super::error::ConfigError;
use super::interpolation::interpolate;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a relay config from the given source.
///
/// Steps:
/// 1. Read raw YAML from the source
/// 2. Compute SHA256 config hash
/// 3. Parse YAML into raw deserialization types
/// 4. Validate version and required upstream fields
/// 5. Expand `${VAR}` references in string fields
/// 6. Range-check generation parameters
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.read()?;
    let config_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.relay != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.relay
        )));
    }

    let upstream = build_upstream_config(raw.upstream.unwrap_or_default())?;
    let chat = build_chat_config(raw.chat.unwrap_or_default())?;

    Ok(Config {
        upstream,
        chat,
        environment: raw.environment.unwrap_or_default(),
        config_hash,
    })
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

fn build_upstream_config(raw: raw::RawUpstreamConfig) -> Result<UpstreamConfig, ConfigError> {
    Ok(UpstreamConfig {
        endpoint: required(raw.endpoint, "endpoint")?,
        api_key: required(raw.api_key, "api_key")?,
        api_version: required(raw.api_version, "api_version")?,
        deployment: required(raw.deployment, "deployment")?,
        model: required(raw.model, "model")?,
        timeout_ms: raw.timeout_ms,
    })
}

/// Interpolate a required string field; absent or blank values are rejected.
fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    let value = match value {
        Some(v) => interpolate(field, &v)?,
        None => return Err(ConfigError::MissingField { field }),
    };
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField { field });
    }
    Ok(value)
}

fn build_chat_config(raw: raw::RawChatConfig) -> Result<ChatConfig, ConfigError> {
    let system_prompt = match raw.system_prompt {
        Some(p) => interpolate("system_prompt", &p)?,
        None => DEFAULT_SYSTEM_PROMPT.to_string(),
    };

    let max_tokens = raw.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    if max_tokens == 0 {
        return Err(ConfigError::Validation(
            "chat.max_tokens must be greater than 0".to_string(),
        ));
    }

    let temperature = raw.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::Validation(format!(
            "chat.temperature {temperature} out of range, expected 0.0..=2.0"
        )));
    }

    let top_p = raw.top_p.unwrap_or(DEFAULT_TOP_P);
    if !(top_p > 0.0 && top_p <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "chat.top_p {top_p} out of range, expected (0.0, 1.0]"
        )));
    }

    Ok(ChatConfig {
        system_prompt,
        max_tokens,
        temperature,
        top_p,
    })
}
