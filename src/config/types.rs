// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Parsed and validated relay config.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where and how to reach the completion provider.
    pub upstream: UpstreamConfig,
    /// Generation parameters sent with every completion request.
    pub chat: ChatConfig,
    /// Environment label (e.g. "dev", "production").
    pub environment: String,
    /// SHA256 hash of the raw YAML document: "sha256:{hex}".
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// Upstream
// ---------------------------------------------------------------------------

/// Azure OpenAI deployment coordinates.
#[derive(Clone, PartialEq)]
pub struct UpstreamConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub deployment: String,
    /// Model name sent in the request body.
    pub model: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
}

impl UpstreamConfig {
    /// Full chat completions URL for the configured deployment.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

// The API key never reaches logs.
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .field("model", &self.model)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Chat parameters
// ---------------------------------------------------------------------------

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_TOP_P: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}
