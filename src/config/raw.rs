// Raw YAML deserialization types (internal)
// Separate from the public Config structs: interpolation and validation
// happen between raw and public.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub relay: String,
    pub upstream: Option<RawUpstreamConfig>,
    pub chat: Option<RawChatConfig>,
    pub environment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawUpstreamConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: Option<String>,
    pub deployment: Option<String>,
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawChatConfig {
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}
