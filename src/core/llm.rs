// src/core/llm.rs

//! Language-model providers used by the report synthesizer.
//!
//! Supports the Anthropic Messages API and a local Ollama server. Both are
//! plain prompt-in, text-out; callers parse whatever structure they asked for.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{LlmProviderKind, LlmSettings};
use crate::core::error::LlmError;

const CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
const CLAUDE_DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";
const OLLAMA_DEFAULT_MODEL: &str = "llama3.1";

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends one system + user prompt pair and returns the reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;

    fn name(&self) -> &str;
}

/// Builds the provider selected in the settings.
///
/// A missing provider or API key is not an error here: the returned provider
/// fails every request instead, so the rest of the app keeps working.
pub fn provider_from_settings(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match settings.provider {
        LlmProviderKind::None => Ok(Arc::new(Unconfigured { missing_key: None })),
        LlmProviderKind::Claude => match std::env::var(&settings.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Arc::new(ClaudeProvider::new(key, settings)?)),
            _ => {
                warn!(env = %settings.api_key_env, "Claude selected but no API key is set.");
                Ok(Arc::new(Unconfigured { missing_key: Some(settings.api_key_env.clone()) }))
            }
        },
        LlmProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(settings)?)),
    }
}

fn http_client(settings: &LlmSettings) -> Result<Client, LlmError> {
    Ok(Client::builder().timeout(Duration::from_secs(settings.timeout_secs)).build()?)
}

/// Stand-in used when no provider can be reached; every call fails.
pub struct Unconfigured {
    missing_key: Option<String>,
}

#[async_trait]
impl LlmProvider for Unconfigured {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        match &self.missing_key {
            Some(env) => Err(LlmError::MissingApiKey(env.clone())),
            None => Err(LlmError::NotConfigured),
        }
    }

    fn name(&self) -> &str {
        "none"
    }
}

pub struct ClaudeProvider {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: Client,
}

impl ClaudeProvider {
    pub fn new(api_key: String, settings: &LlmSettings) -> Result<Self, LlmError> {
        Ok(Self {
            api_key,
            model: settings.model.clone().unwrap_or_else(|| CLAUDE_DEFAULT_MODEL.to_string()),
            base_url: settings.base_url.clone().unwrap_or_else(|| CLAUDE_BASE_URL.to_string()),
            max_tokens: settings.max_tokens,
            client: http_client(settings)?,
        })
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [{ "role": "user", "content": prompt }],
        });
        info!(model = %self.model, "Sending prompt to Claude.");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let reply: Value = response.json().await?;
        let text = reply["content"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse("missing content array".to_string()))?
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect::<Vec<_>>()
            .join("");
        debug!(chars = text.len(), "Claude replied.");
        Ok(text)
    }

    fn name(&self) -> &str {
        "claude"
    }
}

pub struct OllamaProvider {
    model: String,
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        Ok(Self {
            model: settings.model.clone().unwrap_or_else(|| OLLAMA_DEFAULT_MODEL.to_string()),
            base_url: settings.base_url.clone().unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            client: http_client(settings)?,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "stream": false,
        });
        info!(model = %self.model, "Sending prompt to Ollama.");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let reply: Value = response.json().await?;
        reply["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("missing message.content".to_string()))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
