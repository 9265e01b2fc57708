// src/core/checks/mod.rs

//! Check adapters: one per external capability (HTTP fetch, DNS/WHOIS,
//! TLS handshake, subprocess, remote API).
//!
//! Adapters know nothing about deadlines or other checks. They receive their
//! derived input and a `Progress` handle, and return a JSON payload or an
//! `AdapterError`.

pub mod dns;
pub mod headers;
pub mod links;
pub mod local;
pub mod markup;
pub mod observatory;
pub mod performance;
pub mod ports;
pub mod security;
pub mod social;
pub mod ssl;
pub mod whois;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::HttpSettings;
use crate::core::error::AdapterError;

/// Input handed to an adapter, derived from the target by the check's input rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInput {
    /// The full normalized target, e.g. `https://example.com`.
    Url(String),
    /// Scheme-less host, e.g. `example.com`.
    Host(String),
    /// The local working tree; the target is not used.
    Workspace(PathBuf),
}

impl CheckInput {
    pub fn as_url(&self) -> Result<&str, AdapterError> {
        match self {
            CheckInput::Url(url) => Ok(url),
            other => Err(AdapterError::Parse(format!("expected a URL input, got {other:?}"))),
        }
    }

    pub fn as_host(&self) -> Result<&str, AdapterError> {
        match self {
            CheckInput::Host(host) => Ok(host),
            other => Err(AdapterError::Parse(format!("expected a host input, got {other:?}"))),
        }
    }

    pub fn as_workspace(&self) -> Result<&PathBuf, AdapterError> {
        match self {
            CheckInput::Workspace(dir) => Ok(dir),
            other => Err(AdapterError::Parse(format!("expected a workspace input, got {other:?}"))),
        }
    }
}

/// Slot an adapter can publish intermediate results to. If the check times
/// out, the last published value becomes its partial payload.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<Mutex<Option<Value>>>);

impl Progress {
    pub fn publish(&self, partial: Value) {
        *self.0.lock() = Some(partial);
    }

    pub fn latest(&self) -> Option<Value> {
        self.0.lock().clone()
    }
}

#[async_trait]
pub trait CheckAdapter: Send + Sync {
    async fn run(&self, input: CheckInput, progress: Progress) -> Result<Value, AdapterError>;
}

/// Builds the HTTP client shared by the web-facing adapters.
pub fn build_client(settings: &HttpSettings) -> Result<Client, AdapterError> {
    Ok(Client::builder()
        .user_agent(settings.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
        .build()?)
}

/// A fetched page: final status, headers and body text.
#[derive(Debug)]
pub struct Page {
    pub url: reqwest::Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Page {
    /// Rejects error pages, whose markup says nothing about the site itself.
    pub fn require_success(self) -> Result<Self, AdapterError> {
        if self.status.is_client_error() || self.status.is_server_error() {
            return Err(AdapterError::Remote(format!("{} returned HTTP {}", self.url, self.status.as_u16())));
        }
        Ok(self)
    }
}

pub async fn fetch_page(client: &Client, url: &str) -> Result<Page, AdapterError> {
    debug!(url, "Fetching page.");
    let response = client.get(url).send().await?;
    let status = response.status();
    let final_url = response.url().clone();
    let headers = response.headers().clone();
    let body = response.text().await?;
    debug!(url, status = %status, bytes = body.len(), "Page fetched.");
    Ok(Page { url: final_url, status, headers, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn progress_keeps_latest_publication() {
        let progress = Progress::default();
        assert_eq!(progress.latest(), None);
        progress.publish(json!({ "checked": 1 }));
        progress.clone().publish(json!({ "checked": 2 }));
        assert_eq!(progress.latest(), Some(json!({ "checked": 2 })));
    }

    #[test]
    fn input_accessors_reject_the_wrong_shape() {
        assert_eq!(CheckInput::Host("example.com".into()).as_host().unwrap(), "example.com");
        assert!(CheckInput::Host("example.com".into()).as_url().is_err());
        assert!(CheckInput::Url("https://example.com".into()).as_workspace().is_err());
    }
}
