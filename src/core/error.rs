// src/core/error.rs

//! Error types for the audit core.
//!
//! Only `AuditError` ever escapes the orchestrator, and only before any check
//! has started. Everything an adapter can hit is an `AdapterError`, which the
//! orchestrator turns into a `CheckResult::Failure` for that one check.

use thiserror::Error;

/// Errors that reject an audit before orchestration begins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown check: {0}")]
    UnknownCheck(String),
}

/// Errors raised by a single check adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Failed to run {program}: {message}")]
    Process { program: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Remote(String),
}

/// Errors from the language-model collaborator.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No language model provider is configured")]
    NotConfigured,

    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Failure of the full-report synthesizer. Never affects per-check results.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Synthesis failed: {0}")]
    Provider(#[from] LlmError),

    #[error("Synthesis failed: unexpected report shape: {0}")]
    InvalidShape(String),
}
