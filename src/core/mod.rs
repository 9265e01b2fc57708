// src/core/mod.rs

// The audit engine. Nothing in here knows about the terminal UI; the UI only
// reads `AuditRun` snapshots and events.

/// Check identifiers, results, snapshots and the payload types adapters share.
pub mod models;

/// Error enums for validation, adapters and synthesis.
pub mod error;

/// Target normalization and host extraction.
pub mod target;

/// Deadline wrapper used around every check.
pub mod envelope;

/// One-result-per-check store for a run.
pub mod aggregate;

/// The adapters that actually perform each check.
pub mod checks;

/// Static check table: labels, budgets, input rules and adapter bindings.
pub mod registry;

/// Launches checks concurrently and streams their results.
pub mod orchestrator;

/// Titles and remediation advice for finding codes.
pub mod knowledge_base;

pub mod llm;

/// Full-report and section-summary generation.
pub mod synthesis;
