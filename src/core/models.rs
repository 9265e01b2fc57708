// src/core/models.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

// --- Check Identifiers ---

/// The closed set of audit checks the sandbox knows how to run.
///
/// The string form (`Display`, `FromStr` and serde) is the stable camelCase
/// identifier used by configuration, exports and logs, e.g. `rateLimit`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum CheckId {
    Security,
    BrokenLinks,
    Dns,
    Social,
    Ssl,
    Observatory,
    Dependency,
    Headers,
    RateLimit,
    Auth,
    Privacy,
    Accessibility,
    Performance,
    Ports,
    Secrets,
    Backup,
}

// --- Check Results ---

/// The single outcome of one check within one audit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum CheckResult {
    /// The adapter settled with a structured payload.
    Success(Value),
    /// The adapter failed, or returned an error-shaped payload.
    Failure(String),
    /// The deadline fired first. Carries whatever the adapter had published so far.
    TimedOut(Option<Value>),
}

impl CheckResult {
    /// Turns an adapter outcome into a result, folding error-shaped payloads
    /// (`{"error": "..."}`) into `Failure` so consumers see a single shape.
    pub fn from_adapter<E: std::fmt::Display>(outcome: Result<Value, E>) -> Self {
        match outcome {
            Ok(payload) => match error_message(&payload) {
                Some(message) => CheckResult::Failure(message),
                None => CheckResult::Success(payload),
            },
            Err(e) => CheckResult::Failure(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckResult::Success(_))
    }

    /// Short human-readable status used by the UI and exports.
    pub fn status_label(&self) -> &'static str {
        match self {
            CheckResult::Success(_) => "OK",
            CheckResult::Failure(_) => "FAILED",
            CheckResult::TimedOut(_) => "TIMED OUT",
        }
    }

    /// Raw textual form of the result, as fed to the report synthesizer.
    pub fn raw_text(&self) -> String {
        match self {
            CheckResult::Success(payload) => pretty(payload),
            CheckResult::Failure(message) => format!("Check failed: {message}"),
            CheckResult::TimedOut(Some(partial)) => {
                format!("Check timed out, partial results:\n{}", pretty(partial))
            }
            CheckResult::TimedOut(None) => "Check timed out before producing results.".to_string(),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Extracts the message of an error-shaped payload, if the payload is one.
fn error_message(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    if error.is_null() {
        return None;
    }
    let mut message = match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if let Some(details) = payload.get("details").and_then(Value::as_str) {
        let details = details.trim();
        if !details.is_empty() {
            message = format!("{message}: {details}");
        }
    }
    Some(message)
}

/// One settled check, as emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckEvent {
    pub id: CheckId,
    pub result: CheckResult,
}

/// A point-in-time copy of an audit run, safe to render or export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSnapshot {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub selected: Vec<CheckId>,
    pub results: BTreeMap<CheckId, CheckResult>,
    pub settled: bool,
}

impl AuditSnapshot {
    pub fn result(&self, id: CheckId) -> Option<&CheckResult> {
        self.results.get(&id)
    }

    /// Counts of (success, failure, timed out) results recorded so far.
    pub fn tally(&self) -> (usize, usize, usize) {
        self.results.values().fold((0, 0, 0), |(ok, failed, timed_out), r| match r {
            CheckResult::Success(_) => (ok + 1, failed, timed_out),
            CheckResult::Failure(_) => (ok, failed + 1, timed_out),
            CheckResult::TimedOut(_) => (ok, failed, timed_out + 1),
        })
    }
}

// --- Findings ---

/// Severity level of a finding produced by an adapter's own analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// A machine-readable finding code, e.g. `HEADERS_CSP_MISSING`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisFinding {
    pub severity: Severity,
    pub code: String,
}

impl AnalysisFinding {
    pub fn new(severity: Severity, code: &str) -> Self {
        Self { severity, code: code.to_string() }
    }
}

// --- SSL/TLS Models ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInfo {
    pub subject_name: String,
    pub issuer_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub days_until_expiry: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslData {
    pub host: String,
    pub is_valid: bool,
    pub certificate_info: CertificateInfo,
}

// --- Fingerprint Models ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Technology {
    pub name: String,
    pub category: String,
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn check_ids_use_camel_case_strings() {
        assert_eq!(CheckId::RateLimit.to_string(), "rateLimit");
        assert_eq!(CheckId::BrokenLinks.as_ref(), "brokenLinks");
        assert_eq!(CheckId::from_str("ssl").unwrap(), CheckId::Ssl);
        assert!(CheckId::from_str("ratelimit").is_err());
        assert_eq!(serde_json::to_value(CheckId::Headers).unwrap(), json!("headers"));
        assert_eq!(CheckId::iter().count(), 16);
    }

    #[test]
    fn error_shaped_payload_becomes_failure() {
        let result = CheckResult::from_adapter::<String>(Ok(json!({ "error": "boom" })));
        assert_eq!(result, CheckResult::Failure("boom".to_string()));

        let result = CheckResult::from_adapter::<String>(Ok(
            json!({ "error": "nmap scan failed", "details": "host down\n" }),
        ));
        assert_eq!(result, CheckResult::Failure("nmap scan failed: host down".to_string()));
    }

    #[test]
    fn thrown_and_returned_errors_share_a_shape() {
        let thrown = CheckResult::from_adapter::<&str>(Err("connection refused"));
        let returned = CheckResult::from_adapter::<&str>(Ok(json!({ "error": "connection refused" })));
        assert_eq!(thrown, returned);
    }

    #[test]
    fn null_error_field_is_still_success() {
        let payload = json!({ "error": null, "headers": {} });
        assert!(CheckResult::from_adapter::<String>(Ok(payload)).is_success());
    }

    #[test]
    fn tally_counts_each_variant() {
        let mut results = BTreeMap::new();
        results.insert(CheckId::Headers, CheckResult::Success(json!({})));
        results.insert(CheckId::Dns, CheckResult::Failure("x".into()));
        results.insert(CheckId::Ssl, CheckResult::TimedOut(None));
        results.insert(CheckId::Ports, CheckResult::TimedOut(Some(json!([]))));
        let snapshot = AuditSnapshot {
            target: "https://example.com".into(),
            started_at: Utc::now(),
            selected: results.keys().copied().collect(),
            results,
            settled: true,
        };
        assert_eq!(snapshot.tally(), (1, 1, 2));
    }
}
