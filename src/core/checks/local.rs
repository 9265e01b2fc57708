// src/core/checks/local.rs

//! Checks that inspect the local working tree instead of the remote target:
//! exposed secrets, backup/recovery documentation and vulnerable dependencies.

use std::path::Path;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ToolSettings;
use crate::core::checks::{CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;

const SECRET_PATTERN: &str = "(key|secret|password|token)";
const EXCLUDED_DIRS: &[&str] = &["node_modules", "target", ".git", ".next", "dist"];
const EXCLUDED_FILES: &[&str] = &["package-lock.json", "yarn.lock", "Cargo.lock", "pnpm-lock.yaml"];
/// Matches beyond this are dropped; the count is still reported.
const MAX_SECRET_MATCHES: usize = 200;
const MAX_LINE_CHARS: usize = 200;

static RE_BACKUP_DOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)backup|recovery|disaster").expect("valid backup regex"));

/// Secrets & key exposure scan: a recursive, case-insensitive grep.
pub struct SecretsCheck {
    grep: String,
}

impl SecretsCheck {
    pub fn new(tools: &ToolSettings) -> Self {
        Self { grep: tools.grep.clone() }
    }
}

#[async_trait]
impl CheckAdapter for SecretsCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let dir = input.as_workspace()?;
        info!(dir = %dir.display(), "Starting secrets scan.");

        let mut command = Command::new(&self.grep);
        command.arg("-rniIE");
        for excluded in EXCLUDED_DIRS {
            command.arg(format!("--exclude-dir={excluded}"));
        }
        for excluded in EXCLUDED_FILES {
            command.arg(format!("--exclude={excluded}"));
        }
        command.arg(SECRET_PATTERN).arg(".").current_dir(dir).kill_on_drop(true);

        let output = command
            .output()
            .await
            .map_err(|e| AdapterError::Process { program: self.grep.clone(), message: e.to_string() })?;

        // grep exits 1 when nothing matched; only 2 and above are failures.
        match output.status.code() {
            Some(0) | Some(1) => {}
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                warn!(status = %output.status, "Secrets scan failed.");
                return Ok(json!({ "error": "grep scan failed", "details": stderr }));
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (matches, total) = parse_grep_output(&stdout);
        info!(total, "Secrets scan finished.");
        Ok(json!({ "matches": matches, "total": total, "truncated": total > matches.len() }))
    }
}

/// Parses `path:line:text` lines, keeping at most `MAX_SECRET_MATCHES`.
fn parse_grep_output(stdout: &str) -> (Vec<Value>, usize) {
    let mut total = 0;
    let mut matches = Vec::new();
    for line in stdout.lines().filter(|l| !l.is_empty()) {
        total += 1;
        if matches.len() >= MAX_SECRET_MATCHES {
            continue;
        }
        let mut parts = line.splitn(3, ':');
        let (Some(file), Some(number), Some(text)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let Ok(number) = number.parse::<u64>() else {
            continue;
        };
        let file = file.strip_prefix("./").unwrap_or(file);
        let text: String = text.trim().chars().take(MAX_LINE_CHARS).collect();
        matches.push(json!({ "file": file, "line": number, "text": text }));
    }
    (matches, total)
}

/// Looks for backup or disaster-recovery documentation at the workspace root.
pub struct BackupCheck;

#[async_trait]
impl CheckAdapter for BackupCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let dir = input.as_workspace()?;
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if RE_BACKUP_DOC.is_match(&name) {
                found.push(name);
            }
        }
        found.sort();
        info!(dir = %dir.display(), found = found.len(), "Backup documentation check finished.");
        Ok(json!({ "found": found }))
    }
}

/// Dependency vulnerability scan through the ecosystem's own audit tool.
pub struct DependencyCheck {
    cargo: String,
    npm: String,
}

impl DependencyCheck {
    pub fn new(tools: &ToolSettings) -> Self {
        Self { cargo: tools.cargo.clone(), npm: tools.npm.clone() }
    }

    /// Picks the audit command for the lockfile present in `dir`.
    fn audit_command(&self, dir: &Path) -> Option<(&'static str, &str, &'static [&'static str])> {
        if dir.join("Cargo.lock").is_file() {
            Some(("cargo", self.cargo.as_str(), &["audit", "--json"]))
        } else if dir.join("package-lock.json").is_file() {
            Some(("npm", self.npm.as_str(), &["audit", "--json"]))
        } else {
            None
        }
    }
}

#[async_trait]
impl CheckAdapter for DependencyCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let dir = input.as_workspace()?;
        let Some((ecosystem, program, args)) = self.audit_command(dir) else {
            debug!(dir = %dir.display(), "No lockfile found.");
            return Ok(json!({
                "error": "No supported lockfile found",
                "details": "expected Cargo.lock or package-lock.json in the workspace",
            }));
        };
        info!(ecosystem, program, "Starting dependency audit.");

        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AdapterError::Process { program: program.to_string(), message: e.to_string() })?;

        // Both tools exit non-zero when they find vulnerabilities, so the JSON
        // report decides success, not the exit status.
        match serde_json::from_slice::<Value>(&output.stdout) {
            Ok(report) => {
                info!(ecosystem, status = %output.status, "Dependency audit finished.");
                Ok(json!({ "ecosystem": ecosystem, "report": report }))
            }
            Err(e) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                warn!(ecosystem, error = %e, "Dependency audit produced no JSON report.");
                Ok(json!({ "error": format!("{ecosystem} audit failed"), "details": stderr }))
            }
        }
    }
}
