// src/core/synthesis.rs

//! Turns a finished audit into a consolidated, prioritized report with the
//! help of a language model. Failures here never touch per-check results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::SynthesisError;
use crate::core::llm::LlmProvider;
use crate::core::models::{AuditSnapshot, CheckId};

pub const NO_DATA: &str = "No data collected.";
pub const SUMMARY_FALLBACK: &str = "Could not generate summary at this time.";

const REPORT_SYSTEM_PROMPT: &str = "You are an expert web development consultant. \
You analyze website audit reports and answer with a single JSON object and nothing else.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are an expert web performance analyst. \
You write short, plain-text summaries of website audit report sections.";

/// Raw report text for the four fixed categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTexts {
    pub performance: String,
    pub accessibility: String,
    pub best_practices: String,
    pub seo: String,
}

impl ReportTexts {
    /// Groups the snapshot's results into the four categories.
    pub fn from_snapshot(snapshot: &AuditSnapshot) -> Self {
        let section = |ids: &[CheckId]| {
            let parts: Vec<String> = ids
                .iter()
                .filter_map(|id| snapshot.result(*id).map(|result| format!("## {id}\n{}", result.raw_text())))
                .collect();
            if parts.is_empty() {
                NO_DATA.to_string()
            } else {
                parts.join("\n\n")
            }
        };
        Self {
            performance: section(&[CheckId::Performance]),
            accessibility: section(&[CheckId::Accessibility]),
            best_practices: section(&[CheckId::Headers, CheckId::Ssl, CheckId::Observatory, CheckId::Security]),
            seo: section(&[CheckId::Social, CheckId::BrokenLinks]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub priority: Priority,
    pub task: String,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullReport {
    pub overall_summary: String,
    pub key_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub action_plan: Vec<ActionItem>,
}

/// What the full-report request hands back: the report, or a displayable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FullReportOutcome {
    Report(FullReport),
    Error { error: String },
}

pub struct ReportSynthesizer {
    provider: Arc<dyn LlmProvider>,
}

impl ReportSynthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn synthesize(&self, texts: &ReportTexts) -> Result<FullReport, SynthesisError> {
        info!(provider = self.provider.name(), "Requesting full report.");
        let reply = self.provider.complete(REPORT_SYSTEM_PROMPT, &report_prompt(texts)).await?;
        let report = parse_report(&reply)?;
        info!(actions = report.action_plan.len(), "Full report synthesized.");
        Ok(report)
    }

    /// Like [`ReportSynthesizer::synthesize`], but never fails.
    pub async fn full_report(&self, texts: &ReportTexts) -> FullReportOutcome {
        match self.synthesize(texts).await {
            Ok(report) => FullReportOutcome::Report(report),
            Err(e) => {
                warn!(error = %e, "Full report synthesis failed.");
                FullReportOutcome::Error { error: e.to_string() }
            }
        }
    }

    /// At most three sentences about one report section, or a fixed fallback.
    pub async fn summarize_section(&self, section: &str, report: &str) -> String {
        let prompt = format!(
            "Report Section Title: {section}\nReport Section Content:\n{report}\n\n\
             Summarize the key findings and recommendations from this content \
             in no more than three sentences."
        );
        match self.provider.complete(SUMMARY_SYSTEM_PROMPT, &prompt).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => SUMMARY_FALLBACK.to_string(),
            Err(e) => {
                warn!(section, error = %e, "Section summary failed.");
                SUMMARY_FALLBACK.to_string()
            }
        }
    }
}

fn report_prompt(texts: &ReportTexts) -> String {
    format!(
        "Analyze these four audit reports and give one consolidated, high-level analysis.\n\n\
         # Performance Report\n{}\n\n\
         # Accessibility Report\n{}\n\n\
         # Best Practices Report\n{}\n\n\
         # SEO Report\n{}\n\n\
         Answer with JSON of this shape:\n\
         {{\"overallSummary\": string, \"keyStrengths\": [string], \"areasForImprovement\": [string], \
         \"actionPlan\": [{{\"priority\": \"High\" | \"Medium\" | \"Low\", \"task\": string, \"justification\": string}}]}}\n\n\
         The summary is a holistic overview, not a list of scores. Give 3-5 strengths and 3-5 areas \
         for improvement. The action plan is prioritized and every item explains why it matters. \
         Be encouraging but direct.",
        texts.performance, texts.accessibility, texts.best_practices, texts.seo
    )
}

fn parse_report(reply: &str) -> Result<FullReport, SynthesisError> {
    let json = extract_json(reply).ok_or_else(|| SynthesisError::InvalidShape("no JSON object in reply".to_string()))?;
    debug!(chars = json.len(), "Extracted report JSON.");
    let report: FullReport =
        serde_json::from_str(json).map_err(|e| SynthesisError::InvalidShape(e.to_string()))?;
    if report.overall_summary.trim().is_empty() {
        return Err(SynthesisError::InvalidShape("overallSummary is empty".to_string()));
    }
    Ok(report)
}

/// Finds the JSON object in a model reply: a fenced ```json block if present,
/// otherwise the first balanced `{...}` span.
fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
