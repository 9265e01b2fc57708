// src/app.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use ratatui::widgets::ListState;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::core::models::{AnalysisFinding, AuditSnapshot, CheckId, CheckResult, Severity};
use crate::core::orchestrator::{AuditRun, Orchestrator};
use crate::core::registry::{all_descriptors, CheckDescriptor};
use crate::core::synthesis::{FullReportOutcome, ReportSynthesizer, ReportTexts};
use crate::logging::get_data_dir;

pub const SPINNER_CHARS: [char; 8] = ['⣷', '⣯', '⣟', '⡿', '⢿', '⣻', '⣽', '⣾'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// The start-up disclaimer is showing.
    Disclaimer,
    /// Editing the target and the check selection.
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Target,
    Checks,
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportState {
    NotRequested,
    Pending,
    Ready(FullReportOutcome),
}

/// Issue counts and a rough score derived from the snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub score: u8,
    pub critical_issues: usize,
    pub warning_issues: usize,
    pub ok: usize,
    pub failed: usize,
    pub timed_out: usize,
}

/// A section summary, tagged with the start time of the run it belongs to.
type SectionReply = (DateTime<Utc>, CheckId, String);

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub focus: Focus,
    pub input: String,
    /// Validation message from the last start attempt.
    pub input_error: Option<String>,
    pub checks: Vec<CheckDescriptor>,
    pub selected: BTreeSet<CheckId>,
    pub check_list_state: ListState,
    pub results_list_state: ListState,
    pub detail_scroll: u16,
    pub snapshot: Option<AuditSnapshot>,
    pub summary: ScanSummary,
    pub report: ReportState,
    pub show_report: bool,
    pub report_scroll: u16,
    /// Short model-written summaries per check; `None` while one is pending.
    pub section_summaries: BTreeMap<CheckId, Option<String>>,
    pub export_status: ExportStatus,
    pub spinner_frame: usize,
    orchestrator: Orchestrator,
    synthesizer: Arc<ReportSynthesizer>,
    run: Option<AuditRun>,
    report_rx: Option<oneshot::Receiver<FullReportOutcome>>,
    summaries_tx: mpsc::UnboundedSender<SectionReply>,
    summaries_rx: mpsc::UnboundedReceiver<SectionReply>,
}

impl App {
    pub fn new(orchestrator: Orchestrator, synthesizer: Arc<ReportSynthesizer>) -> Self {
        let checks = all_descriptors();
        // Every check is selected by default.
        let selected = checks.iter().map(|d| d.id).collect();
        let (summaries_tx, summaries_rx) = mpsc::unbounded_channel();
        Self {
            should_quit: false,
            state: AppState::Disclaimer,
            focus: Focus::Target,
            input: String::new(),
            input_error: None,
            checks,
            selected,
            check_list_state: ListState::default().with_selected(Some(0)),
            results_list_state: ListState::default(),
            detail_scroll: 0,
            snapshot: None,
            summary: ScanSummary::default(),
            report: ReportState::NotRequested,
            show_report: false,
            report_scroll: 0,
            section_summaries: BTreeMap::new(),
            export_status: ExportStatus::Idle,
            spinner_frame: 0,
            orchestrator,
            synthesizer,
            run: None,
            report_rx: None,
            summaries_tx,
            summaries_rx,
        }
    }

    pub fn acknowledge_disclaimer(&mut self) {
        self.state = AppState::Idle;
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match (self.state, self.focus) {
            (AppState::Idle, Focus::Target) => Focus::Checks,
            (AppState::Idle, _) => Focus::Target,
            (_, Focus::Results) => Focus::Checks,
            _ => Focus::Results,
        };
    }

    pub fn toggle_current_check(&mut self) {
        let Some(descriptor) = self.check_list_state.selected().and_then(|i| self.checks.get(i)) else {
            return;
        };
        let id = descriptor.id;
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Selects every check, or clears the selection if everything is already selected.
    pub fn toggle_all_checks(&mut self) {
        if self.selected.len() == self.checks.len() {
            self.selected.clear();
        } else {
            self.selected = self.checks.iter().map(|d| d.id).collect();
        }
    }

    pub fn next_item(&mut self) {
        match self.focus {
            Focus::Checks => self.check_list_state.select_next(),
            Focus::Results => {
                self.results_list_state.select_next();
                self.detail_scroll = 0;
            }
            Focus::Target => {}
        }
    }

    pub fn previous_item(&mut self) {
        match self.focus {
            Focus::Checks => self.check_list_state.select_previous(),
            Focus::Results => {
                self.results_list_state.select_previous();
                self.detail_scroll = 0;
            }
            Focus::Target => {}
        }
    }

    pub fn scroll_detail_down(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_add(3);
    }

    pub fn scroll_detail_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(3);
    }

    pub fn scroll_report(&mut self, lines: i16) {
        self.report_scroll = self.report_scroll.saturating_add_signed(lines);
    }

    /// Validates the form and launches the audit. Validation errors stay on
    /// screen next to the input; nothing is started.
    pub fn start_audit(&mut self) {
        let names: Vec<String> = self.selected.iter().map(ToString::to_string).collect();
        match self.orchestrator.run_audit(&self.input, names.as_slice()) {
            Ok(run) => {
                info!(target = run.target().as_str(), checks = names.len(), "Audit started from the UI.");
                self.snapshot = Some(run.snapshot());
                self.run = Some(run);
                self.input_error = None;
                self.state = AppState::Running;
                self.focus = Focus::Results;
                self.results_list_state = ListState::default().with_selected(Some(0));
                self.detail_scroll = 0;
                self.report = ReportState::NotRequested;
                self.section_summaries.clear();
                self.export_status = ExportStatus::Idle;
                self.update_summary();
            }
            Err(e) => {
                warn!(error = %e, "Audit rejected.");
                self.input_error = Some(e.to_string());
            }
        }
    }

    /// Pulls any settled checks and any finished report into the view state.
    pub fn on_tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();

        if let Some(run) = self.run.as_mut() {
            let mut changed = false;
            while run.try_next_event().is_some() {
                changed = true;
            }
            if changed || self.snapshot.is_none() {
                let snapshot = run.snapshot();
                if snapshot.settled && self.state == AppState::Running {
                    info!(target = %snapshot.target, "Audit settled.");
                    self.state = AppState::Finished;
                }
                self.snapshot = Some(snapshot);
                self.update_summary();
            }
        }

        let current_run = self.snapshot.as_ref().map(|s| s.started_at);
        while let Ok((run_started, id, summary)) = self.summaries_rx.try_recv() {
            if current_run != Some(run_started) {
                debug!(check = %id, "Dropping a summary from a discarded run.");
                continue;
            }
            if let Some(slot) = self.section_summaries.get_mut(&id) {
                *slot = Some(summary);
            }
        }

        if let Some(rx) = self.report_rx.as_mut() {
            match rx.try_recv() {
                Ok(outcome) => {
                    self.report = ReportState::Ready(outcome);
                    self.report_rx = None;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.report = ReportState::Ready(FullReportOutcome::Error {
                        error: "Report generation was interrupted.".to_string(),
                    });
                    self.report_rx = None;
                }
            }
        }
    }

    /// Asks the synthesizer for a full report of the settled run, in the background.
    pub fn request_full_report(&mut self) {
        self.show_report = true;
        self.report_scroll = 0;
        if self.report != ReportState::NotRequested {
            return;
        }
        let Some(snapshot) = self.snapshot.as_ref().filter(|s| s.settled) else {
            return;
        };
        let texts = ReportTexts::from_snapshot(snapshot);
        let synthesizer = self.synthesizer.clone();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = synthesizer.full_report(&texts).await;
            let _ = tx.send(outcome);
        });
        self.report_rx = Some(rx);
        self.report = ReportState::Pending;
    }

    /// Asks for a short summary of the check under the cursor, once per check.
    pub fn request_section_summary(&mut self) {
        let Some(run_started) = self.snapshot.as_ref().map(|s| s.started_at) else {
            return;
        };
        let Some((id, Some(result))) = self.current_result() else {
            return;
        };
        if self.section_summaries.contains_key(&id) {
            return;
        }
        let section = id.descriptor().label;
        let raw = result.raw_text();
        let synthesizer = self.synthesizer.clone();
        let tx = self.summaries_tx.clone();
        tokio::spawn(async move {
            let summary = synthesizer.summarize_section(section, &raw).await;
            let _ = tx.send((run_started, id, summary));
        });
        self.section_summaries.insert(id, None);
    }

    /// Name of the provider behind report synthesis.
    pub fn report_provider(&self) -> &str {
        self.synthesizer.provider_name()
    }

    pub fn close_report(&mut self) {
        self.show_report = false;
    }

    pub fn export(&mut self) {
        self.export_status = match self.export_to(get_data_dir()) {
            Ok(path) => ExportStatus::Success(path.display().to_string()),
            Err(e) => ExportStatus::Error(e.to_string()),
        };
    }

    /// Writes the current snapshot (and the full report, if ready) as JSON into `dir`.
    pub fn export_to(&self, dir: PathBuf) -> Result<PathBuf> {
        let Some(snapshot) = &self.snapshot else {
            return Err(color_eyre::eyre::eyre!("Nothing to export yet"));
        };
        let report = match &self.report {
            ReportState::Ready(outcome) => Some(outcome),
            _ => None,
        };
        let document = json!({ "audit": snapshot, "fullReport": report });

        std::fs::create_dir_all(&dir)?;
        let file_name = format!("audit-{}.json", snapshot.started_at.format("%Y%m%d-%H%M%S"));
        let path = dir.join(file_name);
        std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;
        info!(path = %path.display(), "Audit exported.");
        Ok(path)
    }

    /// Findings reported by successful checks, tagged with the check that raised them.
    pub fn findings(&self) -> Vec<(CheckId, AnalysisFinding)> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };
        snapshot
            .results
            .iter()
            .filter_map(|(id, result)| match result {
                CheckResult::Success(payload) => Some((*id, payload)),
                _ => None,
            })
            .flat_map(|(id, payload)| {
                payload["analysis"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|v| serde_json::from_value::<AnalysisFinding>(v.clone()).ok())
                    .map(move |finding| (id, finding))
            })
            .collect()
    }

    pub fn update_summary(&mut self) {
        let Some(snapshot) = &self.snapshot else {
            self.summary = ScanSummary::default();
            return;
        };
        let (ok, failed, timed_out) = snapshot.tally();
        let findings = self.findings();
        let critical_issues = findings.iter().filter(|(_, f)| matches!(f.severity, Severity::Critical)).count();
        let warning_issues = findings.iter().filter(|(_, f)| matches!(f.severity, Severity::Warning)).count();

        let penalty = critical_issues * 15 + warning_issues * 5 + failed * 5 + timed_out * 3;
        self.summary = ScanSummary {
            score: 100usize.saturating_sub(penalty) as u8,
            critical_issues,
            warning_issues,
            ok,
            failed,
            timed_out,
        };
    }

    /// The check under the cursor in the results panel.
    pub fn current_result(&self) -> Option<(CheckId, Option<&CheckResult>)> {
        let snapshot = self.snapshot.as_ref()?;
        let id = *snapshot.selected.get(self.results_list_state.selected()?)?;
        Some((id, snapshot.result(id)))
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Back to the form for a new audit. A run still in flight is discarded.
    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.focus = Focus::Target;
        self.input.clear();
        self.input_error = None;
        self.run = None;
        self.snapshot = None;
        self.summary = ScanSummary::default();
        self.results_list_state = ListState::default();
        self.detail_scroll = 0;
        self.report = ReportState::NotRequested;
        self.report_rx = None;
        self.show_report = false;
        self.section_summaries.clear();
        self.export_status = ExportStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checks::{CheckAdapter, CheckInput, Progress};
    use crate::core::error::{AdapterError, LlmError};
    use crate::core::llm::LlmProvider;
    use crate::core::registry::ScanRegistry;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;

    struct Headers;

    #[async_trait]
    impl CheckAdapter for Headers {
        async fn run(&self, _input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
            Ok(json!({
                "status": 200,
                "analysis": [
                    { "severity": "Warning", "code": "HEADERS_HSTS_MISSING" },
                    { "severity": "Critical", "code": "SEC_EXPOSED_ENV" }
                ]
            }))
        }
    }

    struct NoModel;

    #[async_trait]
    impl LlmProvider for NoModel {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::NotConfigured)
        }

        fn name(&self) -> &str {
            "none"
        }
    }

    fn app() -> App {
        let registry = ScanRegistry::new(".").with_adapter(CheckId::Headers, Arc::new(Headers));
        App::new(
            Orchestrator::new(Arc::new(registry)),
            Arc::new(ReportSynthesizer::new(Arc::new(NoModel))),
        )
    }

    async fn settle(app: &mut App) {
        for _ in 0..100 {
            app.on_tick();
            if app.state == AppState::Finished {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("audit did not settle");
    }

    #[tokio::test]
    async fn summaries_from_a_previous_run_are_dropped() {
        let mut app = app();
        app.acknowledge_disclaimer();
        app.input = "example.com".to_string();
        app.selected = [CheckId::Headers].into_iter().collect();
        app.start_audit();
        settle(&mut app).await;
        let previous_run = app.snapshot.as_ref().unwrap().started_at;

        app.reset();
        tokio::time::sleep(Duration::from_millis(5)).await;
        app.input = "example.com".to_string();
        app.selected = [CheckId::Headers].into_iter().collect();
        app.start_audit();
        settle(&mut app).await;
        assert_ne!(app.snapshot.as_ref().unwrap().started_at, previous_run);

        // A pending slot in the new run must not be filled by the old reply.
        app.section_summaries.insert(CheckId::Headers, None);
        app.summaries_tx.send((previous_run, CheckId::Headers, "stale".to_string())).unwrap();
        app.on_tick();
        assert_eq!(app.section_summaries.get(&CheckId::Headers), Some(&None));

        let current_run = app.snapshot.as_ref().unwrap().started_at;
        app.summaries_tx.send((current_run, CheckId::Headers, "fresh".to_string())).unwrap();
        app.on_tick();
        assert_eq!(app.section_summaries.get(&CheckId::Headers), Some(&Some("fresh".to_string())));
    }

    #[test]
    fn selection_toggles() {
        let mut app = app();
        assert_eq!(app.selected.len(), app.checks.len());

        app.toggle_all_checks();
        assert!(app.selected.is_empty());

        app.check_list_state.select(Some(0));
        app.toggle_current_check();
        assert_eq!(app.selected.iter().next(), Some(&app.checks[0].id));
        app.toggle_current_check();
        assert!(app.selected.is_empty());
    }

    #[test]
    fn validation_errors_stay_on_the_form() {
        let mut app = app();
        app.acknowledge_disclaimer();
        app.start_audit();
        assert_eq!(app.input_error.as_deref(), Some("Invalid input: Please enter a URL."));
        assert_eq!(app.state, AppState::Idle);

        app.input = "example.com".to_string();
        app.selected.clear();
        app.start_audit();
        assert_eq!(app.input_error.as_deref(), Some("Invalid input: Select at least one scan."));
    }

    #[tokio::test]
    async fn audit_results_flow_into_the_summary_and_export() {
        let mut app = app();
        app.acknowledge_disclaimer();
        app.input = "example.com".to_string();
        app.selected = [CheckId::Headers].into_iter().collect();

        app.start_audit();
        assert_eq!(app.state, AppState::Running);
        settle(&mut app).await;

        assert_eq!(app.summary.ok, 1);
        assert_eq!(app.summary.critical_issues, 1);
        assert_eq!(app.summary.warning_issues, 1);
        assert_eq!(app.summary.score, 80);
        assert_eq!(app.current_result().map(|(id, _)| id), Some(CheckId::Headers));

        let dir = std::env::temp_dir().join(format!("audit-sandbox-export-{}", std::process::id()));
        let path = app.export_to(dir.clone()).unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["audit"]["target"], "https://example.com");
        assert_eq!(written["audit"]["results"]["headers"]["status"], "success");
        assert!(written["fullReport"].is_null());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn failed_synthesis_is_reported_not_raised() {
        let mut app = app();
        app.acknowledge_disclaimer();
        app.input = "https://example.com".to_string();
        app.selected = [CheckId::Headers].into_iter().collect();
        app.start_audit();
        settle(&mut app).await;

        app.scroll_report(-3);
        app.scroll_report(10);
        assert_eq!(app.report_scroll, 10);
        app.request_full_report();
        assert_eq!(app.report, ReportState::Pending);
        assert_eq!(app.report_scroll, 0, "opening the report starts at the top");
        app.scroll_report(-1);
        assert_eq!(app.report_scroll, 0);
        for _ in 0..100 {
            app.on_tick();
            if matches!(app.report, ReportState::Ready(_)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        match &app.report {
            ReportState::Ready(FullReportOutcome::Error { error }) => assert!(error.contains("No language model")),
            other => panic!("unexpected report state {other:?}"),
        }

        app.request_section_summary();
        assert_eq!(app.section_summaries.get(&CheckId::Headers), Some(&None));
        for _ in 0..100 {
            app.on_tick();
            if matches!(app.section_summaries.get(&CheckId::Headers), Some(Some(_))) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            app.section_summaries.get(&CheckId::Headers),
            Some(&Some(crate::core::synthesis::SUMMARY_FALLBACK.to_string()))
        );
    }
}
