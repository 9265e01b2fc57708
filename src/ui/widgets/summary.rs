// src/ui/widgets/summary.rs
 
use crate::app::{App, ReportState};
use crate::core::models::{CheckId, CheckResult, Technology};
use crate::core::synthesis::FullReportOutcome;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph},
    text::Line,
};
 
/// Renders the summary panel: run progress, a rough score, outcome and issue
/// counts, and the technologies the security check identified.
///
/// Everything is read from the current snapshot, so the panel updates while
/// the run is still in flight.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);
 
    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Score & rating
            Constraint::Length(1), // Progress gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(4), // Outcomes
            Constraint::Length(1), // Spacer
            Constraint::Length(3), // Issues
            Constraint::Length(1), // Spacer
            Constraint::Length(2), // Full report status
            Constraint::Min(0),    // Technologies
        ])
        .split(area);
 
    let Some(snapshot) = &app.snapshot else {
        return;
    };
    let settled_count = snapshot.results.len();
    let total = snapshot.selected.len().max(1);
 
    // --- Score & Rating ---
    let (rating_text, rating_style) = match app.summary.score {
        90..=100 => ("Excellent", Style::default().fg(Color::Green)),
        75..=89 => ("Good", Style::default().fg(Color::Cyan)),
        50..=74 => ("Needs Improvement", Style::default().fg(Color::Yellow)),
        _ => ("Poor", Style::default().fg(Color::Red)),
    };
    let score_line = if snapshot.settled {
        Line::from(format!("{}/100 ({})", app.summary.score, rating_text)).style(rating_style)
    } else {
        Line::from("pending...").dark_gray()
    };
    let score_text = Text::from(vec![Line::from("Overall Score".bold()), score_line]);
    frame.render_widget(Paragraph::new(score_text).alignment(Alignment::Center), summary_chunks[0]);
 
    // --- Progress ---
    let progress = Gauge::default()
        .ratio(settled_count as f64 / total as f64)
        .label(format!("{settled_count}/{} checks", snapshot.selected.len()))
        .gauge_style(Style::default().fg(if snapshot.settled { Color::Green } else { Color::Cyan }));
    frame.render_widget(progress, summary_chunks[1]);
 
    // --- Outcomes ---
    let outcome_lines = vec![
        Line::from("OUTCOMES".bold()),
        Line::from(vec![Span::raw("Succeeded: "), Span::styled(app.summary.ok.to_string(), Style::default().fg(Color::Green))]),
        Line::from(vec![Span::raw("Failed:    "), Span::styled(app.summary.failed.to_string(), Style::default().fg(Color::Red))]),
        Line::from(vec![Span::raw("Timed out: "), Span::styled(app.summary.timed_out.to_string(), Style::default().fg(Color::Yellow))]),
    ];
    frame.render_widget(Paragraph::new(outcome_lines), summary_chunks[3]);
 
    // --- Issues ---
    let issues_text = Text::from(vec![
        Line::from("ISSUES FOUND".bold()),
        Line::from(vec![Span::raw("Critical: "), Span::styled(app.summary.critical_issues.to_string(), Style::default().fg(Color::Red))]),
        Line::from(vec![Span::raw("Warnings: "), Span::styled(app.summary.warning_issues.to_string(), Style::default().fg(Color::Yellow))]),
    ]);
    frame.render_widget(Paragraph::new(issues_text), summary_chunks[5]);
 
    // --- Full Report ---
    let report_line = match &app.report {
        ReportState::NotRequested if snapshot.settled => Line::from("Press R to generate").dark_gray(),
        ReportState::NotRequested => Line::from("Available when settled").dark_gray(),
        ReportState::Pending => Line::from("Generating...").cyan(),
        ReportState::Ready(FullReportOutcome::Report(_)) => Line::from("Ready (R to view)").green(),
        ReportState::Ready(FullReportOutcome::Error { .. }) => Line::from("Failed (R to view)").red(),
    };
    let report_text = Text::from(vec![
        Line::from(format!("FULL REPORT [{}]", app.report_provider())).bold(),
        report_line,
    ]);
    frame.render_widget(Paragraph::new(report_text), summary_chunks[7]);
 
    // --- Technologies ---
    let mut tech_lines = vec![Line::from("TECHNOLOGIES".bold())];
    match snapshot.result(CheckId::Security) {
        Some(CheckResult::Success(payload)) => {
            let techs: Vec<Technology> = serde_json::from_value(payload["technologies"].clone()).unwrap_or_default();
            if techs.is_empty() {
                tech_lines.push(Line::from("Not identified."));
            }
            for tech in techs {
                let name = match tech.version {
                    Some(version) => format!("{} {version}", tech.name),
                    None => tech.name,
                };
                tech_lines.push(Line::from(vec![
                    Span::raw("- "),
                    Span::styled(name, Style::default().fg(Color::Cyan)),
                ]));
            }
        }
        Some(other) => tech_lines.push(Line::from(
            Span::styled(format!("Scan {}", other.status_label().to_lowercase()), Style::default().fg(Color::Red))
        )),
        None if snapshot.selected.contains(&CheckId::Security) => tech_lines.push(Line::from("Scanning...").dark_gray()),
        None => tech_lines.push(Line::from("Security check not selected.").dark_gray()),
    }
    frame.render_widget(Paragraph::new(tech_lines), summary_chunks[8]);
}
