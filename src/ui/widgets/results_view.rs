// src/ui/widgets/results_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use crate::core::knowledge_base;
use crate::core::models::{CheckResult, Severity};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    text::Line,
};

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Critical => Style::default().fg(Color::Red),
        Severity::Warning => Style::default().fg(Color::Yellow),
        Severity::Info => Style::default().fg(Color::Cyan),
    }
}

/// One row per selected check. Rows stay pending (spinner) until that check's
/// event arrives, so results fill in in completion order.
pub fn render_results_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Results (Navigate with ↑ ↓, scroll with PgUp/PgDn)");

    let Some(snapshot) = app.snapshot.as_ref() else {
        let content = Paragraph::new("Audit results will appear here...").alignment(Alignment::Center);
        frame.render_widget(content.block(main_block), area);
        return;
    };

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(snapshot.selected.len().min(12) as u16),
            Constraint::Min(0),
        ])
        .split(inner_area);

    let spinner = SPINNER_CHARS[app.spinner_frame];
    let items: Vec<ListItem> = snapshot
        .selected
        .iter()
        .map(|id| {
            let label = id.descriptor().label;
            let (badge, style) = match snapshot.result(*id) {
                None => (format!("{spinner} RUNNING"), Style::default().fg(Color::Cyan)),
                Some(result @ CheckResult::Success(_)) => (result.status_label().to_string(), Style::default().fg(Color::Green)),
                Some(result @ CheckResult::Failure(_)) => (result.status_label().to_string(), Style::default().fg(Color::Red)),
                Some(result @ CheckResult::TimedOut(_)) => (result.status_label().to_string(), Style::default().fg(Color::Yellow)),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{badge:<10} "), style),
                Span::raw(label),
            ]))
        })
        .collect();

    let focused = app.focus == crate::app::Focus::Results;
    let checks_list = List::new(items).highlight_style(if focused {
        Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
    } else {
        Style::new().add_modifier(Modifier::BOLD)
    });
    frame.render_stateful_widget(checks_list, chunks[0], &mut app.results_list_state);

    render_details(frame, app, chunks[1]);
}

fn render_details(frame: &mut Frame, app: &App, area: Rect) {
    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let Some((id, result)) = app.current_result() else {
        frame.render_widget(Paragraph::new("Select a check above to see details.").block(detail_block), area);
        return;
    };

    let mut text: Vec<Line> = vec![Line::from(id.descriptor().description.italic())];
    let Some(result) = result else {
        let waiting = if app.state == AppState::Running { "Waiting for this check to finish..." } else { "No result." };
        text.push(Line::from(""));
        text.push(Line::from(waiting));
        frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }).block(detail_block), area);
        return;
    };

    match app.section_summaries.get(&id) {
        Some(Some(summary)) => {
            text.push(Line::from(""));
            text.push(Line::from("SUMMARY:".yellow().bold()));
            text.push(Line::from(summary.clone()));
        }
        Some(None) => {
            text.push(Line::from(""));
            text.push(Line::from(format!("{} Summarizing...", SPINNER_CHARS[app.spinner_frame])).cyan());
        }
        None => {}
    }

    let findings: Vec<_> = app.findings().into_iter().filter(|(check, _)| *check == id).collect();
    let known = knowledge_base::findings_for(id).count();
    if findings.is_empty() && known > 0 && result.is_success() {
        text.push(Line::from(""));
        text.push(Line::from(format!("✓ None of the {known} known issues for this check were found.")).green());
    }
    if !findings.is_empty() {
        text.push(Line::from(""));
        text.push(Line::from("FINDINGS:".yellow().bold()));
        for (_, finding) in &findings {
            match knowledge_base::finding_detail(&finding.code) {
                Some(detail) => {
                    text.push(Line::from(Span::styled(format!("• {}", detail.title), severity_style(detail.severity))));
                    text.push(Line::from(format!("  Fix: {}", detail.remediation)).dark_gray());
                }
                None => text.push(Line::from(Span::styled(format!("• {}", finding.code), severity_style(finding.severity)))),
            }
        }
    }

    text.push(Line::from(""));
    text.push(Line::from("RAW RESULT:".yellow().bold()));
    text.extend(result.raw_text().lines().map(|l| Line::from(l.to_string())));

    let p = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0))
        .block(detail_block);
    frame.render_widget(p, area);
}
