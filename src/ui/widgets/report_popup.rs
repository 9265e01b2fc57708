// src/ui/widgets/report_popup.rs

use crate::app::{App, ReportState, SPINNER_CHARS};
use crate::core::synthesis::{FullReport, FullReportOutcome, Priority};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    text::Line,
};

use super::disclaimer_popup::centered_rect;

fn report_lines(report: &FullReport) -> Vec<Line<'_>> {
    let mut lines = vec![
        Line::from("OVERALL SUMMARY".yellow().bold()),
        Line::from(report.overall_summary.as_str()),
        Line::from(""),
        Line::from("KEY STRENGTHS".green().bold()),
    ];
    lines.extend(report.key_strengths.iter().map(|s| Line::from(format!("+ {s}"))));
    lines.push(Line::from(""));
    lines.push(Line::from("AREAS FOR IMPROVEMENT".yellow().bold()));
    lines.extend(report.areas_for_improvement.iter().map(|s| Line::from(format!("- {s}"))));
    lines.push(Line::from(""));
    lines.push(Line::from("ACTION PLAN".cyan().bold()));
    for item in &report.action_plan {
        let color = match item.priority {
            Priority::High => Color::Red,
            Priority::Medium => Color::Yellow,
            Priority::Low => Color::Green,
        };
        lines.push(Line::from(vec![
            Span::styled(format!("[{:?}] ", item.priority), Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::raw(item.task.as_str()),
        ]));
        lines.push(Line::from(format!("    {}", item.justification)).dark_gray());
    }
    lines
}

/// Renders the full report (or its progress, or its error) as a popup.
pub fn render_report_popup(frame: &mut Frame, app: &App, area: Rect) {
    let text = match &app.report {
        ReportState::Ready(FullReportOutcome::Report(report)) => report_lines(report),
        ReportState::Ready(FullReportOutcome::Error { error }) => vec![
            Line::from("The full report could not be generated.".red().bold()),
            Line::from(""),
            Line::from(error.as_str()),
        ],
        ReportState::Pending => vec![Line::from(format!(
            "{} Generating the full report with {}...",
            SPINNER_CHARS[app.spinner_frame],
            app.report_provider()
        ))],
        ReportState::NotRequested => vec![Line::from("The full report is available once every check has settled.")],
    };

    let block = Block::default()
        .title("Full Report (↑↓ PgUp/PgDn to scroll, Esc to close)")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let popup_area = centered_rect(80, 80, area);
    let popup = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.report_scroll, 0));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}
