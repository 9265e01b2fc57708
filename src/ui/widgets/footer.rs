// src/ui/widgets/footer.rs

use crate::app::{App, AppState, ExportStatus, Focus};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the footer: the keys that do something in the current state, or
/// the outcome of the last export.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let line = match (&app.export_status, app.state) {
        (ExportStatus::Success(path), _) => Line::from(format!("Exported to {path}")).green(),
        (ExportStatus::Error(e), _) => Line::from(format!("Export failed: {e}")).red(),
        (_, AppState::Disclaimer) => Line::from(vec![key("Enter"), Span::raw(" to continue, "), key("Esc"), Span::raw(" to quit.")]),
        (_, AppState::Idle) if app.focus == Focus::Checks => Line::from(vec![
            key("Space"),
            Span::raw(" toggle, "),
            key("A"),
            Span::raw(" all/none, "),
            key("Tab"),
            Span::raw(" target, "),
            key("Enter"),
            Span::raw(" start, "),
            key("Q"),
            Span::raw(" quit."),
        ]),
        (_, AppState::Idle) => Line::from(vec![
            Span::raw("Type a URL, "),
            key("Tab"),
            Span::raw(" choose checks, "),
            key("Enter"),
            Span::raw(" start, "),
            key("Esc"),
            Span::raw(" quit."),
        ]),
        (_, AppState::Running) => Line::from(vec![
            Span::raw("Auditing... "),
            key("↑↓"),
            Span::raw(" browse, "),
            key("S"),
            Span::raw(" summarize, "),
            key("Q"),
            Span::raw(" quit."),
        ]),
        (_, AppState::Finished) => Line::from(vec![
            key("[N]"),
            Span::raw("ew audit, "),
            key("[R]"),
            Span::raw("eport, "),
            key("[S]"),
            Span::raw("ummarize, "),
            key("[E]"),
            Span::raw("xport, "),
            key("[Q]"),
            Span::raw("uit"),
        ]),
    };

    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}
