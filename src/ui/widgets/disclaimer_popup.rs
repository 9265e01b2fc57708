// src/ui/widgets/disclaimer_popup.rs

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    text::Line,
};

/// Renders the start-up notice over the rest of the UI.
///
/// Some checks send traffic to the target (port scan, exposed-path probes,
/// repeated requests) and others read the local working tree, so the user
/// acknowledges both before anything runs.
pub fn render_disclaimer_popup(frame: &mut Frame, area: Rect) {
    let disclaimer_text = Text::from(vec![
        Line::from("BEFORE YOU AUDIT".bold().yellow()),
        Line::from(""),
        Line::from("audit-sandbox runs website checks against the target you enter: header and TLS inspection, DNS and WHOIS lookups, link crawling, an nmap port scan, probes for exposed files and a short burst of repeated requests."),
        Line::from(""),
        Line::from("Only audit sites you own or are explicitly authorized to test. Port scans and path probes against systems you do not control may be illegal where you are."),
        Line::from(""),
        Line::from("The secrets, backup and dependency checks read the local workspace directory, not the target."),
        Line::from(""),
        Line::from("If a report provider is configured, collected results are sent to it for the full report."),
        Line::from(""),
        Line::from("Press ".bold() + "Enter".bold().yellow() + " to acknowledge and continue".bold()),
    ]);

    let block = Block::default()
        .title("Disclaimer")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let popup_area = centered_rect(70, 70, area);

    let popup = Paragraph::new(disclaimer_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    // Clear first so the panels underneath do not bleed through.
    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// A rectangle of the given percentage size centered within `r`.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
