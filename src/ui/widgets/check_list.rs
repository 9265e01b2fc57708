// src/ui/widgets/check_list.rs

use crate::app::{App, AppState, Focus};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem},
};

/// Renders the check selection list. Locked while an audit is on screen.
pub fn render_check_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let editable = app.state == AppState::Idle;
    let focused = editable && app.focus == Focus::Checks;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Checks ({}/{})", app.selected.len(), app.checks.len()))
        .border_style(if focused { Style::default().fg(Color::Yellow) } else { Style::default() });

    let items: Vec<ListItem> = app
        .checks
        .iter()
        .map(|descriptor| {
            let checked = app.selected.contains(&descriptor.id);
            let (mark, style) = if checked {
                ("[x] ", Style::default().fg(Color::Green))
            } else {
                ("[ ] ", Style::default().fg(Color::DarkGray))
            };
            ListItem::new(Line::from(vec![
                Span::styled(mark, style),
                Span::raw(descriptor.label),
                Span::styled(format!(" {}s", descriptor.timeout.as_secs()), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(if focused {
        Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
    } else {
        Style::new()
    });
    frame.render_stateful_widget(list, area, &mut app.check_list_state);
}
