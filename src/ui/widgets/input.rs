// src/ui/widgets/input.rs
use ratatui::{prelude::*, widgets::{Block, Borders, Paragraph}};
use crate::app::{App, AppState, Focus};

/// Renders the target input. A rejected start shows its message in the title.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.state == AppState::Idle && app.focus == Focus::Target;
    let mut input_block = Block::default()
        .borders(Borders::ALL)
        .title("Target URL")
        .border_style(if focused { Style::default().fg(Color::Yellow) } else { Style::default() });
    if let Some(error) = &app.input_error {
        input_block = input_block.title(Line::from(format!(" {error} ")).red().right_aligned());
    }

    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    if focused {
        frame.set_cursor_position(Position::new(area.x + app.input.chars().count() as u16 + 1, area.y + 1));
    }
}
