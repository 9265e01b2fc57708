// src/ui/layout.rs

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Screen areas for each widget, computed once per frame.
pub struct AppLayout {
    pub input: Rect,
    pub checks: Rect,
    pub results: Rect,
    pub summary: Rect,
    pub footer: Rect,
}

/// Splits the frame into the target input on top, the footer at the bottom
/// and three side-by-side panels in between: check selection, results and
/// summary.
pub fn create_layout(frame_size: Rect) -> AppLayout {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame_size);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(45),
            Constraint::Percentage(25),
        ])
        .split(main_chunks[1]);

    AppLayout {
        input: main_chunks[0],
        checks: content_chunks[0],
        results: content_chunks[1],
        summary: content_chunks[2],
        footer: main_chunks[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panels_tile_the_frame() {
        let layout = create_layout(Rect::new(0, 0, 100, 40));
        assert_eq!(layout.input.height, 3);
        assert_eq!(layout.footer.y, 39);
        assert_eq!(layout.checks.width + layout.results.width + layout.summary.width, 100);
        assert_eq!(layout.results.x, layout.checks.x + layout.checks.width);
    }
}
