// src/ui/mod.rs

use crate::app::{App, AppState};
use ratatui::prelude::*;

mod layout;
mod widgets;

/// Draws one frame. Everything shown comes from the app's latest snapshot.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let layout = layout::create_layout(area);

    widgets::input::render_input(frame, app, layout.input);
    widgets::check_list::render_check_list(frame, app, layout.checks);
    widgets::results_view::render_results_view(frame, app, layout.results);
    widgets::summary::render_summary(frame, app, layout.summary);
    widgets::footer::render_footer(frame, app, layout.footer);

    if app.state == AppState::Disclaimer {
        widgets::disclaimer_popup::render_disclaimer_popup(frame, area);
    } else if app.show_report {
        widgets::report_popup::render_report_popup(frame, app, area);
    }
}
