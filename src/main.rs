// src/main.rs

use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::info;

mod app;
mod config;
mod core;
mod logging;
mod ui;

use app::{App, AppState, Focus};
use config::Settings;
use core::llm::provider_from_settings;
use core::orchestrator::Orchestrator;
use core::registry::ScanRegistry;
use core::synthesis::ReportSynthesizer;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let log_path = logging::initialize_logging()?;
    let settings = Settings::load()?;
    info!(log = %log_path.display(), workspace = %settings.workspace_dir.display(), "audit-sandbox starting.");

    let registry = ScanRegistry::standard(&settings)?;
    let provider = provider_from_settings(&settings.llm)?;
    info!(provider = provider.name(), "Report synthesis provider ready.");
    let mut app = App::new(
        Orchestrator::new(Arc::new(registry)),
        Arc::new(ReportSynthesizer::new(provider)),
    );

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let outcome = run(&mut terminal, &mut app);

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    outcome
}

fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(app)?;
        }
        app.on_tick();
    }
    Ok(())
}

fn handle_events(app: &mut App) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            if app.show_report {
                handle_report_input(app, key.code);
                return Ok(());
            }
            match app.state {
                AppState::Disclaimer => handle_disclaimer_input(app, key.code),
                AppState::Idle => handle_idle_input(app, key.code),
                AppState::Running | AppState::Finished => handle_audit_input(app, key.code),
            }
        }
    }
    Ok(())
}

fn handle_disclaimer_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Enter | KeyCode::Char('y') => app.acknowledge_disclaimer(),
        KeyCode::Esc | KeyCode::Char('q') => app.quit(),
        _ => {}
    }
}

/// Keys while editing the target or choosing checks.
fn handle_idle_input(app: &mut App, key_code: KeyCode) {
    match (app.focus, key_code) {
        (_, KeyCode::Esc) => app.quit(),
        (_, KeyCode::Tab) => app.cycle_focus(),
        (_, KeyCode::Enter) => app.start_audit(),
        (Focus::Target, KeyCode::Char(c)) => app.input.push(c),
        (Focus::Target, KeyCode::Backspace) => {
            app.input.pop();
        }
        (Focus::Checks, KeyCode::Char(' ')) => app.toggle_current_check(),
        (Focus::Checks, KeyCode::Char('a')) => app.toggle_all_checks(),
        (Focus::Checks, KeyCode::Char('q')) => app.quit(),
        (Focus::Checks, KeyCode::Up) => app.previous_item(),
        (Focus::Checks, KeyCode::Down) => app.next_item(),
        _ => {}
    }
}

/// Keys while a run is in flight or after it settled.
fn handle_audit_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Up => app.previous_item(),
        KeyCode::Down => app.next_item(),
        KeyCode::PageDown => app.scroll_detail_down(),
        KeyCode::PageUp => app.scroll_detail_up(),
        KeyCode::Char('n') if app.state == AppState::Finished => app.reset(),
        KeyCode::Char('r') if app.state == AppState::Finished => app.request_full_report(),
        KeyCode::Char('s') => app.request_section_summary(),
        KeyCode::Char('e') => app.export(),
        _ => {}
    }
}

fn handle_report_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Esc | KeyCode::Char('r') | KeyCode::Enter => app.close_report(),
        KeyCode::Char('q') => app.quit(),
        KeyCode::Down => app.scroll_report(1),
        KeyCode::Up => app.scroll_report(-1),
        KeyCode::PageDown => app.scroll_report(10),
        KeyCode::PageUp => app.scroll_report(-10),
        _ => {}
    }
}
