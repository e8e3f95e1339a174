mod app;
mod event;
mod view;
mod watch;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self as ct_event, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;

use crate::workspace::Workspace;
use app::App;
use event::KeyAction;
use watch::DirWatcher;

pub fn run(ws: &mut Workspace, poll_interval: Duration) -> Result<()> {
    let mut app = App::new(ws);

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, ws, poll_interval);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    ws: &mut Workspace,
    poll_interval: Duration,
) -> Result<()> {
    let paths = ws.config.paths();
    paths.ensure_app_data()?;
    let watcher = DirWatcher::new(&paths.app_data)?;

    loop {
        terminal.draw(|frame| view::render(frame, app, ws))?;

        if ct_event::poll(poll_interval)? {
            if let Event::Key(key) = ct_event::read()? {
                if key.kind == KeyEventKind::Press {
                    match event::handle_key(app, key) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::Toggle(id) => {
                            // Completion heals the neko through the task hook.
                            if let Err(e) = ws.tasks.toggle(id) {
                                app.message = Some(e.to_string());
                            }
                            app.refresh(ws);
                        }
                        KeyAction::Delete(id) => {
                            app.message = match ws.tasks.delete(id) {
                                Ok(true) => Some(format!("Deleted task {id}")),
                                Ok(false) => Some(format!("Task {id} not found")),
                                Err(e) => Some(e.to_string()),
                            };
                            app.refresh(ws);
                        }
                        KeyAction::Refresh => {
                            ws.reload()?;
                            app.message = None;
                            app.refresh(ws);
                        }
                        KeyAction::Continue => {}
                    }
                }
            }
        }

        // Another process wrote to the store.
        if watcher.changed() {
            ws.reload()?;
            app.refresh(ws);
        }
    }
}
