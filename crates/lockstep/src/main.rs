//! Lockstep CLI - synchronized two-pane diff viewer TUI

mod app;
mod config;
mod provider;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use provider::TreeProvider;
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "lockstep")]
#[command(author, version, about = "A synchronized two-pane diff viewer")]
struct Args {
    /// Source (old) file
    source: PathBuf,

    /// Destination (new) file
    destination: PathBuf,

    /// Unchanged context lines kept around each hunk
    #[arg(short, long)]
    context: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Config::load().resolve();

    let old = std::fs::read_to_string(&args.source)
        .with_context(|| format!("failed to read {}", args.source.display()))?;
    let new = std::fs::read_to_string(&args.destination)
        .with_context(|| format!("failed to read {}", args.destination.display()))?;

    let context_lines = args.context.unwrap_or(settings.context_lines);
    let tree = TreeProvider::new()
        .with_context(context_lines)
        .build(&old, &new);

    let mut app = App::new(tree, settings, 0);
    run_tui(&mut app)
}

fn run_tui(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        app.tick();

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.on_key(key.code);
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        app.on_click(mouse.column, mouse.row);
                    }
                    MouseEventKind::ScrollDown => app.scroll_by(3),
                    MouseEventKind::ScrollUp => app.scroll_by(-3),
                    _ => {}
                },
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
