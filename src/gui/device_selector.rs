use std::{io::stdout, path::PathBuf, time::Duration};

use crate::gui::error::HunterGuiError;

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Where the cursor goes after a key press, `None` keeps it.
fn move_cursor(cursor: usize, n_ports: usize, key: KeyCode) -> Option<usize> {
    match key {
        KeyCode::Down | KeyCode::Char('j') => Some((cursor + 1) % n_ports),
        KeyCode::Up | KeyCode::Char('k') => Some((cursor + n_ports - 1) % n_ports),
        _ => None,
    }
}

/// Lets the user pick the serial device the DWM1001-DEV is on. Returns
/// `None` if they quit without choosing.
pub fn device_selector(mut available_ports: Vec<PathBuf>) -> Result<Option<PathBuf>, HunterGuiError> {
    if available_ports.is_empty() {
        return Err(HunterGuiError::NoPorts);
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let res = select_loop(&available_ports);
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(res?.map(|i| available_ports.swap_remove(i)))
}

fn select_loop(available_ports: &[PathBuf]) -> Result<Option<usize>, HunterGuiError> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let n_ports = available_ports.len();
    let mut list_state = ListState::default().with_selected(Some(0));
    loop {
        let title = Title::from(" Which port is the DWM1001-DEV? ".cyan().bold());
        let instructions = Title::from(Line::from(vec![
            " Move ".into(),
            "<Up>/<Down>".cyan().bold(),
            " Pick ".into(),
            "<Enter>".cyan().bold(),
            " Quit ".into(),
            "<Q> ".cyan().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);
        let list = List::new(available_ports.iter().map(|p| p.to_string_lossy()))
            .style(Style::default().fg(Color::White))
            .highlight_symbol(">>")
            .highlight_style(Style::default().fg(Color::Cyan))
            .block(block);
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_stateful_widget(list, area, &mut list_state);
        })?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        if let event::Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let cursor = list_state.selected().unwrap_or(0);
            match key.code {
                KeyCode::Enter => return Ok(Some(cursor)),
                KeyCode::Char('q') | KeyCode::Esc => return Ok(None),
                code => {
                    if let Some(next) = move_cursor(cursor, n_ports, code) {
                        list_state.select(Some(next));
                    }
                }
            }
        }
    }
}
