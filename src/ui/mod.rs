//! Blocking prompts for the raw-mode terminal.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute, terminal,
};
use std::io::{self, Write};
use std::time::Duration;

fn next_key() -> anyhow::Result<KeyCode> {
    loop {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    return Ok(key.code);
                }
            }
        }
    }
}

/// Reads one line; Enter on empty input yields `default`, Esc yields `None`.
pub fn read_input_raw(default: &str, prompt: &str) -> anyhow::Result<Option<String>> {
    print!("{}: (Default: {}) \r\n> ", prompt, default);
    io::stdout().flush()?;

    let mut input = String::new();
    loop {
        match next_key()? {
            KeyCode::Enter => {
                print!("\r\n");
                if input.is_empty() {
                    return Ok(Some(default.to_string()));
                }
                return Ok(Some(input));
            }
            KeyCode::Char(c) => {
                input.push(c);
                print!("{}", c);
                io::stdout().flush()?;
            }
            KeyCode::Backspace => {
                if input.pop().is_some() {
                    print!("\u{0008} \u{0008}");
                    io::stdout().flush()?;
                }
            }
            KeyCode::Esc => return Ok(None),
            _ => {}
        }
    }
}

/// Waits for one of the keys in `choices`; `q`/Esc cancel.
pub fn choose(choices: &[char]) -> anyhow::Result<Option<char>> {
    loop {
        match next_key()? {
            KeyCode::Char(c) if choices.contains(&c) => return Ok(Some(c)),
            KeyCode::Char('q') | KeyCode::Esc => return Ok(None),
            _ => {}
        }
    }
}

/// Arrow-key picker over `labels`; returns the chosen index.
pub fn select_from_list(title: &str, labels: &[String]) -> anyhow::Result<Option<usize>> {
    if labels.is_empty() {
        print!("Nothing to choose from. Press any key to return.\r\n");
        io::stdout().flush()?;
        next_key()?;
        return Ok(None);
    }

    let mut selected = 0;
    loop {
        execute!(
            io::stdout(),
            terminal::Clear(terminal::ClearType::All),
            crossterm::cursor::MoveTo(0, 0)
        )?;
        print!("{} (↑/↓ or j/k / Enter / q):\r\n", title);
        print!("------------------------------------------------\r\n");
        for (i, label) in labels.iter().enumerate() {
            let marker = if i == selected { '>' } else { ' ' };
            print!("{} {}\r\n", marker, label);
        }
        io::stdout().flush()?;

        match next_key()? {
            KeyCode::Up | KeyCode::Char('k') => selected = selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if selected + 1 < labels.len() {
                    selected += 1;
                }
            }
            KeyCode::Enter => return Ok(Some(selected)),
            KeyCode::Char('q') | KeyCode::Esc => return Ok(None),
            _ => {}
        }
    }
}
