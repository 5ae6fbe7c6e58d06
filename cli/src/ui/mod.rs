mod view;

use crate::app::{AppCommand, AppEvent, AppState, Pane};
use crate::form::FormField;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, Terminal};
use std::time::Duration;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    event_rx: &mut UnboundedReceiver<AppEvent>,
    command_tx: UnboundedSender<AppCommand>,
) -> Result<()> {
    loop {
        loop {
            match event_rx.try_recv() {
                Ok(event) => app.handle_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("controller event channel closed");
                    return Ok(());
                }
            }
        }

        terminal.draw(|frame| view::render(frame, app))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(command) = handle_key(app, key) {
                    if command_tx.send(command).is_err() {
                        warn!("controller stopped accepting commands");
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

pub fn handle_key(app: &mut AppState, key: KeyEvent) -> Option<AppCommand> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_alert();
        }
        return None;
    }

    if app.editor.is_some() {
        handle_editor_key(app, key, ctrl);
        return None;
    }

    if ctrl {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => {
                app.should_quit = true;
                None
            }
            KeyCode::Char('g') => app.submit(),
            KeyCode::Char('f') => app.request_full_vocal(),
            KeyCode::Char('s') => app.request_export(),
            KeyCode::Char('r') => {
                app.toggle_pane();
                None
            }
            KeyCode::Char('p') if app.focused_field() == Some(FormField::SamplePath) => {
                app.preview_sample()
            }
            KeyCode::Char('x') if app.focused_field() == Some(FormField::SamplePath) => {
                app.remove_sample();
                None
            }
            _ => None,
        };
    }

    match app.pane {
        Pane::Form => handle_form_key(app, key),
        Pane::Sections => handle_sections_key(app, key),
    }
}

fn handle_form_key(app: &mut AppState, key: KeyEvent) -> Option<AppCommand> {
    let field = app.form.focus();
    match key.code {
        KeyCode::Tab | KeyCode::Down => app.form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => app.form.focus_prev(),
        KeyCode::Left if !field.is_text() => app.cycle_field(false),
        KeyCode::Right if !field.is_text() => app.cycle_field(true),
        KeyCode::Enter => match field {
            FormField::SamplePath => app.attach_sample_from_field(),
            FormField::CustomLyrics => app.form.custom_lyrics.push('\n'),
            FormField::LyricsMode => app.cycle_field(true),
            _ => return app.submit(),
        },
        KeyCode::Backspace => {
            if let Some(text) = app.form.focused_text_mut() {
                text.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(text) = app.form.focused_text_mut() {
                text.push(c);
            } else if field == FormField::Duration {
                if let Some(digit) = c.to_digit(10) {
                    // '0' stands for the 10-minute maximum on a single keystroke.
                    let minutes = if digit == 0 { 10 } else { digit as i32 };
                    app.set_duration(minutes);
                }
            }
        }
        KeyCode::Esc if app.song.is_some() => app.toggle_pane(),
        _ => {}
    }
    None
}

fn handle_sections_key(app: &mut AppState, key: KeyEvent) -> Option<AppCommand> {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.select_next_section(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous_section(),
        KeyCode::Char('p') => return app.request_section_vocal(app.selected_section),
        KeyCode::Enter | KeyCode::Char('e') => app.begin_edit(),
        KeyCode::Esc | KeyCode::Tab => app.toggle_pane(),
        _ => {}
    }
    None
}

fn handle_editor_key(app: &mut AppState, key: KeyEvent, ctrl: bool) {
    match key.code {
        KeyCode::Char('s') if ctrl => return app.commit_edit(),
        KeyCode::Esc => return app.cancel_edit(),
        _ => {}
    }
    let Some(editor) = app.editor.as_mut() else { return };
    match key.code {
        KeyCode::Enter => editor.buffer.push('\n'),
        KeyCode::Backspace => {
            editor.buffer.pop();
        }
        KeyCode::Char(c) if !ctrl => editor.buffer.push(c),
        _ => {}
    }
}
