use super::{contains, Hitboxes};
use crate::{
    app::{AppState, EditKey, Overlay, PromptFocus},
    types::{AppMode, VocalCoordinate},
    xy_pad,
};
use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use tracing::warn;

/// System clipboard, opened on first use. Headless sessions without a
/// clipboard get a status line instead of a failure.
#[derive(Default)]
pub struct ClipboardHandle {
    inner: Option<arboard::Clipboard>,
}

impl ClipboardHandle {
    fn clipboard(&mut self) -> Result<&mut arboard::Clipboard> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new().context("clipboard unavailable")?);
        }
        self.inner.as_mut().context("clipboard unavailable")
    }

    pub fn read(&mut self) -> Result<String> {
        self.clipboard()?.get_text().context("failed to read clipboard")
    }

    pub fn write(&mut self, text: String) -> Result<()> {
        self.clipboard()?.set_text(text).context("failed to write clipboard")
    }
}

#[derive(Debug, Default)]
pub struct PointerState {
    dragging_pad: bool,
}

fn edit_key(key: &KeyEvent) -> Option<EditKey> {
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return None;
    }
    Some(match key.code {
        KeyCode::Char(ch) => EditKey::Char(ch),
        KeyCode::Enter => EditKey::Newline,
        KeyCode::Backspace => EditKey::Backspace,
        KeyCode::Delete => EditKey::Delete,
        KeyCode::Left => EditKey::Left,
        KeyCode::Right => EditKey::Right,
        KeyCode::Up => EditKey::Up,
        KeyCode::Down => EditKey::Down,
        KeyCode::Home => EditKey::Home,
        KeyCode::End => EditKey::End,
        _ => return None,
    })
}

fn ctrl(key: &KeyEvent, ch: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(ch)
}

pub fn handle_key(app: &mut AppState, key: KeyEvent, clipboard: &mut ClipboardHandle) {
    if ctrl(&key, 'q') {
        app.quit = true;
        return;
    }
    if app.notice().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_notice();
        }
        return;
    }
    if app.overlay.is_some() {
        handle_overlay_key(app, key, clipboard);
        return;
    }

    match key.code {
        KeyCode::F(1) => return app.open_overlay(Overlay::Help),
        KeyCode::F(2) => return app.open_overlay(Overlay::Settings { row: 0 }),
        KeyCode::F(n @ 5..=8) => return app.set_mode(AppMode::ALL[(n - 5) as usize]),
        _ => {}
    }
    if ctrl(&key, 'c') {
        copy(app, clipboard);
        return;
    }

    match app.mode {
        AppMode::Lyrics => handle_lyrics_key(app, key, clipboard),
        AppMode::Prompt => handle_prompt_key(app, key, clipboard),
        AppMode::Creation => handle_creation_key(app, key),
        AppMode::Chat => handle_chat_key(app, key, clipboard),
    }
}

fn copy(app: &mut AppState, clipboard: &mut ClipboardHandle) {
    let Some(text) = app.copy_source() else {
        app.push_status_line("Nothing to copy".to_string());
        return;
    };
    let chars = text.chars().count();
    match clipboard.write(text) {
        Ok(()) => app.push_status_line(format!("Copied {chars} characters")),
        Err(err) => {
            warn!("copy failed: {err:#}");
            app.push_status_line(format!("Copy failed: {err:#}"));
        }
    }
}

fn paste(app: &mut AppState, clipboard: &mut ClipboardHandle) -> Option<String> {
    match clipboard.read() {
        Ok(text) if !text.is_empty() => Some(text.replace("\r\n", "\n")),
        Ok(_) => None,
        Err(err) => {
            warn!("paste failed: {err:#}");
            app.push_status_line(format!("Paste failed: {err:#}"));
            None
        }
    }
}

fn handle_overlay_key(app: &mut AppState, key: KeyEvent, clipboard: &mut ClipboardHandle) {
    let Some(overlay) = app.overlay.clone() else {
        return;
    };
    match overlay {
        Overlay::Onboarding { .. } | Overlay::Input { .. } => {
            if ctrl(&key, 'v') {
                if let Some(text) = paste(app, clipboard) {
                    text.chars()
                        .filter(|ch| !ch.is_control())
                        .for_each(|ch| app.edit_overlay_input(EditKey::Char(ch)));
                }
                return;
            }
            match key.code {
                KeyCode::Enter if matches!(overlay, Overlay::Onboarding { .. }) => {
                    app.submit_credential()
                }
                KeyCode::Enter => app.submit_input(),
                KeyCode::Esc => app.close_overlay(),
                _ => {
                    if let Some(edit) = edit_key(&key) {
                        app.edit_overlay_input(edit);
                    }
                }
            }
        }
        Overlay::Confirm(_) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.resolve_confirm(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.resolve_confirm(false),
            _ => {}
        },
        Overlay::Settings { .. } => match key.code {
            KeyCode::Up => app.settings_move(-1),
            KeyCode::Down => app.settings_move(1),
            KeyCode::Left => app.settings_adjust(false),
            KeyCode::Right | KeyCode::Enter => app.settings_adjust(true),
            KeyCode::Esc | KeyCode::F(2) => app.close_overlay(),
            _ => {}
        },
        Overlay::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::F(1)) {
                app.close_overlay();
            }
        }
    }
}

fn handle_lyrics_key(app: &mut AppState, key: KeyEvent, clipboard: &mut ClipboardHandle) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('e') => app.toggle_editing(),
            KeyCode::Char('g') => app.request_lyric_generation(),
            KeyCode::Char('k') => app.convert_to_hiragana(),
            KeyCode::Char('d') => app.request_clear_lyrics(),
            KeyCode::Char('t') => app.insert_selected_tag(),
            KeyCode::Char('n') => app.request_custom_tag(),
            KeyCode::Char('v') => {
                if let Some(text) = paste(app, clipboard) {
                    app.replace_active_lyrics(text);
                    app.push_status_line("Pasted from clipboard".to_string());
                }
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Tab => app.toggle_tab(),
        KeyCode::PageUp => app.move_tag_cursor(-1),
        KeyCode::PageDown => app.move_tag_cursor(1),
        KeyCode::Esc if app.editing => app.toggle_editing(),
        KeyCode::Enter if !app.editing => app.insert_selected_tag(),
        _ => {
            if let Some(edit) = edit_key(&key) {
                app.edit_lyrics(edit);
            }
        }
    }
}

fn handle_prompt_key(app: &mut AppState, key: KeyEvent, clipboard: &mut ClipboardHandle) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('g') => app.generate_prompt(),
            KeyCode::Char('p') => app.play_voice_sample(),
            KeyCode::Char('o') => app.request_audio_analysis(),
            KeyCode::Char('v') if app.prompt_focus == PromptFocus::Artist => {
                if let Some(text) = paste(app, clipboard) {
                    text.chars()
                        .filter(|ch| !ch.is_control())
                        .for_each(|ch| app.edit_artist(EditKey::Char(ch)));
                }
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Tab => return app.focus_next(),
        KeyCode::BackTab => return app.focus_previous(),
        _ => {}
    }

    match app.prompt_focus {
        PromptFocus::Artist => match key.code {
            KeyCode::Enter => app.analyze_artist(),
            _ => {
                if let Some(edit) = edit_key(&key) {
                    app.edit_artist(edit);
                }
            }
        },
        PromptFocus::Pad => match key.code {
            KeyCode::Left => app.nudge_vocal(-1, 0),
            KeyCode::Right => app.nudge_vocal(1, 0),
            KeyCode::Up => app.nudge_vocal(0, 1),
            KeyCode::Down => app.nudge_vocal(0, -1),
            KeyCode::Home => app.set_vocal(VocalCoordinate::default()),
            _ => {}
        },
        PromptFocus::Field(_) => match key.code {
            KeyCode::Left | KeyCode::Up => app.move_chip(-1),
            KeyCode::Right | KeyCode::Down => app.move_chip(1),
            KeyCode::Char(' ') | KeyCode::Enter => app.toggle_focused_chip(),
            _ => {}
        },
    }
}

fn handle_creation_key(app: &mut AppState, key: KeyEvent) {
    if ctrl(&key, 'g') {
        app.generate_visualization();
        return;
    }
    match key.code {
        KeyCode::Up => app.move_section(-1),
        KeyCode::Down => app.move_section(1),
        KeyCode::Enter => app.generate_video_for_selected(),
        _ => {}
    }
}

fn handle_chat_key(app: &mut AppState, key: KeyEvent, clipboard: &mut ClipboardHandle) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('l') => app.request_clear_chat(),
            KeyCode::Char('v') => {
                if let Some(text) = paste(app, clipboard) {
                    text.chars()
                        .filter(|ch| !ch.is_control())
                        .for_each(|ch| app.edit_chat_input(EditKey::Char(ch)));
                }
            }
            _ => {}
        }
        return;
    }
    match key.code {
        KeyCode::Enter => app.send_chat(),
        KeyCode::PageUp => app.scroll_chat(5),
        KeyCode::PageDown => app.scroll_chat(-5),
        _ => {
            if let Some(edit) = edit_key(&key) {
                app.edit_chat_input(edit);
            }
        }
    }
}

pub fn handle_mouse(
    app: &mut AppState,
    mouse: MouseEvent,
    hitboxes: &Hitboxes,
    pointer: &mut PointerState,
) {
    if app.notice().is_some() || app.overlay.is_some() {
        pointer.dragging_pad = false;
        return;
    }
    let (column, row) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(mode) = Hitboxes::hit(&hitboxes.mode_tabs, column, row) {
                app.set_mode(mode);
            } else if let Some(tab) = Hitboxes::hit(&hitboxes.lyric_tabs, column, row) {
                app.set_tab(tab);
            } else if let Some(line) = Hitboxes::hit(&hitboxes.lyric_lines, column, row) {
                app.click_line(line);
            } else if let Some(index) = Hitboxes::hit(&hitboxes.tags, column, row) {
                app.tag_cursor = index;
                app.insert_selected_tag();
            } else if let Some(pad) = hitboxes.pad.filter(|pad| contains(*pad, column, row)) {
                app.prompt_focus = PromptFocus::Pad;
                app.set_vocal(xy_pad::cell_to_coordinate(column, row, pad));
                pointer.dragging_pad = true;
            } else if let Some((field, value)) = Hitboxes::hit(&hitboxes.chips, column, row) {
                app.prompt_focus = PromptFocus::Field(field);
                app.chip_cursor = field.catalog().iter().position(|v| *v == value).unwrap_or(0);
                app.toggle_style(field, value);
            } else if let Some(index) = Hitboxes::hit(&hitboxes.sections, column, row) {
                app.creation.section_cursor = index;
            }
        }
        MouseEventKind::Drag(MouseButton::Left) if pointer.dragging_pad => {
            // Pointer positions outside the pad clamp to its edges.
            if let Some(pad) = hitboxes.pad {
                app.set_vocal(xy_pad::cell_to_coordinate(column, row, pad));
            }
        }
        MouseEventKind::Up(_) => pointer.dragging_pad = false,
        MouseEventKind::ScrollUp if app.mode == AppMode::Chat => app.scroll_chat(3),
        MouseEventKind::ScrollDown if app.mode == AppMode::Chat => app.scroll_chat(-3),
        _ => {}
    }
}
