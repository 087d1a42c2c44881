mod chat;
mod creation;
mod input;
mod lyrics;
mod overlay;
mod prompt;
mod theme;

use crate::{
    app::{AppCommand, AppEvent, AppState, Slot},
    audio::{self, VoicePlayer},
    types::{AppMode, LyricTab, StyleField},
};
use anyhow::{anyhow, Result};
use crossterm::event::{self, Event, KeyEventKind};
use input::{ClipboardHandle, PointerState};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::warn;
use unicode_width::UnicodeWidthStr;

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Clickable regions recorded while drawing the last frame.
#[derive(Debug, Default)]
pub struct Hitboxes {
    pub mode_tabs: Vec<(Rect, AppMode)>,
    pub lyric_tabs: Vec<(Rect, LyricTab)>,
    pub lyric_lines: Vec<(Rect, usize)>,
    pub tags: Vec<(Rect, usize)>,
    pub pad: Option<Rect>,
    pub chips: Vec<(Rect, (StyleField, &'static str))>,
    pub sections: Vec<(Rect, usize)>,
}

impl Hitboxes {
    pub fn hit<T: Copy>(items: &[(Rect, T)], column: u16, row: u16) -> Option<T> {
        items.iter().find(|(rect, _)| contains(*rect, column, row)).map(|(_, value)| *value)
    }
}

pub fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x && column < rect.right() && row >= rect.y && row < rect.bottom()
}

pub fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    event_rx: &mut UnboundedReceiver<AppEvent>,
    command_tx: UnboundedSender<AppCommand>,
) -> Result<()> {
    let mut player = VoicePlayer::new();
    let mut clipboard = ClipboardHandle::default();
    let mut pointer = PointerState::default();
    let mut hitboxes = Hitboxes::default();

    loop {
        while let Ok(event) = event_rx.try_recv() {
            app.handle_event(event);
        }
        for command in app.take_commands() {
            command_tx.send(command).map_err(|_| anyhow!("controller stopped"))?;
        }
        if let Some(samples) = app.pending_audio.take() {
            let seconds = audio::duration_secs(samples.len());
            app.push_status_line(format!("Playing voice sample ({seconds:.1}s)"));
            if let Err(err) = player.play_pcm(samples) {
                warn!("voice playback failed: {err:#}");
                app.handle_event(AppEvent::Error(format!("{err:#}")));
            }
        }
        if app.quit {
            player.stop();
            break;
        }

        let playing = player.is_playing();
        terminal.draw(|frame| hitboxes = draw(frame, app, playing))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    input::handle_key(app, key, &mut clipboard);
                }
                Event::Mouse(mouse) => input::handle_mouse(app, mouse, &hitboxes, &mut pointer),
                _ => {}
            }
        }
        app.tick();
    }

    Ok(())
}

fn draw(frame: &mut Frame, app: &AppState, playing: bool) -> Hitboxes {
    let mut hitboxes = Hitboxes::default();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(8), Constraint::Length(2)])
        .split(frame.area());

    render_header(frame, chunks[0], app, &mut hitboxes);
    match app.mode {
        AppMode::Lyrics => lyrics::render(frame, chunks[1], app, &mut hitboxes),
        AppMode::Prompt => prompt::render(frame, chunks[1], app, &mut hitboxes),
        AppMode::Creation => creation::render(frame, chunks[1], app, &mut hitboxes),
        AppMode::Chat => chat::render(frame, chunks[1], app),
    }
    render_status(frame, chunks[2], app, playing);
    overlay::render(frame, app);
    hitboxes
}

fn render_header(frame: &mut Frame, area: Rect, app: &AppState, hitboxes: &mut Hitboxes) {
    let title = " ♪ Suno Lyric Assist ";
    let title_width = title.chars().count() as u16;
    frame.render_widget(
        Paragraph::new(Span::styled(
            title,
            Style::default().fg(theme::accent(app.accent())).add_modifier(Modifier::BOLD),
        )),
        Rect { width: title_width.min(area.width), ..area },
    );

    let mut x = area.x + title_width + 1;
    for (index, mode) in AppMode::ALL.into_iter().enumerate() {
        let label = format!(" F{} {} ", index + 5, mode.label());
        let width = label.chars().count() as u16;
        if x + width > area.right() {
            break;
        }
        let style = if mode == app.mode {
            Style::default()
                .fg(Color::Black)
                .bg(theme::accent(app.theme.color_for(mode)))
                .add_modifier(Modifier::BOLD)
        } else {
            theme::muted()
        };
        let rect = Rect { x, y: area.y, width, height: 1 };
        frame.render_widget(Paragraph::new(Span::styled(label, style)), rect);
        hitboxes.mode_tabs.push((rect, mode));
        x += width + 1;
    }

    let help = Paragraph::new(Span::styled("F1 help  F2 settings  ^Q quit ", theme::muted()))
        .alignment(Alignment::Right);
    if x < area.right() {
        frame.render_widget(help, Rect { x, width: area.right() - x, ..area });
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &AppState, playing: bool) {
    let mut spans = Vec::new();
    if !app.busy.is_empty() {
        let spinner = SPINNER[(app.ticks as usize) % SPINNER.len()];
        let working = app.busy.iter().map(Slot::label).collect::<Vec<_>>().join(", ");
        spans.push(Span::styled(
            format!("{spinner} {} ({working}) ", pulse_message(app.ticks)),
            Style::default().fg(theme::accent(app.accent())),
        ));
    }
    if playing {
        spans.push(Span::styled("♪ playing sample ", Style::default().fg(Color::Cyan)));
    }
    let last = app.status_lines.last().map(String::as_str).unwrap_or("Ready");
    spans.push(Span::styled(last.to_string(), theme::muted()));

    let lines = vec![Line::from(spans), Line::from(Span::styled(key_hints(app), theme::muted()))];
    frame.render_widget(Paragraph::new(lines), area);
}

const PULSE_MESSAGES: &[&str] = &[
    "Asking Gemini…",
    "Listening closely…",
    "Weighing every syllable…",
    "Mixing ideas…",
];

fn pulse_message(ticks: u64) -> &'static str {
    PULSE_MESSAGES[(ticks as usize / 20) % PULSE_MESSAGES.len()]
}

fn key_hints(app: &AppState) -> String {
    match app.mode {
        AppMode::Lyrics if app.editing => {
            "^E stop editing  ^T insert tag  PgUp/PgDn pick tag  ^N custom tag  Tab switch tab".into()
        }
        AppMode::Lyrics => "^E edit  ↑↓ select line  ^T/Enter insert tag  ^G write  ^K hiragana  \
                            ^V paste  ^C copy  ^D clear"
            .into(),
        AppMode::Prompt => {
            "Tab focus  Enter analyze/toggle  ←→↑↓ move  ^G generate  ^P listen  ^O audio file  ^C copy"
                .into()
        }
        AppMode::Creation => "^G visualize  ↑↓ section  Enter video prompt  ^C copy".into(),
        AppMode::Chat => "Enter send  PgUp/PgDn scroll  ^L clear  ^C copy last reply".into(),
    }
}

/// Lays chips out left to right, wrapping at the area width. Returns the
/// rendered lines and the screen rectangle of every chip.
pub fn flow_chips<'a>(area: Rect, chips: Vec<(String, Style)>) -> (Vec<Line<'a>>, Vec<Rect>) {
    let mut lines = Vec::new();
    let mut rects = Vec::with_capacity(chips.len());
    let mut current: Vec<Span<'a>> = Vec::new();
    let mut x = 0u16;

    for (label, style) in chips {
        let width = label.width() as u16;
        if x > 0 && x + width > area.width {
            lines.push(Line::from(std::mem::take(&mut current)));
            x = 0;
        }
        let row = area.y + lines.len() as u16;
        rects.push(Rect { x: area.x + x, y: row, width: width.min(area.width), height: 1 });
        current.push(Span::styled(label, style));
        current.push(Span::raw(" "));
        x += width + 1;
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    (lines, rects)
}

pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chips_wrap_and_report_positions() {
        let area = Rect::new(2, 5, 12, 4);
        let chips = vec![
            ("[Intro]".to_string(), Style::default()),
            ("[Hook]".to_string(), Style::default()),
            ("[Drop]".to_string(), Style::default()),
        ];
        let (lines, rects) = flow_chips(area, chips);
        assert_eq!(lines.len(), 2);
        assert_eq!(rects[0], Rect::new(2, 5, 7, 1));
        assert_eq!(rects[1], Rect::new(2, 6, 6, 1));
        assert_eq!(rects[2], Rect::new(9, 6, 6, 1));
        assert_eq!(Hitboxes::hit(&[(rects[2], 7usize)], 10, 6), Some(7));
        assert_eq!(Hitboxes::hit(&[(rects[2], 7usize)], 15, 6), None);
    }

    #[test]
    fn wide_characters_take_two_cells() {
        let (_, rects) = flow_chips(Rect::new(0, 0, 40, 2), vec![("歌詞".into(), Style::default())]);
        assert_eq!(rects[0].width, 4);
        assert_eq!(centered(Rect::new(0, 0, 10, 10), 20, 4), Rect::new(0, 3, 10, 4));
    }
}
