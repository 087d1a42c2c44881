use super::{centered, theme};
use crate::{
    app::{AppState, InputPurpose, NoticeKind, Overlay, MIN_CREDENTIAL_CHARS},
    types::AppMode,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const HELP_MODES: &[(&str, &str)] = &[
    ("Lyrics", "Write or paste lyrics, tag lines with Suno meta tags, convert to hiragana."),
    ("Prompt", "Place the vocal on the pad, pick styles, then generate a Suno style prompt."),
    ("Creation", "Design a cover image from the lyrics and video prompts for each section."),
    ("Chat", "Talk lyrics over with the assistant. History is kept between runs."),
];

const HELP_KEYS: &[(&str, &str)] = &[
    ("F5-F8", "switch mode"),
    ("F1 / F2", "help / settings"),
    ("Ctrl+C / Ctrl+V", "copy / paste"),
    ("Ctrl+G", "generate in the current mode"),
    ("Esc", "close a dialog"),
    ("Ctrl+Q", "quit"),
];

/// Draws the open overlay, then the front notice on top of everything.
pub fn render(frame: &mut Frame, app: &AppState) {
    let area = frame.area();
    match &app.overlay {
        Some(Overlay::Onboarding { input, error }) => {
            render_onboarding(frame, area, app, input, error.as_deref())
        }
        Some(Overlay::Confirm(action)) => {
            let lines = vec![
                Line::from(action.question()),
                Line::default(),
                Line::from(Span::styled("y / Enter to confirm, n / Esc to cancel", theme::muted())),
            ];
            dialog(frame, area, app, " Confirm ", lines, 52);
        }
        Some(Overlay::Input { purpose, value }) => render_input(frame, area, app, *purpose, value),
        Some(Overlay::Settings { row }) => render_settings(frame, area, app, *row),
        Some(Overlay::Help) => render_help(frame, area, app),
        None => {}
    }

    if let Some(notice) = app.notice() {
        let color = match notice.kind {
            NoticeKind::Info => Color::Green,
            NoticeKind::Validation => Color::Yellow,
            NoticeKind::Empty => Color::Cyan,
            NoticeKind::Error => Color::Red,
        };
        let mut lines = vec![Line::from(notice.message.as_str()), Line::default()];
        let more = app.notices.len().saturating_sub(1);
        let footer = match more {
            0 => "Enter to dismiss".to_string(),
            more => format!("Enter to dismiss ({more} more)"),
        };
        lines.push(Line::from(Span::styled(footer, theme::muted())));
        let title = format!(" {} ", notice.kind.title());
        let rect = dialog_rect(area, &lines, 56);
        frame.render_widget(Clear, rect);
        let block =
            theme::panel(title, app.accent(), true).border_style(Style::default().fg(color));
        frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), rect);
    }
}

fn dialog_rect(area: Rect, lines: &[Line], width: u16) -> Rect {
    let inner_width = width.saturating_sub(2).max(1) as usize;
    let rows: usize = lines.iter().map(|line| line.width().max(1).div_ceil(inner_width)).sum();
    centered(area, width, rows as u16 + 2)
}

fn dialog(
    frame: &mut Frame,
    area: Rect,
    app: &AppState,
    title: &str,
    lines: Vec<Line>,
    width: u16,
) -> Rect {
    let rect = dialog_rect(area, &lines, width);
    frame.render_widget(Clear, rect);
    let block = theme::panel(title.to_string(), app.accent(), true);
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), rect);
    rect
}

fn render_onboarding(
    frame: &mut Frame,
    area: Rect,
    app: &AppState,
    input: &str,
    error: Option<&str>,
) {
    let masked = "•".repeat(input.chars().count());
    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome to Suno Lyric Assist",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from("Paste a Gemini API key to get started."),
        Line::from("It is stored on this machine only."),
        Line::from(Span::styled(
            "Keys are issued at https://aistudio.google.com/apikey",
            theme::muted(),
        )),
        Line::default(),
        Line::from(vec![Span::raw("Key: "), Span::raw(masked.clone())]),
    ];
    match error {
        Some(error) => {
            lines.push(Line::from(Span::styled(error, Style::default().fg(Color::Red))))
        }
        None => lines.push(Line::from(Span::styled(
            format!("More than {MIN_CREDENTIAL_CHARS} characters. Enter to save, Ctrl+Q to quit."),
            theme::muted(),
        ))),
    }
    let rect = dialog(frame, area, app, " API key ", lines, 64);
    if app.notice().is_none() {
        let x = rect.x + 1 + "Key: ".len() as u16 + masked.width() as u16;
        frame.set_cursor_position((x.min(rect.right().saturating_sub(2)), rect.y + 7));
    }
}

fn render_input(
    frame: &mut Frame,
    area: Rect,
    app: &AppState,
    purpose: InputPurpose,
    value: &str,
) {
    let lines = vec![
        Line::from(Span::styled(purpose.hint(), theme::muted())),
        Line::default(),
        Line::from(format!("> {value}")),
        Line::default(),
        Line::from(Span::styled("Enter to submit, Esc to cancel", theme::muted())),
    ];
    let title = format!(" {} ", purpose.title());
    let rect = dialog(frame, area, app, &title, lines, 60);
    if app.notice().is_none() {
        let x = rect.x + 3 + value.width() as u16;
        frame.set_cursor_position((x.min(rect.right().saturating_sub(2)), rect.y + 3));
    }
}

fn render_settings(frame: &mut Frame, area: Rect, app: &AppState, row: usize) {
    let mut lines = vec![
        Line::from(Span::styled("Accent color per mode", theme::muted())),
        Line::default(),
    ];
    for (index, mode) in AppMode::ALL.into_iter().enumerate() {
        let color = app.theme.color_for(mode);
        let marker = if index == row { "▶ " } else { "  " };
        lines.push(Line::from(vec![
            Span::raw(format!("{marker}{:<10}", mode.label())),
            Span::styled("◀ ", theme::muted()),
            Span::styled(
                format!("{:^8}", color.label()),
                Style::default().fg(Color::Black).bg(theme::accent(color)),
            ),
            Span::styled(" ▶", theme::muted()),
        ]));
    }
    lines.push(Line::default());
    let logout_style = if row == AppMode::ALL.len() {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Red)
    };
    let marker = if row == AppMode::ALL.len() { "▶ " } else { "  " };
    lines.push(Line::from(Span::styled(format!("{marker}Log out (remove API key)"), logout_style)));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "↑↓ choose  ←→ change color  Enter on log out  Esc close",
        theme::muted(),
    )));
    dialog(frame, area, app, " Settings ", lines, 60);
}

fn render_help(frame: &mut Frame, area: Rect, app: &AppState) {
    let accent = Style::default().fg(theme::accent(app.accent())).add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();
    for (name, description) in HELP_MODES {
        lines.push(Line::from(Span::styled(*name, accent)));
        lines.push(Line::from(format!("  {description}")));
    }
    lines.push(Line::default());
    for (keys, action) in HELP_KEYS {
        lines.push(Line::from(vec![
            Span::styled(format!("{keys:<18}"), accent),
            Span::raw(*action),
        ]));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Mode-specific keys are listed in the status bar.",
        theme::muted(),
    )));
    dialog(frame, area, app, " Help ", lines, 72);
}
