use super::theme;
use crate::{
    app::{AppState, Slot},
    types::ChatRole,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn render(frame: &mut Frame, area: Rect, app: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    render_history(frame, rows[0], app);
    render_input(frame, rows[1], app);
}

fn render_history(frame: &mut Frame, area: Rect, app: &AppState) {
    let accent = theme::accent(app.accent());
    let block = theme::panel(" Lyric assistant ", app.accent(), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.chat.is_empty() && !app.is_busy(Slot::Chat) {
        let hint = "Ask for rhymes, a chorus rewrite, or feedback on your lyrics.";
        frame.render_widget(Paragraph::new(Span::styled(hint, theme::muted())), inner);
        return;
    }

    let width = inner.width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();
    for message in &app.chat {
        let color = match message.role {
            ChatRole::User => Color::Gray,
            ChatRole::Model => accent,
        };
        lines.push(Line::from(Span::styled(
            message.role.label(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for text in message.text.split('\n') {
            for row in wrap_cells(text, width) {
                lines.push(Line::from(format!("  {row}")));
            }
        }
        lines.push(Line::default());
    }
    if app.is_busy(Slot::Chat) {
        let dots = ".".repeat((app.ticks as usize / 4) % 3 + 1);
        lines.push(Line::from(Span::styled(format!("Assistant is typing{dots}"), theme::muted())));
    }

    let height = inner.height as usize;
    let max_scroll = lines.len().saturating_sub(height);
    let scroll = (app.chat_scroll as usize).min(max_scroll);
    let start = max_scroll - scroll;
    let visible: Vec<Line> = lines.into_iter().skip(start).take(height).collect();
    frame.render_widget(Paragraph::new(visible), inner);
}

fn render_input(frame: &mut Frame, area: Rect, app: &AppState) {
    let block = theme::panel(" Message ", app.accent(), true);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let input = app.chat_input.as_str();
    let width = inner.width.saturating_sub(1) as usize;
    // Keep the tail of long input visible.
    let mut visible = input;
    while visible.width() > width {
        let mut chars = visible.chars();
        chars.next();
        visible = chars.as_str();
    }
    frame.render_widget(Paragraph::new(visible), inner);

    if app.overlay.is_none() && app.notice().is_none() {
        frame.set_cursor_position((inner.x + visible.width() as u16, inner.y));
    }
}

/// Breaks `text` into rows no wider than `width` terminal cells. Wide
/// characters count as two cells and are never split.
fn wrap_cells(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.width() <= width {
        return vec![text.to_string()];
    }
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let cell = ch.width().unwrap_or(0);
        if used + cell > width && !current.is_empty() {
            rows.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(ch);
        used += cell;
    }
    if !current.is_empty() {
        rows.push(current);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_text_wraps_on_cell_width() {
        assert_eq!(wrap_cells("あいうえお", 4), vec!["あい", "うえ", "お"]);
        assert_eq!(wrap_cells("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_cells("", 4), vec![""]);
        assert_eq!(wrap_cells("あa", 2), vec!["あ", "a"]);
    }
}
