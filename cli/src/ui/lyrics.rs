use super::{flow_chips, theme, Hitboxes};
use crate::{
    app::{AppState, Slot},
    catalog::{self, TAG_CATEGORIES},
    tags,
    types::LyricTab,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

pub fn render(frame: &mut Frame, area: Rect, app: &AppState, hitboxes: &mut Hitboxes) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
        .split(area);

    render_editor(frame, columns[0], app, hitboxes);
    render_palette(frame, columns[1], app, hitboxes);
}

fn render_editor(frame: &mut Frame, area: Rect, app: &AppState, hitboxes: &mut Hitboxes) {
    let color = app.accent();
    let mut title = String::from(" Lyrics ");
    if app.editing {
        title.push_str("· editing ");
    }
    if app.is_busy(Slot::Lyrics) {
        title.push_str("· working… ");
    }
    let block = theme::panel(title, color, true);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let mut x = inner.x;
    for tab in [LyricTab::Original, LyricTab::Hiragana] {
        let label = format!(" {} ", tab.label());
        let width = label.chars().count() as u16;
        let style = if tab == app.tab {
            Style::default().fg(Color::Black).bg(theme::accent(color)).add_modifier(Modifier::BOLD)
        } else {
            theme::muted()
        };
        let width = width.min(inner.right().saturating_sub(x));
        let rect = Rect { x, y: inner.y, width, height: 1 };
        frame.render_widget(Paragraph::new(Span::styled(label, style)), rect);
        hitboxes.lyric_tabs.push((rect, tab));
        x += width + 1;
    }

    let body = Rect { y: inner.y + 1, height: inner.height - 1, ..inner };
    let text = app.active_lyrics();
    if text.is_empty() && !app.editing {
        let hint = match app.tab {
            LyricTab::Original => "No lyrics yet. ^E to write, ^V to paste, ^G to generate.",
            LyricTab::Hiragana => "No hiragana yet. ^K converts the original lyrics.",
        };
        frame.render_widget(Paragraph::new(Span::styled(hint, theme::muted())), body);
        return;
    }

    let (caret_line, caret_column) = app.cursor.line_and_column(text);
    let focus_line = if app.editing { caret_line } else { app.selected_line.unwrap_or(0) };
    let scroll = scroll_offset(focus_line, body.height as usize);

    let number_width = 4u16;
    let lines: Vec<Line> = text
        .split('\n')
        .enumerate()
        .skip(scroll)
        .take(body.height as usize)
        .map(|(index, line)| {
            let selected = !app.editing && app.selected_line == Some(index);
            let mut style = if tags::is_tag_line(line) {
                Style::default().fg(theme::accent(color)).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            if selected {
                style = style.bg(Color::Rgb(48, 48, 56));
            }
            let marker = if selected { "▶" } else { " " };
            Line::from(vec![
                Span::styled(format!("{marker}{:>3}", index + 1), theme::muted()),
                Span::styled(line.to_string(), style),
            ])
        })
        .collect();

    for (row, index) in (scroll..scroll + lines.len()).enumerate() {
        let rect = Rect { y: body.y + row as u16, height: 1, ..body };
        hitboxes.lyric_lines.push((rect, index));
    }
    frame.render_widget(Paragraph::new(lines), body);

    if app.editing && app.overlay.is_none() && app.notice().is_none() {
        let line_text = text.split('\n').nth(caret_line).unwrap_or_default();
        let before: String = line_text.chars().take(caret_column).collect();
        let offset = before.width() as u16;
        let cursor_x = (body.x + number_width + offset).min(body.right().saturating_sub(1));
        let cursor_y = body.y + (caret_line - scroll) as u16;
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

/// First visible line so that `focus` stays on screen.
fn scroll_offset(focus: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    focus.saturating_sub(height - 1)
}

fn render_palette(frame: &mut Frame, area: Rect, app: &AppState, hitboxes: &mut Hitboxes) {
    let color = app.accent();
    let block = theme::panel(" Suno tags ", color, false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    let mut index = 0;
    let mut y = inner.y;
    for category in TAG_CATEGORIES {
        if y >= inner.bottom() {
            break;
        }
        lines.push(Line::from(Span::styled(
            category.name,
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        )));
        y += 1;

        let chips = category
            .tags
            .iter()
            .enumerate()
            .map(|(offset, tag)| {
                let style = theme::chip(color, false, index + offset == app.tag_cursor);
                (tag.label.to_string(), style)
            })
            .collect();
        let chip_area = Rect { y, height: inner.bottom().saturating_sub(y), ..inner };
        let (chip_lines, rects) = flow_chips(chip_area, chips);
        for (offset, rect) in rects.into_iter().enumerate() {
            if rect.y < inner.bottom() {
                hitboxes.tags.push((rect, index + offset));
            }
        }
        y += chip_lines.len() as u16;
        lines.extend(chip_lines);
        index += category.tags.len();
    }

    let category = catalog::category_of(app.tag_cursor).unwrap_or_default();
    let selected = catalog::tag_at(app.tag_cursor)
        .map(|tag| format!("{category} → {}", tag.value))
        .unwrap_or_default();
    if y < inner.bottom() {
        lines.push(Line::from(Span::styled(selected, theme::muted())));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_keeps_focus_visible() {
        assert_eq!(scroll_offset(0, 10), 0);
        assert_eq!(scroll_offset(9, 10), 0);
        assert_eq!(scroll_offset(10, 10), 1);
        assert_eq!(scroll_offset(25, 10), 16);
        assert_eq!(scroll_offset(3, 0), 0);
    }
}
