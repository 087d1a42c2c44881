use super::{flow_chips, theme, Hitboxes};
use crate::{
    app::{AppState, PromptFocus, Slot},
    gateway::{self, PROMPT_CHAR_LIMIT},
    types::StyleField,
    xy_pad,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

pub fn render(frame: &mut Frame, area: Rect, app: &AppState, hitboxes: &mut Hitboxes) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(7)])
        .split(columns[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(6),
            Constraint::Min(4),
        ])
        .split(columns[1]);

    render_artist(frame, left[0], app);
    render_pad(frame, left[1], app, hitboxes);
    for (field, rect) in StyleField::ALL.into_iter().zip(right.iter()) {
        render_field(frame, *rect, app, field, hitboxes);
    }
    render_output(frame, right[3], app);
}

fn render_artist(frame: &mut Frame, area: Rect, app: &AppState) {
    let focused = app.prompt_focus == PromptFocus::Artist;
    let title = if app.is_busy(Slot::Style) { " Artist · analyzing… " } else { " Artist " };
    let block = theme::panel(title, app.accent(), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = if app.params.artist.is_empty() {
        Line::from(Span::styled("Reference artist, Enter to analyze", theme::muted()))
    } else {
        Line::from(app.params.artist.as_str())
    };
    frame.render_widget(Paragraph::new(line), inner);

    if focused && app.overlay.is_none() && app.notice().is_none() {
        let offset = app.params.artist.width() as u16;
        let x = (inner.x + offset).min(inner.right().saturating_sub(1));
        frame.set_cursor_position((x, inner.y));
    }
}

fn render_pad(frame: &mut Frame, area: Rect, app: &AppState, hitboxes: &mut Hitboxes) {
    let vocal = app.params.vocal;
    let focused = app.prompt_focus == PromptFocus::Pad;
    let descriptor = gateway::vocal_descriptor(vocal);
    let title = format!(" Vocal x {} y {} · {descriptor} ", vocal.x, vocal.y);
    let block = theme::panel(title, app.accent(), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width < 5 || inner.height < 3 {
        return;
    }

    let pad = Rect { y: inner.y + 1, height: inner.height - 2, ..inner };
    hitboxes.pad = Some(pad);

    let accent = theme::accent(app.accent());
    let (handle_x, handle_y) = xy_pad::handle_cell(vocal, pad);
    let center_x = pad.x + pad.width / 2;
    let center_y = pad.y + pad.height / 2;

    let mut lines = vec![axis_caption(inner.width, "High", None)];
    for row in pad.y..pad.bottom() {
        let spans: Vec<Span> = (pad.x..pad.right())
            .map(|column| {
                if (column, row) == (handle_x, handle_y) {
                    Span::styled("●", Style::default().fg(accent).add_modifier(Modifier::BOLD))
                } else if column == center_x && row == center_y {
                    Span::styled("┼", theme::muted())
                } else if column == center_x {
                    Span::styled("│", theme::muted())
                } else if row == center_y {
                    Span::styled("─", theme::muted())
                } else {
                    Span::styled("·", Style::default().fg(Color::Rgb(60, 60, 70)))
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines.push(axis_caption(inner.width, "Low", Some(("Male", "Female"))));
    frame.render_widget(Paragraph::new(lines), inner);
}

fn axis_caption(width: u16, middle: &str, ends: Option<(&str, &str)>) -> Line<'static> {
    let width = width as usize;
    let middle_len = middle.chars().count();
    let (left, right) = ends.unwrap_or(("", ""));
    let left_len = left.chars().count();
    let right_len = right.chars().count();
    let middle_start = (width.saturating_sub(middle_len)) / 2;
    let gap_left = middle_start.saturating_sub(left_len);
    let gap_right = width.saturating_sub(middle_start + middle_len + right_len);
    Line::from(Span::styled(
        format!("{left}{}{middle}{}{right}", " ".repeat(gap_left), " ".repeat(gap_right)),
        theme::muted(),
    ))
}

fn render_field(
    frame: &mut Frame,
    area: Rect,
    app: &AppState,
    field: StyleField,
    hitboxes: &mut Hitboxes,
) {
    let focused = app.prompt_focus == PromptFocus::Field(field);
    let selected = app.params.field(field).len();
    let block = theme::panel(format!(" {} ({selected}) ", field.label()), app.accent(), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chips = field
        .catalog()
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let style = theme::chip(
                app.accent(),
                app.params.is_selected(field, value),
                focused && index == app.chip_cursor,
            );
            (value.to_string(), style)
        })
        .collect();
    let (lines, rects) = flow_chips(inner, chips);
    for (rect, value) in rects.into_iter().zip(field.catalog()) {
        if rect.y < inner.bottom() {
            hitboxes.chips.push((rect, (field, *value)));
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_output(frame: &mut Frame, area: Rect, app: &AppState) {
    let count = app.generated_prompt.chars().count();
    let title = format!(" Suno style prompt {count}/{PROMPT_CHAR_LIMIT} ");
    let block = theme::panel(title, app.accent(), false);
    let body = if app.generated_prompt.is_empty() {
        Paragraph::new(Span::styled(
            "^G turns the settings above into a prompt for Suno's style field.",
            theme::muted(),
        ))
    } else {
        Paragraph::new(app.generated_prompt.as_str())
    };
    frame.render_widget(body.block(block).wrap(Wrap { trim: false }), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_places_labels_at_edges_and_center() {
        let line = axis_caption(20, "Low", Some(("Male", "Female")));
        let text: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
        assert_eq!(text.chars().count(), 20);
        assert!(text.starts_with("Male"));
        assert!(text.ends_with("Female"));
        assert_eq!(text.find("Low"), Some(8));
    }
}
