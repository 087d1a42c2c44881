use super::{theme, Hitboxes};
use crate::app::{AppState, Slot};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, area: Rect, app: &AppState, hitboxes: &mut Hitboxes) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    render_visual(frame, rows[0], app);
    render_sections(frame, bottom[0], app, hitboxes);
    render_video(frame, bottom[1], app);
}

fn label(text: &str, color: Color) -> Span<'_> {
    Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn render_visual(frame: &mut Frame, area: Rect, app: &AppState) {
    let accent = theme::accent(app.accent());
    let title = if app.is_busy(Slot::Creation) { " Visual · painting… " } else { " Visual " };
    let block = theme::panel(title, app.accent(), true);

    let lines = match &app.creation.visual {
        None => vec![Line::from(Span::styled(
            "^G reads the original lyrics and designs a cover image for them.",
            theme::muted(),
        ))],
        Some(visual) => {
            let image = match &app.creation.image_path {
                Some(path) => Span::raw(path.display().to_string()),
                None if app.is_busy(Slot::Creation) => Span::styled("rendering…", theme::muted()),
                None => Span::styled("not saved", theme::muted()),
            };
            vec![
                Line::from(label("Scene", accent)),
                Line::from(visual.scene_description.as_str()),
                Line::default(),
                Line::from(label("Image prompt", accent)),
                Line::from(visual.image_prompt.as_str()),
                Line::default(),
                Line::from(vec![label("Image ", accent), image]),
            ]
        }
    };
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn render_sections(frame: &mut Frame, area: Rect, app: &AppState, hitboxes: &mut Hitboxes) {
    let block = theme::panel(" Sections ", app.accent(), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sections = app.sections();
    if sections.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled("Tag sections like [Verse] to list them.", theme::muted()))
                .wrap(Wrap { trim: false }),
            inner,
        );
        return;
    }

    let height = inner.height as usize;
    let cursor = app.creation.section_cursor.min(sections.len() - 1);
    let scroll = cursor.saturating_sub(height.saturating_sub(1));
    let lines: Vec<Line> = sections
        .iter()
        .enumerate()
        .skip(scroll)
        .take(height)
        .map(|(index, section)| {
            let done = if app.creation.videos.contains_key(&section.content) { "✓" } else { " " };
            let style = if index == cursor {
                Style::default().fg(Color::Black).bg(theme::accent(app.accent()))
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!("{done} {}", section.title), style))
        })
        .collect();
    for (row, index) in (scroll..scroll + lines.len()).enumerate() {
        hitboxes.sections.push((Rect { y: inner.y + row as u16, height: 1, ..inner }, index));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_video(frame: &mut Frame, area: Rect, app: &AppState) {
    let accent = theme::accent(app.accent());
    let block = theme::panel(" Video prompt ", app.accent(), false);
    let sections = app.sections();
    let Some(section) = sections.get(app.creation.section_cursor) else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let mut lines = vec![Line::from(label(section.title.as_str(), accent))];
    lines.extend(section.content.lines().map(|line| Line::styled(line.to_string(), theme::muted())));
    lines.push(Line::default());
    match app.creation.videos.get(&section.content) {
        Some(video) => {
            lines.push(Line::from(label("Scene", accent)));
            lines.push(Line::from(video.scene_description.clone()));
            lines.push(Line::default());
            lines.push(Line::from(label("Motion prompt", accent)));
            lines.push(Line::from(video.motion_prompt.clone()));
        }
        None => lines.push(Line::from(Span::styled(
            "Enter writes a video generation prompt for this section.",
            theme::muted(),
        ))),
    }
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}
