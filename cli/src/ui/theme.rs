use crate::types::ThemeColor;
use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders},
};

pub fn accent(color: ThemeColor) -> Color {
    match color {
        ThemeColor::Orange => Color::Rgb(249, 115, 22),
        ThemeColor::Blue => Color::Rgb(59, 130, 246),
        ThemeColor::Emerald => Color::Rgb(16, 185, 129),
        ThemeColor::Violet => Color::Rgb(139, 92, 246),
        ThemeColor::Rose => Color::Rgb(244, 63, 94),
    }
}

pub fn muted() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn panel<'a>(title: impl Into<String>, color: ThemeColor, focused: bool) -> Block<'a> {
    let border = if focused { accent(color) } else { Color::DarkGray };
    let title_style = if focused {
        Style::default().fg(accent(color)).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(Span::styled(title.into(), title_style))
}

/// Style for a selectable chip: filled when selected, outlined under the cursor.
pub fn chip(color: ThemeColor, selected: bool, under_cursor: bool) -> Style {
    let mut style = if selected {
        Style::default().fg(Color::Black).bg(accent(color)).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    if under_cursor {
        style = style.add_modifier(Modifier::REVERSED | Modifier::UNDERLINED);
    }
    style
}
