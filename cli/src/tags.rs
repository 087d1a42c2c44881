//! Inserting Suno meta tags into lyrics, and reading the section structure
//! those tags describe.

use crate::types::LyricSection;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagInsertError {
    #[error("Select the line you want to tag first.")]
    NoLineSelected,
    #[error("Line {0} no longer exists; select a line again.")]
    LineOutOfRange(usize),
}

/// Result of splicing text at the caret. `caret` is a character offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaretSplice {
    pub text: String,
    pub caret: usize,
}

/// Replaces the characters between `start` and `end` with `tag`.
/// Offsets are character offsets and are clamped to the content.
pub fn insert_at_caret(content: &str, start: usize, end: usize, tag: &str) -> CaretSplice {
    let (start, end) = (start.min(end), start.max(end));
    let start_byte = byte_offset(content, start);
    let end_byte = byte_offset(content, end);
    let caret = content[..start_byte].chars().count() + tag.chars().count();

    let mut text = String::with_capacity(content.len() + tag.len());
    text.push_str(&content[..start_byte]);
    text.push_str(tag);
    text.push_str(&content[end_byte..]);
    CaretSplice { text, caret }
}

/// Prefixes the selected line with `tag`, trimming the line's own content.
pub fn insert_at_line(
    content: &str,
    selected: Option<usize>,
    tag: &str,
) -> Result<String, TagInsertError> {
    let index = selected.ok_or(TagInsertError::NoLineSelected)?;
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let line = lines.get_mut(index).ok_or(TagInsertError::LineOutOfRange(index))?;
    *line = format!("{tag} {}", line.trim());
    Ok(lines.join("\n"))
}

/// Wraps free text in brackets unless it is already bracketed.
pub fn normalize_custom_tag(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        Some(trimmed.to_string())
    } else {
        Some(format!("[{trimmed}]"))
    }
}

pub fn is_tag_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('[') && trimmed.contains(']')
}

/// Splits lyrics at structural tag lines. Text before the first tag, or
/// lyrics with no tags at all, form an untitled leading section. Sections
/// without any lyric text are skipped.
pub fn split_sections(lyrics: &str) -> Vec<LyricSection> {
    let mut sections = Vec::new();
    let mut title = String::from("Untitled");
    let mut body: Vec<&str> = Vec::new();

    for line in lyrics.lines() {
        let trimmed = line.trim();
        if is_tag_line(trimmed) {
            flush_section(&mut sections, &title, &body);
            body.clear();
            let close = trimmed.find(']').unwrap_or(trimmed.len() - 1);
            title = trimmed[1..close].trim().to_string();
            let rest = trimmed[close + 1..].trim();
            if !rest.is_empty() {
                body.push(rest);
            }
        } else if !trimmed.is_empty() {
            body.push(trimmed);
        }
    }
    flush_section(&mut sections, &title, &body);
    sections
}

fn flush_section(sections: &mut Vec<LyricSection>, title: &str, body: &[&str]) {
    if body.is_empty() {
        return;
    }
    sections.push(LyricSection { title: title.to_string(), content: body.join("\n") });
}

pub(crate) fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map(|(idx, _)| idx).unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_insert_matches_the_documented_example() {
        let splice = insert_at_caret("Hello world", 5, 5, "[Chorus]");
        assert_eq!(splice.text, "Hello[Chorus] world");
        assert_eq!(splice.caret, 13);
    }

    #[test]
    fn caret_insert_replaces_selection_and_keeps_length_formula() {
        let content = "あいうえお かきくけこ";
        let cases = [(0, 0), (2, 4), (5, 5), (0, 11), (11, 11), (3, 1)];
        for (start, end) in cases {
            let splice = insert_at_caret(content, start, end, "[Verse]");
            let removed = start.max(end) - start.min(end);
            assert_eq!(
                splice.text.chars().count(),
                content.chars().count() - removed + "[Verse]".chars().count()
            );
            assert_eq!(splice.caret, start.min(end) + 7);
        }
        assert_eq!(insert_at_caret(content, 2, 4, "[Hook]").text, "あい[Hook]お かきくけこ");
    }

    #[test]
    fn caret_offsets_past_the_end_append() {
        let splice = insert_at_caret("abc", 10, 20, "[End]");
        assert_eq!(splice.text, "abc[End]");
        assert_eq!(splice.caret, 8);
    }

    #[test]
    fn line_insert_prefixes_and_trims_selected_line() {
        let content = "first\n   second line  \nthird";
        let updated = insert_at_line(content, Some(1), "[Chorus]").unwrap();
        assert_eq!(updated, "first\n[Chorus] second line\nthird");
        assert_eq!(updated.split('\n').count(), content.split('\n').count());
    }

    #[test]
    fn line_insert_preserves_line_count_including_blank_lines() {
        let content = "a\n\n\nb\n";
        for index in 0..content.split('\n').count() {
            let updated = insert_at_line(content, Some(index), "[Break]").unwrap();
            assert_eq!(updated.split('\n').count(), 5);
        }
    }

    #[test]
    fn line_insert_requires_a_selected_line() {
        assert_eq!(insert_at_line("a\nb", None, "[Intro]"), Err(TagInsertError::NoLineSelected));
        assert_eq!(
            insert_at_line("a\nb", Some(7), "[Intro]"),
            Err(TagInsertError::LineOutOfRange(7))
        );
    }

    #[test]
    fn custom_tags_are_bracketed_once() {
        assert_eq!(normalize_custom_tag("Guitar Riff").as_deref(), Some("[Guitar Riff]"));
        assert_eq!(normalize_custom_tag(" [Key Change] ").as_deref(), Some("[Key Change]"));
        assert_eq!(normalize_custom_tag("[half"), Some("[[half]".to_string()));
        assert_eq!(normalize_custom_tag("   "), None);
    }

    #[test]
    fn sections_follow_structural_tags() {
        let lyrics = "intro words\n[Verse]\n街の灯り\n\n歩いていく\n[Chorus] 空へ\n高く\n[Outro]\n";
        let sections = split_sections(lyrics);
        assert_eq!(
            sections,
            vec![
                LyricSection { title: "Untitled".into(), content: "intro words".into() },
                LyricSection { title: "Verse".into(), content: "街の灯り\n歩いていく".into() },
                LyricSection { title: "Chorus".into(), content: "空へ\n高く".into() },
            ]
        );
        assert!(split_sections("").is_empty());
    }
}
