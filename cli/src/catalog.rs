//! Compiled-in catalogs: Suno meta tags and the style lists of the prompt builder.

use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunoTag {
    pub label: &'static str,
    pub value: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct TagCategory {
    pub name: &'static str,
    pub tags: &'static [SunoTag],
}

const fn tag(label: &'static str, value: &'static str) -> SunoTag {
    SunoTag { label, value }
}

pub const TAG_CATEGORIES: &[TagCategory] = &[
    TagCategory {
        name: "Structure",
        tags: &[
            tag("Intro", "[Intro]"),
            tag("Verse", "[Verse]"),
            tag("Pre-Chorus", "[Pre-Chorus]"),
            tag("Chorus", "[Chorus]"),
            tag("Post-Chorus", "[Post-Chorus]"),
            tag("Bridge", "[Bridge]"),
            tag("Interlude", "[Interlude]"),
            tag("Outro", "[Outro]"),
            tag("End", "[End]"),
            tag("Hook", "[Hook]"),
            tag("Drop", "[Drop]"),
            tag("Break", "[Break]"),
        ],
    },
    TagCategory {
        name: "Vocals",
        tags: &[
            tag("Male", "[Male Vocals]"),
            tag("Female", "[Female Vocals]"),
            tag("Duet", "[Duet]"),
            tag("Choir", "[Choir]"),
            tag("Whisper", "[Whisper]"),
            tag("Rap", "[Rap]"),
            tag("Scream", "[Scream]"),
            tag("Spoken", "[Spoken Word]"),
            tag("Autotune", "[Autotune]"),
        ],
    },
    TagCategory {
        name: "Instruments",
        tags: &[
            tag("Instrumental", "[Instrumental]"),
            tag("Guitar Solo", "[Guitar Solo]"),
            tag("Piano Solo", "[Piano Solo]"),
            tag("Bass Solo", "[Bass Solo]"),
            tag("Drum Fill", "[Drum Fill]"),
            tag("Synth Solo", "[Synth Solo]"),
            tag("Acoustic", "[Acoustic]"),
            tag("Orchestral", "[Orchestral]"),
        ],
    },
    TagCategory {
        name: "Mood & Speed",
        tags: &[
            tag("Fast", "[Fast Tempo]"),
            tag("Slow", "[Slow Tempo]"),
            tag("Sad", "[Sad]"),
            tag("Happy", "[Happy]"),
            tag("Dark", "[Dark]"),
            tag("Epic", "[Epic]"),
            tag("Chill", "[Chill]"),
            tag("Silence", "[Silence]"),
            tag("Fade Out", "[Fade Out]"),
            tag("Big Finish", "[Big Finish]"),
        ],
    },
];

pub const VOCAL_TEXTURES: &[&str] = &[
    "Edge Voice (Fry)",
    "Whisper",
    "Growl (Ganari)",
    "Seductive",
    "Sexy",
    "Anime Voice",
    "Falsetto",
    "Powerful",
    "Mellow",
    "Husky",
    "Clear",
    "Robot/Autotune",
];

pub const GENRES: &[&str] = &[
    "Visual Kei",
    "J-Pop",
    "J-Rock",
    "Anime Song",
    "EDM",
    "City Pop",
    "Ballad",
    "Heavy Metal",
    "R&B",
    "Jazz",
    "Lo-Fi",
    "Hip Hop",
    "Vocaloid Style",
    "Electro Swing",
];

pub const EMPHASIS_INSTRUMENTS: &[&str] = &[
    "Piano",
    "Guitar",
    "Bass",
    "Slap Bass",
    "Drums",
    "Shamisen",
    "Human Beatbox",
    "Koto",
    "Shakuhachi",
    "Xylophone",
    "Glockenspiel",
];

/// Every tag in palette order, paired with the name of its category.
static FLAT_TAGS: Lazy<Vec<(&'static str, SunoTag)>> = Lazy::new(|| {
    TAG_CATEGORIES
        .iter()
        .flat_map(|category| category.tags.iter().map(move |tag| (category.name, *tag)))
        .collect()
});

pub fn tag_count() -> usize {
    FLAT_TAGS.len()
}

pub fn tag_at(index: usize) -> Option<SunoTag> {
    FLAT_TAGS.get(index).map(|(_, tag)| *tag)
}

pub fn category_of(index: usize) -> Option<&'static str> {
    FLAT_TAGS.get(index).map(|(name, _)| *name)
}

/// Case-insensitive catalog lookup returning the canonical spelling.
pub fn canonical(catalog: &'static [&'static str], value: &str) -> Option<&'static str> {
    let needle = value.trim();
    catalog.iter().copied().find(|entry| entry.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_sizes_match_the_published_lists() {
        assert_eq!(TAG_CATEGORIES.len(), 4);
        assert_eq!(tag_count(), 39);
        assert_eq!(VOCAL_TEXTURES.len(), 12);
        assert_eq!(GENRES.len(), 14);
        assert_eq!(EMPHASIS_INSTRUMENTS.len(), 11);
    }

    #[test]
    fn every_tag_value_is_bracketed() {
        for index in 0..tag_count() {
            let tag = tag_at(index).unwrap();
            assert!(tag.value.starts_with('[') && tag.value.ends_with(']'), "{}", tag.value);
        }
        assert_eq!(category_of(12), Some("Vocals"));
        assert!(tag_at(tag_count()).is_none());
    }

    #[test]
    fn canonical_lookup_ignores_case_and_whitespace() {
        assert_eq!(canonical(GENRES, " j-pop "), Some("J-Pop"));
        assert_eq!(canonical(EMPHASIS_INSTRUMENTS, "koto"), Some("Koto"));
        assert_eq!(canonical(GENRES, "Polka"), None);
    }
}
