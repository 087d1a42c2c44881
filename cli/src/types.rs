use crate::catalog::{self, EMPHASIS_INSTRUMENTS, GENRES, VOCAL_TEXTURES};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

pub const COORDINATE_LIMIT: i32 = 100;

/// Position on the vocal pad: x runs masculine (-100) to feminine (100),
/// y runs low pitch (-100) to high pitch (100).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VocalCoordinate {
    #[serde(rename = "vocalX")]
    pub x: i32,
    #[serde(rename = "vocalY")]
    pub y: i32,
}

impl VocalCoordinate {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x: x.clamp(-COORDINATE_LIMIT, COORDINATE_LIMIT),
            y: y.clamp(-COORDINATE_LIMIT, COORDINATE_LIMIT),
        }
    }

    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(round_axis(x), round_axis(y))
    }

    pub fn clamped(self) -> Self {
        Self::new(self.x, self.y)
    }
}

fn round_axis(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(-COORDINATE_LIMIT as f64, COORDINATE_LIMIT as f64) as i32
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    #[default]
    Lyrics,
    Prompt,
    Creation,
    Chat,
}

impl AppMode {
    pub const ALL: [AppMode; 4] = [Self::Lyrics, Self::Prompt, Self::Creation, Self::Chat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lyrics => "lyrics",
            Self::Prompt => "prompt",
            Self::Creation => "creation",
            Self::Chat => "chat",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Lyrics => "Lyrics",
            Self::Prompt => "Prompt",
            Self::Creation => "Creation",
            Self::Chat => "Chat",
        }
    }
}

impl FromStr for AppMode {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value.trim())
            .ok_or_else(|| UnknownVariant(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LyricTab {
    #[default]
    Original,
    Hiragana,
}

impl LyricTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Hiragana => "hiragana",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Original => "Original",
            Self::Hiragana => "Hiragana",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Original => Self::Hiragana,
            Self::Hiragana => Self::Original,
        }
    }
}

impl FromStr for LyricTab {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "original" => Ok(Self::Original),
            "hiragana" => Ok(Self::Hiragana),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value `{0}`")]
pub struct UnknownVariant(pub String);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThemeColor {
    Orange,
    Blue,
    Emerald,
    Violet,
    Rose,
}

impl ThemeColor {
    pub const PALETTE: [ThemeColor; 5] =
        [Self::Orange, Self::Blue, Self::Emerald, Self::Violet, Self::Rose];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Orange => "Orange",
            Self::Blue => "Blue",
            Self::Emerald => "Green",
            Self::Violet => "Purple",
            Self::Rose => "Pink",
        }
    }

    pub fn next(&self) -> Self {
        let idx = Self::PALETTE.iter().position(|c| c == self).unwrap_or(0);
        Self::PALETTE[(idx + 1) % Self::PALETTE.len()]
    }

    pub fn previous(&self) -> Self {
        let idx = Self::PALETTE.iter().position(|c| c == self).unwrap_or(0);
        Self::PALETTE[(idx + Self::PALETTE.len() - 1) % Self::PALETTE.len()]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeSettings {
    pub lyrics: ThemeColor,
    pub prompt: ThemeColor,
    pub chat: ThemeColor,
    pub creation: ThemeColor,
}

impl ThemeSettings {
    pub fn color_for(&self, mode: AppMode) -> ThemeColor {
        match mode {
            AppMode::Lyrics => self.lyrics,
            AppMode::Prompt => self.prompt,
            AppMode::Creation => self.creation,
            AppMode::Chat => self.chat,
        }
    }

    pub fn set(&mut self, mode: AppMode, color: ThemeColor) {
        match mode {
            AppMode::Lyrics => self.lyrics = color,
            AppMode::Prompt => self.prompt = color,
            AppMode::Creation => self.creation = color,
            AppMode::Chat => self.chat = color,
        }
    }
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            lyrics: ThemeColor::Orange,
            prompt: ThemeColor::Blue,
            chat: ThemeColor::Emerald,
            creation: ThemeColor::Violet,
        }
    }
}

/// The three multi-select style lists of the prompt builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleField {
    Textures,
    Genres,
    Instruments,
}

impl StyleField {
    pub const ALL: [StyleField; 3] = [Self::Textures, Self::Genres, Self::Instruments];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Textures => "Vocal texture",
            Self::Genres => "Genre",
            Self::Instruments => "Instruments",
        }
    }

    pub fn catalog(&self) -> &'static [&'static str] {
        match self {
            Self::Textures => VOCAL_TEXTURES,
            Self::Genres => GENRES,
            Self::Instruments => EMPHASIS_INSTRUMENTS,
        }
    }

    /// Upper bound on how many values an analysis result may set.
    pub fn analysis_limit(&self) -> usize {
        match self {
            Self::Textures => 2,
            Self::Genres => 3,
            Self::Instruments => 2,
        }
    }

    /// Catalog members among `values` in canonical spelling, first
    /// occurrence wins. Anything else is dropped with a warning.
    pub fn members<'a>(
        &self,
        values: impl IntoIterator<Item = &'a str>,
    ) -> IndexSet<&'static str> {
        let mut kept = IndexSet::new();
        for value in values {
            match catalog::canonical(self.catalog(), value) {
                Some(canonical) => {
                    kept.insert(canonical);
                }
                None => warn!(field = self.label(), value, "dropping value outside catalog"),
            }
        }
        kept
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PromptParams {
    #[serde(flatten)]
    pub vocal: VocalCoordinate,
    pub artist: String,
    pub textures: IndexSet<String>,
    pub genres: IndexSet<String>,
    pub instruments: IndexSet<String>,
}

impl PromptParams {
    pub fn field(&self, field: StyleField) -> &IndexSet<String> {
        match field {
            StyleField::Textures => &self.textures,
            StyleField::Genres => &self.genres,
            StyleField::Instruments => &self.instruments,
        }
    }

    fn field_mut(&mut self, field: StyleField) -> &mut IndexSet<String> {
        match field {
            StyleField::Textures => &mut self.textures,
            StyleField::Genres => &mut self.genres,
            StyleField::Instruments => &mut self.instruments,
        }
    }

    pub fn is_selected(&self, field: StyleField, value: &str) -> bool {
        self.field(field).contains(value)
    }

    /// Flips membership of `value`. Values outside the field's catalog are
    /// rejected and leave the set untouched; returns whether anything changed.
    pub fn toggle(&mut self, field: StyleField, value: &str) -> bool {
        if !field.catalog().contains(&value) {
            return false;
        }
        let set = self.field_mut(field);
        if !set.shift_remove(value) {
            set.insert(value.to_string());
        }
        true
    }

    /// Overwrites a field with the catalog members of `values`.
    pub fn replace(&mut self, field: StyleField, values: Vec<String>) {
        let kept = field.members(values.iter().map(String::as_str));
        let set = self.field_mut(field);
        set.clear();
        set.extend(kept.into_iter().map(str::to_string));
    }

    /// Drops persisted selections that are no longer catalog members and
    /// pulls the coordinate back into range.
    pub fn sanitized(mut self) -> Self {
        self.vocal = self.vocal.clamped();
        for field in StyleField::ALL {
            let values = std::mem::take(self.field_mut(field)).into_iter().collect();
            self.replace(field, values);
        }
        self
    }

    pub fn apply_artist_analysis(&mut self, analysis: &ArtistAnalysis) {
        self.vocal = analysis.coordinate();
        self.replace(StyleField::Genres, analysis.genres.clone());
        self.replace(StyleField::Textures, analysis.textures.clone());
        self.replace(StyleField::Instruments, analysis.instruments.clone());
    }

    pub fn apply_audio_analysis(&mut self, analysis: &AudioAnalysis) {
        self.vocal = analysis.coordinate();
        self.replace(StyleField::Textures, analysis.textures.clone());
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Model => "Assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: ChatRole::User, text: text.into(), image: None }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: ChatRole::Model, text: text.into(), image: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArtistAnalysis {
    #[serde(default)]
    pub vocal_x: f64,
    #[serde(default)]
    pub vocal_y: f64,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub textures: Vec<String>,
    #[serde(default)]
    pub instruments: Vec<String>,
}

impl ArtistAnalysis {
    pub fn coordinate(&self) -> VocalCoordinate {
        VocalCoordinate::from_f64(self.vocal_x, self.vocal_y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioAnalysis {
    #[serde(default)]
    pub vocal_x: f64,
    #[serde(default)]
    pub vocal_y: f64,
    #[serde(default)]
    pub textures: Vec<String>,
}

impl AudioAnalysis {
    pub fn coordinate(&self) -> VocalCoordinate {
        VocalCoordinate::from_f64(self.vocal_x, self.vocal_y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VisualPrompt {
    #[serde(default)]
    pub scene_description: String,
    #[serde(default)]
    pub image_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoPrompt {
    #[serde(default)]
    pub lyrics_excerpt: String,
    #[serde(default)]
    pub scene_description: String,
    #[serde(default, alias = "soraPrompt")]
    pub motion_prompt: String,
}

/// A block of lyrics headed by a structural tag such as `[Chorus]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricSection {
    pub title: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_is_clamped_on_construction() {
        let coord = VocalCoordinate::new(250, -180);
        assert_eq!(coord, VocalCoordinate { x: 100, y: -100 });
        assert_eq!(VocalCoordinate::from_f64(35.6, f64::NAN), VocalCoordinate { x: 36, y: 0 });
    }

    #[test]
    fn toggle_rejects_values_outside_catalog() {
        let mut params = PromptParams::default();
        assert!(params.toggle(StyleField::Genres, "J-Pop"));
        assert!(params.toggle(StyleField::Genres, "City Pop"));
        assert!(!params.toggle(StyleField::Genres, "Polka"));
        assert_eq!(params.genres.iter().collect::<Vec<_>>(), vec!["J-Pop", "City Pop"]);

        assert!(params.toggle(StyleField::Genres, "J-Pop"));
        assert_eq!(params.genres.iter().collect::<Vec<_>>(), vec!["City Pop"]);
    }

    #[test]
    fn replace_keeps_canonical_catalog_members_only() {
        let mut params = PromptParams::default();
        params.replace(
            StyleField::Genres,
            vec!["Polka".into(), "j-pop".into(), "J-Pop".into(), " jazz ".into()],
        );
        assert_eq!(params.genres.iter().collect::<Vec<_>>(), vec!["J-Pop", "Jazz"]);

        params.replace(StyleField::Instruments, vec!["Kazoo".into()]);
        assert!(params.instruments.is_empty());
    }

    #[test]
    fn unknown_variant_names_the_value() {
        let err = "karaoke".parse::<AppMode>().unwrap_err();
        assert_eq!(err.to_string(), "unknown value `karaoke`");
    }

    #[test]
    fn prompt_params_serialize_with_flat_vocal_fields() {
        let mut params = PromptParams { vocal: VocalCoordinate::new(-40, 20), ..Default::default() };
        params.artist = "Someone".into();
        params.toggle(StyleField::Textures, "Whisper");

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["vocalX"], -40);
        assert_eq!(value["vocalY"], 20);
        assert_eq!(value["textures"], serde_json::json!(["Whisper"]));

        let parsed: PromptParams =
            serde_json::from_str(r#"{"vocalX":10,"vocalY":-5,"artist":"","genres":["EDM"]}"#)
                .unwrap();
        assert_eq!(parsed.vocal, VocalCoordinate::new(10, -5));
        assert!(parsed.textures.is_empty());
        assert!(parsed.is_selected(StyleField::Genres, "EDM"));
    }

    #[test]
    fn video_prompt_accepts_legacy_field_name() {
        let parsed: VideoPrompt =
            serde_json::from_str(r#"{"sceneDescription":"夜の街","soraPrompt":"slow pan"}"#).unwrap();
        assert_eq!(parsed.motion_prompt, "slow pan");
        assert!(parsed.lyrics_excerpt.is_empty());
    }

    #[test]
    fn mode_and_tab_parse_from_persisted_strings() {
        assert_eq!("creation".parse::<AppMode>().unwrap(), AppMode::Creation);
        assert!("studio".parse::<AppMode>().is_err());
        assert_eq!("hiragana".parse::<LyricTab>().unwrap(), LyricTab::Hiragana);
        assert_eq!(ThemeColor::Rose.next(), ThemeColor::Orange);
        assert_eq!(ThemeColor::Orange.previous(), ThemeColor::Rose);
    }
}
