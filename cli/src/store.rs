use crate::types::{AppMode, ChatMessage, LyricTab, PromptParams, ThemeSettings};
use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::warn;

/// One persisted slice of application state. Each key is stored as its own
/// file and overwritten wholesale on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    Mode,
    Tab,
    ApiKey,
    LyricsOriginal,
    LyricsHiragana,
    PromptParams,
    PromptText,
    ChatHistory,
    Theme,
}

impl PrefKey {
    pub const ALL: [PrefKey; 9] = [
        Self::Mode,
        Self::Tab,
        Self::ApiKey,
        Self::LyricsOriginal,
        Self::LyricsHiragana,
        Self::PromptParams,
        Self::PromptText,
        Self::ChatHistory,
        Self::Theme,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mode => "suno_mode",
            Self::Tab => "suno_tab",
            Self::ApiKey => "suno_api_key",
            Self::LyricsOriginal => "suno_lyrics_orig",
            Self::LyricsHiragana => "suno_lyrics_hira",
            Self::PromptParams => "suno_prompt_params",
            Self::PromptText => "suno_prompt_text",
            Self::ChatHistory => "suno_chat_history",
            Self::Theme => "suno_theme",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    root: PathBuf,
}

impl PreferenceStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create state directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn default_root() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "SunoAssist", "SunoAssist")
            .ok_or_else(|| anyhow!("unable to determine state directory"))?;
        Ok(dirs.data_dir().join("state"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: PrefKey) -> PathBuf {
        self.root.join(key.name())
    }

    pub fn read_string(&self, key: PrefKey) -> Result<Option<String>> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn write_string(&self, key: PrefKey, value: &str) -> Result<()> {
        let path = self.path(key);
        fs::write(&path, value).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn read_json<T: DeserializeOwned>(&self, key: PrefKey) -> Result<Option<T>> {
        let Some(data) = self.read_string(key)? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse stored {}", key.name()))?;
        Ok(Some(value))
    }

    pub fn write_json<T: Serialize>(&self, key: PrefKey, value: &T) -> Result<()> {
        let data = serde_json::to_string(value)
            .with_context(|| format!("failed to encode {}", key.name()))?;
        self.write_string(key, &data)
    }

    pub fn remove(&self, key: PrefKey) -> Result<()> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

/// Everything restored at startup. Unreadable slices fall back to their
/// defaults; a broken file never prevents the app from starting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    pub mode: AppMode,
    pub tab: LyricTab,
    pub credential: Option<String>,
    pub lyrics_original: String,
    pub lyrics_hiragana: String,
    pub params: PromptParams,
    pub generated_prompt: String,
    pub chat: Vec<ChatMessage>,
    pub theme: ThemeSettings,
}

impl Preferences {
    pub fn load(store: &PreferenceStore) -> Self {
        let mode: Option<AppMode> = recover(PrefKey::Mode, read_parsed(store, PrefKey::Mode));
        let tab: Option<LyricTab> = recover(PrefKey::Tab, read_parsed(store, PrefKey::Tab));
        let credential = recover(PrefKey::ApiKey, store.read_string(PrefKey::ApiKey))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let params: PromptParams =
            recover(PrefKey::PromptParams, store.read_json(PrefKey::PromptParams))
                .unwrap_or_default();
        let params = params.sanitized();

        Self {
            mode: mode.unwrap_or_default(),
            tab: tab.unwrap_or_default(),
            credential,
            lyrics_original: recover(PrefKey::LyricsOriginal, store.read_string(PrefKey::LyricsOriginal))
                .unwrap_or_default(),
            lyrics_hiragana: recover(PrefKey::LyricsHiragana, store.read_string(PrefKey::LyricsHiragana))
                .unwrap_or_default(),
            params,
            generated_prompt: recover(PrefKey::PromptText, store.read_string(PrefKey::PromptText))
                .unwrap_or_default(),
            chat: recover(PrefKey::ChatHistory, store.read_json(PrefKey::ChatHistory))
                .unwrap_or_default(),
            theme: recover(PrefKey::Theme, store.read_json(PrefKey::Theme)).unwrap_or_default(),
        }
    }
}

fn read_parsed<T>(store: &PreferenceStore, key: PrefKey) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    store
        .read_string(key)?
        .map(|raw| raw.parse::<T>().with_context(|| format!("invalid stored {}", key.name())))
        .transpose()
}

fn recover<T>(key: PrefKey, result: Result<Option<T>>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(key = key.name(), "discarding stored preference: {err:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StyleField, ThemeColor, VocalCoordinate};

    fn temp_store() -> (tempfile::TempDir, PreferenceStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path().join("state")).unwrap();
        (dir, store)
    }

    #[test]
    fn prompt_params_round_trip_field_for_field() {
        let (_dir, store) = temp_store();
        let mut params = PromptParams {
            vocal: VocalCoordinate::new(-50, 60),
            artist: "宇多田ヒカル".into(),
            ..Default::default()
        };
        params.toggle(StyleField::Genres, "J-Pop");
        params.toggle(StyleField::Genres, "R&B");
        params.toggle(StyleField::Textures, "Husky");
        params.toggle(StyleField::Instruments, "Koto");

        store.write_json(PrefKey::PromptParams, &params).unwrap();
        let restored = Preferences::load(&store).params;

        assert_eq!(restored, params);
        assert_eq!(
            restored.genres.iter().collect::<Vec<_>>(),
            params.genres.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn persisted_params_outside_catalog_are_dropped_on_reload() {
        let (_dir, store) = temp_store();
        store
            .write_string(
                PrefKey::PromptParams,
                r#"{"vocalX":400,"vocalY":-3,"artist":"Ado",
                    "genres":["Polka","J-Pop","heavy metal","Jazz","J-Pop"],
                    "textures":["Yodel"],"instruments":["koto","Kazoo"]}"#,
            )
            .unwrap();

        let params = Preferences::load(&store).params;
        assert_eq!(params.vocal, VocalCoordinate::new(100, -3));
        assert_eq!(params.artist, "Ado");
        assert_eq!(
            params.genres.iter().collect::<Vec<_>>(),
            vec!["J-Pop", "Heavy Metal", "Jazz"]
        );
        assert!(params.textures.is_empty());
        assert_eq!(params.instruments.iter().collect::<Vec<_>>(), vec!["Koto"]);
    }

    #[test]
    fn missing_files_yield_defaults() {
        let (_dir, store) = temp_store();
        let prefs = Preferences::load(&store);
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.theme.creation, ThemeColor::Violet);
    }

    #[test]
    fn corrupt_slices_fall_back_without_touching_others() {
        let (_dir, store) = temp_store();
        store.write_string(PrefKey::Theme, "{not json").unwrap();
        store.write_string(PrefKey::Mode, "karaoke").unwrap();
        store.write_string(PrefKey::Tab, "hiragana").unwrap();
        store.write_string(PrefKey::LyricsOriginal, "[Verse]\n歌詞").unwrap();

        let prefs = Preferences::load(&store);
        assert_eq!(prefs.theme, ThemeSettings::default());
        assert_eq!(prefs.mode, AppMode::Lyrics);
        assert_eq!(prefs.tab, LyricTab::Hiragana);
        assert_eq!(prefs.lyrics_original, "[Verse]\n歌詞");
    }

    #[test]
    fn blank_credential_is_treated_as_absent_and_remove_is_idempotent() {
        let (_dir, store) = temp_store();
        store.write_string(PrefKey::ApiKey, "   ").unwrap();
        assert_eq!(Preferences::load(&store).credential, None);

        store.write_string(PrefKey::ApiKey, "AIzaSy-test-key-123").unwrap();
        assert_eq!(Preferences::load(&store).credential.as_deref(), Some("AIzaSy-test-key-123"));

        store.remove(PrefKey::ApiKey).unwrap();
        store.remove(PrefKey::ApiKey).unwrap();
        assert_eq!(store.read_string(PrefKey::ApiKey).unwrap(), None);
    }

    #[test]
    fn last_write_wins() {
        let (_dir, store) = temp_store();
        for mode in AppMode::ALL {
            store.write_string(PrefKey::Mode, mode.as_str()).unwrap();
        }
        assert_eq!(Preferences::load(&store).mode, AppMode::Chat);
        assert!(store.root().ends_with("state"));
        assert_eq!(PrefKey::ALL.len(), 9);
    }
}
