use crate::store::PreferenceStore;
use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_CONFIG_PATH: &str = "SUNO_ASSIST_CONFIG_PATH";
const ENV_API_BASE: &str = "SUNO_ASSIST_API_BASE";
const ENV_API_KEY: &str = "SUNO_ASSIST_API_KEY";
const ENV_TEXT_MODEL: &str = "SUNO_ASSIST_MODEL";
const ENV_FAST_MODEL: &str = "SUNO_ASSIST_FAST_MODEL";
const ENV_IMAGE_MODEL: &str = "SUNO_ASSIST_IMAGE_MODEL";
const ENV_VOICE_MODEL: &str = "SUNO_ASSIST_VOICE_MODEL";
const ENV_STATE_DIR: &str = "SUNO_ASSIST_STATE_DIR";
const ENV_ARTIFACT_DIR: &str = "SUNO_ASSIST_ARTIFACT_DIR";

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/";

/// Gemini model identifiers, one per kind of request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Models {
    pub text: String,
    pub fast: String,
    pub image: String,
    pub voice: String,
}

impl Default for Models {
    fn default() -> Self {
        Self {
            text: "gemini-1.5-pro".into(),
            fast: "gemini-1.5-flash-001".into(),
            image: "gemini-2.0-flash-preview-image-generation".into(),
            voice: "gemini-2.5-flash-preview-tts".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    api_base: String,
    api_key: Option<String>,
    models: Models,
    state_dir: Option<PathBuf>,
    artifact_dir: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let path = match config_file_override() {
            Some(path) => Some(path),
            None => Self::default_config_path().ok(),
        };
        if let Some(path) = path.filter(|path| path.exists()) {
            let partial = read_partial(&path)?;
            config.apply_partial(partial);
        }

        config.apply_env();
        Ok(config)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Credential supplied through the environment, used only when none
    /// has been saved yet.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn models(&self) -> &Models {
        &self.models
    }

    pub fn artifact_dir(&self) -> &PathBuf {
        &self.artifact_dir
    }

    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => PreferenceStore::default_root(),
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "SunoAssist", "SunoAssist")
            .ok_or_else(|| anyhow!("unable to determine config directory"))?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(base) = partial.api_base {
            self.api_base = base;
        }
        if let Some(key) = partial.api_key.filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = partial.text_model {
            self.models.text = model;
        }
        if let Some(model) = partial.fast_model {
            self.models.fast = model;
        }
        if let Some(model) = partial.image_model {
            self.models.image = model;
        }
        if let Some(model) = partial.voice_model {
            self.models.voice = model;
        }
        if let Some(dir) = partial.state_dir {
            self.state_dir = Some(dir);
        }
        if let Some(dir) = partial.artifact_dir {
            self.artifact_dir = dir;
        }
    }

    fn apply_env(&mut self) {
        if let Some(value) = non_empty_env(ENV_API_BASE) {
            self.api_base = value;
        }
        if let Some(value) = non_empty_env(ENV_API_KEY) {
            self.api_key = Some(value);
        }
        if let Some(value) = non_empty_env(ENV_TEXT_MODEL) {
            self.models.text = value;
        }
        if let Some(value) = non_empty_env(ENV_FAST_MODEL) {
            self.models.fast = value;
        }
        if let Some(value) = non_empty_env(ENV_IMAGE_MODEL) {
            self.models.image = value;
        }
        if let Some(value) = non_empty_env(ENV_VOICE_MODEL) {
            self.models.voice = value;
        }
        if let Some(value) = non_empty_env(ENV_STATE_DIR) {
            self.state_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = non_empty_env(ENV_ARTIFACT_DIR) {
            self.artifact_dir = PathBuf::from(value);
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            api_key: None,
            models: Models::default(),
            state_dir: None,
            artifact_dir: default_artifact_dir(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn config_file_override() -> Option<PathBuf> {
    let value = env::var_os(ENV_CONFIG_PATH)?;
    if value.is_empty() {
        return None;
    }
    let path = PathBuf::from(value);
    if path.is_dir() {
        return Some(path.join(CONFIG_FILE_NAME));
    }
    Some(path)
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_partial(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_partial(contents: &str) -> Result<PartialConfig> {
    Ok(toml::from_str(contents)?)
}

fn default_artifact_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join("Music").join("SunoAssist"))
        .unwrap_or_else(|| PathBuf::from("./artifacts"))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    api_base: Option<String>,
    api_key: Option<String>,
    text_model: Option<String>,
    fast_model: Option<String>,
    image_model: Option<String>,
    voice_model: Option<String>,
    state_dir: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let partial = parse_partial(
            r#"
            fast_model = "gemini-2.0-flash"
            artifact_dir = "/tmp/suno"
            api_key = "   "
            "#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.apply_partial(partial);

        assert_eq!(config.models().fast, "gemini-2.0-flash");
        assert_eq!(config.models().text, Models::default().text);
        assert_eq!(config.artifact_dir(), &PathBuf::from("/tmp/suno"));
        assert_eq!(config.api_key(), None);
        assert_eq!(config.api_base(), DEFAULT_API_BASE);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(parse_partial("text_model = 3").is_err());
    }
}
