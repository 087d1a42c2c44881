use crate::{
    catalog,
    editor::Cursor,
    store::{PrefKey, PreferenceStore, Preferences},
    tags,
    types::{
        AppMode, ArtistAnalysis, AudioAnalysis, ChatMessage, ChatRole, LyricSection, LyricTab,
        PromptParams, StyleField, ThemeColor, ThemeSettings, VideoPrompt, VisualPrompt,
        VocalCoordinate,
    },
    xy_pad,
};
use indexmap::{IndexMap, IndexSet};
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

const MAX_STATUS_LINES: usize = 8;
const PAD_STEP: i32 = 5;
/// Credentials must be longer than this once trimmed.
pub const MIN_CREDENTIAL_CHARS: usize = 10;
pub const SETTINGS_ROWS: usize = AppMode::ALL.len() + 1;

/// Independent request lanes. At most one request per slot is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Lyrics,
    Style,
    Creation,
    Chat,
    Voice,
}

impl Slot {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lyrics => "lyrics",
            Self::Style => "style",
            Self::Creation => "visualization",
            Self::Chat => "chat",
            Self::Voice => "voice sample",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Validation,
    Empty,
    Error,
}

impl NoticeKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Info => "Done",
            Self::Validation => "Check input",
            Self::Empty => "No result",
            Self::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    ClearLyrics,
    ClearChat,
    Logout,
}

impl ConfirmAction {
    pub fn question(&self) -> &'static str {
        match self {
            Self::ClearLyrics => "Clear both the original and hiragana lyrics?",
            Self::ClearChat => "Clear the chat history?",
            Self::Logout => "Remove the API key and log out?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPurpose {
    LyricKeywords,
    CustomTag,
    AudioPath,
}

impl InputPurpose {
    pub fn title(&self) -> &'static str {
        match self {
            Self::LyricKeywords => "Generate lyrics from keywords",
            Self::CustomTag => "Custom tag",
            Self::AudioPath => "Analyze a vocal recording",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::LyricKeywords => "Theme or keywords, e.g. 夏の終わり, 花火, 切ない",
            Self::CustomTag => "Tag name, brackets optional",
            Self::AudioPath => "Path to an mp3/wav/m4a/ogg/flac/webm file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Onboarding { input: String, error: Option<String> },
    Confirm(ConfirmAction),
    Input { purpose: InputPurpose, value: String },
    Settings { row: usize },
    Help,
}

impl Overlay {
    fn onboarding() -> Self {
        Self::Onboarding { input: String::new(), error: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptFocus {
    Artist,
    Pad,
    Field(StyleField),
}

impl PromptFocus {
    pub const ORDER: [PromptFocus; 5] = [
        Self::Artist,
        Self::Pad,
        Self::Field(StyleField::Textures),
        Self::Field(StyleField::Genres),
        Self::Field(StyleField::Instruments),
    ];

    fn step(self, forward: bool) -> Self {
        let len = Self::ORDER.len();
        let idx = Self::ORDER.iter().position(|focus| *focus == self).unwrap_or(0);
        let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
        Self::ORDER[next]
    }
}

/// Editing keys shared by the lyric editor and the single-line inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Char(char),
    Newline,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

#[derive(Debug, Default)]
pub struct CreationState {
    pub visual: Option<VisualPrompt>,
    pub image_path: Option<PathBuf>,
    pub section_cursor: usize,
    /// Video prompts keyed by the lyric excerpt they were made for.
    pub videos: IndexMap<String, VideoPrompt>,
}

#[derive(Debug)]
pub struct AppState {
    store: PreferenceStore,
    pub mode: AppMode,
    pub tab: LyricTab,
    pub credential: Option<String>,
    pub lyrics_original: String,
    pub lyrics_hiragana: String,
    pub editing: bool,
    pub cursor: Cursor,
    pub selected_line: Option<usize>,
    pub tag_cursor: usize,
    pub params: PromptParams,
    pub generated_prompt: String,
    pub prompt_focus: PromptFocus,
    pub chip_cursor: usize,
    pub chat: Vec<ChatMessage>,
    pub chat_input: String,
    pub chat_epoch: u64,
    pub chat_scroll: u16,
    pub theme: ThemeSettings,
    pub creation: CreationState,
    pub busy: IndexSet<Slot>,
    pub status_lines: Vec<String>,
    pub overlay: Option<Overlay>,
    pub notices: VecDeque<Notice>,
    pub pending_audio: Option<Vec<i16>>,
    pub quit: bool,
    pub ticks: u64,
    outbox: Vec<AppCommand>,
}

impl AppState {
    pub fn new(store: PreferenceStore, prefs: Preferences) -> Self {
        let cursor = Cursor::end_of(match prefs.tab {
            LyricTab::Original => &prefs.lyrics_original,
            LyricTab::Hiragana => &prefs.lyrics_hiragana,
        });
        let mut state = Self {
            store,
            mode: prefs.mode,
            tab: prefs.tab,
            credential: prefs.credential,
            lyrics_original: prefs.lyrics_original,
            lyrics_hiragana: prefs.lyrics_hiragana,
            editing: false,
            cursor,
            selected_line: None,
            tag_cursor: 0,
            params: prefs.params,
            generated_prompt: prefs.generated_prompt,
            prompt_focus: PromptFocus::Artist,
            chip_cursor: 0,
            chat: prefs.chat,
            chat_input: String::new(),
            chat_epoch: 0,
            chat_scroll: 0,
            theme: prefs.theme,
            creation: CreationState::default(),
            busy: IndexSet::new(),
            status_lines: Vec::new(),
            overlay: None,
            notices: VecDeque::new(),
            pending_audio: None,
            quit: false,
            ticks: 0,
            outbox: Vec::new(),
        };
        state.announce_credential();
        if state.credential.is_none() {
            state.overlay = Some(Overlay::onboarding());
        }
        state
    }

    pub fn take_commands(&mut self) -> Vec<AppCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn is_busy(&self, slot: Slot) -> bool {
        self.busy.contains(&slot)
    }

    pub fn accent(&self) -> ThemeColor {
        self.theme.color_for(self.mode)
    }

    /// Queues `command` for the controller unless its slot is occupied.
    pub fn dispatch(&mut self, command: AppCommand) -> bool {
        if let Some(slot) = command.slot() {
            if self.credential.is_none() {
                self.overlay = Some(Overlay::onboarding());
                return false;
            }
            if self.busy.contains(&slot) {
                self.show_notice(
                    NoticeKind::Validation,
                    format!("A {} request is already in progress.", slot.label()),
                );
                return false;
            }
            self.busy.insert(slot);
        }
        debug!(slot = ?command.slot(), "dispatching command");
        self.outbox.push(command);
        true
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Info(message) => self.push_status_line(message),
            AppEvent::Error(message) => {
                self.push_status_line(format!("Error: {message}"));
                self.show_notice(NoticeKind::Error, format!("Error: {message}"));
            }
            AppEvent::SlotReleased(slot) => {
                self.busy.shift_remove(&slot);
            }
            AppEvent::HiraganaConverted(text) => {
                if text.trim().is_empty() {
                    self.show_notice(NoticeKind::Empty, "The hiragana conversion result was empty.");
                    return;
                }
                self.lyrics_hiragana = text;
                self.persist(PrefKey::LyricsHiragana);
                self.set_tab(LyricTab::Hiragana);
                self.show_notice(NoticeKind::Info, "Converted to hiragana.");
            }
            AppEvent::LyricsGenerated(lyrics) => match lyrics {
                Some(text) => {
                    self.lyrics_original = text;
                    self.persist(PrefKey::LyricsOriginal);
                    self.set_tab(LyricTab::Original);
                    self.show_notice(NoticeKind::Info, "Lyrics generated.");
                }
                None => self.show_notice(NoticeKind::Empty, "The lyric generation result was empty."),
            },
            AppEvent::ArtistAnalyzed(analysis) => match analysis {
                Some(analysis) => self.apply_artist(&analysis),
                None => self.show_notice(
                    NoticeKind::Empty,
                    "Could not get an artist analysis result.",
                ),
            },
            AppEvent::AudioAnalyzed(analysis) => match analysis {
                Some(analysis) => self.apply_audio(&analysis),
                None => self.show_notice(
                    NoticeKind::Empty,
                    "Audio analysis returned no result. Check the file format.",
                ),
            },
            AppEvent::PromptGenerated(prompt) => {
                if prompt.trim().is_empty() {
                    self.show_notice(NoticeKind::Empty, "The prompt generation result was empty.");
                    return;
                }
                self.push_status_line(format!("Prompt ready ({} chars)", prompt.chars().count()));
                self.generated_prompt = prompt;
                self.persist(PrefKey::PromptText);
            }
            AppEvent::VoiceSample(samples) => match samples {
                Some(samples) if !samples.is_empty() => self.pending_audio = Some(samples),
                _ => debug!("voice sample response carried no audio"),
            },
            AppEvent::VisualPromptReady(visual) => match visual {
                Some(visual) => {
                    self.creation.visual = Some(visual);
                    self.creation.image_path = None;
                }
                None => self.show_notice(NoticeKind::Empty, "The visualization result was empty."),
            },
            AppEvent::ImageSaved(path) => match path {
                Some(path) => {
                    self.push_status_line(format!("Image saved to {}", path.display()));
                    self.creation.image_path = Some(path);
                }
                None => self.show_notice(
                    NoticeKind::Empty,
                    "No image data came back. Check the model limits or quota.",
                ),
            },
            AppEvent::VideoPromptReady(video) => match video {
                Some(video) => {
                    self.creation.videos.insert(video.lyrics_excerpt.clone(), video);
                }
                None => self.show_notice(NoticeKind::Empty, "The video prompt result was empty."),
            },
            AppEvent::ChatReply { epoch, text } => {
                if epoch != self.chat_epoch {
                    debug!(epoch, current = self.chat_epoch, "dropping reply from a cleared chat");
                    return;
                }
                if text.trim().is_empty() {
                    self.show_notice(NoticeKind::Empty, "The assistant reply was empty.");
                    return;
                }
                self.chat.push(ChatMessage::model(text));
                self.chat_scroll = 0;
                self.persist(PrefKey::ChatHistory);
            }
        }
    }

    pub fn push_status_line(&mut self, line: String) {
        self.status_lines.push(line);
        if self.status_lines.len() > MAX_STATUS_LINES {
            let overflow = self.status_lines.len() - MAX_STATUS_LINES;
            self.status_lines.drain(0..overflow);
        }
    }

    pub fn show_notice(&mut self, kind: NoticeKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            NoticeKind::Error => warn!("{message}"),
            _ => debug!(?kind, "{message}"),
        }
        self.notices.push_back(Notice { kind, message });
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.pop_front();
    }

    pub fn open_overlay(&mut self, overlay: Overlay) {
        if matches!(self.overlay, Some(Overlay::Onboarding { .. })) {
            return;
        }
        self.overlay = Some(overlay);
    }

    pub fn close_overlay(&mut self) {
        self.overlay = self.credential.is_none().then(Overlay::onboarding);
    }

    fn persist(&mut self, key: PrefKey) {
        let result = match key {
            PrefKey::Mode => self.store.write_string(key, self.mode.as_str()),
            PrefKey::Tab => self.store.write_string(key, self.tab.as_str()),
            PrefKey::ApiKey => match &self.credential {
                Some(credential) => self.store.write_string(key, credential),
                None => self.store.remove(key),
            },
            PrefKey::LyricsOriginal => self.store.write_string(key, &self.lyrics_original),
            PrefKey::LyricsHiragana => self.store.write_string(key, &self.lyrics_hiragana),
            PrefKey::PromptParams => self.store.write_json(key, &self.params),
            PrefKey::PromptText => self.store.write_string(key, &self.generated_prompt),
            PrefKey::ChatHistory => self.store.write_json(key, &self.chat),
            PrefKey::Theme => self.store.write_json(key, &self.theme),
        };
        if let Err(err) = result {
            warn!(key = key.name(), "failed to persist preference: {err:#}");
            self.push_status_line(format!("Could not save {}: {err}", key.name()));
        }
    }

    fn announce_credential(&mut self) {
        self.outbox.push(AppCommand::SetCredential {
            credential: self.credential.clone(),
            epoch: self.chat_epoch,
            history: self.chat.clone(),
        });
    }

    // Modes and tabs

    pub fn set_mode(&mut self, mode: AppMode) {
        self.mode = mode;
        self.editing = false;
        self.persist(PrefKey::Mode);
    }

    pub fn set_tab(&mut self, tab: LyricTab) {
        self.tab = tab;
        self.selected_line = None;
        self.cursor = Cursor::end_of(self.active_lyrics());
        self.persist(PrefKey::Tab);
    }

    pub fn toggle_tab(&mut self) {
        self.set_tab(self.tab.toggled());
    }

    // Lyrics

    pub fn active_lyrics(&self) -> &str {
        match self.tab {
            LyricTab::Original => &self.lyrics_original,
            LyricTab::Hiragana => &self.lyrics_hiragana,
        }
    }

    fn active_lyrics_mut(&mut self) -> &mut String {
        match self.tab {
            LyricTab::Original => &mut self.lyrics_original,
            LyricTab::Hiragana => &mut self.lyrics_hiragana,
        }
    }

    fn persist_active_lyrics(&mut self) {
        match self.tab {
            LyricTab::Original => self.persist(PrefKey::LyricsOriginal),
            LyricTab::Hiragana => self.persist(PrefKey::LyricsHiragana),
        }
    }

    pub fn line_count(&self) -> usize {
        self.active_lyrics().split('\n').count()
    }

    pub fn replace_active_lyrics(&mut self, text: String) {
        *self.active_lyrics_mut() = text;
        self.cursor = Cursor::end_of(self.active_lyrics());
        self.selected_line = None;
        self.persist_active_lyrics();
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            let text = self.active_lyrics().to_string();
            self.cursor.clamp_to(&text);
        }
    }

    pub fn edit_lyrics(&mut self, key: EditKey) {
        if !self.editing {
            match key {
                EditKey::Up => self.move_line_selection(-1),
                EditKey::Down => self.move_line_selection(1),
                _ => {}
            }
            return;
        }
        let mut cursor = self.cursor;
        let text = self.active_lyrics_mut();
        let changed = match key {
            EditKey::Char(ch) => {
                cursor.insert(text, ch.encode_utf8(&mut [0; 4]));
                true
            }
            EditKey::Newline => {
                cursor.insert(text, "\n");
                true
            }
            EditKey::Backspace => {
                cursor.backspace(text);
                true
            }
            EditKey::Delete => {
                cursor.delete(text);
                true
            }
            EditKey::Left => {
                cursor.left();
                false
            }
            EditKey::Right => {
                cursor.right(text);
                false
            }
            EditKey::Up => {
                cursor.up(text);
                false
            }
            EditKey::Down => {
                cursor.down(text);
                false
            }
            EditKey::Home => {
                cursor.home(text);
                false
            }
            EditKey::End => {
                cursor.end(text);
                false
            }
        };
        self.cursor = cursor;
        if changed {
            self.persist_active_lyrics();
        }
    }

    pub fn select_line(&mut self, index: usize) {
        if index < self.line_count() {
            self.selected_line = Some(index);
        }
    }

    /// Clicking a line selects it, or moves the caret to its start while editing.
    pub fn click_line(&mut self, index: usize) {
        if !self.editing {
            self.select_line(index);
            return;
        }
        let start: usize =
            self.active_lyrics().split('\n').take(index).map(|line| line.chars().count() + 1).sum();
        let mut cursor = Cursor::at(start);
        cursor.clamp_to(self.active_lyrics());
        self.cursor = cursor;
    }

    fn move_line_selection(&mut self, delta: isize) {
        let last = self.line_count().saturating_sub(1);
        let next = match self.selected_line {
            Some(line) => line.saturating_add_signed(delta).min(last),
            None if delta < 0 => last,
            None => 0,
        };
        self.selected_line = Some(next);
    }

    pub fn move_tag_cursor(&mut self, delta: isize) {
        let count = catalog::tag_count() as isize;
        if count == 0 {
            return;
        }
        self.tag_cursor = (self.tag_cursor as isize + delta).rem_euclid(count) as usize;
    }

    pub fn insert_selected_tag(&mut self) {
        if let Some(tag) = catalog::tag_at(self.tag_cursor) {
            self.insert_tag(tag.value);
        }
    }

    /// Caret insertion while editing, otherwise prefixes the selected line.
    pub fn insert_tag(&mut self, tag: &str) {
        if self.editing {
            let mut cursor = self.cursor;
            cursor.insert(self.active_lyrics_mut(), tag);
            self.cursor = cursor;
            self.persist_active_lyrics();
            return;
        }
        match tags::insert_at_line(self.active_lyrics(), self.selected_line, tag) {
            Ok(text) => {
                *self.active_lyrics_mut() = text;
                self.persist_active_lyrics();
            }
            Err(err) => self.show_notice(NoticeKind::Validation, err.to_string()),
        }
    }

    pub fn request_custom_tag(&mut self) {
        self.open_overlay(Overlay::Input { purpose: InputPurpose::CustomTag, value: String::new() });
    }

    pub fn request_lyric_generation(&mut self) {
        self.open_overlay(Overlay::Input {
            purpose: InputPurpose::LyricKeywords,
            value: String::new(),
        });
    }

    pub fn convert_to_hiragana(&mut self) {
        if self.lyrics_original.trim().is_empty() {
            self.show_notice(NoticeKind::Validation, "Enter the original lyrics first.");
            return;
        }
        let lyrics = self.lyrics_original.clone();
        self.dispatch(AppCommand::ConvertToHiragana { lyrics });
    }

    pub fn request_clear_lyrics(&mut self) {
        self.open_overlay(Overlay::Confirm(ConfirmAction::ClearLyrics));
    }

    // Prompt builder

    pub fn focus_next(&mut self) {
        self.prompt_focus = self.prompt_focus.step(true);
        self.chip_cursor = 0;
    }

    pub fn focus_previous(&mut self) {
        self.prompt_focus = self.prompt_focus.step(false);
        self.chip_cursor = 0;
    }

    pub fn edit_artist(&mut self, key: EditKey) {
        match key {
            EditKey::Char(ch) => self.params.artist.push(ch),
            EditKey::Backspace => {
                self.params.artist.pop();
            }
            _ => return,
        }
        self.persist(PrefKey::PromptParams);
    }

    pub fn analyze_artist(&mut self) {
        let artist = self.params.artist.trim().to_string();
        if artist.is_empty() {
            self.show_notice(NoticeKind::Validation, "Enter an artist name.");
            return;
        }
        self.dispatch(AppCommand::AnalyzeArtist { artist });
    }

    fn apply_artist(&mut self, analysis: &ArtistAnalysis) {
        self.params.apply_artist_analysis(analysis);
        self.persist(PrefKey::PromptParams);
        self.push_status_line(format!(
            "Artist analysis applied (x {}, y {})",
            self.params.vocal.x, self.params.vocal.y
        ));
    }

    fn apply_audio(&mut self, analysis: &AudioAnalysis) {
        self.params.apply_audio_analysis(analysis);
        self.persist(PrefKey::PromptParams);
        self.push_status_line(format!(
            "Audio analysis applied (x {}, y {})",
            self.params.vocal.x, self.params.vocal.y
        ));
    }

    pub fn set_vocal(&mut self, coordinate: VocalCoordinate) {
        if self.params.vocal == coordinate {
            return;
        }
        self.params.vocal = coordinate;
        self.persist(PrefKey::PromptParams);
    }

    /// Arrow-key movement on the pad; `dx`/`dy` are in steps.
    pub fn nudge_vocal(&mut self, dx: i32, dy: i32) {
        self.set_vocal(xy_pad::nudge(self.params.vocal, dx * PAD_STEP, dy * PAD_STEP));
    }

    pub fn move_chip(&mut self, delta: isize) {
        let PromptFocus::Field(field) = self.prompt_focus else {
            return;
        };
        let len = field.catalog().len() as isize;
        self.chip_cursor = (self.chip_cursor as isize + delta).rem_euclid(len) as usize;
    }

    pub fn toggle_focused_chip(&mut self) {
        let PromptFocus::Field(field) = self.prompt_focus else {
            return;
        };
        if let Some(value) = field.catalog().get(self.chip_cursor) {
            self.toggle_style(field, value);
        }
    }

    pub fn toggle_style(&mut self, field: StyleField, value: &str) {
        if self.params.toggle(field, value) {
            self.persist(PrefKey::PromptParams);
        }
    }

    pub fn generate_prompt(&mut self) {
        let params = self.params.clone();
        self.dispatch(AppCommand::GeneratePrompt { params });
    }

    pub fn play_voice_sample(&mut self) {
        let coordinate = self.params.vocal;
        self.dispatch(AppCommand::PlayVoiceSample { coordinate });
    }

    pub fn request_audio_analysis(&mut self) {
        self.open_overlay(Overlay::Input { purpose: InputPurpose::AudioPath, value: String::new() });
    }

    // Creation

    pub fn sections(&self) -> Vec<LyricSection> {
        tags::split_sections(&self.lyrics_original)
    }

    pub fn generate_visualization(&mut self) {
        if self.lyrics_original.trim().is_empty() {
            self.show_notice(NoticeKind::Validation, "Enter lyrics first.");
            return;
        }
        let lyrics = self.lyrics_original.clone();
        self.dispatch(AppCommand::GenerateVisualization { lyrics });
    }

    pub fn move_section(&mut self, delta: isize) {
        let count = self.sections().len();
        if count == 0 {
            self.creation.section_cursor = 0;
            return;
        }
        self.creation.section_cursor =
            (self.creation.section_cursor as isize + delta).clamp(0, count as isize - 1) as usize;
    }

    pub fn generate_video_for_selected(&mut self) {
        let sections = self.sections();
        let Some(section) = sections.get(self.creation.section_cursor) else {
            self.show_notice(
                NoticeKind::Validation,
                "Add lyrics with section tags such as [Verse] first.",
            );
            return;
        };
        let excerpt = section.content.clone();
        self.dispatch(AppCommand::GenerateVideoPrompt { excerpt });
    }

    // Chat

    pub fn edit_chat_input(&mut self, key: EditKey) {
        match key {
            EditKey::Char(ch) => self.chat_input.push(ch),
            EditKey::Backspace => {
                self.chat_input.pop();
            }
            _ => {}
        }
    }

    pub fn send_chat(&mut self) {
        let text = self.chat_input.trim().to_string();
        if text.is_empty() {
            return;
        }
        let command = AppCommand::SendChat { epoch: self.chat_epoch, text: text.clone() };
        if !self.dispatch(command) {
            return;
        }
        self.chat_input.clear();
        self.chat.push(ChatMessage::user(text));
        self.chat_scroll = 0;
        self.persist(PrefKey::ChatHistory);
    }

    pub fn request_clear_chat(&mut self) {
        self.open_overlay(Overlay::Confirm(ConfirmAction::ClearChat));
    }

    pub fn scroll_chat(&mut self, delta: i16) {
        self.chat_scroll = self.chat_scroll.saturating_add_signed(delta);
    }

    // Overlays

    pub fn resolve_confirm(&mut self, accepted: bool) {
        let Some(Overlay::Confirm(action)) = self.overlay.clone() else {
            return;
        };
        self.close_overlay();
        if !accepted {
            return;
        }
        match action {
            ConfirmAction::ClearLyrics => {
                self.lyrics_original.clear();
                self.lyrics_hiragana.clear();
                self.cursor = Cursor::default();
                self.selected_line = None;
                self.persist(PrefKey::LyricsOriginal);
                self.persist(PrefKey::LyricsHiragana);
            }
            ConfirmAction::ClearChat => {
                self.chat.clear();
                self.chat_scroll = 0;
                self.chat_epoch += 1;
                self.persist(PrefKey::ChatHistory);
                self.outbox.push(AppCommand::ResetChat { epoch: self.chat_epoch });
            }
            ConfirmAction::Logout => {
                info!("removing stored credential");
                self.credential = None;
                self.chat_epoch += 1;
                self.persist(PrefKey::ApiKey);
                self.announce_credential();
                self.overlay = Some(Overlay::onboarding());
            }
        }
    }

    pub fn edit_overlay_input(&mut self, key: EditKey) {
        let buffer = match &mut self.overlay {
            Some(Overlay::Input { value, .. }) => value,
            Some(Overlay::Onboarding { input, error }) => {
                *error = None;
                input
            }
            _ => return,
        };
        match key {
            EditKey::Char(ch) => buffer.push(ch),
            EditKey::Backspace => {
                buffer.pop();
            }
            _ => {}
        }
    }

    pub fn submit_input(&mut self) {
        let Some(Overlay::Input { purpose, value }) = self.overlay.clone() else {
            return;
        };
        self.close_overlay();
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        match purpose {
            InputPurpose::LyricKeywords => {
                self.dispatch(AppCommand::GenerateLyrics { keywords: value });
            }
            InputPurpose::CustomTag => {
                if let Some(tag) = tags::normalize_custom_tag(&value) {
                    self.insert_tag(&tag);
                }
            }
            InputPurpose::AudioPath => self.submit_audio_path(Path::new(&value)),
        }
    }

    fn submit_audio_path(&mut self, path: &Path) {
        if !path.is_file() {
            self.show_notice(NoticeKind::Validation, format!("No file at {}.", path.display()));
            return;
        }
        self.dispatch(AppCommand::AnalyzeAudio { path: path.to_path_buf() });
    }

    pub fn submit_credential(&mut self) {
        let Some(Overlay::Onboarding { input, .. }) = &self.overlay else {
            return;
        };
        let credential = input.trim().to_string();
        if credential.chars().count() <= MIN_CREDENTIAL_CHARS {
            self.overlay = Some(Overlay::Onboarding {
                input: credential,
                error: Some("That API key looks too short.".to_string()),
            });
            return;
        }
        self.credential = Some(credential);
        self.chat_epoch += 1;
        self.persist(PrefKey::ApiKey);
        self.announce_credential();
        self.overlay = None;
        self.push_status_line("API key saved".to_string());
    }

    pub fn settings_move(&mut self, delta: isize) {
        if let Some(Overlay::Settings { row }) = &mut self.overlay {
            *row = (*row as isize + delta).rem_euclid(SETTINGS_ROWS as isize) as usize;
        }
    }

    /// Left/right on a mode row cycles its color; Enter on the last row logs out.
    pub fn settings_adjust(&mut self, forward: bool) {
        let Some(Overlay::Settings { row }) = self.overlay else {
            return;
        };
        match AppMode::ALL.get(row) {
            Some(&mode) => {
                let current = self.theme.color_for(mode);
                let color = if forward { current.next() } else { current.previous() };
                self.theme.set(mode, color);
                self.persist(PrefKey::Theme);
            }
            None => self.overlay = Some(Overlay::Confirm(ConfirmAction::Logout)),
        }
    }

    /// Text the copy shortcut places on the clipboard in the current mode.
    pub fn copy_source(&self) -> Option<String> {
        let text = match self.mode {
            AppMode::Lyrics => self.active_lyrics().to_string(),
            AppMode::Prompt => self.generated_prompt.clone(),
            AppMode::Creation => {
                let sections = self.sections();
                sections
                    .get(self.creation.section_cursor)
                    .and_then(|section| self.creation.videos.get(&section.content))
                    .map(|video| video.motion_prompt.clone())
                    .or_else(|| self.creation.visual.as_ref().map(|v| v.image_prompt.clone()))
                    .unwrap_or_default()
            }
            AppMode::Chat => self
                .chat
                .iter()
                .rev()
                .find(|message| message.role == ChatRole::Model)
                .map(|message| message.text.clone())
                .unwrap_or_default(),
        };
        (!text.trim().is_empty()).then_some(text)
    }

    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Info(String),
    Error(String),
    SlotReleased(Slot),
    HiraganaConverted(String),
    LyricsGenerated(Option<String>),
    ArtistAnalyzed(Option<ArtistAnalysis>),
    AudioAnalyzed(Option<AudioAnalysis>),
    PromptGenerated(String),
    VoiceSample(Option<Vec<i16>>),
    VisualPromptReady(Option<VisualPrompt>),
    ImageSaved(Option<PathBuf>),
    VideoPromptReady(Option<VideoPrompt>),
    ChatReply { epoch: u64, text: String },
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    ConvertToHiragana { lyrics: String },
    GenerateLyrics { keywords: String },
    AnalyzeArtist { artist: String },
    AnalyzeAudio { path: PathBuf },
    GeneratePrompt { params: PromptParams },
    PlayVoiceSample { coordinate: VocalCoordinate },
    GenerateVisualization { lyrics: String },
    GenerateVideoPrompt { excerpt: String },
    SendChat { epoch: u64, text: String },
    ResetChat { epoch: u64 },
    SetCredential { credential: Option<String>, epoch: u64, history: Vec<ChatMessage> },
}

impl AppCommand {
    pub fn slot(&self) -> Option<Slot> {
        match self {
            Self::ConvertToHiragana { .. } | Self::GenerateLyrics { .. } => Some(Slot::Lyrics),
            Self::AnalyzeArtist { .. } | Self::AnalyzeAudio { .. } | Self::GeneratePrompt { .. } => {
                Some(Slot::Style)
            }
            Self::PlayVoiceSample { .. } => Some(Slot::Voice),
            Self::GenerateVisualization { .. } | Self::GenerateVideoPrompt { .. } => {
                Some(Slot::Creation)
            }
            Self::SendChat { .. } => Some(Slot::Chat),
            Self::ResetChat { .. } | Self::SetCredential { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with(credential: Option<&str>) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path()).unwrap();
        let prefs = Preferences { credential: credential.map(str::to_string), ..Default::default() };
        let mut app = AppState::new(store, prefs);
        app.take_commands();
        (dir, app)
    }

    fn reload(dir: &tempfile::TempDir) -> Preferences {
        Preferences::load(&PreferenceStore::open(dir.path()).unwrap())
    }

    #[test]
    fn startup_announces_credential_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path()).unwrap();
        let prefs = Preferences {
            credential: Some("AIzaSy-0123456789".into()),
            chat: vec![ChatMessage::user("hi"), ChatMessage::model("やあ")],
            ..Default::default()
        };
        let mut app = AppState::new(store, prefs);
        let commands = app.take_commands();
        assert!(matches!(
            commands.as_slice(),
            [AppCommand::SetCredential { credential: Some(_), epoch: 0, history }] if history.len() == 2
        ));
        assert!(app.overlay.is_none());
    }

    #[test]
    fn clearing_chat_starts_a_new_epoch_and_drops_stale_replies() {
        let (dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.set_mode(AppMode::Chat);
        app.chat_input = "サビの歌詞を考えて".into();
        app.send_chat();
        assert_eq!(app.chat.len(), 1);
        assert!(matches!(app.take_commands().as_slice(), [AppCommand::SendChat { epoch: 0, .. }]));

        app.request_clear_chat();
        app.resolve_confirm(true);
        assert!(app.chat.is_empty());
        assert_eq!(app.chat_epoch, 1);
        assert!(matches!(app.take_commands().as_slice(), [AppCommand::ResetChat { epoch: 1 }]));

        app.handle_event(AppEvent::ChatReply { epoch: 0, text: "古い返事".into() });
        assert!(app.chat.is_empty());
        assert!(reload(&dir).chat.is_empty());

        app.handle_event(AppEvent::SlotReleased(Slot::Chat));
        app.chat_input = "もう一度".into();
        app.send_chat();
        app.handle_event(AppEvent::ChatReply { epoch: 1, text: "新しい返事".into() });
        assert_eq!(app.chat.len(), 2);
        assert_eq!(reload(&dir).chat, app.chat);
    }

    #[test]
    fn tag_insert_without_selection_shows_notice() {
        let (dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.replace_active_lyrics("一行目\n二行目".into());

        app.insert_tag("[Chorus]");
        assert_eq!(app.notice().map(|n| n.kind), Some(NoticeKind::Validation));
        assert_eq!(
            app.notice().map(|n| n.message.as_str()),
            Some("Select the line you want to tag first.")
        );
        assert_eq!(app.lyrics_original, "一行目\n二行目");

        app.dismiss_notice();
        app.select_line(1);
        app.insert_tag("[Chorus]");
        assert_eq!(app.lyrics_original, "一行目\n[Chorus] 二行目");
        assert_eq!(reload(&dir).lyrics_original, app.lyrics_original);
    }

    #[test]
    fn caret_mode_inserts_at_cursor() {
        let (_dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.replace_active_lyrics("Hello world".into());
        app.toggle_editing();
        app.cursor = Cursor::at(5);
        app.insert_tag("[Chorus]");
        assert_eq!(app.lyrics_original, "Hello[Chorus] world");
        assert_eq!(app.cursor, Cursor::at(13));
    }

    #[test]
    fn clicking_a_line_moves_the_caret_while_editing() {
        let (_dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.replace_active_lyrics("[Verse]\n夜空\n花火".into());
        app.click_line(1);
        assert_eq!(app.selected_line, Some(1));

        app.toggle_editing();
        app.click_line(2);
        assert_eq!(app.cursor, Cursor::at(11));
        assert_eq!(app.cursor.line_and_column(&app.lyrics_original), (2, 0));

        app.click_line(9);
        assert_eq!(app.cursor, Cursor::end_of(&app.lyrics_original));
    }

    #[test]
    fn chat_scroll_saturates_at_both_ends() {
        let (_dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.scroll_chat(-5);
        assert_eq!(app.chat_scroll, 0);
        app.scroll_chat(5);
        assert_eq!(app.chat_scroll, 5);

        app.chat_scroll = u16::MAX - 2;
        app.scroll_chat(5);
        assert_eq!(app.chat_scroll, u16::MAX);
    }

    #[test]
    fn second_request_in_same_slot_is_refused_until_released() {
        let (_dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.generate_prompt();
        app.analyze_artist();
        assert_eq!(app.take_commands().len(), 1);
        assert!(app.is_busy(Slot::Style));
        assert_eq!(app.notice().map(|n| n.kind), Some(NoticeKind::Validation));

        app.dismiss_notice();
        app.params.artist = "YOASOBI".into();
        app.analyze_artist();
        assert!(app.take_commands().is_empty());

        app.play_voice_sample();
        assert_eq!(app.take_commands().len(), 1);

        app.handle_event(AppEvent::SlotReleased(Slot::Style));
        app.analyze_artist();
        assert!(matches!(app.take_commands().as_slice(), [AppCommand::AnalyzeArtist { .. }]));
    }

    #[test]
    fn empty_results_and_errors_are_distinct_notices() {
        let (_dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.handle_event(AppEvent::LyricsGenerated(None));
        app.handle_event(AppEvent::Error("quota exceeded".into()));
        let kinds: Vec<_> = app.notices.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NoticeKind::Empty, NoticeKind::Error]);
        assert_eq!(app.status_lines, vec!["Error: quota exceeded".to_string()]);
    }

    #[test]
    fn artist_analysis_updates_and_persists_params() {
        let (dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.handle_event(AppEvent::ArtistAnalyzed(Some(ArtistAnalysis {
            vocal_x: 70.0,
            vocal_y: 45.0,
            genres: vec!["J-Pop".into(), "EDM".into()],
            textures: vec!["Clear".into()],
            instruments: vec!["Piano".into()],
        })));
        assert_eq!(app.params.vocal, VocalCoordinate::new(70, 45));
        assert_eq!(reload(&dir).params, app.params);
    }

    #[test]
    fn onboarding_rejects_short_keys_and_logout_clears_credential() {
        let (dir, mut app) = app_with(None);
        assert!(matches!(app.overlay, Some(Overlay::Onboarding { .. })));

        for ch in "short".chars() {
            app.edit_overlay_input(EditKey::Char(ch));
        }
        app.submit_credential();
        assert!(matches!(app.overlay, Some(Overlay::Onboarding { error: Some(_), .. })));
        assert!(app.credential.is_none());

        app.overlay = Some(Overlay::Onboarding { input: " AIzaSy-0123456789 ".into(), error: None });
        app.submit_credential();
        assert_eq!(app.credential.as_deref(), Some("AIzaSy-0123456789"));
        assert_eq!(reload(&dir).credential.as_deref(), Some("AIzaSy-0123456789"));
        assert!(matches!(
            app.take_commands().as_slice(),
            [AppCommand::SetCredential { credential: Some(_), epoch: 1, .. }]
        ));

        app.overlay = Some(Overlay::Settings { row: SETTINGS_ROWS - 1 });
        app.settings_adjust(true);
        app.resolve_confirm(true);
        assert!(app.credential.is_none());
        assert!(reload(&dir).credential.is_none());
        assert!(matches!(app.overlay, Some(Overlay::Onboarding { .. })));
        assert!(matches!(
            app.take_commands().as_slice(),
            [AppCommand::SetCredential { credential: None, epoch: 2, .. }]
        ));
    }

    #[test]
    fn settings_cycle_theme_colors() {
        let (dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.open_overlay(Overlay::Settings { row: 0 });
        app.settings_adjust(true);
        assert_eq!(app.theme.lyrics, ThemeColor::Blue);
        app.settings_move(-1);
        app.settings_move(2);
        app.settings_adjust(false);
        assert_eq!(app.theme.prompt, ThemeColor::Orange);
        assert_eq!(reload(&dir).theme, app.theme);
    }

    #[test]
    fn generated_lyrics_switch_to_original_tab() {
        let (_dir, mut app) = app_with(Some("AIzaSy-0123456789"));
        app.set_tab(LyricTab::Hiragana);
        app.handle_event(AppEvent::LyricsGenerated(Some("[Verse]\n夜空".into())));
        assert_eq!(app.tab, LyricTab::Original);
        assert_eq!(app.sections().len(), 1);
        app.handle_event(AppEvent::HiraganaConverted("[Verse]\nよぞら".into()));
        assert_eq!(app.tab, LyricTab::Hiragana);
        assert_eq!(app.copy_source().as_deref(), Some("[Verse]\nよぞら"));
    }
}
