use anyhow::{anyhow, Context, Result};
use chrono::Local;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    Mutex,
};
use tracing::{debug, error, info};

mod api;
mod app;
mod audio;
mod catalog;
mod config;
mod editor;
mod gateway;
mod store;
mod tags;
mod types;
mod ui;
mod xy_pad;

use app::{AppCommand, AppEvent, AppState};
use config::AppConfig;
use gateway::{ChatSession, Gateway, VOICE_SAMPLE_TEXT};
use store::{PreferenceStore, Preferences};

const LOG_FILE_NAME: &str = "suno-assist.log";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    let store = PreferenceStore::open(config.state_dir()?)?;
    setup_tracing(store.root())?;
    info!("starting suno-assist");

    let mut prefs = Preferences::load(&store);
    if prefs.credential.is_none() {
        prefs.credential = config.api_key().map(|key| key.trim().to_string());
    }

    let client = api::Client::new(config.api_base())?;
    let endpoint = client.base_url().to_string();
    let gateway = Gateway::new(client, config.models().clone());

    let (event_tx, mut event_rx) = unbounded_channel();
    let (command_tx, command_rx) = unbounded_channel();

    let controller = Controller::new(gateway, event_tx, config.clone());
    controller.spawn(command_rx);

    let mut app_state = AppState::new(store, prefs);
    app_state.push_status_line(format!(
        "Gemini at {endpoint} (model {}); artifacts in {}",
        config.models().text,
        config.artifact_dir().display()
    ));

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    enable_raw_mode()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let ui_result = ui::run(&mut terminal, &mut app_state, &mut event_rx, command_tx);

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;

    info!("exiting suno-assist");
    ui_result
}

/// The terminal belongs to the UI, so log output goes to a file in the
/// state directory.
fn setup_tracing(state_dir: &Path) -> Result<()> {
    let path = state_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
            anyhow!("failed to initialise tracing: {err}")
        })?;
    Ok(())
}

struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    gateway: Gateway,
    event_tx: UnboundedSender<AppEvent>,
    config: AppConfig,
    credential: Mutex<Option<String>>,
    chat: Mutex<ChatSession>,
}

impl Controller {
    fn new(gateway: Gateway, event_tx: UnboundedSender<AppEvent>, config: AppConfig) -> Self {
        let inner = ControllerInner {
            gateway,
            event_tx,
            config,
            credential: Mutex::new(None),
            chat: Mutex::new(ChatSession::default()),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Session commands are applied in arrival order; requests run
    /// concurrently, one task each.
    fn spawn(self, mut command_rx: UnboundedReceiver<AppCommand>) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                if command.slot().is_none() {
                    Controller::run_command(inner.clone(), command).await;
                } else {
                    tokio::spawn(Controller::run_command(inner.clone(), command));
                }
            }
        });
    }

    async fn run_command(inner: Arc<ControllerInner>, command: AppCommand) {
        let slot = command.slot();
        if let Err(err) = Controller::handle_command(inner.clone(), command).await {
            error!("command error: {err:#}");
            let _ = inner.event_tx.send(AppEvent::Error(format!("{err:#}")));
        }
        if let Some(slot) = slot {
            let _ = inner.event_tx.send(AppEvent::SlotReleased(slot));
        }
    }

    async fn handle_command(inner: Arc<ControllerInner>, command: AppCommand) -> Result<()> {
        match command {
            AppCommand::SetCredential { credential, epoch, history } => {
                *inner.credential.lock().await = credential;
                *inner.chat.lock().await = ChatSession::seeded(epoch, &history);
                debug!(epoch, turns = history.len(), "chat session replaced");
            }
            AppCommand::ResetChat { epoch } => {
                *inner.chat.lock().await = ChatSession::new(epoch);
                debug!(epoch, "chat session reset");
            }
            AppCommand::ConvertToHiragana { lyrics } => {
                let credential = inner.credential().await?;
                let text = inner.gateway.convert_to_hiragana(&credential, &lyrics).await?;
                inner.send(AppEvent::HiraganaConverted(text));
            }
            AppCommand::GenerateLyrics { keywords } => {
                let credential = inner.credential().await?;
                let lyrics = inner.gateway.generate_lyrics(&credential, &keywords).await?;
                inner.send(AppEvent::LyricsGenerated(lyrics));
            }
            AppCommand::AnalyzeArtist { artist } => {
                let credential = inner.credential().await?;
                let analysis = inner.gateway.analyze_artist_style(&credential, &artist).await?;
                inner.send(AppEvent::ArtistAnalyzed(analysis));
            }
            AppCommand::AnalyzeAudio { path } => {
                let credential = inner.credential().await?;
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let mime_type = gateway::mime_for_path(&path);
                info!(path = %path.display(), mime_type, "analyzing audio sample");
                inner.send(AppEvent::Info(format!(
                    "Uploading {} ({} KB) for analysis",
                    path.display(),
                    bytes.len().div_ceil(1024)
                )));
                let analysis =
                    inner.gateway.analyze_audio_sample(&credential, &bytes, mime_type).await?;
                inner.send(AppEvent::AudioAnalyzed(analysis));
            }
            AppCommand::GeneratePrompt { params } => {
                let credential = inner.credential().await?;
                let prompt = inner.gateway.synthesize_prompt(&credential, &params).await?;
                inner.send(AppEvent::PromptGenerated(prompt));
            }
            AppCommand::PlayVoiceSample { coordinate } => {
                let credential = inner.credential().await?;
                let samples = inner
                    .gateway
                    .synthesize_voice_sample(&credential, VOICE_SAMPLE_TEXT, coordinate)
                    .await?;
                inner.send(AppEvent::VoiceSample(samples));
            }
            AppCommand::GenerateVisualization { lyrics } => {
                Controller::generate_visualization(inner, lyrics).await?;
            }
            AppCommand::GenerateVideoPrompt { excerpt } => {
                let credential = inner.credential().await?;
                let video = inner.gateway.generate_video_prompt(&credential, &excerpt).await?;
                inner.send(AppEvent::VideoPromptReady(video));
            }
            AppCommand::SendChat { epoch, text } => {
                Controller::send_chat(inner, epoch, text).await?;
            }
        }
        Ok(())
    }

    async fn generate_visualization(inner: Arc<ControllerInner>, lyrics: String) -> Result<()> {
        let credential = inner.credential().await?;
        let visual = inner.gateway.generate_visual_prompt(&credential, &lyrics).await?;
        inner.send(AppEvent::VisualPromptReady(visual.clone()));
        let Some(visual) = visual else {
            return Ok(());
        };

        let image = inner.gateway.synthesize_image(&credential, &visual.image_prompt).await?;
        let saved = match image {
            Some(data_uri) => Some(persist_image(&inner.config, data_uri).await?),
            None => None,
        };
        inner.send(AppEvent::ImageSaved(saved));
        Ok(())
    }

    async fn send_chat(inner: Arc<ControllerInner>, epoch: u64, text: String) -> Result<()> {
        let credential = inner.credential().await?;
        let Some(session) = inner.chat_snapshot(epoch).await else {
            return Ok(());
        };
        debug!(epoch, turns = session.len(), fresh = session.is_empty(), "sending chat turn");

        let reply = inner.gateway.send_chat_turn(&credential, &session, &text).await?;
        inner.finish_chat_turn(epoch, &text, reply).await;
        Ok(())
    }
}

impl ControllerInner {
    async fn credential(&self) -> Result<String> {
        self.credential.lock().await.clone().ok_or_else(|| anyhow!("no API key is set"))
    }

    fn send(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn chat_snapshot(&self, epoch: u64) -> Option<ChatSession> {
        let guard = self.chat.lock().await;
        let snapshot = guard.snapshot(epoch);
        if snapshot.is_none() {
            debug!(epoch, current = guard.epoch(), "skipping message for a cleared chat");
        }
        snapshot
    }

    /// The reply is always forwarded; the UI drops it by epoch as well.
    async fn finish_chat_turn(&self, epoch: u64, text: &str, reply: String) {
        if !self.chat.lock().await.record_turn(epoch, text, &reply) {
            debug!(epoch, "discarding reply for a replaced chat session");
        }
        self.send(AppEvent::ChatReply { epoch, text: reply });
    }
}

/// Writes a generated image under `<artifact_dir>/visuals/`.
async fn persist_image(config: &AppConfig, data_uri: String) -> Result<PathBuf> {
    let visuals_dir = config.artifact_dir().join("visuals");
    tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let (mime_type, bytes) = gateway::decode_data_uri(&data_uri)?;
        fs::create_dir_all(&visuals_dir).with_context(|| {
            format!("failed to create artifact dir {}", visuals_dir.display())
        })?;

        let file_name = format!(
            "{}.{}",
            Local::now().format("%Y%m%d-%H%M%S-%3f"),
            gateway::extension_for_mime(&mime_type)
        );
        let target_path = visuals_dir.join(file_name);
        fs::write(&target_path, bytes)
            .with_context(|| format!("failed to write image to {}", target_path.display()))?;
        info!(path = %target_path.display(), "saved generated image");
        Ok(target_path)
    })
    .await
    .context("image persistence task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Models, types::ChatMessage};

    fn controller() -> (Arc<ControllerInner>, UnboundedReceiver<AppEvent>) {
        let client = api::Client::new("http://127.0.0.1:9").unwrap();
        let (event_tx, event_rx) = unbounded_channel();
        let gateway = Gateway::new(client, Models::default());
        let controller = Controller::new(gateway, event_tx, AppConfig::default());
        (controller.inner, event_rx)
    }

    async fn seed(inner: &Arc<ControllerInner>, epoch: u64) {
        let history = vec![ChatMessage::user("一番の歌詞"), ChatMessage::model("いいですね")];
        let command =
            AppCommand::SetCredential { credential: Some("AIza-test".into()), epoch, history };
        Controller::handle_command(inner.clone(), command).await.unwrap();
    }

    #[tokio::test]
    async fn reply_for_an_old_epoch_is_not_recorded() {
        let (inner, mut event_rx) = controller();
        seed(&inner, 1).await;
        Controller::handle_command(inner.clone(), AppCommand::ResetChat { epoch: 2 })
            .await
            .unwrap();

        inner.finish_chat_turn(1, "遅れた質問", "遅れた返事".into()).await;
        let session = inner.chat.lock().await.clone();
        assert_eq!(session.epoch(), 2);
        assert!(session.is_empty());
        assert!(matches!(event_rx.try_recv(), Ok(AppEvent::ChatReply { epoch: 1, .. })));

        let stale = AppCommand::SendChat { epoch: 1, text: "もう一度".into() };
        Controller::handle_command(inner.clone(), stale).await.unwrap();
        assert!(event_rx.try_recv().is_err());
        assert!(inner.chat.lock().await.is_empty());
    }

    #[tokio::test]
    async fn first_request_after_reset_carries_no_history() {
        let (inner, _event_rx) = controller();
        seed(&inner, 1).await;
        let before = inner.chat_snapshot(1).await.unwrap();
        assert_eq!(before.request_for("続き").contents.len(), 3);

        Controller::handle_command(inner.clone(), AppCommand::ResetChat { epoch: 2 })
            .await
            .unwrap();
        assert!(inner.chat_snapshot(1).await.is_none());
        let request = inner.chat_snapshot(2).await.unwrap().request_for("新しい話");
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].parts[0].text.as_deref(), Some("新しい話"));

        inner.finish_chat_turn(2, "新しい話", "どうぞ".into()).await;
        assert_eq!(inner.chat.lock().await.len(), 2);
    }
}
