//! Typed capabilities on top of the Gemini client: lyric conversion and
//! generation, style analysis, prompt synthesis, visuals, chat and voice.

use crate::{
    api::{Client, Content, GenerateContentRequest, GenerationConfig, Part},
    audio,
    catalog::{EMPHASIS_INSTRUMENTS, GENRES, VOCAL_TEXTURES},
    config::Models,
    types::{
        ArtistAnalysis, AudioAnalysis, ChatMessage, ChatRole, PromptParams, StyleField,
        VideoPrompt, VisualPrompt, VocalCoordinate,
    },
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use indexmap::IndexSet;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, warn};

pub const PROMPT_CHAR_LIMIT: usize = 1000;
pub const VOICE_SAMPLE_TEXT: &str = "これはサンプルの声です。";

const HIRAGANA_INSTRUCTION: &str = "You are a Japanese lyrics converter.
Task: Convert the following Japanese song lyrics strictly into Hiragana (reading).
Rules:
1. Maintain the exact same line structure and line breaks.
2. Keep any meta tags (like [Verse], [Chorus]) or English words exactly as they are.
3. Only output the converted text, no explanations.
4. If there are Kanji, convert to Hiragana.
5. If there is already Hiragana or Katakana, ensure it flows naturally as Hiragana.";

const LYRICS_INSTRUCTION: &str = "You are a professional songwriter.
Task: Write song lyrics based on the provided keywords or theme.
Requirements:
1. Language: Japanese.
2. Structure: Use standard song structure with tags like [Verse], [Chorus], [Bridge].
3. Write emotional, rhythmic lines that suit a song.
4. Length: Verse 1, Chorus, Verse 2, Chorus, Outro, or whatever fits the keywords.
Only output the lyrics with tags.";

const VISUAL_INSTRUCTION: &str = "You are a creative director. Analyze the provided lyrics and \
extract core imagery and mood.
Output a JSON object with:
1. sceneDescription: Concise Japanese summary (max 30 chars).
2. imagePrompt: Detailed English prompt for an image generator.";

const CHAT_INSTRUCTION: &str = "あなたはプロの音楽プロデューサー兼作詞家のアシスタントです。\
ユーザーの作詞、楽曲構成、Suno AIのプロンプト作成などについて日本語でアドバイスをしてください。";

/// Conversation context for the chat mode. A new session is created
/// whenever the history is cleared or the credential changes; `epoch`
/// identifies which one a reply belongs to.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    epoch: u64,
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new(epoch: u64) -> Self {
        Self { epoch, history: Vec::new() }
    }

    /// Session whose context continues from previously persisted messages.
    pub fn seeded(epoch: u64, messages: &[ChatMessage]) -> Self {
        let history = messages
            .iter()
            .filter(|message| !message.text.trim().is_empty())
            .map(|message| match message.role {
                ChatRole::User => Content::user(vec![Part::text(&message.text)]),
                ChatRole::Model => Content::model(vec![Part::text(&message.text)]),
            })
            .collect();
        Self { epoch, history }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Copy to send a turn from, or `None` when `epoch` has been superseded.
    pub fn snapshot(&self, epoch: u64) -> Option<Self> {
        (self.epoch == epoch).then(|| self.clone())
    }

    /// Appends a finished turn unless the session was replaced while the
    /// request was in flight. Returns whether the turn was kept.
    pub fn record_turn(&mut self, epoch: u64, user_text: &str, reply: &str) -> bool {
        if self.epoch != epoch {
            return false;
        }
        self.history.push(Content::user(vec![Part::text(user_text)]));
        self.history.push(Content::model(vec![Part::text(reply)]));
        true
    }

    pub fn request_for(&self, text: &str) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.push(Content::user(vec![Part::text(text)]));
        GenerateContentRequest::new(contents).with_system(CHAT_INSTRUCTION)
    }
}

#[derive(Clone)]
pub struct Gateway {
    client: Client,
    models: Models,
}

impl Gateway {
    pub fn new(client: Client, models: Models) -> Self {
        Self { client, models }
    }

    async fn generate(
        &self,
        credential: &str,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<String> {
        let response = self.client.generate_content(credential, model, &request).await?;
        Ok(response.text().trim().to_string())
    }

    async fn generate_json<T: DeserializeOwned>(
        &self,
        credential: &str,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<Option<T>> {
        let request = request.with_config(GenerationConfig::json());
        let text = self.generate(credential, model, request).await?;
        parse_json_payload(&text)
    }

    pub async fn convert_to_hiragana(&self, credential: &str, lyrics: &str) -> Result<String> {
        if lyrics.trim().is_empty() {
            return Ok(String::new());
        }
        let request = GenerateContentRequest::user_text(lyrics).with_system(HIRAGANA_INSTRUCTION);
        self.generate(credential, &self.models.text, request)
            .await
            .context("hiragana conversion failed")
    }

    pub async fn generate_lyrics(&self, credential: &str, keywords: &str) -> Result<Option<String>> {
        let request = GenerateContentRequest::user_text(format!(
            "Keywords/Theme: {keywords}\n\nGenerate lyrics now."
        ))
        .with_system(LYRICS_INSTRUCTION);
        let text = self
            .generate(credential, &self.models.fast, request)
            .await
            .context("lyric generation failed")?;
        Ok(non_empty(text))
    }

    pub async fn analyze_artist_style(
        &self,
        credential: &str,
        artist: &str,
    ) -> Result<Option<ArtistAnalysis>> {
        let request = GenerateContentRequest::user_text(format!("Analyze the artist: {artist}"))
            .with_system(artist_instruction());
        let analysis: Option<ArtistAnalysis> = self
            .generate_json(credential, &self.models.fast, request)
            .await
            .context("artist analysis failed")?;
        Ok(analysis.map(sanitize_artist))
    }

    pub async fn analyze_audio_sample(
        &self,
        credential: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<Option<AudioAnalysis>> {
        debug!(len = bytes.len(), mime_type, "encoding audio sample");
        let request = GenerateContentRequest::new(vec![Content::user(vec![
            Part::inline(mime_type, BASE64.encode(bytes)),
            Part::text("Analyze the vocals in this audio."),
        ])])
        .with_system(audio_instruction());
        let analysis: Option<AudioAnalysis> = self
            .generate_json(credential, &self.models.fast, request)
            .await
            .context("audio analysis failed")?;
        Ok(analysis.map(sanitize_audio))
    }

    pub async fn synthesize_prompt(&self, credential: &str, params: &PromptParams) -> Result<String> {
        let request = GenerateContentRequest::user_text("Generate the Suno prompt string now.")
            .with_system(prompt_instruction(params));
        let text = self
            .generate(credential, &self.models.text, request)
            .await
            .context("prompt generation failed")?;
        Ok(truncate_prompt(&text))
    }

    pub async fn generate_visual_prompt(
        &self,
        credential: &str,
        lyrics: &str,
    ) -> Result<Option<VisualPrompt>> {
        let request = GenerateContentRequest::user_text(format!("Lyrics:\n{lyrics}"))
            .with_system(VISUAL_INSTRUCTION);
        self.generate_json(credential, &self.models.text, request)
            .await
            .context("visual prompt generation failed")
    }

    pub async fn generate_video_prompt(
        &self,
        credential: &str,
        excerpt: &str,
    ) -> Result<Option<VideoPrompt>> {
        let request = GenerateContentRequest::user_text("Generate video prompt for section.")
            .with_system(video_instruction(excerpt));
        let prompt: Option<VideoPrompt> = self
            .generate_json(credential, &self.models.text, request)
            .await
            .context("video prompt generation failed")?;
        Ok(prompt.map(|prompt| VideoPrompt { lyrics_excerpt: excerpt.to_string(), ..prompt }))
    }

    /// Returns the first image part as a `data:` URI.
    pub async fn synthesize_image(&self, credential: &str, prompt: &str) -> Result<Option<String>> {
        let request = GenerateContentRequest::user_text(prompt)
            .with_config(GenerationConfig::modalities(&["TEXT", "IMAGE"]));
        let response = self
            .client
            .generate_content(credential, &self.models.image, &request)
            .await
            .context("image generation failed")?;
        let image = response
            .inline_data()
            .find(|data| data.mime_type.starts_with("image/"))
            .map(|data| image_data_uri(&data.mime_type, &data.data));
        if image.is_none() {
            warn!("no image data found in Gemini response");
        }
        Ok(image)
    }

    pub async fn send_chat_turn(
        &self,
        credential: &str,
        session: &ChatSession,
        text: &str,
    ) -> Result<String> {
        self.generate(credential, &self.models.text, session.request_for(text))
            .await
            .context("chat reply failed")
    }

    /// Speaks `text` in a voice picked from the pad position. `None` means
    /// the response carried no audio.
    pub async fn synthesize_voice_sample(
        &self,
        credential: &str,
        text: &str,
        coordinate: VocalCoordinate,
    ) -> Result<Option<Vec<i16>>> {
        let request = GenerateContentRequest::user_text(text)
            .with_config(GenerationConfig::voice(voice_for(coordinate)));
        let response = self
            .client
            .generate_content(credential, &self.models.voice, &request)
            .await
            .context("voice sample failed")?;
        let Some(payload) = response.inline_data().next() else {
            return Ok(None);
        };
        let bytes = BASE64.decode(payload.data.as_bytes()).context("invalid audio payload")?;
        Ok(Some(audio::pcm16le_to_samples(&bytes)))
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Gender and pitch phrase for the pad position.
pub fn vocal_descriptor(coordinate: VocalCoordinate) -> String {
    let mut descriptor = String::from(match coordinate.x {
        x if x < -30 => "Male vocals",
        x if x > 30 => "Female vocals",
        _ => "Androgynous vocals",
    });
    if coordinate.y < -30 {
        descriptor.push_str(", Low pitch");
    } else if coordinate.y > 30 {
        descriptor.push_str(", High pitch");
    }
    descriptor
}

pub fn prompt_instruction(params: &PromptParams) -> String {
    let join = |set: &IndexSet<String>| set.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    let artist = params.artist.trim();
    format!(
        "You are a Suno AI prompt generator expert.
Task: Create a single string of comma-separated English style tags for Suno AI.

CRITICAL CONSTRAINT:
The output string MUST be under {PROMPT_CHAR_LIMIT} characters.
IMPORTANT: Do NOT use the Artist Name in the output.

Inputs:
1. Vocal Characteristics: {}
2. Vocal Textures: {}
3. Target Genres: {}
4. Emphasized Instruments: {}
5. Artist Style Reference: {}

Output format:
[Genre], [Sub-genre], [Instruments], [Vocal Style], [Mood/Atmosphere], [Tempo]",
        vocal_descriptor(params.vocal),
        join(&params.textures),
        join(&params.genres),
        join(&params.instruments),
        if artist.is_empty() { "None" } else { artist },
    )
}

fn artist_instruction() -> String {
    format!(
        "You are a music analysis expert for Suno AI prompting.
Analyze the artist provided by the user and map their style to the following parameters.

Available lists to choose from (pick the closest matches):
- Genres: {}
- Textures: {}
- Instruments: {}

Parameters to determine:
1. vocalX: Number between -100 (masculine) and 100 (feminine).
2. vocalY: Number between -100 (low pitch) and 100 (high pitch).
3. genres: Array of strings (select max {})
4. textures: Array of strings (select max {})
5. instruments: Array of strings (select max {})

Return strictly JSON.",
        GENRES.join(", "),
        VOCAL_TEXTURES.join(", "),
        EMPHASIS_INSTRUMENTS.join(", "),
        StyleField::Genres.analysis_limit(),
        StyleField::Textures.analysis_limit(),
        StyleField::Instruments.analysis_limit(),
    )
}

fn audio_instruction() -> String {
    format!(
        "You are an expert audio engineer. Listen to the provided vocal audio sample and analyze \
its characteristics.
Map the analysis to the following parameters:

1. vocalX: Number (-100 to 100).
2. vocalY: Number (-100 to 100).
3. textures: Select up to {} descriptors: [{}]

Return strictly JSON.",
        StyleField::Textures.analysis_limit(),
        VOCAL_TEXTURES.join(", "),
    )
}

fn video_instruction(excerpt: &str) -> String {
    format!(
        "You are a video direction expert. Create a video generation prompt for a section of a song.
Input Lyrics: \"{excerpt}\"
Output JSON: sceneDescription (Japanese, max 30 chars), motionPrompt (English, detailed visual motion)."
    )
}

pub fn truncate_prompt(text: &str) -> String {
    text.chars().take(PROMPT_CHAR_LIMIT).collect()
}

pub fn voice_for(coordinate: VocalCoordinate) -> &'static str {
    match coordinate.x {
        x if x < -20 => "Charon",
        x if x > 20 => "Kore",
        _ => "Puck",
    }
}

/// Keeps catalog members only, in canonical spelling, deduplicated and
/// capped at the field's analysis limit.
pub fn constrain_to_catalog(field: StyleField, values: &[String]) -> Vec<String> {
    let kept = field.members(values.iter().map(String::as_str));
    let limit = field.analysis_limit();
    if kept.len() > limit {
        warn!(field = field.label(), count = kept.len(), limit, "truncating analysis result");
    }
    kept.into_iter().take(limit).map(str::to_string).collect()
}

pub fn sanitize_artist(analysis: ArtistAnalysis) -> ArtistAnalysis {
    let coordinate = analysis.coordinate();
    ArtistAnalysis {
        vocal_x: coordinate.x as f64,
        vocal_y: coordinate.y as f64,
        genres: constrain_to_catalog(StyleField::Genres, &analysis.genres),
        textures: constrain_to_catalog(StyleField::Textures, &analysis.textures),
        instruments: constrain_to_catalog(StyleField::Instruments, &analysis.instruments),
    }
}

pub fn sanitize_audio(analysis: AudioAnalysis) -> AudioAnalysis {
    let coordinate = analysis.coordinate();
    AudioAnalysis {
        vocal_x: coordinate.x as f64,
        vocal_y: coordinate.y as f64,
        textures: constrain_to_catalog(StyleField::Textures, &analysis.textures),
    }
}

/// Decodes a JSON-mode response. Blank text is an empty result; models
/// occasionally wrap the object in a Markdown code fence.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<Option<T>> {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        body = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    if body.is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(body).context("response was not the expected JSON")?;
    Ok(Some(value))
}

pub fn image_data_uri(mime_type: &str, data: &str) -> String {
    format!("data:{mime_type};base64,{data}")
}

/// Splits a `data:` URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:").ok_or_else(|| anyhow!("not a data URI"))?;
    let (header, payload) =
        rest.split_once(',').ok_or_else(|| anyhow!("data URI has no payload"))?;
    let mime_type = header.strip_suffix(";base64").unwrap_or(header).to_string();
    let bytes = BASE64.decode(strip_data_uri_prefix(payload)).context("invalid base64 payload")?;
    Ok((mime_type, bytes))
}

pub fn strip_data_uri_prefix(data: &str) -> &str {
    match data.split_once(',') {
        Some((_, payload)) if data.starts_with("data:") => payload,
        _ => data,
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => "audio/mpeg",
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn descriptor_follows_thirty_unit_thresholds() {
        assert_eq!(vocal_descriptor(VocalCoordinate::new(-50, 60)), "Male vocals, High pitch");
        assert_eq!(vocal_descriptor(VocalCoordinate::new(0, 0)), "Androgynous vocals");
        assert_eq!(vocal_descriptor(VocalCoordinate::new(31, -31)), "Female vocals, Low pitch");
        assert_eq!(vocal_descriptor(VocalCoordinate::new(30, -30)), "Androgynous vocals");
    }

    #[test]
    fn prompt_instruction_lists_selections_and_artist_fallback() {
        let mut params = PromptParams::default();
        params.toggle(StyleField::Genres, "J-Rock");
        params.toggle(StyleField::Genres, "EDM");
        let instruction = prompt_instruction(&params);
        assert!(instruction.contains("Target Genres: J-Rock, EDM"));
        assert!(instruction.contains("Artist Style Reference: None"));
        assert!(instruction.contains("Vocal Characteristics: Androgynous vocals"));
    }

    #[test]
    fn prompts_are_capped_at_one_thousand_characters() {
        let long = "あ".repeat(1500);
        assert_eq!(truncate_prompt(&long).chars().count(), PROMPT_CHAR_LIMIT);
        assert_eq!(truncate_prompt("J-Pop, Piano"), "J-Pop, Piano");
    }

    #[test]
    fn voice_selection_by_horizontal_position() {
        assert_eq!(voice_for(VocalCoordinate::new(-21, 0)), "Charon");
        assert_eq!(voice_for(VocalCoordinate::new(-20, 90)), "Puck");
        assert_eq!(voice_for(VocalCoordinate::new(20, -90)), "Puck");
        assert_eq!(voice_for(VocalCoordinate::new(21, 0)), "Kore");
    }

    #[test]
    fn artist_analysis_is_filtered_to_catalog() {
        let raw: ArtistAnalysis = serde_json::from_str(
            r#"{"vocalX": 140.4, "vocalY": -12.6,
                "genres": ["j-pop", "Polka", "City Pop", "J-Pop", "Jazz", "EDM"],
                "textures": ["Clear"],
                "instruments": ["Theremin", "koto"]}"#,
        )
        .unwrap();
        let clean = sanitize_artist(raw);
        assert_eq!(clean.genres, vec!["J-Pop", "City Pop", "Jazz"]);
        assert_eq!(clean.textures, vec!["Clear"]);
        assert_eq!(clean.instruments, vec!["Koto"]);
        assert_eq!(clean.coordinate(), VocalCoordinate::new(100, -13));
    }

    #[test]
    fn audio_analysis_keeps_two_textures() {
        let clean = sanitize_audio(AudioAnalysis {
            vocal_x: -30.0,
            vocal_y: 10.0,
            textures: vec!["Husky".into(), "Mellow".into(), "Clear".into()],
        });
        assert_eq!(clean.textures, vec!["Husky", "Mellow"]);
    }

    #[test]
    fn json_payload_handles_fences_and_blank_text() {
        let fenced = "```json\n{\"sceneDescription\":\"雨の駅\",\"imagePrompt\":\"rainy station\"}\n```";
        let parsed: VisualPrompt = parse_json_payload(fenced).unwrap().unwrap();
        assert_eq!(parsed.scene_description, "雨の駅");

        assert!(parse_json_payload::<VisualPrompt>("   ").unwrap().is_none());
        assert!(parse_json_payload::<VisualPrompt>("not json").is_err());
    }

    #[test]
    fn data_uris_round_trip_bytes() {
        let uri = image_data_uri("image/png", &BASE64.encode([1u8, 2, 3]));
        assert_eq!(uri, "data:image/png;base64,AQID");
        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(strip_data_uri_prefix(&uri), "AQID");
        assert_eq!(strip_data_uri_prefix("AQID"), "AQID");
        assert!(decode_data_uri("AQID").is_err());
        assert_eq!(extension_for_mime(&mime), "png");
    }

    #[test]
    fn audio_mime_from_extension() {
        assert_eq!(mime_for_path(&PathBuf::from("take1.WAV")), "audio/wav");
        assert_eq!(mime_for_path(&PathBuf::from("demo.m4a")), "audio/aac");
        assert_eq!(mime_for_path(&PathBuf::from("voice")), "audio/mpeg");
    }

    #[test]
    fn seeded_session_carries_history_and_epoch() {
        let messages = vec![ChatMessage::user("サビの案は？"), ChatMessage::model("こんなのはどう？")];
        let mut session = ChatSession::seeded(3, &messages);
        assert_eq!(session.epoch(), 3);
        assert_eq!(session.len(), 2);

        let request = session.request_for("もう一つ");
        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[1].role.as_deref(), Some("model"));
        assert!(request.system_instruction.is_some());

        assert!(session.record_turn(3, "もう一つ", "はい"));
        assert_eq!(session.len(), 4);
        assert_eq!(ChatSession::new(4).len(), 0);
    }

    #[test]
    fn superseded_epoch_neither_sends_nor_records() {
        let mut session = ChatSession::seeded(5, &[ChatMessage::user("前の話")]);
        assert!(session.snapshot(4).is_none());
        assert_eq!(session.snapshot(5).map(|copy| copy.len()), Some(1));

        assert!(!session.record_turn(4, "遅れた質問", "遅れた返事"));
        assert_eq!(session.len(), 1);
    }
}
