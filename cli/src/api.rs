//! Minimal client for the Gemini `generateContent` REST endpoint.

use anyhow::{Context, Result};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("an API key is required")]
    MissingCredential,
    #[error("request to Gemini failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gemini responded with {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("failed to decode Gemini response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid model name `{0}`")]
    Model(String),
}

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        let normalized =
            if base_url.ends_with('/') { base_url.to_string() } else { format!("{base_url}/") };
        let url = Url::parse(&normalized).context("invalid Gemini base URL")?;
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url: url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, model: &str) -> Result<Url, ApiError> {
        if model.is_empty() || model.contains('/') {
            return Err(ApiError::Model(model.to_string()));
        }
        self.base_url
            .join(&format!("v1beta/models/{model}:generateContent"))
            .map_err(|_| ApiError::Model(model.to_string()))
    }

    pub async fn generate_content(
        &self,
        credential: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(ApiError::MissingCredential);
        }
        let url = self.endpoint(model)?;
        debug!(model, "sending generateContent request");

        let response =
            self.http.post(url).header("x-goog-api-key", credential).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status, message: error_message(&body) });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: ErrorBody,
    }
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub fn new(contents: Vec<Content>) -> Self {
        Self { contents, ..Default::default() }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(vec![Content::user(vec![Part::text(text)])])
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(Content { role: None, parts: vec![Part::text(instruction)] });
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self { role: Some("user".into()), parts }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self { role: Some("model".into()), parts }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData { mime_type: mime_type.into(), data: data.into() }),
        }
    }
}

/// Base64 payload carried inside a part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

impl GenerationConfig {
    pub fn json() -> Self {
        Self { response_mime_type: Some("application/json".into()), ..Default::default() }
    }

    pub fn modalities(modalities: &[&str]) -> Self {
        Self {
            response_modalities: Some(modalities.iter().map(|m| m.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn voice(voice_name: &str) -> Self {
        Self {
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: voice_name.into() },
                },
            }),
            ..Self::modalities(&["AUDIO"])
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> String {
        self.first_parts().iter().filter_map(|part| part.text.as_deref()).collect()
    }

    pub fn inline_data(&self) -> impl Iterator<Item = &InlineData> {
        self.first_parts().iter().filter_map(|part| part.inline_data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_in_gemini_shape() {
        let request = GenerateContentRequest::new(vec![Content::user(vec![
            Part::inline("audio/wav", "UklGRg=="),
            Part::text("Analyze the vocals in this audio."),
        ])])
        .with_system("You are an expert audio engineer.")
        .with_config(GenerationConfig::json());

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"inlineData": {"mimeType": "audio/wav", "data": "UklGRg=="}},
                        {"text": "Analyze the vocals in this audio."}
                    ]
                }],
                "systemInstruction": {"parts": [{"text": "You are an expert audio engineer."}]},
                "generationConfig": {"responseMimeType": "application/json"}
            })
        );
    }

    #[test]
    fn voice_config_requests_audio_modality() {
        let value = serde_json::to_value(GenerationConfig::voice("Kore")).unwrap();
        assert_eq!(
            value,
            json!({
                "responseModalities": ["AUDIO"],
                "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Kore"}}}
            })
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]}},
                {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"totalTokenCount": 12}
        }))
        .unwrap();
        assert_eq!(response.text(), "Hello there");
        assert_eq!(response.inline_data().count(), 0);

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn endpoint_joins_model_path() {
        let client = Client::new("https://example.test/gemini").unwrap();
        let url = client.endpoint("gemini-1.5-pro").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/gemini/v1beta/models/gemini-1.5-pro:generateContent"
        );
        assert!(matches!(client.endpoint("a/b"), Err(ApiError::Model(_))));
    }

    #[test]
    fn error_message_prefers_structured_body() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message(""), "empty response body");
        assert_eq!(error_message("<html>bad gateway</html>"), "<html>bad gateway</html>");
    }
}
