use crate::{
    error::ClientError,
    extract::parse_song,
    prompt::{render_user_prompt, render_vocal_instruction, SONG_SCHEMA, SYSTEM_INSTRUCTION},
    types::{GeneratedSong, SongRequest, Voice},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

/// Produces a structured song from a form request.
#[async_trait]
pub trait SongGenerator: Send + Sync {
    async fn generate(&self, request: &SongRequest) -> Result<GeneratedSong, ClientError>;
}

/// Renders lyric text as sung audio, returned as base64 s16le PCM.
#[async_trait]
pub trait VocalSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<String, ClientError>;
}

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    generation_model: String,
    speech_model: String,
}

impl Client {
    pub fn new(
        base_url: Option<&str>,
        api_key: Option<String>,
        generation_model: impl Into<String>,
        speech_model: impl Into<String>,
    ) -> Result<Self> {
        let url = base_url
            .map(Url::parse)
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL))
            .context("invalid API base URL")?;
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: url,
            api_key,
            generation_model: generation_model.into(),
            speech_model: speech_model.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    /// Confirms the credential works and the generation model exists.
    pub async fn probe_model(&self) -> Result<Value, ClientError> {
        let api_key = self.api_key.as_deref().ok_or(ClientError::MissingApiKey)?;
        let url = self.model_url(&self.generation_model, "");
        let response = self.http.get(url).header("x-goog-api-key", api_key).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status: status.as_u16(), message });
        }
        Ok(response.json().await?)
    }

    fn model_url(&self, model: &str, action: &str) -> Url {
        let mut url = self.base_url.clone();
        let base = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{base}/v1beta/models/{model}{action}"));
        url
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ClientError> {
        let api_key = self.api_key.as_deref().ok_or(ClientError::MissingApiKey)?;
        let url = self.model_url(model, ":generateContent");
        debug!(%model, "sending generateContent request");

        let response =
            self.http.post(url).header("x-goog-api-key", api_key).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%model, status = status.as_u16(), "generateContent failed");
            return Err(ClientError::Api { status: status.as_u16(), message });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SongGenerator for Client {
    async fn generate(&self, request: &SongRequest) -> Result<GeneratedSong, ClientError> {
        let body = song_request_body(request);
        let response = self.generate_content(&self.generation_model, &body).await?;
        let text = response.first_text().ok_or(ClientError::EmptyResponse)?;
        parse_song(&text)
    }
}

#[async_trait]
impl VocalSynthesizer for Client {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<String, ClientError> {
        let body = vocal_request_body(text, voice);
        let response = self.generate_content(&self.speech_model, &body).await?;
        response.first_inline_data().ok_or(ClientError::MissingAudio)
    }
}

pub fn song_request_body(request: &SongRequest) -> GenerateContentRequest {
    let mut parts = vec![Part::text(render_user_prompt(request))];
    if let Some(sample) = &request.audio_sample {
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: sample.mime_type.clone(),
                data: sample.data.clone(),
            }),
        });
    }

    GenerateContentRequest {
        system_instruction: Some(Content {
            role: None,
            parts: vec![Part::text(SYSTEM_INSTRUCTION)],
        }),
        contents: vec![Content { role: Some("user".into()), parts }],
        generation_config: GenerationConfig {
            response_mime_type: Some("application/json".into()),
            response_schema: Some(SONG_SCHEMA.clone()),
            response_modalities: None,
            speech_config: None,
        },
    }
}

pub fn vocal_request_body(text: &str, voice: Voice) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: None,
        contents: vec![Content {
            role: Some("user".into()),
            parts: vec![Part::text(render_vocal_instruction(text))],
        }],
        generation_config: GenerationConfig {
            response_mime_type: None,
            response_schema: None,
            response_modalities: Some(vec!["AUDIO".into()]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.name().to_string(),
                    },
                },
            }),
        },
    }
}

// generateContent wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(value: impl Into<String>) -> Self {
        Self { text: Some(value.into()), inline_data: None }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn first_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String =
            candidate.content.parts.iter().filter_map(|part| part.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn first_inline_data(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .find_map(|part| part.inline_data)
            .map(|inline| inline.data)
            .filter(|data| !data.is_empty())
    }
}
