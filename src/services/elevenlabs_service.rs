// src/services/elevenlabs_service.rs
use crate::errors::BrandKitError;
use crate::models::Voice;
use bytes::Bytes;
use log::warn;
use reqwest::Client;
use serde_json::{Value, json};

const API_BASE: &str = "https://api.elevenlabs.io/v1";
const TTS_MODEL: &str = "eleven_multilingual_v2";
const OUTPUT_FORMAT: &str = "mp3_44100_128";

pub struct ElevenLabsService {
    api_key: String,
    client: Client,
}

impl ElevenLabsService {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    async fn post_for_audio(&self, url: String, body: Value) -> Result<Bytes, BrandKitError> {
        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .query(&[("output_format", OUTPUT_FORMAT)])
            .json(&body)
            .send()
            .await
            .map_err(|e| BrandKitError::Provider(format!("ElevenLabs request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BrandKitError::Provider(format!(
                "ElevenLabs error: {}",
                error_text
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| BrandKitError::Provider(format!("Failed to read ElevenLabs audio: {}", e)))?;
        if audio.is_empty() {
            return Err(BrandKitError::Provider("ElevenLabs returned no audio".to_string()));
        }
        Ok(audio)
    }

    pub async fn text_to_speech(&self, text: &str, voice_id: &str) -> Result<Bytes, BrandKitError> {
        if text.trim().is_empty() || voice_id.trim().is_empty() {
            return Err(BrandKitError::Validation("Missing text or voiceId".to_string()));
        }
        self.post_for_audio(
            format!("{}/text-to-speech/{}", API_BASE, voice_id),
            json!({ "text": text, "model_id": TTS_MODEL }),
        )
        .await
    }

    pub async fn compose_music(&self, prompt: &str, length_ms: u64) -> Result<Bytes, BrandKitError> {
        self.post_for_audio(
            format!("{}/music", API_BASE),
            json!({ "prompt": prompt, "music_length_ms": length_ms }),
        )
        .await
    }

    /// An unreachable provider yields an empty list rather than an error.
    pub async fn list_voices(&self) -> Result<Vec<Voice>, BrandKitError> {
        let response = match self
            .client
            .get(format!("{}/voices", API_BASE))
            .header("xi-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("ElevenLabs voices returned {}", response.status());
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!("ElevenLabs voices request failed: {}", e);
                return Ok(Vec::new());
            }
        };

        match response.json::<Value>().await {
            Ok(body) => Ok(parse_voices(&body)),
            Err(e) => {
                warn!("Failed to parse ElevenLabs voices: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

/// Voices with a preview first, then alphabetical.
pub fn parse_voices(body: &Value) -> Vec<Voice> {
    let text = |v: &Value| v.as_str().unwrap_or_default().to_string();

    let mut voices: Vec<Voice> = body["voices"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|v| {
            let id = v["voice_id"].as_str().filter(|id| !id.is_empty())?;
            let preview_url = v["preview_url"]
                .as_str()
                .or_else(|| v["samples"][0]["preview_url"].as_str())
                .filter(|url| !url.is_empty())
                .map(str::to_string);
            Some(Voice {
                id: id.to_string(),
                name: text(&v["name"]),
                preview_url,
                category: text(&v["category"]),
                description: text(&v["description"]),
                accent: text(&v["labels"]["accent"]),
                gender: text(&v["labels"]["gender"]),
                age: text(&v["labels"]["age"]),
            })
        })
        .collect();

    voices.sort_by(|a, b| {
        b.preview_url
            .is_some()
            .cmp(&a.preview_url.is_some())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    voices
}
