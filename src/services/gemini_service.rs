// src/services/gemini_service.rs
use crate::config::GeminiConfig;
use crate::errors::BrandKitError;
use crate::models::*;
use crate::sanitize;
use crate::services::fallback::first_success;
use log::{debug, warn};
use regex::Regex;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::LazyLock;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// An entry that is nothing but a hex color, `#` optional.
static HEX_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#?([0-9a-fA-F]{6}|[0-9a-fA-F]{3})$").expect("valid regex")
});

/// Inside prose only `#`-prefixed values count, so words like "facade" don't.
static HEX_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#([0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b").expect("valid regex")
});

pub struct GeminiService {
    config: GeminiConfig,
    client: Client,
}

impl GeminiService {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<Value, BrandKitError> {
        let response = self
            .client
            .post(format!("{}/{}:generateContent", API_BASE, model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| BrandKitError::Provider(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BrandKitError::Provider(format!("Gemini error: {}", error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| BrandKitError::Provider(format!("Failed to parse Gemini response: {}", e)))
    }

    /// Runs an image request against each image model until one returns image data.
    async fn image_request(&self, what: &str, parts: Value) -> Result<String, BrandKitError> {
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] }
        });
        first_success(what, &self.config.image_models(), |model| {
            let model = model.clone();
            let body = &body;
            async move {
                let result = self.generate_content(&model, body).await?;
                extract_inline_image(&result)
                    .ok_or_else(|| BrandKitError::Provider("No image data returned by model".to_string()))
            }
        })
        .await
    }

    async fn text_request(
        &self,
        what: &str,
        prompt: &str,
        schema: Option<Value>,
    ) -> Result<String, BrandKitError> {
        let mut body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        if let Some(schema) = schema {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema
            });
        }
        first_success(what, &self.config.text_models(), |model| {
            let model = model.clone();
            let body = &body;
            async move {
                let result = self.generate_content(&model, body).await?;
                extract_text(&result)
                    .ok_or_else(|| BrandKitError::Provider("No text returned by model".to_string()))
            }
        })
        .await
    }

    /// None when no model produced an image; the caller applies the fallbacks.
    pub async fn generate_logo(
        &self,
        name: &str,
        description: &str,
        keywords: &str,
        slot: LogoSlot,
    ) -> Option<String> {
        let style = match slot {
            LogoSlot::Primary => "Minimalist vector logo",
            LogoSlot::Secondary => "Alternate horizontal lockup of a minimalist vector logo",
            LogoSlot::Submark => "Compact circular submark icon",
        };
        let prompt = format!(
            "{} for a brand named \"{}\". The brand is about: {}. Keywords: {}. \
             The logo should be on a clean, solid #f0f0f0 background. Flat 2D style. No text in the logo.",
            style, name, description, keywords
        );
        match self
            .image_request(&format!("{} logo", slot.as_str()), json!([{ "text": prompt }]))
            .await
        {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("No {} logo for {}: {}", slot.as_str(), name, e);
                None
            }
        }
    }

    pub async fn generate_palette(
        &self,
        description: &str,
        keywords: &str,
    ) -> Result<ColorPalette, BrandKitError> {
        let prompt = format!(
            "Generate a 5-color brand palette for a brand described as \"{}\". The vibe should be {}. \
             The colors should be modern and complementary. Return hex codes.",
            description, keywords
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": { "palette": { "type": "ARRAY", "items": { "type": "STRING" } } }
        });
        let text = self.text_request("palette", &prompt, Some(schema)).await?;
        let parsed: Value = serde_json::from_str(strip_code_fence(&text))?;
        let raw: Vec<String> = parsed["palette"]
            .as_array()
            .map(|colors| {
                colors
                    .iter()
                    .filter_map(|c| c.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        normalize_palette(&raw)
    }

    /// Never fails; falls back to the default pairing.
    pub async fn generate_typography(&self, description: &str, keywords: &str) -> Typography {
        let prompt = format!(
            "Suggest a heading font and a body font pairing from Google Fonts for a brand described as \"{}\". \
             The vibe is {}. The fonts should be highly readable and web-safe.",
            description, keywords
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "headingFont": { "type": "STRING" },
                "bodyFont": { "type": "STRING" }
            },
            "required": ["headingFont", "bodyFont"]
        });

        let parsed = match self.text_request("typography", &prompt, Some(schema)).await {
            Ok(text) => serde_json::from_str::<Value>(strip_code_fence(&text)).ok(),
            Err(e) => {
                warn!("Typography generation failed, using default pairing: {}", e);
                None
            }
        };
        parse_typography(parsed.as_ref())
    }

    pub async fn generate_imagery(
        &self,
        description: &str,
        keywords: &str,
    ) -> Result<String, BrandKitError> {
        let prompt = format!(
            "An abstract, high-quality background image suitable for a brand website. \
             The brand is about: {}. The mood should be {}. Photorealistic, subtle, professional.",
            description, keywords
        );
        self.image_request("imagery", json!([{ "text": prompt }]))
            .await
    }

    pub async fn generate_backdrop(
        &self,
        name: &str,
        description: &str,
        keywords: &str,
        platform: SocialPlatform,
    ) -> Result<String, BrandKitError> {
        let (width, height) = platform.dimensions();
        let prompt = format!(
            "A {} social media background for the brand \"{}\" ({}). Mood: {}. \
             Composition framed for {}x{} pixels, no text, leave calm space for overlays.",
            platform.as_str(),
            name,
            description,
            keywords,
            width,
            height
        );
        self.image_request(&format!("{} backdrop", platform.as_str()), json!([{ "text": prompt }]))
            .await
    }

    pub async fn generate_ad_copy(
        &self,
        name: &str,
        description: &str,
        keywords: &str,
        tone: Tone,
    ) -> Result<AdCopy, BrandKitError> {
        let prompt = format!(
            "Write a short, 15-25 second ad script for a company called {}. The brand is: {}. \
             Vibe/keywords: {}. Tone: {}. Include a strong opening hook, one key benefit and a clear \
             call-to-action. Return `script` (may include stage directions) and `voiceover` \
             (only the words to be spoken, plain text).",
            name, description, keywords, tone
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "script": { "type": "STRING" },
                "voiceover": { "type": "STRING" }
            },
            "required": ["script", "voiceover"]
        });
        let text = self.text_request("ad copy", &prompt, Some(schema)).await?;
        parse_ad_copy(&text)
    }

    /// Echoes the script when no model answers.
    pub async fn generate_video_prompt(
        &self,
        name: &str,
        script: &str,
        aspect_ratio: AspectRatio,
    ) -> String {
        let prompt = format!(
            "Turn this ad script for {} into one vivid prompt for an 8 second {} video. \
             Describe the scenes, camera movement and lighting. No on-screen text. Script:\n{}",
            name,
            aspect_ratio.as_str(),
            script
        );
        match self.text_request("video prompt", &prompt, None).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => script.to_string(),
            Err(e) => {
                warn!("Video prompt generation failed, using script: {}", e);
                script.to_string()
            }
        }
    }

    pub async fn edit_image(&self, inline: &str, instruction: &str) -> Result<String, BrandKitError> {
        debug!("Editing image with instruction: {}", instruction);
        let parts = json!([
            { "inlineData": { "mimeType": "image/png", "data": inline } },
            { "text": instruction }
        ]);
        self.image_request("image edit", parts).await
    }
}

fn response_parts(response: &Value) -> impl Iterator<Item = &Value> {
    response["candidates"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|c| c["content"]["parts"].as_array())
        .flatten()
}

fn extract_inline_image(response: &Value) -> Option<String> {
    response_parts(response)
        .filter_map(|p| p["inlineData"]["data"].as_str())
        .find(|data| !data.is_empty())
        .map(str::to_string)
}

fn extract_text(response: &Value) -> Option<String> {
    let text: String = response_parts(response)
        .filter_map(|p| p["text"].as_str())
        .collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Normalizes model colors to `#RRGGBB` and keeps the first five.
pub fn normalize_palette(raw: &[String]) -> Result<ColorPalette, BrandKitError> {
    let palette: ColorPalette = raw
        .iter()
        .map(|token| token.trim())
        .filter_map(|token| HEX_TOKEN.captures(token).or_else(|| HEX_IN_TEXT.captures(token)))
        .map(|caps| {
            let hex = caps[1].to_ascii_uppercase();
            if hex.len() == 3 {
                let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
                format!("#{}", expanded)
            } else {
                format!("#{}", hex)
            }
        })
        .take(PALETTE_SIZE)
        .collect();

    if palette.len() < PALETTE_SIZE {
        return Err(BrandKitError::Provider(format!(
            "Palette has {} valid colors, expected {}",
            palette.len(),
            PALETTE_SIZE
        )));
    }
    Ok(palette)
}

fn parse_typography(parsed: Option<&Value>) -> Typography {
    let default = Typography::default();
    let field = |key: &str| {
        parsed
            .and_then(|v| v[key].as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Typography {
        heading_font: field("headingFont").unwrap_or(default.heading_font),
        body_font: field("bodyFont").unwrap_or(default.body_font),
    }
}

/// Accepts the structured answer or, failing that, raw script text.
pub fn parse_ad_copy(text: &str) -> Result<AdCopy, BrandKitError> {
    let structured = serde_json::from_str::<Value>(strip_code_fence(text))
        .ok()
        .filter(|v| v.is_object());

    let (script, voiceover) = match structured {
        Some(v) => (
            v["script"].as_str().unwrap_or_default().trim().to_string(),
            v["voiceover"].as_str().unwrap_or_default().trim().to_string(),
        ),
        None => (text.trim().to_string(), String::new()),
    };

    if script.is_empty() {
        return Err(BrandKitError::Provider("Ad copy was empty".to_string()));
    }

    let voiceover = if voiceover.is_empty() {
        sanitize::voiceover_from_script(&script)
    } else {
        sanitize::collapse_whitespace(&voiceover)
    };
    Ok(AdCopy { script, voiceover })
}
