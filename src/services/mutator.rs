// src/services/mutator.rs
//! Single-field edits of an existing kit.
//!
//! Each operation replaces exactly one field. On failure the caller gets the
//! kit back unchanged, except for a failed voiceover which records `ttsError`.

use crate::errors::BrandKitError;
use crate::models::*;
use crate::services::adapters::GenerationAdapters;
use crate::services::assembler::VOICEOVER_LABEL;
use crate::services::sessions::SessionRegistry;
use base64::{Engine as _, engine::general_purpose};
use log::{info, warn};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum KitOperation {
    EditLogo {
        slot: LogoSlot,
        instruction: String,
    },
    EditImagery {
        index: usize,
        instruction: String,
    },
    RegenerateMusic {
        slot: MusicSlot,
    },
    GenerateVoiceover,
    #[serde(rename_all = "camelCase")]
    GenerateAdVideo {
        #[serde(default)]
        aspect_ratio: Option<String>,
    },
}

impl KitOperation {
    pub fn name(&self) -> &'static str {
        match self {
            KitOperation::EditLogo { .. } => "editLogo",
            KitOperation::EditImagery { .. } => "editImagery",
            KitOperation::RegenerateMusic { .. } => "regenerateMusic",
            KitOperation::GenerateVoiceover => "generateVoiceover",
            KitOperation::GenerateAdVideo { .. } => "generateAdVideo",
        }
    }
}

/// A failed mutation together with the kit the caller should keep.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationFailure {
    pub error: BrandKitError,
    pub kit: BrandKit,
}

impl fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

pub struct KitMutator {
    adapters: Arc<dyn GenerationAdapters>,
    sessions: Arc<SessionRegistry>,
}

impl KitMutator {
    pub fn new(adapters: Arc<dyn GenerationAdapters>, sessions: Arc<SessionRegistry>) -> Self {
        Self { adapters, sessions }
    }

    pub async fn apply(
        &self,
        kit: BrandKit,
        operation: &KitOperation,
        session_id: Option<&str>,
    ) -> Result<BrandKit, MutationFailure> {
        let result = match operation {
            KitOperation::EditLogo { slot, instruction } => {
                keep_on_error(self.edit_logo(&kit, *slot, instruction).await, kit)
            }
            KitOperation::EditImagery { index, instruction } => {
                keep_on_error(self.edit_imagery(&kit, *index, instruction).await, kit)
            }
            KitOperation::RegenerateMusic { slot } => {
                keep_on_error(self.regenerate_music(&kit, *slot).await, kit)
            }
            KitOperation::GenerateVoiceover => self.voiceover(kit).await,
            KitOperation::GenerateAdVideo { aspect_ratio } => {
                let aspect_ratio = aspect_ratio
                    .as_deref()
                    .map(AspectRatio::parse_or_default)
                    .unwrap_or_default();
                keep_on_error(self.ad_video(&kit, aspect_ratio).await, kit)
            }
        };

        match &result {
            Ok(updated) => {
                info!("Applied {} to '{}'", operation.name(), updated.name);
                if let Some(session_id) = session_id {
                    self.sessions.track(session_id, updated);
                }
            }
            Err(failure) => warn!("{} failed: {}", operation.name(), failure.error),
        }
        result
    }

    async fn edit_logo(
        &self,
        kit: &BrandKit,
        slot: LogoSlot,
        instruction: &str,
    ) -> Result<BrandKit, BrandKitError> {
        let instruction = required_instruction(instruction)?;
        let current = match &kit.logos {
            Some(logos) => logos.get(slot),
            None if slot == LogoSlot::Primary => &kit.logo,
            None => {
                return Err(BrandKitError::Mutation(format!(
                    "No {} logo to edit",
                    slot.as_str()
                )));
            }
        };
        let prompt = format!(
            "Modify logo for {}: {}. Keep it text-free, vector-like and minimal.",
            kit.name, instruction
        );
        let edited = self.edit(current, &prompt).await?;

        let mut updated = kit.clone();
        if let Some(logos) = updated.logos.as_mut() {
            logos.set(slot, edited.clone());
        }
        if slot == LogoSlot::Primary {
            updated.logo = edited;
        }
        Ok(updated)
    }

    async fn edit_imagery(
        &self,
        kit: &BrandKit,
        index: usize,
        instruction: &str,
    ) -> Result<BrandKit, BrandKitError> {
        let instruction = required_instruction(instruction)?;
        let current = kit
            .imagery
            .get(index)
            .ok_or_else(|| BrandKitError::Mutation(format!("No image at position {}", index)))?;
        let edited = self.edit(current, instruction).await?;

        let mut updated = kit.clone();
        updated.imagery[index] = edited;
        Ok(updated)
    }

    async fn regenerate_music(
        &self,
        kit: &BrandKit,
        slot: MusicSlot,
    ) -> Result<BrandKit, BrandKitError> {
        let asset = self
            .adapters
            .generate_music(&slot.prompt(&kit.name), slot.label())
            .await
            .map_err(|e| BrandKitError::Mutation(e.to_string()))?;

        let mut updated = kit.clone();
        updated.audio.set(slot, asset);
        Ok(updated)
    }

    async fn ad_video(
        &self,
        kit: &BrandKit,
        aspect_ratio: AspectRatio,
    ) -> Result<BrandKit, BrandKitError> {
        let script = kit
            .ad
            .as_ref()
            .map(|ad| {
                if ad.copy_script.trim().is_empty() {
                    ad.voiceover_text.trim()
                } else {
                    ad.copy_script.trim()
                }
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| BrandKitError::Unavailable("Ad copy is required for a video".to_string()))?;

        let prompt = match self
            .adapters
            .generate_video_prompt(&kit.name, script, aspect_ratio)
            .await
        {
            Ok(prompt) if !prompt.trim().is_empty() => prompt,
            Ok(_) => script.to_string(),
            Err(e) => {
                warn!("Video prompt unavailable, using the script: {}", e);
                script.to_string()
            }
        };

        let video = self
            .adapters
            .generate_ad_video(&prompt, aspect_ratio)
            .await
            .map_err(|e| BrandKitError::Mutation(e.to_string()))?;

        let mut updated = kit.clone();
        updated.ad_video = Some(video);
        Ok(updated)
    }

    async fn voiceover(&self, kit: BrandKit) -> Result<BrandKit, MutationFailure> {
        let request = kit.ad.as_ref().and_then(|ad| {
            let text = ad.voiceover_text.trim();
            let voice = ad.voice_id.as_deref().map(str::trim).unwrap_or_default();
            if text.is_empty() || voice.is_empty() {
                None
            } else {
                Some((text.to_string(), voice.to_string()))
            }
        });
        let Some((text, voice_id)) = request else {
            return Err(MutationFailure {
                error: BrandKitError::Unavailable(
                    "Voiceover needs ad text and a selected voice".to_string(),
                ),
                kit,
            });
        };

        let result = self
            .adapters
            .generate_voiceover(&text, VOICEOVER_LABEL, &voice_id)
            .await;

        let mut updated = kit;
        if let Some(ad) = updated.ad.as_mut() {
            match &result {
                Ok(asset) => {
                    ad.audio_url = Some(asset.url.clone());
                    ad.tts_error = None;
                }
                Err(_) => ad.tts_error = Some(VOICEOVER_UNAVAILABLE.to_string()),
            }
        }
        match result {
            Ok(_) => Ok(updated),
            Err(e) => Err(MutationFailure {
                error: BrandKitError::Mutation(e.to_string()),
                kit: updated,
            }),
        }
    }

    /// Dereferences URL images first; the edit adapter only takes inline data.
    async fn edit(&self, image: &ImageRef, instruction: &str) -> Result<ImageRef, BrandKitError> {
        let inline = match image {
            ImageRef::Inline { data } => data.clone(),
            ImageRef::Url { location } => {
                let asset = self
                    .adapters
                    .fetch_asset(location)
                    .await
                    .map_err(|e| BrandKitError::Mutation(format!("Could not load image: {}", e)))?;
                general_purpose::STANDARD.encode(&asset.bytes)
            }
        };

        let edited = self
            .adapters
            .edit_image(&inline, instruction)
            .await
            .map_err(|e| BrandKitError::Mutation(e.to_string()))?;
        Ok(ImageRef::inline(edited))
    }
}

fn keep_on_error(
    result: Result<BrandKit, BrandKitError>,
    kit: BrandKit,
) -> Result<BrandKit, MutationFailure> {
    result.map_err(|error| MutationFailure { error, kit })
}

fn required_instruction(instruction: &str) -> Result<&str, BrandKitError> {
    let trimmed = instruction.trim();
    if trimmed.is_empty() {
        Err(BrandKitError::Mutation("An edit instruction is required".to_string()))
    } else {
        Ok(trimmed)
    }
}
