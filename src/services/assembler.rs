// src/services/assembler.rs
//! Turns one `BrandInput` into one `BrandKit`.
//!
//! The visual identity (logos, palette, typography, imagery, backdrops) is
//! generated concurrently and joined all-or-nothing: any failure there fails
//! the run. Ad copy, voiceover and jingles are optional and degrade to
//! explicit absent fields instead.

use crate::errors::BrandKitError;
use crate::models::*;
use crate::sanitize;
use crate::services::adapters::GenerationAdapters;
use crate::services::sessions::SessionRegistry;
use log::{debug, error, info, warn};
use std::sync::Arc;

pub const VOICEOVER_LABEL: &str = "Ad Voiceover";

pub struct KitAssembler {
    adapters: Arc<dyn GenerationAdapters>,
    sessions: Arc<SessionRegistry>,
    imagery_count: usize,
}

struct VisualIdentity {
    logos: LogoVariants,
    palette: ColorPalette,
    typography: Typography,
    imagery: Vec<ImageRef>,
    backdrops: Vec<SocialBackdrop>,
}

impl KitAssembler {
    pub fn new(
        adapters: Arc<dyn GenerationAdapters>,
        sessions: Arc<SessionRegistry>,
        imagery_count: usize,
    ) -> Self {
        Self {
            adapters,
            sessions,
            imagery_count,
        }
    }

    /// Runs the whole pipeline. When `session_id` is given, local audio the
    /// session held from an earlier kit is released once this one is built.
    pub async fn assemble(
        &self,
        input: &BrandInput,
        session_id: Option<&str>,
    ) -> Result<BrandKit, BrandKitError> {
        input.validate()?;
        info!("Assembling brand kit for '{}'", input.name);

        let visual = self.visual_identity(input).await.map_err(|e| {
            error!("Brand kit generation failed for '{}': {}", input.name, e);
            match e {
                BrandKitError::Generation(_) => e,
                other => BrandKitError::Generation(other.to_string()),
            }
        })?;

        // Jingles overlap with the ad chain; neither can fail the run
        let (ad, audio) = futures_util::join!(self.ad_with_voiceover(input), self.jingles(input));

        let kit = BrandKit {
            name: input.name.trim().to_string(),
            logo: visual.logos.primary.clone(),
            logos: Some(visual.logos),
            color_palette: visual.palette,
            typography: visual.typography,
            imagery: visual.imagery,
            social_backdrops: Some(visual.backdrops),
            audio,
            ad,
            ad_video: None,
        };

        if let Some(session_id) = session_id {
            let released = self.sessions.track(session_id, &kit);
            if released > 0 {
                debug!("Released {} superseded blobs for session {}", released, session_id);
            }
        }

        info!("Assembled brand kit for '{}'", kit.name);
        Ok(kit)
    }

    async fn visual_identity(&self, input: &BrandInput) -> Result<VisualIdentity, BrandKitError> {
        let adapters = &self.adapters;
        let (name, description, keywords) = (
            input.name.as_str(),
            input.description.as_str(),
            input.keywords.as_str(),
        );

        let (candidates, palette, typography, imagery, backdrops) = futures_util::try_join!(
            adapters.generate_logo_variants(name, description, keywords),
            adapters.generate_color_palette(description, keywords),
            adapters.generate_typography(description, keywords),
            adapters.generate_brand_imagery(description, keywords, self.imagery_count),
            adapters.generate_social_backdrops(name, description, keywords),
        )?;

        if palette.len() != PALETTE_SIZE {
            return Err(BrandKitError::Generation(format!(
                "Palette has {} colors, expected {}",
                palette.len(),
                PALETTE_SIZE
            )));
        }

        let default = Typography::default();
        let typography = Typography {
            heading_font: non_empty(typography.heading_font).unwrap_or(default.heading_font),
            body_font: non_empty(typography.body_font).unwrap_or(default.body_font),
        };

        Ok(VisualIdentity {
            logos: LogoVariants::from_candidates(candidates),
            palette,
            typography,
            imagery,
            backdrops,
        })
    }

    /// Ad copy, then voiceover when asked for and a voice is picked.
    async fn ad_with_voiceover(&self, input: &BrandInput) -> Option<BrandAd> {
        let copy = match self
            .adapters
            .generate_ad_copy(&input.name, &input.description, &input.keywords, input.tone)
            .await
        {
            Ok(copy) => copy,
            Err(e) => {
                warn!("Ad copy unavailable for '{}': {}", input.name, e);
                return None;
            }
        };

        let mut ad = ad_from_copy(copy, input)?;

        if let Some(voice_id) = input.selected_voice().filter(|_| input.generate_voiceover) {
            match self
                .adapters
                .generate_voiceover(&ad.voiceover_text, VOICEOVER_LABEL, voice_id)
                .await
            {
                Ok(asset) => ad.audio_url = Some(asset.url),
                Err(e) => {
                    warn!("Voiceover failed for '{}': {}", input.name, e);
                    ad.tts_error = Some(VOICEOVER_UNAVAILABLE.to_string());
                }
            }
        }

        Some(ad)
    }

    async fn jingles(&self, input: &BrandInput) -> KitAudio {
        if input.skip_music {
            return KitAudio::default();
        }

        let generate = |slot: MusicSlot| {
            let prompt = slot.prompt(&input.name);
            async move { self.adapters.generate_music(&prompt, slot.label()).await }
        };
        let (intro, outro) = futures_util::join!(generate(MusicSlot::Intro), generate(MusicSlot::Outro));

        match (intro, outro) {
            (Ok(intro), Ok(outro)) => KitAudio { intro, outro },
            (intro, outro) => {
                // Both or neither; drop the half that made it
                for result in [&intro, &outro] {
                    match result {
                        Ok(asset) => {
                            self.sessions.release(&asset.url);
                        }
                        Err(e) => warn!("Jingle unavailable for '{}': {}", input.name, e),
                    }
                }
                KitAudio::default()
            }
        }
    }
}

/// None when the script is empty; the voiceover text is never empty otherwise.
fn ad_from_copy(copy: AdCopy, input: &BrandInput) -> Option<BrandAd> {
    let copy_script = copy.script.trim().to_string();
    if copy_script.is_empty() {
        return None;
    }
    let voiceover_text = match sanitize::collapse_whitespace(&copy.voiceover) {
        text if text.is_empty() => sanitize::voiceover_from_script(&copy_script),
        text => text,
    };

    Some(BrandAd {
        copy_script,
        voiceover_text,
        voice_id: input.selected_voice().map(str::to_string),
        voice_name: input
            .voice_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        audio_url: None,
        tts_error: None,
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
