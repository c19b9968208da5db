// src/services/adapters.rs
//! The outbound generation capabilities the kit pipeline depends on.
//!
//! `VendorAdapters` is the production composition; tests substitute a
//! recording mock.

use crate::errors::BrandKitError;
use crate::models::*;
use crate::services::asset_policy::AssetPolicy;
use crate::services::blob_cache::BlobCache;
use crate::services::blob_store::HttpBlobStore;
use crate::services::elevenlabs_service::ElevenLabsService;
use crate::services::fal_service::FalService;
use crate::services::gemini_service::GeminiService;
use crate::services::image_processor::ImageProcessor;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::Client;
use reqwest::redirect::Policy;
use std::sync::Arc;

const MAX_ASSET_REDIRECTS: usize = 5;

/// Bytes of a dereferenced asset.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAsset {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait GenerationAdapters: Send + Sync {
    async fn generate_logo_variants(
        &self,
        name: &str,
        description: &str,
        keywords: &str,
    ) -> Result<LogoCandidates, BrandKitError>;

    async fn generate_color_palette(
        &self,
        description: &str,
        keywords: &str,
    ) -> Result<ColorPalette, BrandKitError>;

    async fn generate_typography(
        &self,
        description: &str,
        keywords: &str,
    ) -> Result<Typography, BrandKitError>;

    async fn generate_brand_imagery(
        &self,
        description: &str,
        keywords: &str,
        count: usize,
    ) -> Result<Vec<ImageRef>, BrandKitError>;

    async fn generate_social_backdrops(
        &self,
        name: &str,
        description: &str,
        keywords: &str,
    ) -> Result<Vec<SocialBackdrop>, BrandKitError>;

    async fn generate_ad_copy(
        &self,
        name: &str,
        description: &str,
        keywords: &str,
        tone: Tone,
    ) -> Result<AdCopy, BrandKitError>;

    async fn generate_video_prompt(
        &self,
        name: &str,
        script: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, BrandKitError>;

    async fn generate_ad_video(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<BrandVideo, BrandKitError>;

    async fn generate_music(&self, prompt: &str, label: &str) -> Result<AudioAsset, BrandKitError>;

    async fn generate_voiceover(
        &self,
        text: &str,
        label: &str,
        voice_id: &str,
    ) -> Result<AudioAsset, BrandKitError>;

    /// Takes and returns base64 image data.
    async fn edit_image(&self, inline: &str, instruction: &str) -> Result<String, BrandKitError>;

    async fn list_voices(&self) -> Result<Vec<Voice>, BrandKitError>;

    async fn upload_blob(
        &self,
        data: Bytes,
        key: &str,
        content_type: &str,
    ) -> Result<String, BrandKitError>;

    async fn fetch_asset(&self, location: &str) -> Result<FetchedAsset, BrandKitError>;
}

pub struct VendorAdapters {
    gemini: Option<GeminiService>,
    elevenlabs: Option<ElevenLabsService>,
    fal: Option<FalService>,
    blob_store: Option<HttpBlobStore>,
    blobs: Arc<BlobCache>,
    image_processor: ImageProcessor,
    music_length_ms: u64,
    asset_policy: AssetPolicy,
    client: Client,
}

impl VendorAdapters {
    pub fn new(
        gemini: Option<GeminiService>,
        elevenlabs: Option<ElevenLabsService>,
        fal: Option<FalService>,
        blob_store: Option<HttpBlobStore>,
        blobs: Arc<BlobCache>,
        music_length_ms: u64,
    ) -> Self {
        let asset_policy = AssetPolicy::new(blob_store.iter().map(|store| store.public_url("")));
        Self {
            gemini,
            elevenlabs,
            fal,
            blob_store,
            blobs,
            image_processor: ImageProcessor::new(),
            music_length_ms,
            client: asset_client(asset_policy.clone()),
            asset_policy,
        }
    }

    fn gemini(&self) -> Result<&GeminiService, BrandKitError> {
        self.gemini
            .as_ref()
            .ok_or_else(|| BrandKitError::NotConfigured("Gemini".to_string()))
    }

    fn elevenlabs(&self) -> Result<&ElevenLabsService, BrandKitError> {
        self.elevenlabs
            .as_ref()
            .ok_or_else(|| BrandKitError::NotConfigured("ElevenLabs".to_string()))
    }

    fn fal(&self) -> Result<&FalService, BrandKitError> {
        self.fal
            .as_ref()
            .ok_or_else(|| BrandKitError::NotConfigured("FAL".to_string()))
    }

    /// Logo bytes the image decoder rejects count as a failed candidate.
    fn checked_logo(&self, logo: Result<String, BrandKitError>) -> Result<ImageRef, BrandKitError> {
        let data = logo?;
        let raw = self.image_processor.decode_base64(&data)?;
        self.image_processor.validate_image(&raw)?;
        Ok(ImageRef::inline(data))
    }
}

/// Redirects are followed only while they stay inside the asset policy.
fn asset_client(policy: AssetPolicy) -> Client {
    let redirects = Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_ASSET_REDIRECTS {
            attempt.error("too many redirects")
        } else if policy.allows(attempt.url().as_str()) {
            attempt.follow()
        } else {
            attempt.stop()
        }
    });
    Client::builder()
        .redirect(redirects)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[async_trait]
impl GenerationAdapters for VendorAdapters {
    async fn generate_logo_variants(
        &self,
        name: &str,
        description: &str,
        keywords: &str,
    ) -> Result<LogoCandidates, BrandKitError> {
        let gemini = self.gemini()?;
        let (primary, secondary, submark) = futures_util::join!(
            gemini.generate_logo(name, description, keywords, LogoSlot::Primary),
            gemini.generate_logo(name, description, keywords, LogoSlot::Secondary),
            gemini.generate_logo(name, description, keywords, LogoSlot::Submark),
        );
        Ok(LogoCandidates {
            primary: self.checked_logo(primary),
            secondary: self.checked_logo(secondary),
            submark: self.checked_logo(submark),
        })
    }

    async fn generate_color_palette(
        &self,
        description: &str,
        keywords: &str,
    ) -> Result<ColorPalette, BrandKitError> {
        self.gemini()?.generate_palette(description, keywords).await
    }

    async fn generate_typography(
        &self,
        description: &str,
        keywords: &str,
    ) -> Result<Typography, BrandKitError> {
        Ok(self.gemini()?.generate_typography(description, keywords).await)
    }

    async fn generate_brand_imagery(
        &self,
        description: &str,
        keywords: &str,
        count: usize,
    ) -> Result<Vec<ImageRef>, BrandKitError> {
        let gemini = self.gemini()?;
        let images = futures_util::future::try_join_all(
            (0..count).map(|_| gemini.generate_imagery(description, keywords)),
        )
        .await?;
        Ok(images.into_iter().map(ImageRef::inline).collect())
    }

    async fn generate_social_backdrops(
        &self,
        name: &str,
        description: &str,
        keywords: &str,
    ) -> Result<Vec<SocialBackdrop>, BrandKitError> {
        let gemini = self.gemini()?;
        let generated = futures_util::future::try_join_all(SocialPlatform::ALL.iter().map(
            |platform| async move {
                let raw = gemini
                    .generate_backdrop(name, description, keywords, *platform)
                    .await?;
                Ok::<_, BrandKitError>((*platform, raw))
            },
        ))
        .await?;

        generated
            .into_iter()
            .map(|(platform, raw)| {
                let (width, height) = platform.dimensions();
                let resized = self.image_processor.cover_base64(&raw, width, height)?;
                Ok(SocialBackdrop {
                    platform,
                    image: ImageRef::inline(resized),
                })
            })
            .collect()
    }

    async fn generate_ad_copy(
        &self,
        name: &str,
        description: &str,
        keywords: &str,
        tone: Tone,
    ) -> Result<AdCopy, BrandKitError> {
        self.gemini()?
            .generate_ad_copy(name, description, keywords, tone)
            .await
    }

    async fn generate_video_prompt(
        &self,
        name: &str,
        script: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, BrandKitError> {
        Ok(self
            .gemini()?
            .generate_video_prompt(name, script, aspect_ratio)
            .await)
    }

    async fn generate_ad_video(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<BrandVideo, BrandKitError> {
        let url = self.fal()?.generate_video(prompt, aspect_ratio).await?;
        Ok(BrandVideo { url, aspect_ratio })
    }

    async fn generate_music(&self, prompt: &str, label: &str) -> Result<AudioAsset, BrandKitError> {
        let audio = self
            .elevenlabs()?
            .compose_music(prompt, self.music_length_ms)
            .await?;
        Ok(AudioAsset {
            url: self.blobs.insert(audio, "audio/mpeg"),
            name: label.to_string(),
        })
    }

    async fn generate_voiceover(
        &self,
        text: &str,
        label: &str,
        voice_id: &str,
    ) -> Result<AudioAsset, BrandKitError> {
        let audio = self.elevenlabs()?.text_to_speech(text, voice_id).await?;
        Ok(AudioAsset {
            url: self.blobs.insert(audio, "audio/mpeg"),
            name: label.to_string(),
        })
    }

    async fn edit_image(&self, inline: &str, instruction: &str) -> Result<String, BrandKitError> {
        self.gemini()?.edit_image(inline, instruction).await
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, BrandKitError> {
        match self.elevenlabs.as_ref() {
            Some(elevenlabs) => elevenlabs.list_voices().await,
            None => Ok(Vec::new()),
        }
    }

    async fn upload_blob(
        &self,
        data: Bytes,
        key: &str,
        content_type: &str,
    ) -> Result<String, BrandKitError> {
        self.blob_store
            .as_ref()
            .ok_or_else(|| BrandKitError::NotConfigured("Blob store".to_string()))?
            .put(data, key, content_type)
            .await
    }

    async fn fetch_asset(&self, location: &str) -> Result<FetchedAsset, BrandKitError> {
        if BlobCache::is_local(location) {
            let blob = self.blobs.get(location).ok_or(BrandKitError::NotFound)?;
            return Ok(FetchedAsset {
                bytes: blob.bytes,
                content_type: Some(blob.content_type),
            });
        }
        if !self.asset_policy.allows(location) {
            return Err(BrandKitError::Validation(format!(
                "Refusing to fetch asset location: {}",
                location
            )));
        }

        debug!("Fetching asset {}", location);
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| BrandKitError::Provider(format!("Asset fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BrandKitError::Provider(format!(
                "Asset fetch failed: {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BrandKitError::Provider(format!("Asset fetch failed: {}", e)))?;

        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }
}
