// src/tests/mocks.rs
use crate::errors::BrandKitError;
use crate::models::*;
use crate::services::adapters::{FetchedAsset, GenerationAdapters};
use crate::services::blob_cache::BlobCache;
use crate::services::clock::{Clock, SystemClock};
use crate::services::rate_guard::CounterStore;
use crate::services::share_store::{InMemoryShareBackend, ShareBackend, ShareObserver, ShareRecord};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

pub fn b64(text: &str) -> String {
    general_purpose::STANDARD.encode(text)
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(rfc3339: &str) -> Self {
        let now = DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc);
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at("2026-03-01T12:00:00Z")
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub struct FailingCounterStore;

#[async_trait]
impl CounterStore for FailingCounterStore {
    async fn incr_with_expiry(&self, _key: &str, _ttl: Duration) -> Result<i64, BrandKitError> {
        Err(BrandKitError::Redis("connection refused".to_string()))
    }
}

/// Stores snapshots but cannot update owner indexes.
pub struct UnindexableShareBackend {
    inner: InMemoryShareBackend,
}

impl Default for UnindexableShareBackend {
    fn default() -> Self {
        Self {
            inner: InMemoryShareBackend::new(Arc::new(SystemClock)),
        }
    }
}

#[async_trait]
impl ShareBackend for UnindexableShareBackend {
    async fn put_snapshot(&self, key: &str, json: &str, ttl: Duration) -> Result<(), BrandKitError> {
        self.inner.put_snapshot(key, json, ttl).await
    }

    async fn get_snapshot(&self, key: &str) -> Result<Option<String>, BrandKitError> {
        self.inner.get_snapshot(key).await
    }

    async fn add_to_index(&self, _key: &str, _id: &str) -> Result<(), BrandKitError> {
        Err(BrandKitError::Redis("READONLY".to_string()))
    }

    async fn index_members(&self, key: &str) -> Result<Vec<String>, BrandKitError> {
        self.inner.index_members(key).await
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub records: Mutex<Vec<ShareRecord>>,
}

#[async_trait]
impl ShareObserver for RecordingObserver {
    async fn on_published(&self, record: &ShareRecord) -> Result<(), BrandKitError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

pub fn sample_input() -> BrandInput {
    BrandInput {
        name: "Solara Coffee".to_string(),
        description: "eco-friendly coffee brand".to_string(),
        keywords: "minimalist,warm".to_string(),
        tone: Tone::Friendly,
        voice_id: None,
        voice_name: None,
        skip_music: true,
        generate_voiceover: false,
    }
}

pub fn sample_kit() -> BrandKit {
    let logos = LogoVariants {
        primary: ImageRef::inline(b64("PRIMARY")),
        secondary: ImageRef::inline(b64("SECONDARY")),
        submark: ImageRef::inline(b64("SUBMARK")),
    };
    BrandKit {
        name: "Solara Coffee".to_string(),
        logo: logos.primary.clone(),
        logos: Some(logos),
        color_palette: ["#2F4F4F", "#D2B48C", "#F5F5DC", "#8B4513", "#FFFFFF"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        typography: Typography {
            heading_font: "Playfair Display".to_string(),
            body_font: "Inter".to_string(),
        },
        imagery: vec![ImageRef::inline(b64("IMAGE-1")), ImageRef::inline(b64("IMAGE-2"))],
        social_backdrops: Some(vec![SocialBackdrop {
            platform: SocialPlatform::Instagram,
            image: ImageRef::inline(b64("BACKDROP")),
        }]),
        audio: KitAudio::default(),
        ad: Some(BrandAd {
            copy_script: "[Upbeat music] Meet Solara Coffee. Coffee that cares.".to_string(),
            voiceover_text: "Meet Solara Coffee. Coffee that cares.".to_string(),
            voice_id: Some("voice-1".to_string()),
            voice_name: Some("Aria".to_string()),
            audio_url: None,
            tts_error: None,
        }),
        ad_video: None,
    }
}

/// Deterministic adapters that record every call.
///
/// Failures are keyed by operation name (`generate_music`) or by operation
/// and label (`generate_music:Outro Jingle`).
pub struct MockAdapters {
    failures: HashSet<String>,
    calls: Mutex<Vec<String>>,
    palette: Mutex<ColorPalette>,
    assets: Mutex<HashMap<String, FetchedAsset>>,
    uploads: Mutex<Vec<(Vec<u8>, String)>>,
    edits: Mutex<Vec<(String, String)>>,
    video_prompts: Mutex<Vec<String>>,
    blobs: Option<Arc<BlobCache>>,
    blob_store: bool,
}

impl MockAdapters {
    pub fn new() -> Self {
        Self::failing(&[])
    }

    pub fn failing(operations: &[&str]) -> Self {
        Self {
            failures: operations.iter().map(|op| op.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
            palette: Mutex::new(sample_kit().color_palette),
            assets: Mutex::new(HashMap::new()),
            uploads: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            video_prompts: Mutex::new(Vec::new()),
            blobs: None,
            blob_store: true,
        }
    }

    /// Generated audio goes into `blobs` and comes back as local references.
    pub fn with_blobs(mut self, blobs: Arc<BlobCache>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn without_blob_store(mut self) -> Self {
        self.blob_store = false;
        self
    }

    pub fn set_palette(&self, palette: ColorPalette) {
        *self.palette.lock() = palette;
    }

    pub fn add_asset(&self, location: &str, bytes: Bytes, content_type: &str) {
        self.assets.lock().insert(
            location.to_string(),
            FetchedAsset {
                bytes,
                content_type: Some(content_type.to_string()),
            },
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn called(&self, operation: &str) -> bool {
        self.calls.lock().iter().any(|c| c == operation)
    }

    pub fn uploads(&self) -> Vec<(Vec<u8>, String)> {
        self.uploads.lock().clone()
    }

    pub fn last_edit_input(&self) -> Option<String> {
        self.edits.lock().last().map(|(input, _)| input.clone())
    }

    pub fn last_edit_instruction(&self) -> Option<String> {
        self.edits.lock().last().map(|(_, instruction)| instruction.clone())
    }

    pub fn last_video_prompt(&self) -> Option<String> {
        self.video_prompts.lock().last().cloned()
    }

    fn record(&self, operation: &str, detail: Option<&str>) -> Result<(), BrandKitError> {
        self.calls.lock().push(operation.to_string());
        let keyed = detail.map(|d| format!("{}:{}", operation, d));
        if self.failures.contains(operation)
            || keyed.is_some_and(|k| self.failures.contains(&k))
        {
            return Err(BrandKitError::Provider(format!("{} failed", operation)));
        }
        Ok(())
    }

    fn store_audio(&self, bytes: Vec<u8>, label: &str) -> String {
        match &self.blobs {
            Some(blobs) => blobs.insert(Bytes::from(bytes), "audio/mpeg"),
            None => format!(
                "https://audio.test/{}.mp3",
                crate::sanitize::slugify(label)
            ),
        }
    }
}

#[async_trait]
impl GenerationAdapters for MockAdapters {
    async fn generate_logo_variants(
        &self,
        _name: &str,
        _description: &str,
        _keywords: &str,
    ) -> Result<LogoCandidates, BrandKitError> {
        self.record("generate_logo_variants", None)?;
        Ok(LogoCandidates {
            primary: Some(ImageRef::inline(b64("PRIMARY"))),
            secondary: Some(ImageRef::inline(b64("SECONDARY"))),
            submark: Some(ImageRef::inline(b64("SUBMARK"))),
        })
    }

    async fn generate_color_palette(
        &self,
        _description: &str,
        _keywords: &str,
    ) -> Result<ColorPalette, BrandKitError> {
        self.record("generate_color_palette", None)?;
        Ok(self.palette.lock().clone())
    }

    async fn generate_typography(
        &self,
        _description: &str,
        _keywords: &str,
    ) -> Result<Typography, BrandKitError> {
        self.record("generate_typography", None)?;
        Ok(sample_kit().typography)
    }

    async fn generate_brand_imagery(
        &self,
        _description: &str,
        _keywords: &str,
        count: usize,
    ) -> Result<Vec<ImageRef>, BrandKitError> {
        self.record("generate_brand_imagery", None)?;
        Ok((1..=count)
            .map(|i| ImageRef::inline(b64(&format!("IMAGE-{}", i))))
            .collect())
    }

    async fn generate_social_backdrops(
        &self,
        _name: &str,
        _description: &str,
        _keywords: &str,
    ) -> Result<Vec<SocialBackdrop>, BrandKitError> {
        self.record("generate_social_backdrops", None)?;
        Ok(SocialPlatform::ALL
            .iter()
            .map(|platform| SocialBackdrop {
                platform: *platform,
                image: ImageRef::inline(b64(platform.as_str())),
            })
            .collect())
    }

    async fn generate_ad_copy(
        &self,
        name: &str,
        _description: &str,
        _keywords: &str,
        _tone: Tone,
    ) -> Result<AdCopy, BrandKitError> {
        self.record("generate_ad_copy", None)?;
        Ok(AdCopy {
            script: format!("[Upbeat music] Meet {}. Coffee that cares.", name),
            voiceover: format!("Meet {}. Coffee that cares.", name),
        })
    }

    async fn generate_video_prompt(
        &self,
        _name: &str,
        script: &str,
        _aspect_ratio: AspectRatio,
    ) -> Result<String, BrandKitError> {
        self.record("generate_video_prompt", None)?;
        Ok(format!("Cinematic: {}", script))
    }

    async fn generate_ad_video(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<BrandVideo, BrandKitError> {
        self.video_prompts.lock().push(prompt.to_string());
        self.record("generate_ad_video", None)?;
        Ok(BrandVideo {
            url: "https://videos.test/ad.mp4".to_string(),
            aspect_ratio,
        })
    }

    async fn generate_music(&self, prompt: &str, label: &str) -> Result<AudioAsset, BrandKitError> {
        self.record("generate_music", Some(label))?;
        Ok(AudioAsset {
            url: self.store_audio(prompt.as_bytes().to_vec(), label),
            name: label.to_string(),
        })
    }

    async fn generate_voiceover(
        &self,
        text: &str,
        label: &str,
        voice_id: &str,
    ) -> Result<AudioAsset, BrandKitError> {
        self.record("generate_voiceover", Some(voice_id))?;
        Ok(AudioAsset {
            url: self.store_audio(text.as_bytes().to_vec(), label),
            name: label.to_string(),
        })
    }

    async fn edit_image(&self, inline: &str, instruction: &str) -> Result<String, BrandKitError> {
        self.edits
            .lock()
            .push((inline.to_string(), instruction.to_string()));
        self.record("edit_image", None)?;
        Ok(b64(&format!("edited:{}", instruction)))
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, BrandKitError> {
        self.record("list_voices", None)?;
        Ok(vec![Voice {
            id: "voice-1".to_string(),
            name: "Aria".to_string(),
            preview_url: Some("https://audio.test/aria.mp3".to_string()),
            category: "premade".to_string(),
            description: String::new(),
            accent: "american".to_string(),
            gender: "female".to_string(),
            age: "young".to_string(),
        }])
    }

    async fn upload_blob(
        &self,
        data: Bytes,
        key: &str,
        content_type: &str,
    ) -> Result<String, BrandKitError> {
        self.record("upload_blob", None)?;
        if !self.blob_store {
            return Err(BrandKitError::NotConfigured("Blob store".to_string()));
        }
        self.uploads
            .lock()
            .push((data.to_vec(), content_type.to_string()));
        Ok(format!("https://blobs.test/{}", key))
    }

    async fn fetch_asset(&self, location: &str) -> Result<FetchedAsset, BrandKitError> {
        self.record("fetch_asset", None)?;
        if let Some(blob) = self.blobs.as_ref().and_then(|blobs| blobs.get(location)) {
            return Ok(FetchedAsset {
                bytes: blob.bytes,
                content_type: Some(blob.content_type),
            });
        }
        self.assets
            .lock()
            .get(location)
            .cloned()
            .ok_or(BrandKitError::NotFound)
    }
}
