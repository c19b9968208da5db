// src/models.rs
use crate::errors::BrandKitError;
use crate::sanitize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1x1 transparent PNG, used when the logo model returns no image at all.
pub const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub const PALETTE_SIZE: usize = 5;

pub const VOICEOVER_UNAVAILABLE: &str =
    "Voiceover unavailable right now. Try again or choose a different voice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Friendly,
    Professional,
    Bold,
    Playful,
    Inspirational,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tone::Friendly => "friendly",
            Tone::Professional => "professional",
            Tone::Bold => "bold",
            Tone::Playful => "playful",
            Tone::Inspirational => "inspirational",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandInput {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub voice_name: Option<String>,
    #[serde(default)]
    pub skip_music: bool,
    #[serde(default)]
    pub generate_voiceover: bool,
}

impl BrandInput {
    pub fn validate(&self) -> Result<(), BrandKitError> {
        if self.name.trim().is_empty() {
            return Err(BrandKitError::Validation("Brand name is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(BrandKitError::Validation(
                "Brand description is required".to_string(),
            ));
        }
        Ok(())
    }

    /// The voice to synthesize with, if one was actually picked.
    pub fn selected_voice(&self) -> Option<&str> {
        self.voice_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// An image either carried inline (base64) or stored elsewhere and referenced by location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageRef {
    Inline { data: String },
    Url { location: String },
}

impl ImageRef {
    pub fn inline(data: impl Into<String>) -> Self {
        ImageRef::Inline { data: data.into() }
    }

    pub fn url(location: impl Into<String>) -> Self {
        ImageRef::Url {
            location: location.into(),
        }
    }

    pub fn placeholder() -> Self {
        ImageRef::inline(PLACEHOLDER_PNG)
    }

    pub fn as_inline(&self) -> Option<&str> {
        match self {
            ImageRef::Inline { data } => Some(data),
            ImageRef::Url { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImageRef::Inline { .. } => "inline",
            ImageRef::Url { .. } => "url",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoSlot {
    Primary,
    Secondary,
    Submark,
}

impl LogoSlot {
    pub const ALL: [LogoSlot; 3] = [LogoSlot::Primary, LogoSlot::Secondary, LogoSlot::Submark];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogoSlot::Primary => "primary",
            LogoSlot::Secondary => "secondary",
            LogoSlot::Submark => "submark",
        }
    }
}

/// Raw adapter output before fallbacks are applied.
#[derive(Debug, Clone, Default)]
pub struct LogoCandidates {
    pub primary: Option<ImageRef>,
    pub secondary: Option<ImageRef>,
    pub submark: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoVariants {
    pub primary: ImageRef,
    pub secondary: ImageRef,
    pub submark: ImageRef,
}

impl LogoVariants {
    /// Secondary and submark inherit the primary when missing; a missing
    /// primary becomes the placeholder.
    pub fn from_candidates(candidates: LogoCandidates) -> Self {
        let primary = candidates.primary.unwrap_or_else(ImageRef::placeholder);
        Self {
            secondary: candidates.secondary.unwrap_or_else(|| primary.clone()),
            submark: candidates.submark.unwrap_or_else(|| primary.clone()),
            primary,
        }
    }

    pub fn get(&self, slot: LogoSlot) -> &ImageRef {
        match slot {
            LogoSlot::Primary => &self.primary,
            LogoSlot::Secondary => &self.secondary,
            LogoSlot::Submark => &self.submark,
        }
    }

    pub fn set(&mut self, slot: LogoSlot, image: ImageRef) {
        match slot {
            LogoSlot::Primary => self.primary = image,
            LogoSlot::Secondary => self.secondary = image,
            LogoSlot::Submark => self.submark = image,
        }
    }
}

pub type ColorPalette = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub heading_font: String,
    pub body_font: String,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            heading_font: "Inter".to_string(),
            body_font: "Inter".to_string(),
        }
    }
}

impl Typography {
    pub fn heading_display_name(&self) -> String {
        sanitize::font_display_name(&self.heading_font)
    }

    pub fn body_display_name(&self) -> String {
        sanitize::font_display_name(&self.body_font)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Instagram,
    Tiktok,
    Linkedin,
}

impl SocialPlatform {
    pub const ALL: [SocialPlatform; 3] = [
        SocialPlatform::Instagram,
        SocialPlatform::Tiktok,
        SocialPlatform::Linkedin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SocialPlatform::Instagram => "instagram",
            SocialPlatform::Tiktok => "tiktok",
            SocialPlatform::Linkedin => "linkedin",
        }
    }

    /// Target pixel size (width, height) of a backdrop for this platform.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            SocialPlatform::Instagram => (1080, 1080),
            SocialPlatform::Tiktok => (1080, 1920),
            SocialPlatform::Linkedin => (1584, 396),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialBackdrop {
    pub platform: SocialPlatform,
    pub image: ImageRef,
}

/// Ad copy as returned by the text adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdCopy {
    pub script: String,
    pub voiceover: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandAd {
    pub copy_script: String,
    pub voiceover_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
        }
    }

    /// Unknown ratios normalize to 16:9.
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim() {
            "9:16" => AspectRatio::Portrait,
            "1:1" => AspectRatio::Square,
            _ => AspectRatio::Landscape,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandVideo {
    pub url: String,
    pub aspect_ratio: AspectRatio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioAsset {
    pub url: String,
    pub name: String,
}

impl AudioAsset {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            url: String::new(),
            name: name.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        !self.url.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MusicSlot {
    Intro,
    Outro,
}

impl MusicSlot {
    pub const ALL: [MusicSlot; 2] = [MusicSlot::Intro, MusicSlot::Outro];

    pub fn as_str(&self) -> &'static str {
        match self {
            MusicSlot::Intro => "intro",
            MusicSlot::Outro => "outro",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MusicSlot::Intro => "Intro Jingle",
            MusicSlot::Outro => "Outro Jingle",
        }
    }

    pub fn prompt(&self, brand_name: &str) -> String {
        match self {
            MusicSlot::Intro => format!("Upbeat and modern intro music for {}", brand_name),
            MusicSlot::Outro => format!("Calm and conclusive outro music for {}", brand_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitAudio {
    pub intro: AudioAsset,
    pub outro: AudioAsset,
}

impl Default for KitAudio {
    fn default() -> Self {
        Self {
            intro: AudioAsset::empty(MusicSlot::Intro.label()),
            outro: AudioAsset::empty(MusicSlot::Outro.label()),
        }
    }
}

impl KitAudio {
    pub fn get(&self, slot: MusicSlot) -> &AudioAsset {
        match slot {
            MusicSlot::Intro => &self.intro,
            MusicSlot::Outro => &self.outro,
        }
    }

    pub fn set(&mut self, slot: MusicSlot, asset: AudioAsset) {
        match slot {
            MusicSlot::Intro => self.intro = asset,
            MusicSlot::Outro => self.outro = asset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandKit {
    pub name: String,
    /// Legacy single-image field; mirrors `logos.primary` when variants exist.
    pub logo: ImageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logos: Option<LogoVariants>,
    pub color_palette: ColorPalette,
    pub typography: Typography,
    pub imagery: Vec<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_backdrops: Option<Vec<SocialBackdrop>>,
    #[serde(default)]
    pub audio: KitAudio,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad: Option<BrandAd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_video: Option<BrandVideo>,
}

impl BrandKit {
    /// Every audio location currently referenced by the kit.
    pub fn audio_locations(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for asset in [&self.audio.intro, &self.audio.outro] {
            if asset.is_present() {
                out.push(asset.url.as_str());
            }
        }
        if let Some(url) = self.ad.as_ref().and_then(|ad| ad.audio_url.as_deref()) {
            if !url.is_empty() {
                out.push(url);
            }
        }
        out
    }
}

/// True for locations another device can resolve on its own.
pub fn is_persisted_location(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSnapshot {
    pub name: String,
    pub logo: ImageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logos: Option<LogoVariants>,
    pub color_palette: ColorPalette,
    pub typography: Typography,
    pub imagery: Vec<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_backdrops: Option<Vec<SocialBackdrop>>,
    #[serde(default)]
    pub audio: KitAudio,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad: Option<BrandAd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_video: Option<BrandVideo>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl ShareSnapshot {
    /// Projects a kit onto its re-servable fields. Audio that only lives in
    /// this process is dropped, as is any per-session TTS error.
    pub fn sanitize(kit: &BrandKit, created_at: i64) -> Self {
        let keep = |asset: &AudioAsset| AudioAsset {
            url: if is_persisted_location(&asset.url) {
                asset.url.clone()
            } else {
                String::new()
            },
            name: asset.name.clone(),
        };

        Self {
            name: kit.name.clone(),
            logo: kit.logo.clone(),
            logos: kit.logos.clone(),
            color_palette: kit.color_palette.clone(),
            typography: kit.typography.clone(),
            imagery: kit.imagery.clone(),
            social_backdrops: kit.social_backdrops.clone(),
            audio: KitAudio {
                intro: keep(&kit.audio.intro),
                outro: keep(&kit.audio.outro),
            },
            ad: kit.ad.as_ref().map(|ad| BrandAd {
                copy_script: ad.copy_script.clone(),
                voiceover_text: ad.voiceover_text.clone(),
                voice_id: ad.voice_id.clone(),
                voice_name: ad.voice_name.clone(),
                audio_url: ad
                    .audio_url
                    .clone()
                    .filter(|url| is_persisted_location(url)),
                tts_error: None,
            }),
            ad_video: kit.ad_video.clone(),
            created_at,
        }
    }

    /// Rebuilds a read-only kit for a visitor.
    pub fn into_kit(self) -> BrandKit {
        BrandKit {
            name: self.name,
            logo: self.logo,
            logos: self.logos,
            color_palette: self.color_palette,
            typography: self.typography,
            imagery: self.imagery,
            social_backdrops: self.social_backdrops,
            audio: self.audio,
            ad: self.ad,
            ad_video: self.ad_video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub accent: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandIdea {
    pub name: String,
    pub description: String,
    pub keywords: String,
    pub tone: Tone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ref_carries_an_explicit_tag() {
        let inline = serde_json::to_value(ImageRef::inline("abc")).unwrap();
        assert_eq!(inline, serde_json::json!({"kind": "inline", "data": "abc"}));

        let url: ImageRef =
            serde_json::from_str(r#"{"kind":"url","location":"https://cdn.example.com/a.png"}"#)
                .unwrap();
        assert_eq!(url, ImageRef::url("https://cdn.example.com/a.png"));
        assert!(url.as_inline().is_none());
    }

    #[test]
    fn logo_variants_fall_back_to_primary() {
        let logos = LogoVariants::from_candidates(LogoCandidates {
            primary: Some(ImageRef::inline("P")),
            secondary: None,
            submark: Some(ImageRef::inline("S")),
        });
        assert_eq!(logos.secondary, ImageRef::inline("P"));
        assert_eq!(logos.submark, ImageRef::inline("S"));

        let empty = LogoVariants::from_candidates(LogoCandidates::default());
        assert_eq!(empty.primary, ImageRef::placeholder());
        assert_eq!(empty.secondary, empty.primary);
        assert_eq!(empty.submark, empty.primary);
    }

    #[test]
    fn brand_input_defaults_and_voice_selection() {
        let input: BrandInput = serde_json::from_str(
            r#"{"name":"Solara Coffee","description":"eco-friendly coffee brand","voiceId":"  "}"#,
        )
        .unwrap();
        assert_eq!(input.tone, Tone::Friendly);
        assert!(!input.skip_music);
        assert!(!input.generate_voiceover);
        assert_eq!(input.selected_voice(), None);
        assert!(input.validate().is_ok());

        let blank = BrandInput {
            name: " ".to_string(),
            ..input
        };
        assert!(matches!(blank.validate(), Err(BrandKitError::Validation(_))));
    }

    #[test]
    fn aspect_ratio_wire_form() {
        assert_eq!(
            serde_json::to_string(&AspectRatio::Portrait).unwrap(),
            "\"9:16\""
        );
        assert_eq!(AspectRatio::parse_or_default("4:3"), AspectRatio::Landscape);
        assert_eq!(AspectRatio::parse_or_default("1:1"), AspectRatio::Square);
    }

    #[test]
    fn snapshot_keeps_only_persisted_audio() {
        let kit = BrandKit {
            name: "Solara".to_string(),
            logo: ImageRef::inline("P"),
            logos: None,
            color_palette: vec!["#111111".to_string(); 5],
            typography: Typography::default(),
            imagery: vec![],
            social_backdrops: None,
            audio: KitAudio {
                intro: AudioAsset {
                    url: "/api/blobs/1".to_string(),
                    name: "Intro Jingle".to_string(),
                },
                outro: AudioAsset {
                    url: "https://cdn.example.com/outro.mp3".to_string(),
                    name: "Outro Jingle".to_string(),
                },
            },
            ad: Some(BrandAd {
                copy_script: "Script".to_string(),
                voiceover_text: "Script".to_string(),
                voice_id: Some("v1".to_string()),
                voice_name: None,
                audio_url: Some("/api/blobs/2".to_string()),
                tts_error: Some("boom".to_string()),
            }),
            ad_video: None,
        };

        let snapshot = ShareSnapshot::sanitize(&kit, 42);
        assert_eq!(snapshot.audio.intro.url, "");
        assert_eq!(snapshot.audio.outro.url, "https://cdn.example.com/outro.mp3");
        let ad = snapshot.ad.as_ref().unwrap();
        assert_eq!(ad.audio_url, None);
        assert_eq!(ad.tts_error, None);
        assert_eq!(ad.voice_id.as_deref(), Some("v1"));
        assert_eq!(snapshot.created_at, 42);
        assert_eq!(snapshot.into_kit().name, "Solara");
    }
}
