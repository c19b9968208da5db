// src/services/export.rs
//! Zip archive of a kit: `brandkit.json` metadata plus every asset that can
//! be resolved at export time. Assets that fail to load are left out.

use crate::errors::BrandKitError;
use crate::models::*;
use crate::sanitize;
use crate::services::adapters::{FetchedAsset, GenerationAdapters};
use crate::services::clock::{Clock, SystemClock};
use base64::{Engine as _, engine::general_purpose};
use log::{debug, info};
use serde_json::json;
use std::io::{Cursor, Write};
use std::sync::Arc;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Debug, Clone)]
pub struct ExportArchive {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Entry names in archive order.
    pub entries: Vec<String>,
}

pub struct KitExporter {
    adapters: Arc<dyn GenerationAdapters>,
    clock: Arc<dyn Clock>,
}

impl KitExporter {
    pub fn new(adapters: Arc<dyn GenerationAdapters>) -> Self {
        Self::with_clock(adapters, Arc::new(SystemClock))
    }

    pub fn with_clock(adapters: Arc<dyn GenerationAdapters>, clock: Arc<dyn Clock>) -> Self {
        Self { adapters, clock }
    }

    pub async fn export(&self, kit: &BrandKit) -> Result<ExportArchive, BrandKitError> {
        let now = self.clock.now();
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        let metadata = serde_json::to_vec_pretty(&metadata(kit, now.to_rfc3339()))?;
        files.push(("brandkit.json".to_string(), metadata));

        if let Some(bytes) = self.image_bytes(&kit.logo).await {
            files.push(("logo.png".to_string(), bytes));
        }
        if let Some(logos) = &kit.logos {
            for slot in LogoSlot::ALL {
                if let Some(bytes) = self.image_bytes(logos.get(slot)).await {
                    files.push((format!("logo-{}.png", slot.as_str()), bytes));
                }
            }
        }
        for (i, image) in kit.imagery.iter().enumerate() {
            if let Some(bytes) = self.image_bytes(image).await {
                files.push((format!("images/image-{}.png", i + 1), bytes));
            }
        }
        for backdrop in kit.social_backdrops.iter().flatten() {
            if let Some(bytes) = self.image_bytes(&backdrop.image).await {
                files.push((format!("social/{}.jpg", backdrop.platform.as_str()), bytes));
            }
        }

        for slot in MusicSlot::ALL {
            let asset = kit.audio.get(slot);
            if !asset.is_present() {
                continue;
            }
            if let Some(fetched) = self.fetch(&asset.url).await {
                files.push((format!("audio/{}.mp3", slot.as_str()), fetched.bytes.to_vec()));
            }
        }
        if let Some(url) = kit.ad.as_ref().and_then(|ad| ad.audio_url.as_deref()) {
            if let Some(fetched) = self.fetch(url).await {
                let ext = audio_extension(fetched.content_type.as_deref());
                files.push((format!("audio/ad-voiceover.{}", ext), fetched.bytes.to_vec()));
            }
        }
        if let Some(video) = kit.ad_video.as_ref().filter(|v| !v.url.is_empty()) {
            if let Some(fetched) = self.fetch(&video.url).await {
                let ext = video_extension(fetched.content_type.as_deref(), &video.url);
                files.push((format!("ad-video.{}", ext), fetched.bytes.to_vec()));
            }
        }

        let entries: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();
        let bytes = write_zip(files)?;
        let filename = format!(
            "brand-kit-{}-{}.zip",
            sanitize::slugify(&kit.name),
            now.timestamp_millis()
        );
        info!("Exported {} ({} entries, {} bytes)", filename, entries.len(), bytes.len());

        Ok(ExportArchive {
            filename,
            bytes,
            entries,
        })
    }

    async fn image_bytes(&self, image: &ImageRef) -> Option<Vec<u8>> {
        match image {
            ImageRef::Inline { data } => match general_purpose::STANDARD.decode(data.trim()) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    debug!("Skipping undecodable inline image: {}", e);
                    None
                }
            },
            ImageRef::Url { location } => self.fetch(location).await.map(|f| f.bytes.to_vec()),
        }
    }

    async fn fetch(&self, location: &str) -> Option<FetchedAsset> {
        match self.adapters.fetch_asset(location).await {
            Ok(asset) if !asset.bytes.is_empty() => Some(asset),
            Ok(_) => None,
            Err(e) => {
                debug!("Skipping asset {}: {}", location, e);
                None
            }
        }
    }
}

fn metadata(kit: &BrandKit, generated_at: String) -> serde_json::Value {
    let logos = match &kit.logos {
        Some(logos) => json!({
            "primary": logos.primary.kind(),
            "secondary": logos.secondary.kind(),
            "submark": logos.submark.kind(),
        }),
        None => json!({ "primary": kit.logo.kind() }),
    };
    let backdrops: Vec<_> = kit
        .social_backdrops
        .iter()
        .flatten()
        .map(|b| json!({ "platform": b.platform, "type": b.image.kind() }))
        .collect();

    json!({
        "name": kit.name,
        "colorPalette": kit.color_palette,
        "typography": {
            "headingFont": kit.typography.heading_font,
            "bodyFont": kit.typography.body_font,
            "headingDisplayName": kit.typography.heading_display_name(),
            "bodyDisplayName": kit.typography.body_display_name(),
        },
        "assets": {
            "logos": logos,
            "imageryCount": kit.imagery.len(),
            "socialBackdrops": backdrops,
            "audio": {
                "hasIntro": kit.audio.intro.is_present(),
                "hasOutro": kit.audio.outro.is_present(),
            },
        },
        "ad": kit.ad.as_ref().map(|ad| json!({
            "copyScript": ad.copy_script,
            "voiceoverText": ad.voiceover_text,
            "voiceId": ad.voice_id,
            "voiceName": ad.voice_name,
            "hasVoiceoverAudio": ad.audio_url.is_some(),
        })),
        "adVideo": kit.ad_video,
        "generatedAt": generated_at,
    })
}

fn write_zip(files: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>, BrandKitError> {
    let export_error = |e: &dyn std::fmt::Display| BrandKitError::Export(e.to_string());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, bytes) in files {
        zip.start_file(name, options).map_err(|e| export_error(&e))?;
        zip.write_all(&bytes).map_err(|e| export_error(&e))?;
    }

    let cursor = zip.finish().map_err(|e| export_error(&e))?;
    Ok(cursor.into_inner())
}

fn audio_extension(content_type: Option<&str>) -> &'static str {
    match content_type.unwrap_or_default() {
        ct if ct.contains("wav") => "wav",
        ct if ct.contains("ogg") => "ogg",
        _ => "mp3",
    }
}

fn video_extension(content_type: Option<&str>, url: &str) -> &'static str {
    let ct = content_type.unwrap_or_default();
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    if ct.contains("webm") {
        "webm"
    } else if ct.contains("quicktime") || path.ends_with(".mov") {
        "mov"
    } else if path.ends_with(".webm") {
        "webm"
    } else {
        "mp4"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::{ManualClock, MockAdapters, sample_kit};
    use bytes::Bytes;
    use std::io::Read;

    fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn archive_contains_metadata_and_resolvable_assets() {
        let mocks = MockAdapters::new();
        mocks.add_asset("https://cdn.example.com/intro.mp3", Bytes::from_static(b"INTRO"), "audio/mpeg");
        mocks.add_asset("https://cdn.example.com/vo", Bytes::from_static(b"VO"), "audio/wav");
        mocks.add_asset("https://cdn.example.com/ad.mov?sig=1", Bytes::from_static(b"MOV"), "application/octet-stream");
        let adapters: Arc<dyn GenerationAdapters> = Arc::new(mocks);
        let exporter = KitExporter::with_clock(
            adapters,
            Arc::new(ManualClock::at("2026-03-01T12:00:00Z")),
        );

        let mut kit = sample_kit();
        kit.audio.intro.url = "https://cdn.example.com/intro.mp3".to_string();
        kit.audio.outro.url = "https://cdn.example.com/missing.mp3".to_string();
        kit.ad.as_mut().unwrap().audio_url = Some("https://cdn.example.com/vo".to_string());
        kit.ad_video = Some(BrandVideo {
            url: "https://cdn.example.com/ad.mov?sig=1".to_string(),
            aspect_ratio: AspectRatio::Portrait,
        });

        let archive = exporter.export(&kit).await.unwrap();

        assert_eq!(archive.filename, "brand-kit-solara-coffee-1772366400000.zip");
        assert_eq!(
            archive.entries,
            vec![
                "brandkit.json",
                "logo.png",
                "logo-primary.png",
                "logo-secondary.png",
                "logo-submark.png",
                "images/image-1.png",
                "images/image-2.png",
                "social/instagram.jpg",
                "audio/intro.mp3",
                "audio/ad-voiceover.wav",
                "ad-video.mov",
            ]
        );

        let metadata: serde_json::Value =
            serde_json::from_slice(&read_entry(&archive.bytes, "brandkit.json")).unwrap();
        assert_eq!(metadata["name"], "Solara Coffee");
        assert_eq!(metadata["typography"]["headingDisplayName"], "Playfair Display");
        assert_eq!(metadata["typography"]["bodyDisplayName"], "Inter");
        assert_eq!(metadata["assets"]["imageryCount"], 2);
        assert_eq!(metadata["assets"]["audio"]["hasOutro"], true);
        assert_eq!(metadata["ad"]["hasVoiceoverAudio"], true);
        assert_eq!(metadata["adVideo"]["aspectRatio"], "9:16");
        assert_eq!(read_entry(&archive.bytes, "audio/intro.mp3"), b"INTRO");
    }

    #[tokio::test]
    async fn failed_fetches_are_skipped_not_fatal() {
        let adapters: Arc<dyn GenerationAdapters> = Arc::new(MockAdapters::failing(&["fetch_asset"]));
        let exporter = KitExporter::new(adapters);
        let mut kit = sample_kit();
        kit.imagery[0] = ImageRef::url("https://cdn.example.com/gone.png");
        kit.logo = ImageRef::inline("%%% not base64 %%%");

        let archive = exporter.export(&kit).await.unwrap();

        assert!(!archive.entries.contains(&"images/image-1.png".to_string()));
        assert!(!archive.entries.contains(&"logo.png".to_string()));
        assert!(archive.entries.contains(&"images/image-2.png".to_string()));
    }

    #[tokio::test]
    async fn typography_display_names_are_cleaned_in_metadata() {
        let adapters: Arc<dyn GenerationAdapters> = Arc::new(MockAdapters::new());
        let exporter = KitExporter::new(adapters);
        let mut kit = sample_kit();
        kit.typography.heading_font = "Heading font: **Montserrat** (bold, geometric)".to_string();

        let archive = exporter.export(&kit).await.unwrap();
        let metadata: serde_json::Value =
            serde_json::from_slice(&read_entry(&archive.bytes, "brandkit.json")).unwrap();

        assert_eq!(
            metadata["typography"]["headingFont"],
            "Heading font: **Montserrat** (bold, geometric)"
        );
        assert_eq!(metadata["typography"]["headingDisplayName"], "Montserrat");
    }

    #[test]
    fn extensions_follow_content_type_then_url() {
        assert_eq!(audio_extension(Some("audio/ogg")), "ogg");
        assert_eq!(audio_extension(None), "mp3");
        assert_eq!(video_extension(Some("video/webm"), "https://v/a.mp4"), "webm");
        assert_eq!(video_extension(None, "https://v/a.WEBM#t=1"), "webm");
        assert_eq!(video_extension(None, "https://v/a"), "mp4");
    }
}
