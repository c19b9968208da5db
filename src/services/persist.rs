// src/services/persist.rs
use crate::errors::BrandKitError;
use crate::models::BrandKit;
use crate::sanitize;
use crate::services::adapters::GenerationAdapters;
use crate::services::blob_cache::BlobCache;
use log::{info, warn};
use uuid::Uuid;

fn audio_key(kit_name: &str) -> String {
    format!("brandkits/{}/{}.mp3", sanitize::slugify(kit_name), Uuid::new_v4())
}

/// Uploads every local audio reference and substitutes the persisted URL,
/// so the kit can be shared. References that fail to upload stay local;
/// without a blob store the kit is returned as is.
pub async fn persist_local_audio(
    adapters: &dyn GenerationAdapters,
    kit: &BrandKit,
) -> Result<BrandKit, BrandKitError> {
    let mut updated = kit.clone();
    let mut locations: Vec<&mut String> =
        vec![&mut updated.audio.intro.url, &mut updated.audio.outro.url];
    if let Some(url) = updated.ad.as_mut().and_then(|ad| ad.audio_url.as_mut()) {
        locations.push(url);
    }

    let mut uploaded = 0;
    for location in locations {
        let current = location.clone();
        if !BlobCache::is_local(&current) {
            continue;
        }
        let asset = match adapters.fetch_asset(&current).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!("Local audio {} is gone: {}", current, e);
                continue;
            }
        };
        let content_type = asset
            .content_type
            .unwrap_or_else(|| "audio/mpeg".to_string());

        match adapters
            .upload_blob(asset.bytes, &audio_key(&kit.name), &content_type)
            .await
        {
            Ok(url) => {
                *location = url;
                uploaded += 1;
            }
            Err(BrandKitError::NotConfigured(what)) => {
                info!("{} not configured, keeping local audio references", what);
                return Ok(kit.clone());
            }
            Err(e) => warn!("Failed to persist {}: {}", current, e),
        }
    }

    if uploaded > 0 {
        info!("Persisted {} audio assets for '{}'", uploaded, kit.name);
    }
    Ok(updated)
}
