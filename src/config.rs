// src/config.rs
//! Process configuration, read once at start-up and passed to every service.

use log::warn;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const FALLBACK_TEXT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: Option<String>,
    pub rate_limit_disabled: bool,
    pub rate_limit_max_per_day: i64,
    /// Counts runs in this process when Redis is absent. Off by default,
    /// which leaves the guard open without Redis.
    pub rate_limit_in_process: bool,
    pub share_ttl: Duration,
    pub sharing_disabled: bool,
    pub gemini: Option<GeminiConfig>,
    pub elevenlabs_api_key: Option<String>,
    pub fal_api_key: Option<String>,
    pub video_timeout: Duration,
    pub blob_store: Option<BlobStoreConfig>,
    pub imagery_count: usize,
    pub music_length_ms: u64,
    pub local_blob_ttl: Duration,
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub image_model: String,
    pub text_model: String,
}

impl GeminiConfig {
    /// Image models in the order they are tried.
    pub fn image_models(&self) -> Vec<String> {
        candidates(&self.image_model, DEFAULT_IMAGE_MODEL)
    }

    /// Text models in the order they are tried.
    pub fn text_models(&self) -> Vec<String> {
        candidates(&self.text_model, FALLBACK_TEXT_MODEL)
    }
}

fn candidates(configured: &str, fallback: &str) -> Vec<String> {
    let mut models = vec![configured.to_string()];
    if configured != fallback {
        models.push(fallback.to_string());
    }
    models
}

#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub endpoint: String,
    pub public_url: String,
    pub token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str| {
            get(key)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        let gemini = get("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            image_model: get("GEMINI_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            text_model: get("GEMINI_TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
        });

        let blob_store = get("BLOB_STORE_URL").map(|endpoint| {
            let endpoint = endpoint.trim_end_matches('/').to_string();
            BlobStoreConfig {
                public_url: get("BLOB_PUBLIC_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| endpoint.clone()),
                token: get("BLOB_STORE_TOKEN"),
                endpoint,
            }
        });

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            redis_url: get("REDIS_URL"),
            rate_limit_disabled: flag("RATE_LIMIT_DISABLED"),
            rate_limit_max_per_day: parse_or(&get, "RATE_LIMIT_MAX_PER_IP_PER_DAY", 2),
            rate_limit_in_process: flag("RATE_LIMIT_IN_PROCESS"),
            share_ttl: Duration::from_secs(parse_or(&get, "SHARE_TTL_SECS", 24 * 60 * 60)),
            sharing_disabled: flag("SHARING_DISABLED"),
            gemini,
            elevenlabs_api_key: get("ELEVENLABS_API_KEY"),
            fal_api_key: get("FAL_AI_KEY"),
            video_timeout: Duration::from_secs(parse_or(&get, "VIDEO_TIMEOUT_SECS", 600)),
            blob_store,
            imagery_count: parse_or(&get, "IMAGERY_COUNT", 2),
            music_length_ms: parse_or(&get, "MUSIC_LENGTH_MS", 15_000),
            local_blob_ttl: Duration::from_secs(parse_or(&get, "LOCAL_BLOB_TTL_SECS", 3600)),
            static_dir: get("STATIC_DIR"),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
