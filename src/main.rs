// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use brandkit::config::AppConfig;
use brandkit::services::clock::{Clock, SystemClock};
use brandkit::services::rate_guard::{CounterStore, select_counter_store};
use brandkit::services::share_store::{InMemoryShareBackend, LogShareObserver, ShareBackend};
use brandkit::services::{
    BlobCache, ElevenLabsService, FalService, GeminiService, GenerationAdapters, HttpBlobStore,
    RateGuard, RedisService, ShareStore, VendorAdapters,
};
use brandkit::{AppState, configure};
use log::{info, warn};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting brand kit service...");
    let config = AppConfig::from_env();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let redis = match config.redis_url.as_deref() {
        Some(url) => match RedisService::new(url).await {
            Ok(redis) => Some(Arc::new(redis)),
            Err(e) => {
                warn!("Redis unavailable ({}), using in-process stores", e);
                None
            }
        },
        None => {
            info!("REDIS_URL not set, using in-process stores");
            None
        }
    };

    let counters = select_counter_store(
        redis.clone().map(|redis| redis as Arc<dyn CounterStore>),
        config.rate_limit_in_process,
        clock.clone(),
    );
    let rate_guard = RateGuard::new(
        counters,
        config.rate_limit_max_per_day,
        config.rate_limit_disabled,
    );

    let share_backend: Option<Arc<dyn ShareBackend>> = if config.sharing_disabled {
        info!("Sharing disabled by configuration");
        None
    } else {
        match &redis {
            Some(redis) => Some(redis.clone()),
            None => Some(Arc::new(InMemoryShareBackend::new(clock.clone()))),
        }
    };
    let share_store =
        ShareStore::new(share_backend, config.share_ttl).with_observer(Arc::new(LogShareObserver));

    let blobs = Arc::new(BlobCache::new(config.local_blob_ttl));
    let adapters: Arc<dyn GenerationAdapters> = Arc::new(VendorAdapters::new(
        config.gemini.clone().map(GeminiService::new),
        config.elevenlabs_api_key.clone().map(ElevenLabsService::new),
        config
            .fal_api_key
            .clone()
            .map(|key| FalService::new(key, config.video_timeout)),
        config.blob_store.clone().map(HttpBlobStore::new),
        blobs.clone(),
        config.music_length_ms,
    ));
    for (vendor, configured) in [
        ("Gemini", config.gemini.is_some()),
        ("ElevenLabs", config.elevenlabs_api_key.is_some()),
        ("FAL", config.fal_api_key.is_some()),
        ("Blob store", config.blob_store.is_some()),
    ] {
        if !configured {
            warn!("{} not configured; dependent features will be unavailable", vendor);
        }
    }

    let app_state = AppState::new(
        adapters,
        blobs,
        rate_guard,
        share_store,
        config.imagery_count,
    );
    let static_dir = config.static_dir.clone();

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        let app = App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(32 * 1024 * 1024))
            .wrap(middleware::Logger::default())
            .configure(configure);
        match &static_dir {
            Some(dir) => app.service(actix_files::Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("failed to bind {}", config.bind_addr))?
    .run()
    .await
    .context("server error")
}
