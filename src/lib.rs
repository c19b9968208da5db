// src/lib.rs
use actix_web::web;
use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod sanitize;
pub mod services;

#[cfg(test)]
mod tests;

use crate::services::{
    BlobCache, GenerationAdapters, KitAssembler, KitExporter, KitMutator, RateGuard,
    SessionRegistry, ShareStore,
};

#[derive(Clone)]
pub struct AppState {
    pub rate_guard: Arc<RateGuard>,
    pub assembler: Arc<KitAssembler>,
    pub mutator: Arc<KitMutator>,
    pub exporter: Arc<KitExporter>,
    pub share_store: Arc<ShareStore>,
    pub sessions: Arc<SessionRegistry>,
    pub blobs: Arc<BlobCache>,
    pub adapters: Arc<dyn GenerationAdapters>,
}

impl AppState {
    /// Wires the kit pipeline around one set of adapters.
    pub fn new(
        adapters: Arc<dyn GenerationAdapters>,
        blobs: Arc<BlobCache>,
        rate_guard: RateGuard,
        share_store: ShareStore,
        imagery_count: usize,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(blobs.clone()));
        Self {
            rate_guard: Arc::new(rate_guard),
            assembler: Arc::new(KitAssembler::new(
                adapters.clone(),
                sessions.clone(),
                imagery_count,
            )),
            mutator: Arc::new(KitMutator::new(adapters.clone(), sessions.clone())),
            exporter: Arc::new(KitExporter::new(adapters.clone())),
            share_store: Arc::new(share_store),
            sessions,
            blobs,
            adapters,
        }
    }
}

/// Registers `/health` and the `/api` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use crate::handlers::*;

    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/api")
            .route("/guard/start", web::post().to(guard_start))
            .route("/kits", web::post().to(create_kit))
            .route("/kits/mutate", web::post().to(mutate_kit))
            .route("/kits/persist", web::post().to(persist_kit))
            .route("/kits/export", web::post().to(export_kit))
            .route("/sessions/{id}", web::delete().to(reset_session))
            .route("/share", web::post().to(publish_share))
            .route("/share/{id}", web::get().to(get_share))
            .route("/share/{id}/export", web::get().to(export_share))
            .route("/user/shares", web::get().to(list_user_shares))
            .route("/voices", web::get().to(list_voices))
            .route("/brand-idea", web::get().to(brand_idea))
            .route("/blobs/{id}", web::get().to(serve_blob)),
    );
}
