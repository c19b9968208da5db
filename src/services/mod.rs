// src/services/mod.rs
pub mod adapters;
pub mod asset_policy;
pub mod assembler;
pub mod blob_cache;
pub mod blob_store;
pub mod brand_ideas;
pub mod clock;
pub mod elevenlabs_service;
pub mod export;
pub mod fal_service;
pub mod fallback;
pub mod gemini_service;
pub mod image_processor;
pub mod memory_store;
pub mod mutator;
pub mod persist;
pub mod rate_guard;
pub mod redis_service;
pub mod sessions;
pub mod share_store;

pub use adapters::{GenerationAdapters, VendorAdapters};
pub use assembler::KitAssembler;
pub use blob_cache::BlobCache;
pub use blob_store::HttpBlobStore;
pub use elevenlabs_service::ElevenLabsService;
pub use export::KitExporter;
pub use fal_service::FalService;
pub use gemini_service::GeminiService;
pub use image_processor::ImageProcessor;
pub use mutator::{KitMutator, KitOperation};
pub use rate_guard::RateGuard;
pub use redis_service::RedisService;
pub use sessions::SessionRegistry;
pub use share_store::ShareStore;
