// src/handlers.rs
use crate::services::brand_ideas::random_brand_idea;
use crate::services::export::ExportArchive;
use crate::services::mutator::KitOperation;
use crate::services::persist::persist_local_audio;
use crate::services::rate_guard::{Admission, caller_key};
use crate::{AppState, errors::BrandKitError, models::*};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use log::{info, warn};
use serde::Deserialize;

pub const SESSION_HEADER: &str = "X-Session-Id";
pub const USER_HEADER: &str = "X-User-Id";

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn request_caller(req: &HttpRequest) -> String {
    let peer = req.peer_addr().map(|addr| addr.ip().to_string());
    caller_key(header_value(req, "X-Forwarded-For"), peer.as_deref())
}

async fn admit(req: &HttpRequest, data: &AppState) -> Result<(), BrandKitError> {
    match data.rate_guard.admit(&request_caller(req)).await? {
        Admission::Allowed => Ok(()),
        Admission::Denied => Err(BrandKitError::QuotaExceeded),
    }
}

pub async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "brandkit",
        "version": env!("CARGO_PKG_VERSION"),
        "sharing": data.share_store.is_enabled()
    }))
}

pub async fn guard_start(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, BrandKitError> {
    admit(&req, &data).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}

pub async fn create_kit(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<BrandInput>,
) -> Result<HttpResponse, BrandKitError> {
    // Rejected input must not spend the caller's quota
    body.validate()?;
    admit(&req, &data).await?;
    let kit = data
        .assembler
        .assemble(&body, header_value(&req, SESSION_HEADER))
        .await?;
    Ok(HttpResponse::Ok().json(&kit))
}

#[derive(Debug, Deserialize)]
pub struct MutateRequest {
    pub kit: BrandKit,
    #[serde(flatten)]
    pub operation: KitOperation,
}

pub async fn mutate_kit(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<MutateRequest>,
) -> HttpResponse {
    let MutateRequest { kit, operation } = body.into_inner();
    match data
        .mutator
        .apply(kit, &operation, header_value(&req, SESSION_HEADER))
        .await
    {
        Ok(kit) => HttpResponse::Ok().json(&kit),
        Err(failure) => HttpResponse::UnprocessableEntity().json(serde_json::json!({
            "error": failure.error.label(),
            "message": failure.error.to_string(),
            "kit": failure.kit,
        })),
    }
}

pub async fn persist_kit(
    data: web::Data<AppState>,
    body: web::Json<BrandKit>,
) -> Result<HttpResponse, BrandKitError> {
    let kit = persist_local_audio(data.adapters.as_ref(), &body).await?;
    Ok(HttpResponse::Ok().json(&kit))
}

pub async fn export_kit(
    data: web::Data<AppState>,
    body: web::Json<BrandKit>,
) -> Result<HttpResponse, BrandKitError> {
    let archive = data.exporter.export(&body).await?;
    Ok(zip_response(archive))
}

pub async fn reset_session(path: web::Path<String>, data: web::Data<AppState>) -> HttpResponse {
    let session_id = path.into_inner();
    let released = data.sessions.discard(&session_id);
    info!("Reset session {} ({} blobs released)", session_id, released);
    HttpResponse::Ok().json(serde_json::json!({ "released": released }))
}

pub async fn publish_share(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<BrandKit>,
) -> Result<HttpResponse, BrandKitError> {
    let id = data
        .share_store
        .publish(&body, header_value(&req, USER_HEADER))
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "id": id })))
}

pub async fn get_share(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, BrandKitError> {
    let snapshot = data.share_store.retrieve(&path).await?;
    Ok(HttpResponse::Ok().json(&snapshot))
}

fn zip_response(archive: ExportArchive) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", archive.filename),
        ))
        .body(archive.bytes)
}

pub async fn export_share(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, BrandKitError> {
    let kit = data.share_store.retrieve(&path).await?.into_kit();
    let archive = data.exporter.export(&kit).await?;
    Ok(zip_response(archive))
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub id: Option<String>,
}

pub async fn list_user_shares(
    data: web::Data<AppState>,
    query: web::Query<OwnerQuery>,
) -> Result<HttpResponse, BrandKitError> {
    let owner = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BrandKitError::Validation("Missing id".to_string()))?;
    let shares = data.share_store.list_by_owner(owner).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "shares": shares })))
}

pub async fn list_voices(data: web::Data<AppState>) -> HttpResponse {
    let voices = data.adapters.list_voices().await.unwrap_or_else(|e| {
        warn!("Voice listing failed: {}", e);
        Vec::new()
    });
    HttpResponse::Ok().json(serde_json::json!({ "voices": voices }))
}

pub async fn brand_idea() -> HttpResponse {
    let idea = random_brand_idea(&mut rand::thread_rng());
    HttpResponse::Ok().json(&idea)
}

pub async fn serve_blob(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, BrandKitError> {
    let blob = data.blobs.get(&path).ok_or(BrandKitError::NotFound)?;
    Ok(HttpResponse::Ok()
        .content_type(blob.content_type)
        .insert_header((header::CACHE_CONTROL, "private, max-age=3600"))
        .body(blob.bytes))
}
