// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrandKitError {
    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("{0} not configured")]
    NotConfigured(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Daily run limit reached")]
    QuotaExceeded,

    #[error("Guard failed: {0}")]
    Guard(String),

    #[error("Generation failed. Details: {0}")]
    Generation(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Mutation failed: {0}")]
    Mutation(String),

    #[error("Share failed: {0}")]
    Share(String),

    #[error("Not found")]
    NotFound,

    #[error("Export error: {0}")]
    Export(String),
}

impl BrandKitError {
    /// Short machine-readable label used in JSON error bodies.
    pub fn label(&self) -> &'static str {
        match self {
            BrandKitError::Redis(_) => "Database error",
            BrandKitError::Provider(_) => "AI service error",
            BrandKitError::NotConfigured(_) => "Not configured",
            BrandKitError::ImageProcessing(_) => "Image processing error",
            BrandKitError::Serialization(_) => "Data processing error",
            BrandKitError::Validation(_) => "Validation error",
            BrandKitError::QuotaExceeded => "Daily run limit reached",
            BrandKitError::Guard(_) => "Guard failed",
            BrandKitError::Generation(_) => "Generation failed",
            BrandKitError::Unavailable(_) => "Unavailable",
            BrandKitError::Mutation(_) => "Edit failed",
            BrandKitError::Share(_) => "Share failed",
            BrandKitError::NotFound => "Not found",
            BrandKitError::Export(_) => "Export failed",
        }
    }
}

impl From<serde_json::Error> for BrandKitError {
    fn from(e: serde_json::Error) -> Self {
        BrandKitError::Serialization(e.to_string())
    }
}

impl From<redis::RedisError> for BrandKitError {
    fn from(e: redis::RedisError) -> Self {
        BrandKitError::Redis(e.to_string())
    }
}

impl ResponseError for BrandKitError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::json!({
            "error": self.label(),
            "message": self.to_string()
        });
        match self {
            BrandKitError::QuotaExceeded => HttpResponse::TooManyRequests().json(body),
            BrandKitError::NotFound => HttpResponse::NotFound().json(body),
            BrandKitError::Validation(_) | BrandKitError::ImageProcessing(_) => {
                HttpResponse::BadRequest().json(body)
            }
            BrandKitError::Provider(_) | BrandKitError::NotConfigured(_) => {
                HttpResponse::ServiceUnavailable().json(body)
            }
            BrandKitError::Unavailable(_) | BrandKitError::Mutation(_) => {
                HttpResponse::UnprocessableEntity().json(body)
            }
            BrandKitError::Guard(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Guard failed"
            })),
            BrandKitError::Share(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Share failed",
                "message": self.to_string()
            })),
            BrandKitError::Redis(_)
            | BrandKitError::Serialization(_)
            | BrandKitError::Generation(_)
            | BrandKitError::Export(_) => HttpResponse::InternalServerError().json(body),
        }
    }
}
