// src/services/image_processor.rs
use crate::errors::BrandKitError;
use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;

const JPEG_QUALITY: u8 = 88;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn decode_base64(&self, data: &str) -> Result<Vec<u8>, BrandKitError> {
        // Tolerate data URLs
        let payload = data.split_once(',').map(|(_, rest)| rest).unwrap_or(data);
        general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| BrandKitError::ImageProcessing(format!("Invalid base64 image: {}", e)))
    }

    pub fn validate_image(&self, data: &[u8]) -> Result<(u32, u32), BrandKitError> {
        let img = image::load_from_memory(data)
            .map_err(|e| BrandKitError::ImageProcessing(format!("Invalid image format: {}", e)))?;
        Ok(img.dimensions())
    }

    /// Scales and center-crops to exactly `width`x`height`, encoded as JPEG.
    pub fn cover(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, BrandKitError> {
        let img = image::load_from_memory(data)
            .map_err(|e| BrandKitError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let resized = img.resize_to_fill(width, height, image::imageops::FilterType::Lanczos3);
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut output = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut output), ImageOutputFormat::Jpeg(JPEG_QUALITY))
            .map_err(|e| {
                BrandKitError::ImageProcessing(format!("Failed to encode resized image: {}", e))
            })?;

        Ok(output)
    }

    pub fn cover_base64(&self, data: &str, width: u32, height: u32) -> Result<String, BrandKitError> {
        let raw = self.decode_base64(data)?;
        let jpeg = self.cover(&raw, width, height)?;
        Ok(general_purpose::STANDARD.encode(jpeg))
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}
