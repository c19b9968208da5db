// src/services/fal_service.rs
use crate::errors::BrandKitError;
use crate::models::AspectRatio;
use log::{debug, info};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::{Instant, sleep};

const QUEUE_BASE: &str = "https://queue.fal.run";
const VIDEO_MODEL: &str = "fal-ai/veo3/fast";
const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, PartialEq)]
enum QueueStatus {
    Pending,
    Completed,
    Failed(String),
}

pub struct FalService {
    api_key: String,
    timeout: Duration,
    client: Client,
}

impl FalService {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            api_key,
            timeout,
            client: Client::new(),
        }
    }

    async fn call(&self, request: reqwest::RequestBuilder) -> Result<Value, BrandKitError> {
        let response = request
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await
            .map_err(|e| BrandKitError::Provider(format!("FAL request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BrandKitError::Provider(format!("FAL error: {}", error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| BrandKitError::Provider(format!("Failed to parse FAL response: {}", e)))
    }

    /// Submits a video job and waits for its result URL.
    pub async fn generate_video(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, BrandKitError> {
        if prompt.trim().is_empty() {
            return Err(BrandKitError::Validation("Missing prompt".to_string()));
        }

        let submitted = self
            .call(
                self.client
                    .post(format!("{}/{}", QUEUE_BASE, VIDEO_MODEL))
                    .json(&json!({ "prompt": prompt, "aspect_ratio": aspect_ratio.as_str() })),
            )
            .await?;

        let request_id = submitted["request_id"]
            .as_str()
            .ok_or_else(|| BrandKitError::Provider("FAL returned no request id".to_string()))?;
        let requests_base = format!("{}/{}/requests/{}", QUEUE_BASE, VIDEO_MODEL, request_id);
        let status_url = submitted["status_url"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/status", requests_base));
        let response_url = submitted["response_url"]
            .as_str()
            .map(str::to_string)
            .unwrap_or(requests_base);

        info!("Submitted FAL video request {}", request_id);
        let deadline = Instant::now() + self.timeout;

        loop {
            let status = self.call(self.client.get(&status_url)).await?;
            match parse_status(&status) {
                QueueStatus::Completed => break,
                QueueStatus::Failed(reason) => {
                    return Err(BrandKitError::Provider(format!(
                        "Video generation failed: {}",
                        reason
                    )));
                }
                QueueStatus::Pending => {
                    if Instant::now() + POLL_INTERVAL > deadline {
                        return Err(BrandKitError::Provider(format!(
                            "Video generation timed out after {}s",
                            self.timeout.as_secs()
                        )));
                    }
                    debug!("FAL request {} still pending", request_id);
                    sleep(POLL_INTERVAL).await;
                }
            }
        }

        let result = self.call(self.client.get(&response_url)).await?;
        extract_video_url(&result)
            .ok_or_else(|| BrandKitError::Provider("FAL returned no video url".to_string()))
    }
}

fn parse_status(body: &Value) -> QueueStatus {
    match body["status"].as_str().unwrap_or_default() {
        "COMPLETED" => match body["error"].as_str() {
            Some(error) if !error.is_empty() => QueueStatus::Failed(error.to_string()),
            _ => QueueStatus::Completed,
        },
        "FAILED" | "ERROR" | "CANCELLED" => QueueStatus::Failed(
            body["error"].as_str().unwrap_or("unknown error").to_string(),
        ),
        _ => QueueStatus::Pending,
    }
}

fn extract_video_url(body: &Value) -> Option<String> {
    body["video"]["url"]
        .as_str()
        .or_else(|| body["data"]["video"]["url"].as_str())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_status_parsing() {
        assert_eq!(parse_status(&json!({ "status": "IN_QUEUE" })), QueueStatus::Pending);
        assert_eq!(parse_status(&json!({ "status": "IN_PROGRESS" })), QueueStatus::Pending);
        assert_eq!(parse_status(&json!({ "status": "COMPLETED" })), QueueStatus::Completed);
        assert_eq!(
            parse_status(&json!({ "status": "COMPLETED", "error": "nsfw" })),
            QueueStatus::Failed("nsfw".to_string())
        );
    }

    #[test]
    fn video_url_from_either_result_shape() {
        assert_eq!(
            extract_video_url(&json!({ "video": { "url": "https://v/1.mp4" } })).as_deref(),
            Some("https://v/1.mp4")
        );
        assert_eq!(
            extract_video_url(&json!({ "data": { "video": { "url": "https://v/2.mp4" } } }))
                .as_deref(),
            Some("https://v/2.mp4")
        );
        assert_eq!(extract_video_url(&json!({ "video": {} })), None);
    }
}
