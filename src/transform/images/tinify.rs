// src/transform/images/tinify.rs

//! TinyPNG/Tinify HTTP client.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::header::LOCATION;
use serde::Deserialize;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::{CompressError, CompressionService};
use crate::config::ImagesSection;

const COMPRESSION_COUNT: &str = "Compression-Count";

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Posts images to the shrink endpoint and downloads the result.
///
/// Calls block the current thread; tasks run on the blocking pool.
pub struct TinifyService {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    min_interval: Duration,
    monthly_quota: u32,
    last_request: Mutex<Option<Instant>>,
}

impl TinifyService {
    /// Read the key from the configured environment variable.
    pub fn from_env(section: &ImagesSection) -> Result<Self, CompressError> {
        let api_key = std::env::var(&section.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CompressError::MissingKey(section.api_key_env.clone()))?;
        Self::new(section, api_key)
    }

    pub fn new(section: &ImagesSection, api_key: String) -> Result<Self, CompressError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CompressError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: section.endpoint.clone(),
            api_key,
            min_interval: Duration::from_millis(section.min_interval_ms),
            monthly_quota: section.monthly_quota,
            last_request: Mutex::new(None),
        })
    }

    /// Sleep until `min_interval` has passed since the previous request.
    fn throttle(&self) {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "throttling compression request");
                std::thread::sleep(wait);
            }
        }
        *last = Some(Instant::now());
    }

    fn check_quota(&self, headers: &reqwest::header::HeaderMap) {
        let Some(count) = headers
            .get(COMPRESSION_COUNT)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok())
        else {
            return;
        };
        if count >= self.monthly_quota {
            warn!(count, quota = self.monthly_quota, "compression quota reached for this month");
        } else {
            info!(count, quota = self.monthly_quota, "compressions used this month");
        }
    }

    async fn shrink(&self, file: &str, data: Vec<u8>) -> Result<Vec<u8>, CompressError> {
        let transport = |e: reqwest::Error| CompressError::Transport(e.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .body(data)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        self.check_quota(response.headers());

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CompressError::QuotaExhausted);
        }
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            let message = match (body.error.is_empty(), body.message.is_empty()) {
                (false, false) => format!("{}: {}", body.error, body.message),
                (false, true) => body.error,
                _ => body.message,
            };
            return Err(CompressError::Rejected {
                file: file.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| CompressError::Transport("response has no Location header".to_string()))?;

        let download = self
            .client
            .get(&location)
            .basic_auth("api", Some(&self.api_key))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport)?;

        let bytes = download.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

impl CompressionService for TinifyService {
    fn compress(&self, file: &str, data: &[u8]) -> Result<Vec<u8>, CompressError> {
        let handle = Handle::try_current()
            .map_err(|_| CompressError::Transport("no async runtime available".to_string()))?;
        self.throttle();
        debug!(file = %file, bytes = data.len(), "submitting image for compression");
        handle.block_on(self.shrink(file, data.to_vec()))
    }
}
