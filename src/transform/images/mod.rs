// src/transform/images/mod.rs

//! Image compression through an external service.

pub mod cache;
pub mod tinify;

use thiserror::Error;

pub use cache::{ImageCache, content_hash, open_cache};
pub use tinify::TinifyService;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompressError {
    #[error("no API key: set the {0} environment variable")]
    MissingKey(String),

    #[error("monthly compression quota exhausted")]
    QuotaExhausted,

    #[error("compression service rejected {file} (HTTP {status}): {message}")]
    Rejected {
        file: String,
        status: u16,
        message: String,
    },

    #[error("compression request failed: {0}")]
    Transport(String),
}

/// A lossy image optimizer.
pub trait CompressionService: Send + Sync {
    /// Compress one image. `file` is only used for diagnostics.
    fn compress(&self, file: &str, data: &[u8]) -> Result<Vec<u8>, CompressError>;
}

/// Stands in when no key is configured: every call fails with
/// [`CompressError::MissingKey`] so the task reports it and stops.
#[derive(Debug, Clone)]
pub struct UnconfiguredService {
    env_var: String,
}

impl UnconfiguredService {
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }
}

impl CompressionService for UnconfiguredService {
    fn compress(&self, _file: &str, _data: &[u8]) -> Result<Vec<u8>, CompressError> {
        Err(CompressError::MissingKey(self.env_var.clone()))
    }
}
