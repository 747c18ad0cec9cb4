//! Loading source images into pixel surfaces

use crate::error::ImageLoadError;
use crate::transport::Transport;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;
use tracing::debug;

/// Loads and decodes the image at a locator
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load_image(&self, locator: &str) -> Result<DynamicImage, ImageLoadError>;
}

/// Fetches image bytes through a [`Transport`] and decodes them with `image`
pub struct TransportImageLoader {
    transport: Arc<dyn Transport>,
}

impl TransportImageLoader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ImageLoader for TransportImageLoader {
    async fn load_image(&self, locator: &str) -> Result<DynamicImage, ImageLoadError> {
        let bytes = self
            .transport
            .fetch_bytes(locator)
            .await
            .map_err(|e| ImageLoadError::new(locator, e.to_string()))?;

        debug!("Decoding {} ({} bytes)", locator, bytes.len());

        // Decoding is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| ImageLoadError::new(locator, format!("decode task failed: {e}")))?
            .map_err(|e| ImageLoadError::new(locator, e.to_string()))
    }
}
