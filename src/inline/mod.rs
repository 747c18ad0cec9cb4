//! Converting image references into self-contained `data:` URLs

mod loader;

pub use loader::{ImageLoader, TransportImageLoader};

use crate::config::schema::ImagesConfig;
use crate::error::{ImageLoadError, PanelError};
use crate::transport::is_data_url;
use async_trait::async_trait;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Raster encoding used for inline data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineFormat {
    /// Lossless
    #[default]
    Png,
    /// Lossy; alpha is dropped
    Jpeg,
}

impl InlineFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            InlineFormat::Png => "image/png",
            InlineFormat::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for InlineFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InlineFormat::Png => f.write_str("png"),
            InlineFormat::Jpeg => f.write_str("jpeg"),
        }
    }
}

impl FromStr for InlineFormat {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(InlineFormat::Png),
            "jpeg" | "jpg" => Ok(InlineFormat::Jpeg),
            _ => Err(PanelError::UnknownFormat(s.to_string())),
        }
    }
}

/// Encode a decoded surface as a `data:<mime>;base64,...` URL.
///
/// `jpeg_quality` is clamped to 1-100 and ignored for PNG.
pub fn encode(
    surface: &DynamicImage,
    format: InlineFormat,
    jpeg_quality: u8,
) -> Result<String, image::ImageError> {
    let mut cursor = Cursor::new(Vec::new());

    match format {
        InlineFormat::Png => surface.write_to(&mut cursor, ImageFormat::Png)?,
        InlineFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(surface.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut cursor, jpeg_quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
        }
    }

    let payload = base64::engine::general_purpose::STANDARD.encode(cursor.into_inner());
    Ok(format!("data:{};base64,{}", format.mime_type(), payload))
}

/// Turns one image locator into inline data
#[async_trait]
pub trait Inliner: Send + Sync {
    async fn inline(&self, locator: &str) -> Result<String, ImageLoadError>;
}

/// Loads an image and re-encodes it as a `data:` URL
pub struct ImageInliner {
    loader: Arc<dyn ImageLoader>,
    format: InlineFormat,
    jpeg_quality: u8,
}

impl ImageInliner {
    /// Create an inliner producing PNG data
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self {
            loader,
            format: InlineFormat::Png,
            jpeg_quality: 85,
        }
    }

    pub fn from_config(loader: Arc<dyn ImageLoader>, config: &ImagesConfig) -> Self {
        Self::new(loader)
            .with_format(config.format)
            .with_jpeg_quality(config.jpeg_quality)
    }

    pub fn with_format(mut self, format: InlineFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn format(&self) -> InlineFormat {
        self.format
    }
}

#[async_trait]
impl Inliner for ImageInliner {
    async fn inline(&self, locator: &str) -> Result<String, ImageLoadError> {
        if is_data_url(locator) {
            debug!("Image already inline, keeping as is");
            return Ok(locator.to_string());
        }

        let surface = self.loader.load_image(locator).await?;
        let (width, height) = (surface.width(), surface.height());
        let (format, quality) = (self.format, self.jpeg_quality);

        // Encoding is CPU-bound like decoding; keep it off the async workers
        let data = tokio::task::spawn_blocking(move || encode(&surface, format, quality))
            .await
            .map_err(|e| ImageLoadError::new(locator, format!("encode task failed: {e}")))?
            .map_err(|e| ImageLoadError::new(locator, format!("encode failed: {e}")))?;

        debug!(
            "Inlined {} ({}x{}, {} bytes as {})",
            locator,
            width,
            height,
            data.len(),
            format
        );
        Ok(data)
    }
}
