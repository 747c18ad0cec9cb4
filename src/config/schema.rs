//! Configuration schema for panelcache
//!
//! Configuration is stored at `~/.config/panelcache/config.toml`

use crate::inline::InlineFormat;
use crate::transport::Method;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Fragment fetch settings
    pub transport: TransportConfig,

    /// Image inlining settings
    pub images: ImagesConfig,

    /// Markup parsing settings
    pub parser: ParserConfig,

    /// Display binding defaults
    pub binding: BindingConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Request method used to fetch fragments
    pub method: Method,

    /// Global timeout per request in seconds
    pub timeout_secs: u64,

    /// User-Agent header sent with HTTP requests
    pub user_agent: String,

    /// Largest fragment body accepted, in bytes
    pub max_body_bytes: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            method: Method::Get,
            timeout_secs: 30,
            user_agent: concat!("panelcache/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Image inlining configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Inline encoding: "png" (lossless) or "jpeg"
    pub format: InlineFormat,

    /// JPEG quality, 1-100
    pub jpeg_quality: u8,

    /// Conversions in flight per fragment (0 = all at once)
    pub max_concurrent: usize,

    /// Largest source image accepted, in bytes
    pub max_image_bytes: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            format: InlineFormat::Png,
            jpeg_quality: 85,
            max_concurrent: 0,
            max_image_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Markup parsing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Class marking top-level content blocks
    pub block_class: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            block_class: "content".to_string(),
        }
    }
}

/// Display binding defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Load as soon as a binding is created
    pub auto: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self { auto: true }
    }
}
