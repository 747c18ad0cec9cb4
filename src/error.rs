//! Error types for panelcache
//!
//! All modules use `PanelResult<T>` as their return type. Errors are `Clone`
//! because one in-flight resolution failure is handed to every requester
//! attached to it.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for panelcache operations
pub type PanelResult<T> = Result<T, PanelError>;

/// A single image could not be loaded, decoded or re-encoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to load image {locator}: {reason}")]
pub struct ImageLoadError {
    /// Locator of the image that failed
    pub locator: String,

    /// What went wrong
    pub reason: String,
}

impl ImageLoadError {
    /// Create an image load error for `locator`
    pub fn new(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            reason: reason.into(),
        }
    }
}

/// All errors that can occur in panelcache
#[derive(Error, Debug, Clone)]
pub enum PanelError {
    // Pipeline errors
    #[error("Fetch failed for {locator}: {reason}")]
    Transport { locator: String, reason: String },

    #[error("Malformed markup at byte {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    #[error(transparent)]
    ImageLoad(#[from] ImageLoadError),

    #[error("Fragment {key} failed to resolve ({total} images): {first}")]
    Resolution {
        key: String,
        total: usize,
        #[source]
        first: ImageLoadError,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Unknown request method: {0}. Supported: GET, POST")]
    UnknownMethod(String),

    #[error("Unknown image format: {0}. Supported: png, jpeg")]
    UnknownFormat(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialize(String),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PanelError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    /// Create a transport error for `locator`
    pub fn transport(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error at byte `offset`
    pub fn parse(offset: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            reason: reason.into(),
        }
    }

    /// Check if a later request for the same key may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::ImageLoad(_) | Self::Resolution { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Transport { .. } => Some("Check the locator and network access, then retry"),
            Self::Parse { .. } => Some("The fragment markup must have terminated tags, attributes and comments"),
            Self::Resolution { .. } => Some("Every image in a fragment must load; fix or remove the failing image"),
            Self::UnknownMethod(_) => Some("Use --method GET or --method POST"),
            Self::UnknownFormat(_) => Some("Use --format png or --format jpeg"),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

impl From<toml::ser::Error> for PanelError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}
