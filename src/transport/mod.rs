//! Fragment and image transport
//!
//! The core never talks to the network directly; it goes through the
//! [`Transport`] trait so tests and embedders can supply their own.

mod data_url;
mod http;

pub use data_url::{decode_data_url, is_data_url};
pub use http::HttpTransport;

use crate::error::{PanelError, PanelResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Request method used to fetch a fragment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            _ => Err(PanelError::UnknownMethod(s.to_string())),
        }
    }
}

/// Source of raw fragment markup and raw image bytes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the markup stored at `locator`
    async fn fetch(&self, locator: &str, method: Method) -> PanelResult<String>;

    /// Fetch raw bytes (image payloads) stored at `locator`
    async fn fetch_bytes(&self, locator: &str) -> PanelResult<Vec<u8>>;
}
