//! ureq-backed transport with scheme dispatch
//!
//! `http(s)://` goes over the network, `file://` and bare paths are read
//! from disk, and `data:` URLs are decoded in place.

use super::data_url::{decode_data_url, is_data_url};
use super::{Method, Transport};
use crate::config::Config;
use crate::error::{PanelError, PanelResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Where a locator points
#[derive(Debug, PartialEq, Eq)]
enum Source {
    Data,
    Http,
    File(PathBuf),
}

impl Source {
    fn of(locator: &str) -> PanelResult<Self> {
        if is_data_url(locator) {
            return Ok(Source::Data);
        }

        match Url::parse(locator) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Source::Http),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Source::File)
                .map_err(|_| PanelError::transport(locator, "not a valid file URL")),
            Ok(url) if url.scheme().len() > 1 => Err(PanelError::transport(
                locator,
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            // Relative references and single-letter "schemes" (drive letters) are paths
            _ => Ok(Source::File(PathBuf::from(locator))),
        }
    }
}

/// Default transport used by the CLI and by `FragmentCache::from_config`
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    user_agent: String,
    max_body_bytes: u64,
    max_image_bytes: u64,
}

impl HttpTransport {
    /// Create a transport with a request timeout
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let agent: ureq::Agent = config.into();

        Self {
            agent,
            user_agent: user_agent.into(),
            max_body_bytes: 10 * 1024 * 1024,
            max_image_bytes: 25 * 1024 * 1024,
        }
    }

    /// Create a transport from the `[transport]` and `[images]` settings
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_secs(config.transport.timeout_secs),
            config.transport.user_agent.clone(),
        )
        .with_max_body_bytes(config.transport.max_body_bytes)
        .with_max_image_bytes(config.images.max_image_bytes)
    }

    /// Set the largest fragment body accepted
    pub fn with_max_body_bytes(mut self, max: u64) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Set the largest image payload accepted
    pub fn with_max_image_bytes(mut self, max: u64) -> Self {
        self.max_image_bytes = max;
        self
    }

    async fn read(&self, locator: &str, method: Method, limit: u64) -> PanelResult<Vec<u8>> {
        match Source::of(locator)? {
            Source::Data => {
                decode_data_url(locator).map_err(|reason| PanelError::transport(locator, reason))
            }
            Source::File(path) => {
                debug!("Reading {} from disk", path.display());
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| PanelError::transport(locator, e.to_string()))?;
                if bytes.len() as u64 > limit {
                    return Err(PanelError::transport(
                        locator,
                        format!("body exceeds {limit} bytes"),
                    ));
                }
                Ok(bytes)
            }
            Source::Http => self.read_http(locator, method, limit).await,
        }
    }

    /// ureq is blocking, so the request runs on the blocking pool
    async fn read_http(&self, locator: &str, method: Method, limit: u64) -> PanelResult<Vec<u8>> {
        debug!("{} {}", method, locator);

        let agent = self.agent.clone();
        let url = locator.to_string();
        let user_agent = self.user_agent.clone();

        let outcome = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, String> {
            let result = match method {
                Method::Get => agent.get(&url).header("User-Agent", &user_agent).call(),
                Method::Post => agent
                    .post(&url)
                    .header("User-Agent", &user_agent)
                    .send_empty(),
            };

            let mut response = result.map_err(describe_ureq_error)?;
            response
                .body_mut()
                .with_config()
                .limit(limit)
                .read_to_vec()
                .map_err(describe_ureq_error)
        })
        .await
        .map_err(|e| PanelError::Internal(format!("transport task failed: {e}")))?;

        outcome.map_err(|reason| PanelError::transport(locator, reason))
    }
}

fn describe_ureq_error(err: ureq::Error) -> String {
    match err {
        ureq::Error::StatusCode(code) => format!("HTTP {code}"),
        other => other.to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, locator: &str, method: Method) -> PanelResult<String> {
        let bytes = self.read(locator, method, self.max_body_bytes).await?;
        String::from_utf8(bytes)
            .map_err(|_| PanelError::transport(locator, "body is not valid UTF-8"))
    }

    async fn fetch_bytes(&self, locator: &str) -> PanelResult<Vec<u8>> {
        self.read(locator, Method::Get, self.max_image_bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn transport() -> HttpTransport {
        HttpTransport::new(Duration::from_secs(5), "panelcache-test")
    }

    #[test]
    fn classifies_sources() {
        assert_eq!(Source::of("https://example.com/a.html").unwrap(), Source::Http);
        assert_eq!(Source::of("data:,x").unwrap(), Source::Data);
        assert_eq!(
            Source::of("panels/a.html").unwrap(),
            Source::File(PathBuf::from("panels/a.html"))
        );
        assert!(Source::of("ftp://example.com/a.html").is_err());
    }

    #[tokio::test]
    async fn fetches_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("panel.html");
        tokio::fs::write(&path, "<p>hello</p>").await.unwrap();

        let markup = transport()
            .fetch(path.to_str().unwrap(), Method::Get)
            .await
            .unwrap();
        assert_eq!(markup, "<p>hello</p>");
    }

    #[tokio::test]
    async fn fetches_file_urls() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("panel.html");
        tokio::fs::write(&path, "<p>file url</p>").await.unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let markup = transport().fetch(url.as_str(), Method::Get).await.unwrap();
        assert_eq!(markup, "<p>file url</p>");
    }

    #[tokio::test]
    async fn missing_file_is_transport_error() {
        let err = transport()
            .fetch("/definitely/not/here.html", Method::Get)
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Transport { .. }));
    }

    #[tokio::test]
    async fn enforces_body_limit() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.html");
        tokio::fs::write(&path, "x".repeat(64)).await.unwrap();

        let err = transport()
            .with_max_body_bytes(16)
            .fetch(path.to_str().unwrap(), Method::Get)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds 16 bytes"));
    }

    #[tokio::test]
    async fn decodes_data_urls() {
        let bytes = transport().fetch_bytes("data:,abc").await.unwrap();
        assert_eq!(bytes, b"abc");
    }
}
