//! Resolving image locators against the fragment they appear in

use super::ContentKey;
use crate::transport::is_data_url;
use std::path::Path;
use url::Url;

/// Resolve an image `src` relative to the fragment's key.
///
/// Absolute URLs and `data:` URLs are returned unchanged. URL keys use URL
/// joining; anything else is treated as a filesystem path and joined onto
/// the key's parent directory.
pub fn resolve_locator(base: &ContentKey, src: &str) -> String {
    if is_data_url(src) {
        return src.to_string();
    }

    if let Ok(url) = Url::parse(src) {
        if url.scheme().len() > 1 {
            return src.to_string();
        }
    }

    if let Ok(base_url) = Url::parse(base.as_str()) {
        if base_url.scheme().len() > 1 {
            return base_url
                .join(src)
                .map(String::from)
                .unwrap_or_else(|_| src.to_string());
        }
    }

    let path = Path::new(src);
    if path.is_absolute() {
        return src.to_string();
    }

    match Path::new(base.as_str()).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(path).to_string_lossy().into_owned(),
        _ => src.to_string(),
    }
}
