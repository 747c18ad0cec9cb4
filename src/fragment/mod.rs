//! Fragments: fetched panel markup and the image references inside it
//!
//! A [`Fragment`] keeps its markup split around every image `src` value, so
//! rewriting one reference never touches the bytes of another. That is what
//! makes image rewrites commute: the rendered markup depends only on which
//! references carry inline data, never on the order they received it.

mod locator;
mod parser;

pub use locator::resolve_locator;
pub use parser::FragmentParser;

use crate::error::{PanelError, PanelResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Locator used both to fetch a fragment and to index the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(String);

impl ContentKey {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentKey {
    fn from(locator: &str) -> Self {
        Self::new(locator)
    }
}

impl From<String> for ContentKey {
    fn from(locator: String) -> Self {
        Self(locator)
    }
}

/// One `<img src>` found in a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    index: usize,
    offset: usize,
    locator: String,
    source: String,
    token: String,
    inline: Option<String>,
}

impl ImageReference {
    pub(crate) fn new(
        index: usize,
        offset: usize,
        locator: String,
        source: String,
        token: String,
    ) -> Self {
        Self {
            index,
            offset,
            locator,
            source,
            token,
            inline: None,
        }
    }

    /// Position of this reference among the fragment's images (document order)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of the `src` value in the unresolved markup
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The `src` value as written, with character references decoded
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// The locator resolved against the fragment's key; this is what gets loaded
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Inline data, once the reference has been rewritten
    pub fn inline_data(&self) -> Option<&str> {
        self.inline.as_deref()
    }

    pub fn is_inlined(&self) -> bool {
        self.inline.is_some()
    }

    fn render_into(&self, out: &mut String) {
        match &self.inline {
            Some(data) => push_attr_escaped(out, data),
            None => out.push_str(&self.token),
        }
    }
}

/// Escape `value` for a double-quoted attribute the way the serializer does
fn push_attr_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Parsed panel markup plus its image references
///
/// Invariant: `segments.len() == images.len() + 1`; image `i` sits between
/// `segments[i]` and `segments[i + 1]`.
#[derive(Debug, Clone)]
pub struct Fragment {
    key: ContentKey,
    segments: Vec<String>,
    images: Vec<ImageReference>,
    blocks: usize,
    resolved_at: Option<DateTime<Utc>>,
}

impl Fragment {
    pub(crate) fn new(
        key: ContentKey,
        segments: Vec<String>,
        images: Vec<ImageReference>,
        blocks: usize,
    ) -> Self {
        debug_assert_eq!(segments.len(), images.len() + 1);
        Self {
            key,
            segments,
            images,
            blocks,
            resolved_at: None,
        }
    }

    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    /// Image references in document order
    pub fn images(&self) -> &[ImageReference] {
        &self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Number of top-level content blocks (0 when the markup has no block convention)
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Whether every image has been inlined and the fragment sealed
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Render the current markup
    pub fn markup(&self) -> String {
        let capacity = self.segments.iter().map(String::len).sum::<usize>()
            + self
                .images
                .iter()
                .map(|image| image.inline.as_ref().map_or(image.token.len(), String::len))
                .sum::<usize>();

        let mut out = String::with_capacity(capacity);
        for (segment, image) in self.segments.iter().zip(&self.images) {
            out.push_str(segment);
            image.render_into(&mut out);
        }
        if let Some(last) = self.segments.last() {
            out.push_str(last);
        }
        out
    }

    /// Short SHA-256 digest of the rendered markup
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.markup().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..6])
    }

    /// Replace image `index`'s locator with inline data. Each reference is
    /// rewritten exactly once.
    pub(crate) fn rewrite(&mut self, index: usize, data: String) -> PanelResult<()> {
        if self.resolved_at.is_some() {
            return Err(PanelError::Internal(format!(
                "fragment {} is sealed",
                self.key
            )));
        }

        let image = self.images.get_mut(index).ok_or_else(|| {
            PanelError::Internal(format!("image {} out of range in {}", index, self.key))
        })?;

        if image.inline.is_some() {
            return Err(PanelError::Internal(format!(
                "image {} in {} rewritten twice",
                index, self.key
            )));
        }

        image.inline = Some(data);
        Ok(())
    }

    /// Seal the fragment once every reference carries inline data
    pub(crate) fn seal(&mut self) -> PanelResult<()> {
        if let Some(pending) = self.images.iter().find(|image| !image.is_inlined()) {
            return Err(PanelError::Internal(format!(
                "cannot seal {}: image {} not inlined",
                self.key, pending.index
            )));
        }
        self.resolved_at = Some(Utc::now());
        Ok(())
    }
}
