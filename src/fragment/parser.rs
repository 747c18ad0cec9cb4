//! Markup parsing: image references and content blocks
//!
//! Fragments are parsed with html5ever in fragment mode (a `<body>` context),
//! so implied end tags, void elements and character references follow the
//! HTML tree-building rules. Each `src` value is swapped for a numbered
//! sentinel before the tree is serialized, and the serialized markup is split
//! on those sentinels into the segments a [`Fragment`] is built from.

use super::{push_attr_escaped, resolve_locator, ContentKey, Fragment, ImageReference};
use crate::config::schema::ParserConfig;
use crate::error::{PanelError, PanelResult};
use html5ever::parse_fragment;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use tracing::debug;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Tokenizer error for input that ends inside a tag, attribute value or comment
const TRUNCATED: &str = "Unexpected EOF";

/// Marks a `src` value in the serialized tree. The tree builder drops or
/// replaces NUL in every insertion mode, so parsed content never holds one.
const SENTINEL: char = '\0';

/// Turns raw markup into a [`Fragment`]
#[derive(Debug, Clone)]
pub struct FragmentParser {
    block_class: String,
}

impl FragmentParser {
    /// Create a parser that treats `block_class` as the content-block marker
    pub fn new(block_class: impl Into<String>) -> Self {
        Self {
            block_class: block_class.into(),
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.block_class.clone())
    }

    pub fn block_class(&self) -> &str {
        &self.block_class
    }

    /// Parse `markup` fetched for `key`.
    ///
    /// Image references are recorded in document order. When any top-level
    /// element carries the block class, every top-level element is given it
    /// so mounted blocks can be handled uniformly. The stored markup is the
    /// serialized tree, so quoting and implied end tags come out normalized.
    pub fn parse(&self, key: &ContentKey, markup: &str) -> PanelResult<Fragment> {
        let dom = parse_fragment(
            RcDom::default(),
            ParseOpts::default(),
            QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from("body")),
            Vec::new(),
        )
        .one(markup);

        if let Some(error) = dom.errors.iter().find(|e| **e == TRUNCATED) {
            return Err(PanelError::parse(markup.len(), error.to_string()));
        }

        let root = dom
            .document
            .children
            .borrow()
            .first()
            .cloned()
            .ok_or_else(|| PanelError::Internal(format!("{key}: fragment has no root")))?;

        let locators = mark_images(&root);
        let blocks = self.normalize_blocks(&root);

        let mut out = Vec::with_capacity(markup.len() + locators.len() * 4);
        serialize(
            &mut out,
            &SerializableHandle::from(root),
            SerializeOpts {
                traversal_scope: TraversalScope::ChildrenOnly(None),
                ..Default::default()
            },
        )
        .map_err(|e| PanelError::Internal(format!("{key}: serializing fragment: {e}")))?;
        let rendered = String::from_utf8(out)
            .map_err(|e| PanelError::Internal(format!("{key}: serialized markup: {e}")))?;

        let mut segments = Vec::with_capacity(locators.len() + 1);
        let mut images = Vec::with_capacity(locators.len());
        let mut locators = locators.into_iter();
        let mut offset = 0;

        for (i, part) in rendered.split(SENTINEL).enumerate() {
            if i % 2 == 0 {
                offset += part.len();
                segments.push(part.to_string());
                continue;
            }

            let index = images.len();
            let locator = match (part.parse::<usize>(), locators.next()) {
                (Ok(n), Some(locator)) if n == index => locator,
                _ => {
                    return Err(PanelError::Internal(format!(
                        "{key}: image {index} out of place in serialized markup"
                    )))
                }
            };

            let source = resolve_locator(key, &locator);
            let mut token = String::with_capacity(locator.len());
            push_attr_escaped(&mut token, &locator);
            debug!("{}: image {} ({}) at byte {}", key, index, locator, offset);

            let start = offset;
            offset += token.len();
            images.push(ImageReference::new(index, start, locator, source, token));
        }

        if locators.next().is_some() || segments.len() != images.len() + 1 {
            return Err(PanelError::Internal(format!(
                "{key}: serialized markup lost image references"
            )));
        }

        Ok(Fragment::new(key.clone(), segments, images, blocks))
    }

    /// Add the block class to every top-level element when one already has
    /// it. Returns the block count, or 0 when the convention is not in use.
    fn normalize_blocks(&self, root: &Handle) -> usize {
        let top_level: Vec<Handle> = root
            .children
            .borrow()
            .iter()
            .filter(|node| matches!(node.data, NodeData::Element { .. }))
            .cloned()
            .collect();

        if !top_level.iter().any(|node| has_class(node, &self.block_class)) {
            return 0;
        }

        for node in &top_level {
            if !has_class(node, &self.block_class) {
                add_class(node, &self.block_class);
            }
        }
        top_level.len()
    }
}

impl Default for FragmentParser {
    fn default() -> Self {
        Self::from_config(&ParserConfig::default())
    }
}

/// Replace every non-empty `<img src>` with a numbered sentinel and return
/// the original values in document order
fn mark_images(root: &Handle) -> Vec<String> {
    let mut locators = Vec::new();

    for node in preorder(root) {
        let NodeData::Element { name, attrs, .. } = &node.data else {
            continue;
        };
        if name.ns.as_ref() != HTML_NAMESPACE || name.local.as_ref() != "img" {
            continue;
        }

        let mut attrs = attrs.borrow_mut();
        let src = attrs
            .iter_mut()
            .find(|attr| is_attr(attr, "src"))
            .filter(|attr| !attr.value.trim().is_empty());
        if let Some(src) = src {
            let marker = format!("{SENTINEL}{}{SENTINEL}", locators.len());
            locators.push(src.value.to_string());
            src.value = marker.into();
        }
    }

    locators
}

/// Descendants of `root` in document order. Template contents are not
/// children in the tree, so they are skipped.
fn preorder(root: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut stack: Vec<Handle> = root.children.borrow().iter().rev().cloned().collect();
    while let Some(node) = stack.pop() {
        stack.extend(node.children.borrow().iter().rev().cloned());
        out.push(node);
    }
    out
}

fn is_attr(attr: &Attribute, local: &str) -> bool {
    attr.name.ns.is_empty() && attr.name.local.as_ref() == local
}

fn has_class(node: &Handle, class: &str) -> bool {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs.borrow().iter().any(|attr| {
            is_attr(attr, "class") && attr.value.split_ascii_whitespace().any(|t| t == class)
        }),
        _ => false,
    }
}

fn add_class(node: &Handle, class: &str) {
    let NodeData::Element { attrs, .. } = &node.data else {
        return;
    };

    let mut attrs = attrs.borrow_mut();
    match attrs.iter_mut().find(|attr| is_attr(attr, "class")) {
        Some(attr) => {
            let existing = attr.value.trim();
            let value = if existing.is_empty() {
                class.to_string()
            } else {
                format!("{existing} {class}")
            };
            attr.value = value.into();
        }
        None => attrs.push(Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from("class")),
            value: class.into(),
        }),
    }
}
