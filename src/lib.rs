//! panelcache - cached HTML fragments with inlined images
//!
//! Fetches HTML fragments, rewrites every `<img>` source into a `data:`
//! URL, and keeps the resolved fragments in a cache that runs at most one
//! resolution per key at a time.

pub mod binding;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fragment;
pub mod inline;
pub mod resolver;
pub mod transport;
pub mod ui;

#[cfg(test)]
mod testing;

pub use binding::{BindingEvent, BindingOptions, DisplayBinding, MountTarget};
pub use cache::{EntryState, FragmentCache};
pub use error::{ImageLoadError, PanelError, PanelResult};
pub use fragment::{ContentKey, Fragment, FragmentParser, ImageReference};
pub use resolver::FragmentResolver;
