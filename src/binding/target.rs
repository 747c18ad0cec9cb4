//! Regions a resolved fragment can be mounted into

use crate::error::{PanelError, PanelResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::fs;

/// A display region identified by a stable selector
#[async_trait]
pub trait MountTarget: Send + Sync {
    /// Selector or handle naming the region, for logs
    fn selector(&self) -> &str;

    /// Replace the region's contents with `markup`
    async fn set_content(&self, markup: &str) -> PanelResult<()>;

    /// Empty the region
    async fn clear_content(&self) -> PanelResult<()>;
}

/// In-process region holding the mounted markup
#[derive(Debug, Default)]
pub struct MemoryTarget {
    selector: String,
    content: Mutex<String>,
    mounts: AtomicUsize,
}

impl MemoryTarget {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..Self::default()
        }
    }

    /// Current contents of the region
    pub fn content(&self) -> String {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times content has been set
    pub fn mount_count(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MountTarget for MemoryTarget {
    fn selector(&self) -> &str {
        &self.selector
    }

    async fn set_content(&self, markup: &str) -> PanelResult<()> {
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = markup.to_string();
        self.mounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear_content(&self) -> PanelResult<()> {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

/// Region backed by a file; mounting rewrites the file
#[derive(Debug, Clone)]
pub struct FileTarget {
    path: PathBuf,
    selector: String,
}

impl FileTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let selector = path.display().to_string();
        Self { path, selector }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MountTarget for FileTarget {
    fn selector(&self) -> &str {
        &self.selector
    }

    async fn set_content(&self, markup: &str) -> PanelResult<()> {
        fs::write(&self.path, markup)
            .await
            .map_err(|e| PanelError::io(format!("mounting into {}", self.path.display()), e))
    }

    async fn clear_content(&self) -> PanelResult<()> {
        fs::write(&self.path, "")
            .await
            .map_err(|e| PanelError::io(format!("clearing {}", self.path.display()), e))
    }
}

/// Region that prints mounted markup to stdout
#[derive(Debug, Clone, Default)]
pub struct StdoutTarget;

#[async_trait]
impl MountTarget for StdoutTarget {
    fn selector(&self) -> &str {
        "stdout"
    }

    async fn set_content(&self, markup: &str) -> PanelResult<()> {
        println!("{}", markup);
        Ok(())
    }

    async fn clear_content(&self) -> PanelResult<()> {
        Ok(())
    }
}
