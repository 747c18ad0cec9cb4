//! Binding a content key to a display region
//!
//! A [`DisplayBinding`] loads its key through the shared [`FragmentCache`],
//! mounts the resolved markup into its [`MountTarget`], and reports the
//! outcome through the configured callbacks and a broadcast channel.

mod target;

pub use target::{FileTarget, MemoryTarget, MountTarget, StdoutTarget};

use crate::cache::FragmentCache;
use crate::config::Config;
use crate::error::{PanelError, PanelResult};
use crate::fragment::{ContentKey, Fragment};
use crate::transport::Method;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 16;

type ReadyCallback = Arc<dyn Fn(&ContentKey) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&PanelError) + Send + Sync>;

/// Lifecycle notification published by a binding
#[derive(Debug, Clone)]
pub enum BindingEvent {
    /// Fragment mounted
    Ready { key: ContentKey },
    /// Load failed; nothing new was mounted
    Error { key: ContentKey, error: PanelError },
    /// Region cleared
    Unloaded { key: ContentKey },
}

/// Options recognized by a binding
#[derive(Clone)]
pub struct BindingOptions {
    method: Method,
    auto: bool,
    onready: Option<ReadyCallback>,
    onerror: Option<ErrorCallback>,
}

impl BindingOptions {
    pub fn new() -> Self {
        Self {
            method: Method::Get,
            auto: true,
            onready: None,
            onerror: None,
        }
    }

    /// Defaults from the `[transport]` and `[binding]` settings
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .method(config.transport.method)
            .auto(config.binding.auto)
    }

    /// Request method used to fetch the fragment
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Load as soon as the binding is created
    pub fn auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    pub fn on_ready(mut self, callback: impl Fn(&ContentKey) + Send + Sync + 'static) -> Self {
        self.onready = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&PanelError) + Send + Sync + 'static) -> Self {
        self.onerror = Some(Arc::new(callback));
        self
    }
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BindingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingOptions")
            .field("method", &self.method)
            .field("auto", &self.auto)
            .field("onready", &self.onready.is_some())
            .field("onerror", &self.onerror.is_some())
            .finish()
    }
}

/// A content key bound to a display region
pub struct DisplayBinding {
    cache: FragmentCache,
    key: ContentKey,
    target: Arc<dyn MountTarget>,
    options: BindingOptions,
    mounted: Option<Arc<Fragment>>,
    events: broadcast::Sender<BindingEvent>,
}

impl DisplayBinding {
    /// Create an unloaded binding
    pub fn new(
        cache: FragmentCache,
        key: ContentKey,
        target: Arc<dyn MountTarget>,
        options: BindingOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            cache,
            key,
            target,
            options,
            mounted: None,
            events,
        }
    }

    /// Create a binding and, when `auto` is set, load it right away.
    ///
    /// A failed automatic load is reported through `onerror` and the
    /// event channel; the binding is returned unloaded.
    pub async fn bind(
        cache: FragmentCache,
        key: ContentKey,
        target: Arc<dyn MountTarget>,
        options: BindingOptions,
    ) -> Self {
        let mut binding = Self::new(cache, key, target, options);
        if binding.options.auto {
            let _ = binding.load().await;
        }
        binding
    }

    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    pub fn is_loaded(&self) -> bool {
        self.mounted.is_some()
    }

    /// The fragment currently mounted, if any
    pub fn mounted(&self) -> Option<&Arc<Fragment>> {
        self.mounted.as_ref()
    }

    /// Receive lifecycle events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<BindingEvent> {
        self.events.subscribe()
    }

    /// Resolve the key through the cache and mount it.
    ///
    /// Loading an already loaded binding returns the mounted fragment
    /// without touching the cache.
    pub async fn load(&mut self) -> PanelResult<Arc<Fragment>> {
        if let Some(fragment) = &self.mounted {
            debug!("{} already mounted in {}", self.key, self.target.selector());
            let fragment = Arc::clone(fragment);
            self.notify_ready();
            return Ok(fragment);
        }

        match self.mount().await {
            Ok(fragment) => {
                info!("Mounted {} into {}", self.key, self.target.selector());
                self.notify_ready();
                Ok(fragment)
            }
            Err(e) => {
                warn!("Failed to load {}: {}", self.key, e);
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    /// Clear the region. The cache entry is left in place.
    pub async fn unload(&mut self) -> PanelResult<()> {
        self.target.clear_content().await?;
        if self.mounted.take().is_some() {
            info!("Unmounted {} from {}", self.key, self.target.selector());
        }
        let _ = self.events.send(BindingEvent::Unloaded {
            key: self.key.clone(),
        });
        Ok(())
    }

    /// Unload then load; normally served from the cache
    pub async fn reload(&mut self) -> PanelResult<Arc<Fragment>> {
        self.unload().await?;
        self.load().await
    }

    async fn mount(&mut self) -> PanelResult<Arc<Fragment>> {
        let fragment = self
            .cache
            .get_with_method(&self.key, self.options.method)
            .await?;
        self.target.set_content(&fragment.markup()).await?;
        self.mounted = Some(Arc::clone(&fragment));
        Ok(fragment)
    }

    fn notify_ready(&self) {
        if let Some(onready) = &self.options.onready {
            onready(&self.key);
        }
        let _ = self.events.send(BindingEvent::Ready {
            key: self.key.clone(),
        });
    }

    fn notify_error(&self, error: &PanelError) {
        if let Some(onerror) = &self.options.onerror {
            onerror(error);
        }
        let _ = self.events.send(BindingEvent::Error {
            key: self.key.clone(),
            error: error.clone(),
        });
    }
}
