//! In-memory fragment cache with single-flight resolution
//!
//! # Entry States
//!
//! | State | Meaning |
//! |-------|---------|
//! | Missing | No entry; the next `get` fetches and resolves |
//! | Pending | A resolution is in flight; every `get` attaches to it |
//! | Resolved | Finished fragment; `get` returns it without any work |
//!
//! A failed resolution leaves no entry behind, so the next `get` retries
//! from scratch. `invalidate` drops an entry in either state; results of
//! work it superseded are still delivered to requesters already attached
//! but are never written back.

use crate::config::Config;
use crate::error::PanelResult;
use crate::fragment::{ContentKey, Fragment, FragmentParser};
use crate::inline::{ImageInliner, TransportImageLoader};
use crate::resolver::FragmentResolver;
use crate::transport::{HttpTransport, Method, Transport};
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

type Resolution = Shared<BoxFuture<'static, PanelResult<Arc<Fragment>>>>;

enum CacheEntry {
    Pending {
        generation: u64,
        resolution: Resolution,
    },
    Resolved(Arc<Fragment>),
}

/// Observable state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Missing,
    Pending,
    Resolved,
}

/// Fetch, parse and resolve steps for one key
#[derive(Clone)]
struct Pipeline {
    transport: Arc<dyn Transport>,
    parser: FragmentParser,
    resolver: FragmentResolver,
    fetches: Arc<AtomicU64>,
}

impl Pipeline {
    async fn run(&self, key: &ContentKey, method: Method) -> PanelResult<Fragment> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let markup = self.transport.fetch(key.as_str(), method).await?;
        let fragment = self.parser.parse(key, &markup)?;
        debug!(
            "Parsed {} ({} bytes, {} images, {} blocks)",
            key,
            markup.len(),
            fragment.image_count(),
            fragment.blocks()
        );
        self.resolver.resolve(fragment).await
    }
}

struct CacheInner {
    entries: Mutex<HashMap<ContentKey, CacheEntry>>,
    next_generation: AtomicU64,
    pipeline: Pipeline,
}

impl CacheInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<ContentKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the outcome of resolution `generation`, unless it was superseded
    fn settle(&self, key: &ContentKey, generation: u64, outcome: &PanelResult<Arc<Fragment>>) {
        let mut entries = self.entries();

        let current = matches!(
            entries.get(key),
            Some(CacheEntry::Pending { generation: g, .. }) if *g == generation
        );
        if !current {
            debug!("Discarding superseded resolution of {}", key);
            return;
        }

        match outcome {
            Ok(fragment) => {
                info!("Cached {} ({} images)", key, fragment.image_count());
                entries.insert(key.clone(), CacheEntry::Resolved(Arc::clone(fragment)));
            }
            Err(e) => {
                warn!("Resolution of {} failed: {}", key, e);
                entries.remove(key);
            }
        }
    }
}

/// Key-indexed store of resolved fragments
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Clone)]
pub struct FragmentCache {
    inner: Arc<CacheInner>,
    method: Method,
}

impl FragmentCache {
    /// Create a cache that fetches with GET
    pub fn new(
        transport: Arc<dyn Transport>,
        parser: FragmentParser,
        resolver: FragmentResolver,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                pipeline: Pipeline {
                    transport,
                    parser,
                    resolver,
                    fetches: Arc::new(AtomicU64::new(0)),
                },
            }),
            method: Method::Get,
        }
    }

    /// Wire the default pipeline over `transport` from configuration
    pub fn with_transport(transport: Arc<dyn Transport>, config: &Config) -> Self {
        let loader = Arc::new(TransportImageLoader::new(Arc::clone(&transport)));
        let inliner = Arc::new(ImageInliner::from_config(loader, &config.images));
        let resolver = FragmentResolver::from_config(inliner, &config.images);
        let parser = FragmentParser::from_config(&config.parser);

        Self::new(transport, parser, resolver).with_method(config.transport.method)
    }

    /// Wire the default pipeline over an [`HttpTransport`]
    pub fn from_config(config: &Config) -> Self {
        Self::with_transport(Arc::new(HttpTransport::from_config(config)), config)
    }

    /// Set the method used by [`get`](Self::get)
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Get the resolved fragment for `key`, fetching and resolving on a miss
    pub async fn get(&self, key: &ContentKey) -> PanelResult<Arc<Fragment>> {
        self.get_with_method(key, self.method).await
    }

    /// Like [`get`](Self::get) with an explicit request method. The method
    /// is not part of the cache key.
    pub async fn get_with_method(
        &self,
        key: &ContentKey,
        method: Method,
    ) -> PanelResult<Arc<Fragment>> {
        let resolution = {
            let mut entries = self.inner.entries();
            match entries.get(key) {
                Some(CacheEntry::Resolved(fragment)) => {
                    debug!("Cache hit for {}", key);
                    return Ok(Arc::clone(fragment));
                }
                Some(CacheEntry::Pending { resolution, .. }) => {
                    debug!("Attaching to in-flight resolution of {}", key);
                    resolution.clone()
                }
                None => {
                    debug!("Cache miss for {}, fetching", key);
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
                    let resolution = self.start(key.clone(), method, generation);
                    entries.insert(
                        key.clone(),
                        CacheEntry::Pending {
                            generation,
                            resolution: resolution.clone(),
                        },
                    );
                    resolution
                }
            }
        };

        resolution.await
    }

    fn start(&self, key: ContentKey, method: Method, generation: u64) -> Resolution {
        let pipeline = self.inner.pipeline.clone();
        let cache: Weak<CacheInner> = Arc::downgrade(&self.inner);

        async move {
            let outcome = pipeline.run(&key, method).await.map(Arc::new);
            if let Some(cache) = cache.upgrade() {
                cache.settle(&key, generation, &outcome);
            }
            outcome
        }
        .boxed()
        .shared()
    }

    /// Resolve several keys concurrently, returning each outcome in input order
    pub async fn prefetch<I>(&self, keys: I) -> Vec<(ContentKey, PanelResult<Arc<Fragment>>)>
    where
        I: IntoIterator<Item = ContentKey>,
    {
        let keys: Vec<ContentKey> = keys.into_iter().collect();
        debug!("Prefetching {} fragments", keys.len());

        let outcomes = join_all(keys.iter().map(|key| self.get(key))).await;
        keys.into_iter().zip(outcomes).collect()
    }

    /// Drop any entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &ContentKey) -> bool {
        let removed = self.inner.entries().remove(key).is_some();
        if removed {
            debug!("Invalidated {}", key);
        }
        removed
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.entries().clear();
    }

    pub fn state(&self, key: &ContentKey) -> EntryState {
        match self.inner.entries().get(key) {
            None => EntryState::Missing,
            Some(CacheEntry::Pending { .. }) => EntryState::Pending,
            Some(CacheEntry::Resolved(_)) => EntryState::Resolved,
        }
    }

    /// Number of entries, pending or resolved
    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys with an entry, sorted
    pub fn keys(&self) -> Vec<ContentKey> {
        let mut keys: Vec<ContentKey> = self.inner.entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of transport fetches issued so far
    pub fn fetch_count(&self) -> u64 {
        self.inner.pipeline.fetches.load(Ordering::SeqCst)
    }
}
