//! Inlining every image of a fragment
//!
//! Conversions for one fragment are issued together and joined: the
//! fragment resolves when the number of completed rewrites equals the
//! number of references. A fragment with no images resolves without
//! awaiting anything. The first failed conversion fails the whole fragment.

use crate::config::schema::ImagesConfig;
use crate::error::{ImageLoadError, PanelError, PanelResult};
use crate::fragment::{ContentKey, Fragment};
use crate::inline::Inliner;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Progress of one fragment's resolution, reported after each rewrite
#[derive(Debug, Clone, Copy)]
pub struct ResolveProgress<'a> {
    pub key: &'a ContentKey,
    pub completed: usize,
    pub total: usize,
}

type ProgressFn = Arc<dyn Fn(&ResolveProgress<'_>) + Send + Sync>;

/// Drives an [`Inliner`] across all image references of a fragment
#[derive(Clone)]
pub struct FragmentResolver {
    inliner: Arc<dyn Inliner>,
    max_concurrent: usize,
    progress: Option<ProgressFn>,
}

impl FragmentResolver {
    pub fn new(inliner: Arc<dyn Inliner>) -> Self {
        Self {
            inliner,
            max_concurrent: 0,
            progress: None,
        }
    }

    pub fn from_config(inliner: Arc<dyn Inliner>, config: &ImagesConfig) -> Self {
        Self::new(inliner).with_max_concurrent(config.max_concurrent)
    }

    /// Limit conversions in flight per fragment (0 = no limit)
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Observe each completed rewrite
    pub fn with_progress(
        mut self,
        progress: impl Fn(&ResolveProgress<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Inline every image reference in `fragment` and seal it.
    ///
    /// Each completion rewrites its own pre-identified position, so the
    /// result is identical whatever order conversions finish in.
    pub async fn resolve(&self, mut fragment: Fragment) -> PanelResult<Fragment> {
        let total = fragment.image_count();
        if total == 0 {
            fragment.seal()?;
            debug!("{} has no images, resolved immediately", fragment.key());
            return Ok(fragment);
        }

        let mut queued: VecDeque<(usize, String)> = fragment
            .images()
            .iter()
            .map(|image| (image.index(), image.source().to_string()))
            .collect();

        let limit = match self.max_concurrent {
            0 => total,
            max => max.min(total),
        };

        let mut in_flight = FuturesUnordered::new();
        for (index, source) in queued.drain(..limit) {
            in_flight.push(self.convert(index, source));
        }

        let mut completed = 0;
        while let Some((index, outcome)) = in_flight.next().await {
            let data = outcome.map_err(|first| PanelError::Resolution {
                key: fragment.key().to_string(),
                total,
                first,
            })?;

            fragment.rewrite(index, data)?;
            completed += 1;
            debug!("{}: image {} inlined ({}/{})", fragment.key(), index, completed, total);

            if let Some(progress) = &self.progress {
                progress(&ResolveProgress {
                    key: fragment.key(),
                    completed,
                    total,
                });
            }

            if let Some((index, source)) = queued.pop_front() {
                in_flight.push(self.convert(index, source));
            }
        }

        if completed != total {
            return Err(PanelError::Internal(format!(
                "{}: {} of {} images completed",
                fragment.key(),
                completed,
                total
            )));
        }

        fragment.seal()?;
        info!("Resolved {} ({} images)", fragment.key(), total);
        Ok(fragment)
    }

    async fn convert(
        &self,
        index: usize,
        source: String,
    ) -> (usize, Result<String, ImageLoadError>) {
        let outcome = self.inliner.inline(&source).await;
        (index, outcome)
    }
}
