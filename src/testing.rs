//! Scripted transport and inliner shared by unit tests

use crate::error::{ImageLoadError, PanelError, PanelResult};
use crate::inline::Inliner;
use crate::transport::{Method, Transport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Serves fixed pages, counting fetches. With a gate, every fetch waits
/// until the test releases it.
#[derive(Default)]
pub struct ScriptedTransport {
    pages: Mutex<HashMap<String, String>>,
    fetches: AtomicUsize,
    methods: Mutex<Vec<Method>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn with_page(self, locator: &str, markup: &str) -> Self {
        self.set_page(locator, markup);
        self
    }

    pub fn set_page(&self, locator: &str, markup: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(locator.to_string(), markup.to_string());
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn methods(&self) -> Vec<Method> {
        self.methods.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, locator: &str, method: Method) -> PanelResult<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.methods.lock().unwrap().push(method);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let page = self.pages.lock().unwrap().get(locator).cloned();
        page.ok_or_else(|| PanelError::transport(locator, "HTTP 404"))
    }

    async fn fetch_bytes(&self, locator: &str) -> PanelResult<Vec<u8>> {
        Err(PanelError::transport(locator, "no bytes in scripted transport"))
    }
}

/// Inliner whose outcome and latency are scripted per locator.
///
/// Unscripted locators succeed immediately with `data:image/png;base64,XYZ`.
#[derive(Default)]
pub struct ScriptedInliner {
    delays: HashMap<String, Duration>,
    failures: HashMap<String, String>,
    calls: AtomicUsize,
    completed: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedInliner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, locator: &str, delay: Duration) -> Self {
        self.delays.insert(locator.to_string(), delay);
        self
    }

    pub fn with_failure(mut self, locator: &str, reason: &str) -> Self {
        self.failures.insert(locator.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Locators in the order their conversions finished
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn data_for(locator: &str) -> String {
        if locator == "a.png" {
            return "data:image/png;base64,XYZ".to_string();
        }
        format!("data:image/png;base64,{}", locator.replace('.', "_"))
    }
}

#[async_trait]
impl Inliner for ScriptedInliner {
    async fn inline(&self, locator: &str) -> Result<String, ImageLoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(locator) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().unwrap().push(locator.to_string());

        match self.failures.get(locator) {
            Some(reason) => Err(ImageLoadError::new(locator, reason.clone())),
            None => Ok(Self::data_for(locator)),
        }
    }
}
