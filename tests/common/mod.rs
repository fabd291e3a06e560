#![allow(dead_code)]

use async_trait::async_trait;
use creative_suite::{
    ClientConfig, Credential, CredentialHost, GenerationClient, StaticCredentialHost, SuiteError,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

pub const TEST_KEY: &str = "test_api_key";
pub const IMAGE_PATH: &str = "/models/gemini-3-pro-image-preview:generateContent";
pub const VIDEO_SUBMIT_PATH: &str = "/models/veo-3.1-fast-generate-preview:predictLongRunning";
pub const OPERATION_NAME: &str = "models/veo-3.1-fast-generate-preview/operations/op123";
pub const OPERATION_PATH: &str = "/models/veo-3.1-fast-generate-preview/operations/op123";

pub fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig::default()
        .with_base_url(&server.uri())
        .with_poll_interval(Duration::from_millis(10))
        .with_max_wait(Duration::from_secs(5))
}

pub fn test_client(server: &MockServer) -> GenerationClient<StaticCredentialHost> {
    GenerationClient::with_config(Arc::new(StaticCredentialHost::new(TEST_KEY)), test_config(server))
        .unwrap()
}

pub fn image_response(data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [{ "inlineData": { "mimeType": "image/png", "data": data } }]
            },
            "finishReason": "STOP"
        }]
    })
}

pub fn pending_operation() -> Value {
    json!({ "name": OPERATION_NAME, "done": false })
}

pub fn finished_operation(uri: Option<&str>) -> Value {
    let samples = match uri {
        Some(uri) => json!([{ "video": { "uri": uri } }]),
        None => json!([]),
    };
    json!({
        "name": OPERATION_NAME,
        "done": true,
        "response": { "generateVideoResponse": { "generatedSamples": samples } }
    })
}

/// Replays a fixed list of bodies, repeating the last one once exhausted.
pub struct OperationSequence {
    bodies: Vec<Value>,
    calls: AtomicUsize,
}

impl OperationSequence {
    pub fn new(bodies: Vec<Value>) -> Self {
        Self {
            bodies,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Respond for OperationSequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let body = &self.bodies[call.min(self.bodies.len() - 1)];
        ResponseTemplate::new(200).set_body_json(body)
    }
}

/// A host that counts how often it is consulted.
///
/// Opening selection picks `pick_on_open` when set, otherwise behaves like a
/// user cancelling the dialog if nothing is selected.
pub struct CountingHost {
    inner: StaticCredentialHost,
    pick_on_open: Option<String>,
    select_delay: Duration,
    pub checks: AtomicUsize,
    pub selections: AtomicUsize,
}

impl CountingHost {
    pub fn selected(key: &str) -> Self {
        Self {
            inner: StaticCredentialHost::new(key),
            pick_on_open: None,
            select_delay: Duration::ZERO,
            checks: AtomicUsize::new(0),
            selections: AtomicUsize::new(0),
        }
    }

    pub fn unselected(pick_on_open: Option<&str>) -> Self {
        Self {
            inner: StaticCredentialHost::empty(),
            pick_on_open: pick_on_open.map(str::to_string),
            select_delay: Duration::ZERO,
            checks: AtomicUsize::new(0),
            selections: AtomicUsize::new(0),
        }
    }

    /// Keeps the selection dialog open for `delay` before it settles.
    pub fn with_select_delay(mut self, delay: Duration) -> Self {
        self.select_delay = delay;
        self
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn selections(&self) -> usize {
        self.selections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialHost for CountingHost {
    async fn has_selected_key(&self) -> Result<bool, SuiteError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.inner.has_selected_key().await
    }

    async fn open_select_key(&self) -> Result<(), SuiteError> {
        self.selections.fetch_add(1, Ordering::SeqCst);
        if !self.select_delay.is_zero() {
            tokio::time::sleep(self.select_delay).await;
        }
        if let Some(key) = &self.pick_on_open {
            self.inner.select(key.clone());
        }
        self.inner.open_select_key().await
    }

    async fn credential(&self) -> Result<Credential, SuiteError> {
        self.inner.credential().await
    }
}
