//! Scripted [`ModelService`] for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use docgraph_shared::{DocGraphError, Result, Triple};

use crate::model::ModelService;
use crate::schema::KgSchema;

type Reply = std::result::Result<Vec<Triple>, String>;

/// Replays queued replies to `extract_paths`, then repeats a fixed reply.
///
/// Errors are scripted as strings and surface as [`DocGraphError::Model`].
/// `complete` echoes the prompt unless the fixed reply is an error.
pub struct MockModel {
    queued: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
    documents: Mutex<Vec<String>>,
}

impl MockModel {
    fn with_fallback(fallback: Reply) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            documents: Mutex::new(Vec::new()),
        }
    }

    /// Always returns `triples`.
    pub fn returning(triples: Vec<Triple>) -> Self {
        Self::with_fallback(Ok(triples))
    }

    /// Always returns zero triples.
    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    /// Always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self::with_fallback(Err(message.to_string()))
    }

    /// Queue a reply served before the fixed one.
    pub fn then(self, reply: std::result::Result<Vec<Triple>, &str>) -> Self {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(reply.map_err(str::to_string));
        }
        self
    }

    /// Number of `extract_paths` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Documents passed to `extract_paths`, in call order.
    pub fn documents(&self) -> Vec<String> {
        self.documents.lock().map(|d| d.clone()).unwrap_or_default()
    }

    fn next_reply(&self) -> Reply {
        self.queued
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl ModelService for MockModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match &self.fallback {
            Ok(_) => Ok(format!("echo: {prompt}")),
            Err(message) => Err(DocGraphError::Model(message.clone())),
        }
    }

    async fn extract_paths(&self, document: &str, _schema: &KgSchema) -> Result<Vec<Triple>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut docs) = self.documents.lock() {
            docs.push(document.to_string());
        }
        self.next_reply().map_err(DocGraphError::Model)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
