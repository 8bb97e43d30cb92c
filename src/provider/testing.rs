// In-process models for exercising the flows without a network

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ChatModel, EmbeddingModel};
use crate::prompt::Message;
use crate::{RagError, Result};

const VOCABULARY: [&str; 8] = [
    "paris", "france", "capital", "berlin", "germany", "madrid", "spain", "rust",
];

/// Embeds text as keyword counts over a small vocabulary
#[derive(Debug, Default)]
pub(crate) struct KeywordEmbedder {
    calls: AtomicUsize,
    /// Number of leading calls that report throttling
    throttle_first: usize,
}

impl KeywordEmbedder {
    pub(crate) fn throttling(throttle_first: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            throttle_first,
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn vector(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        VOCABULARY
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect()
    }
}

impl EmbeddingModel for KeywordEmbedder {
    fn model_id(&self) -> &str {
        "keyword-embedder"
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.throttle_first {
            return Err(RagError::ProviderRateLimited("Too many requests".to_string()));
        }
        Ok(texts.iter().map(|text| Self::vector(text)).collect())
    }
}

/// Embedder that always fails with a non-throttle error
#[derive(Debug, Default)]
pub(crate) struct FailingEmbedder;

impl EmbeddingModel for FailingEmbedder {
    fn model_id(&self) -> &str {
        "failing-embedder"
    }

    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::Provider("HTTP 403 AccessDeniedException: denied".to_string()))
    }
}

/// Chat model that records every request and answers with a fixed reply
#[derive(Debug)]
pub(crate) struct RecordingChat {
    reply: String,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl RecordingChat {
    pub(crate) fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().expect("lock is not poisoned").clone()
    }
}

impl ChatModel for RecordingChat {
    fn model_id(&self) -> &str {
        "recording-chat"
    }

    fn chat(&self, messages: &[Message]) -> Result<String> {
        self.requests
            .lock()
            .expect("lock is not poisoned")
            .push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

/// Sleeper that returns immediately
#[derive(Debug, Default)]
pub(crate) struct NoSleep;

impl crate::invoker::Sleeper for NoSleep {
    fn sleep(&self, _duration: std::time::Duration) {}
}

/// Invoker with the default retry policy that never actually waits
pub(crate) fn instant_invoker() -> crate::invoker::ThrottledInvoker {
    crate::invoker::ThrottledInvoker::default().with_sleeper(std::sync::Arc::new(NoSleep))
}
