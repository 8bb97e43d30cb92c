//! Question answering over the persisted vector index.
//!
//! [`RagAnswerer::answer`] embeds the question, pulls the nearest chunks out of
//! the index, joins them into the prompt context and asks the chat model
//! through the [`ThrottledInvoker`]. Nothing is cached between questions.

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::RagConfig;
use crate::database::{SearchResult, VectorIndex};
use crate::invoker::ThrottledInvoker;
use crate::prompt::PromptTemplate;
use crate::provider::{ChatModel, EmbeddingModel};
use crate::{RagError, Result};

/// Separator placed between retrieved chunks in the prompt context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub struct RagAnswerer {
    embedder: Arc<dyn EmbeddingModel>,
    chat: Arc<dyn ChatModel>,
    invoker: ThrottledInvoker,
    prompt: PromptTemplate,
    index_dir: PathBuf,
    top_k: usize,
}

/// Where a retrieved chunk came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceRef {
    pub source: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    /// Distinct sources of the retrieved chunks, nearest first
    pub sources: Vec<SourceRef>,
}

impl std::fmt::Debug for RagAnswerer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagAnswerer")
            .field("embedder", &self.embedder.model_id())
            .field("chat", &self.chat.model_id())
            .field("index_dir", &self.index_dir)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl RagAnswerer {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        chat: Arc<dyn ChatModel>,
        invoker: ThrottledInvoker,
        rag: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            chat,
            invoker,
            prompt: PromptTemplate::rag(),
            index_dir: rag.index_dir.clone(),
            top_k: rag.top_k,
        }
    }

    #[inline]
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Fetch the `top_k` chunks nearest to `question`
    #[inline]
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let index = VectorIndex::open(&self.index_dir).await?;

        let embedder = Arc::clone(&self.embedder);
        let invoker = self.invoker.clone();
        let text = question.to_string();
        let query_vector = tokio::task::spawn_blocking(move || {
            invoker.run(|| embedder.embed_query(&text))
        })
        .await
        .context("Embedding task panicked")??;

        let results = index.search(&query_vector, self.top_k).await?;
        debug!(
            "Retrieved {} chunks for question ({} chars)",
            results.len(),
            question.chars().count()
        );
        Ok(results)
    }

    /// Answer `question` from the indexed documents
    ///
    /// Fails with [`RagError::EmptyQuestion`] before touching the index when
    /// the question is blank, and with [`RagError::IndexNotFound`] when no
    /// index has been built yet.
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let results = self.retrieve(question).await?;
        let context = build_context(&results);
        let messages = self
            .prompt
            .format_messages(&[("context", context.as_str()), ("user_text", question)])?;

        let chat = Arc::clone(&self.chat);
        let invoker = self.invoker.clone();
        let answer = tokio::task::spawn_blocking(move || invoker.invoke(chat.as_ref(), &messages))
            .await
            .context("Chat task panicked")??;

        info!(
            "Answered from {} chunks ({} chars)",
            results.len(),
            answer.len()
        );
        Ok(RagAnswer {
            answer,
            sources: collect_sources(&results),
        })
    }
}

/// Join retrieved chunk texts, nearest first
#[inline]
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|result| result.metadata.content.as_str())
        .join(CONTEXT_SEPARATOR)
}

fn collect_sources(results: &[SearchResult]) -> Vec<SourceRef> {
    results
        .iter()
        .map(|result| SourceRef {
            source: result.metadata.source.clone(),
            page: result.metadata.page,
        })
        .unique()
        .collect()
}
