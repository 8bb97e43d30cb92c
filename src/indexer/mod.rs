// Indexer module
// Turns a directory of PDFs into a persisted vector index

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::RagConfig;
use crate::database::{ChunkRecord, VectorIndex};
use crate::documents::{DocumentChunk, SplitterConfig, load_pdf_directory, split_documents};
use crate::invoker::ThrottledInvoker;
use crate::provider::EmbeddingModel;
use crate::{RagError, Result};

/// Builds the vector index from the configured PDF directory
pub struct DocumentIndexer {
    embedder: Arc<dyn EmbeddingModel>,
    invoker: ThrottledInvoker,
    data_dir: PathBuf,
    index_dir: PathBuf,
    splitter: SplitterConfig,
    show_progress: bool,
}

/// Statistics about one index build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexingStats {
    /// PDF files that contributed at least one page
    pub documents: usize,
    pub pages: usize,
    pub chunks: usize,
}

impl std::fmt::Debug for DocumentIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndexer")
            .field("embedder", &self.embedder.model_id())
            .field("data_dir", &self.data_dir)
            .field("index_dir", &self.index_dir)
            .field("splitter", &self.splitter)
            .finish_non_exhaustive()
    }
}

impl DocumentIndexer {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        invoker: ThrottledInvoker,
        rag: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            invoker,
            data_dir: rag.data_dir.clone(),
            index_dir: rag.index_dir.clone(),
            splitter: SplitterConfig::new(rag.chunk_size, rag.chunk_overlap),
            show_progress: console::user_attended_stderr(),
        }
    }

    /// Show or hide the embedding progress bar
    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[inline]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[inline]
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Load, split and embed every PDF, then replace the index on disk
    ///
    /// Nothing is written until every chunk has an embedding, so any failure
    /// leaves the previous index as it was.
    #[inline]
    pub async fn build_index(&self) -> Result<IndexingStats> {
        info!(
            "Building index from {} into {}",
            self.data_dir.display(),
            self.index_dir.display()
        );

        let data_dir = self.data_dir.clone();
        let splitter = self.splitter.clone();
        let embedder = Arc::clone(&self.embedder);
        let invoker = self.invoker.clone();
        let show_progress = self.show_progress;

        // PDF parsing and the embedding calls block, keep them off the runtime threads
        let (stats, records) = tokio::task::spawn_blocking(move || {
            let documents = load_pdf_directory(&data_dir)?;
            let chunks = split_documents(&documents, &splitter);
            if chunks.is_empty() {
                return Err(RagError::NoDocumentsFound(data_dir));
            }

            let stats = IndexingStats {
                documents: documents
                    .iter()
                    .map(|d| d.source.as_str())
                    .collect::<BTreeSet<_>>()
                    .len(),
                pages: documents.len(),
                chunks: chunks.len(),
            };
            info!(
                "Split {} pages from {} documents into {} chunks",
                stats.pages, stats.documents, stats.chunks
            );

            let records = embed_chunks(embedder.as_ref(), &invoker, &chunks, show_progress)?;
            Ok((stats, records))
        })
        .await
        .context("Indexing task panicked")??;

        VectorIndex::create(&self.index_dir, &records).await?;

        info!(
            "Indexed {} chunks from {} documents",
            stats.chunks, stats.documents
        );
        Ok(stats)
    }
}

/// Embed chunks one at a time, retrying throttles per chunk
fn embed_chunks(
    embedder: &dyn EmbeddingModel,
    invoker: &ThrottledInvoker,
    chunks: &[DocumentChunk],
    show_progress: bool,
) -> Result<Vec<ChunkRecord>> {
    let progress = if show_progress {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    progress.set_length(chunks.len() as u64);

    let mut records = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let vector = invoker.run(|| embedder.embed_query(&chunk.content))?;
        debug!(
            "Embedded chunk {} ({} dims) from {} page {}",
            chunk.chunk_index,
            vector.len(),
            chunk.source,
            chunk.page
        );
        records.push(ChunkRecord::new(chunk, vector));
        progress.set_message(chunk.source.clone());
        progress.inc(1);
    }

    progress.finish_and_clear();
    Ok(records)
}
