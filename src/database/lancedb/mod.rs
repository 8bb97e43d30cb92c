// LanceDB vector database module
// Persists chunk embeddings on disk and answers nearest-neighbour queries


pub mod vector_store;

use serde::{Deserialize, Serialize};

use crate::documents::DocumentChunk;

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding (1536 dimensions for Titan text v1)
    pub vector: Vec<f32>,
    /// The chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk stored alongside its embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// The actual text content of the chunk
    pub content: String,
    /// Path of the PDF the chunk was cut from
    pub source: String,
    /// Zero-based page index within the source
    pub page: u32,
    /// Index of this chunk within the build (for ordering)
    pub chunk_index: u32,
    /// Timestamp when this embedding was created
    pub created_at: String,
}

impl ChunkRecord {
    #[inline]
    pub fn new(chunk: &DocumentChunk, vector: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            metadata: ChunkMetadata {
                content: chunk.content.clone(),
                source: chunk.source.clone(),
                page: chunk.page,
                chunk_index: u32::try_from(chunk.chunk_index).unwrap_or(u32::MAX),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }
}
