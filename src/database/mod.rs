// Database module
// LanceDB holds the chunk vectors and their metadata for retrieval

pub mod lancedb;

pub use lancedb::{ChunkMetadata, ChunkRecord, vector_store::SearchResult, vector_store::VectorIndex};
