// Documents module
// Loads PDFs page by page and splits them into overlapping chunks for embedding

pub mod loader;
pub mod splitter;

use serde::{Deserialize, Serialize};

pub use loader::{find_pdfs, load_pdf, load_pdf_directory};
pub use splitter::{SplitterConfig, split_documents, split_text};

/// One page of extracted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    /// Path of the PDF the page came from
    pub source: String,
    /// Zero-based page index within the source
    pub page: u32,
}

/// A piece of a [`Document`] ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    pub source: String,
    pub page: u32,
    /// Position of this chunk across the whole index build
    pub chunk_index: usize,
}
