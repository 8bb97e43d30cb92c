use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Missing prompt variable: {0}")]
    MissingVariable(String),

    #[error("Provider rate limited the request: {0}")]
    ProviderRateLimited(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Maximum retries exceeded due to Bedrock throttling ({attempts} attempts)")]
    RetriesExhausted { attempts: u32 },

    #[error("No PDFs found in {}", .0.display())]
    NoDocumentsFound(PathBuf),

    #[error("Vector index not found at {}. Build it first.", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Please enter a question first")]
    EmptyQuestion,

    #[error("Input is {actual} characters long (limit is {limit})")]
    InputTooLong { actual: usize, limit: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Whether the provider asked us to slow down
    #[inline]
    pub fn is_throttle(&self) -> bool {
        matches!(self, Self::ProviderRateLimited(_))
    }
}

pub mod chat;
pub mod commands;
pub mod config;
pub mod database;
pub mod documents;
pub mod indexer;
pub mod invoker;
pub mod prompt;
pub mod provider;
pub mod rag;
pub mod ui;
