#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use tracing::{debug, warn};

use super::{Document, DocumentChunk};

/// Configuration for recursive character splitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next
    pub chunk_overlap: usize,
    /// Separators tried in order; the empty string splits between characters
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    #[inline]
    fn default() -> Self {
        Self::new(1000, 500)
    }
}

impl SplitterConfig {
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: ["\n\n", "\n", " ", ""]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Split every document, numbering chunks in source order
#[inline]
pub fn split_documents(documents: &[Document], config: &SplitterConfig) -> Vec<DocumentChunk> {
    let mut chunks = Vec::new();

    for document in documents {
        for content in split_text(&document.content, config) {
            chunks.push(DocumentChunk {
                content,
                source: document.source.clone(),
                page: document.page,
                chunk_index: chunks.len(),
            });
        }
    }

    debug!(
        "Split {} documents into {} chunks (avg {} chars)",
        documents.len(),
        chunks.len(),
        chunks.iter().map(|c| char_len(&c.content)).sum::<usize>() / chunks.len().max(1)
    );

    chunks
}

/// Split text into trimmed chunks of at most `chunk_size` characters
#[inline]
pub fn split_text(text: &str, config: &SplitterConfig) -> Vec<String> {
    split_recursive(text, &config.separators, config)
}

fn split_recursive(text: &str, separators: &[String], config: &SplitterConfig) -> Vec<String> {
    let mut final_chunks = Vec::new();

    // Use the first separator that occurs in the text, keep the rest for oversized pieces
    let mut separator = separators.last().map_or("", String::as_str);
    let mut remaining: &[String] = &[];
    for (i, candidate) in separators.iter().enumerate() {
        if candidate.is_empty() {
            separator = "";
            break;
        }
        if text.contains(candidate.as_str()) {
            separator = candidate;
            remaining = separators.get(i + 1..).unwrap_or_default();
            break;
        }
    }

    let mut good_pieces = Vec::new();
    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) < config.chunk_size {
            good_pieces.push(piece);
            continue;
        }

        if !good_pieces.is_empty() {
            final_chunks.extend(merge_pieces(&good_pieces, config));
            good_pieces.clear();
        }

        if remaining.is_empty() {
            final_chunks.push(piece.to_string());
        } else {
            final_chunks.extend(split_recursive(piece, remaining, config));
        }
    }

    if !good_pieces.is_empty() {
        final_chunks.extend(merge_pieces(&good_pieces, config));
    }

    final_chunks
}

/// Split on `separator`, attaching each separator to the start of the piece after it
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut boundaries: Vec<usize> = if separator.is_empty() {
        text.char_indices().map(|(i, _)| i).collect()
    } else {
        std::iter::once(0)
            .chain(text.match_indices(separator).map(|(i, _)| i))
            .collect()
    };
    boundaries.push(text.len());
    boundaries.dedup();

    boundaries
        .windows(2)
        .filter_map(|window| text.get(window[0]..window[1]))
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Greedily merge small pieces into chunks, keeping up to `chunk_overlap` characters between them
fn merge_pieces(pieces: &[&str], config: &SplitterConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for &piece in pieces {
        let len = char_len(piece);

        if total + len > config.chunk_size {
            if total > config.chunk_size {
                warn!(
                    "Created a chunk of size {}, which is longer than the specified {}",
                    total, config.chunk_size
                );
            }

            if !window.is_empty() {
                if let Some(chunk) = join_window(&window) {
                    chunks.push(chunk);
                }

                // Shrink from the front until only the overlap is left and the next piece fits
                while total > config.chunk_overlap
                    || (total + len > config.chunk_size && total > 0)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front);
                }
            }
        }

        window.push_back(piece);
        total += len;
    }

    if let Some(chunk) = join_window(&window) {
        chunks.push(chunk);
    }

    chunks
}

fn join_window(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
