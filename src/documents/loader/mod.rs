
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::Document as PdfDocument;
use tracing::{debug, info, warn};

use super::Document;
use crate::{RagError, Result};

/// List the PDF files directly inside `dir`, sorted by path
///
/// The extension check ignores case so `REPORT.PDF` is picked up as well.
#[inline]
pub fn find_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RagError::NoDocumentsFound(dir.to_path_buf()));
    }

    let mut pdfs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_pdf(path))
        .collect();
    pdfs.sort();

    debug!("Found {} PDF files in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Extract the text of every non-blank page of one PDF
#[inline]
pub fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    let pdf = PdfDocument::load(path)
        .map_err(|e| RagError::Pdf(format!("Failed to open {}: {}", path.display(), e)))?;
    let source = path.display().to_string();

    let mut documents = Vec::new();
    for page_number in pdf.get_pages().into_keys() {
        let text = match pdf.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Skipping page {} of {}: {}",
                    page_number,
                    path.display(),
                    e
                );
                continue;
            }
        };

        if text.trim().is_empty() {
            debug!("Page {} of {} has no text", page_number, path.display());
            continue;
        }

        documents.push(Document {
            content: text,
            source: source.clone(),
            // lopdf numbers pages from 1
            page: page_number.saturating_sub(1),
        });
    }

    Ok(documents)
}

/// Load every PDF in `dir` as one [`Document`] per page
///
/// Unreadable files are logged and skipped. Fails with
/// [`RagError::NoDocumentsFound`] when the directory is missing or yields no text.
#[inline]
pub fn load_pdf_directory(dir: &Path) -> Result<Vec<Document>> {
    let pdfs = find_pdfs(dir)?;

    let mut documents = Vec::new();
    for path in &pdfs {
        match load_pdf(path) {
            Ok(pages) => {
                debug!("Loaded {} pages from {}", pages.len(), path.display());
                documents.extend(pages);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    if documents.is_empty() {
        return Err(RagError::NoDocumentsFound(dir.to_path_buf()));
    }

    info!(
        "Loaded {} pages from {} PDF files in {}",
        documents.len(),
        pdfs.len(),
        dir.display()
    );
    Ok(documents)
}
