use crate::chunking::{document_id, RecursiveCharacterSplitter};
use crate::extractor::load_pdf;
use crate::{Chunk, DocumentFingerprint, IngestError, IngestionOptions};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub fingerprint: DocumentFingerprint,
    pub page_count: usize,
    pub chunks: Vec<Chunk>,
}

/// Loads the PDF at `path` and splits its pages into chunks.
pub fn ingest_pdf(path: &Path, options: &IngestionOptions) -> Result<IngestionReport, IngestError> {
    let splitter = RecursiveCharacterSplitter::try_from(options)?;
    let documents = load_pdf(path)?;
    let total_pages = documents
        .first()
        .map(|document| document.metadata.total_pages)
        .unwrap_or_default();
    let fingerprint = build_document_fingerprint(path, total_pages)?;
    let chunks = splitter.split_documents(&documents);

    tracing::info!(
        source = %fingerprint.source_path,
        checksum = %fingerprint.checksum,
        page_count = documents.len(),
        chunk_count = chunks.len(),
        "ingested pdf"
    );

    Ok(IngestionReport {
        fingerprint,
        page_count: documents.len(),
        chunks,
    })
}

fn build_document_fingerprint(
    path: &Path,
    page_count: u32,
) -> Result<DocumentFingerprint, IngestError> {
    let checksum = digest_file(path)?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })?;
    let source_path = path.to_string_lossy().to_string();

    Ok(DocumentFingerprint {
        document_id: document_id(&source_path),
        document_title: name.to_string(),
        source_path,
        checksum,
        page_count,
        ingested_at: Utc::now(),
    })
}
