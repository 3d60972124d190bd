use crate::error::IngestError;
use crate::models::{Document, DocumentMetadata};
use lopdf::Document as PdfDocument;
use std::path::Path;

pub trait PdfExtractor {
    fn extract_documents(&self, path: &Path) -> Result<Vec<Document>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_documents(&self, path: &Path) -> Result<Vec<Document>, IngestError> {
        let bytes = std::fs::read(path)?;
        let document = PdfDocument::load_mem(&bytes)
            .map_err(|error| IngestError::PdfParse(format!("{}: {error}", path.display())))?;

        let pages = document.get_pages();
        let total_pages = pages.len() as u32;
        let source = path.to_string_lossy().to_string();

        let mut documents = Vec::new();
        for page_no in pages.keys() {
            let text = document
                .extract_text(&[*page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if text.trim().is_empty() {
                tracing::debug!(page = page_no, source = %source, "skipping page without text");
                continue;
            }

            documents.push(Document {
                text,
                metadata: DocumentMetadata {
                    source: source.clone(),
                    page_number: *page_no,
                    total_pages,
                },
            });
        }

        if documents.is_empty() {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(documents)
    }
}

/// Loads every page of the PDF at `path` that has extractable text.
pub fn load_pdf(path: &Path) -> Result<Vec<Document>, IngestError> {
    LopdfExtractor.extract_documents(path)
}

#[cfg(test)]
mod tests {
    use super::load_pdf;
    use crate::error::IngestError;
    use crate::test_support::write_text_pdf;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let result = load_pdf(&dir.path().join("absent.pdf"));
        assert!(matches!(result, Err(IngestError::Io(_))));
    }

    #[test]
    fn broken_pdf_is_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let result = load_pdf(&path);
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
        Ok(())
    }

    #[test]
    fn pages_become_documents_with_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("minutes.pdf");
        write_text_pdf(&path, &["Budget approved", "Next meeting in March"])?;

        let documents = load_pdf(&path)?;

        assert_eq!(documents.len(), 2);
        assert!(documents[0].text.contains("Budget approved"));
        assert!(documents[1].text.contains("Next meeting in March"));
        assert_eq!(documents[0].metadata.page_number, 1);
        assert_eq!(documents[1].metadata.page_number, 2);
        assert_eq!(documents[1].metadata.total_pages, 2);
        assert_eq!(documents[0].metadata.source, path.to_string_lossy());
        Ok(())
    }

    #[test]
    fn blank_pages_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("sparse.pdf");
        write_text_pdf(&path, &["", "Only this page has words"])?;

        let documents = load_pdf(&path)?;

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].metadata.page_number, 2);
        assert_eq!(documents[0].metadata.total_pages, 2);
        Ok(())
    }
}
