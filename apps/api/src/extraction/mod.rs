//! Text extraction from uploaded résumé files. Dispatch is on the filename
//! extension; the bytes never touch disk.

use thiserror::Error;
use tracing::{error, info};

mod docx;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Filename is required")]
    MissingFilename,

    #[error("Unsupported file type '{0}': upload a PDF, DOCX, TXT or MD file")]
    UnsupportedFormat(String),

    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("Failed to read DOCX: {0}")]
    Docx(String),

    #[error("File is not valid UTF-8 text")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("No text could be extracted from the file")]
    NoText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Result<Self, ExtractionError> {
        if filename.trim().is_empty() {
            return Err(ExtractionError::MissingFilename);
        }
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            "txt" | "md" => Ok(DocumentKind::PlainText),
            _ => Err(ExtractionError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// Extracts plain text from an uploaded file. Whitespace-only output is an error.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let kind = DocumentKind::from_filename(filename)?;
    info!("Extracting text from {filename} ({kind:?}, {} bytes)", bytes.len());

    let text = match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::Pdf(e.to_string()))?,
        DocumentKind::Docx => docx::extract_text(bytes)?,
        DocumentKind::PlainText => String::from_utf8(bytes.to_vec())?,
    };

    if text.trim().is_empty() {
        error!("No text could be extracted from {filename}");
        return Err(ExtractionError::NoText);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension_is_case_insensitive() {
        assert_eq!(DocumentKind::from_filename("CV.PDF").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("cv.Docx").unwrap(), DocumentKind::Docx);
        assert_eq!(DocumentKind::from_filename("notes.md").unwrap(), DocumentKind::PlainText);
    }

    #[test]
    fn test_missing_filename() {
        assert!(matches!(
            DocumentKind::from_filename("  "),
            Err(ExtractionError::MissingFilename)
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            DocumentKind::from_filename("resume.odt"),
            Err(ExtractionError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            DocumentKind::from_filename("resume"),
            Err(ExtractionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text("resume.txt", b"Jane Doe\nRust Engineer").unwrap();
        assert_eq!(text, "Jane Doe\nRust Engineer");
    }

    #[test]
    fn test_whitespace_only_is_no_text() {
        assert!(matches!(
            extract_text("resume.txt", b"  \n\t "),
            Err(ExtractionError::NoText)
        ));
    }

    #[test]
    fn test_invalid_utf8_text() {
        assert!(matches!(
            extract_text("resume.txt", &[0xff, 0xfe, 0x00]),
            Err(ExtractionError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_garbage_pdf_is_an_error() {
        assert!(matches!(
            extract_text("resume.pdf", b"definitely not a pdf"),
            Err(ExtractionError::Pdf(_))
        ));
    }

    #[test]
    fn test_docx_generated_by_us_roundtrips_text() {
        let bytes = crate::docx::text_to_docx("[NAME] Jane Doe\n[BULLET] Shipped the thing").unwrap();
        let text = extract_text("tailored.docx", &bytes).unwrap();
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("Shipped the thing"));
    }
}
