//! File-to-text extraction for attachments.
//!
//! An attachment is appended to the outgoing user message as a plain text
//! block wrapped in start/end markers, so the model sees the document inline.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

pub const MAX_FILE_SIZE: u64 = 5_242_880; // 5MB
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];
pub const PDF_EXTENSION: &str = "pdf";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Unsupported file type. Please select a .txt or .pdf file.")]
    Unsupported { extension: Option<String> },

    #[error("File is too large ({size} bytes, max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Failed to read attachment: {0}")]
    Io(#[from] std::io::Error),

    #[error("Attachment is not valid UTF-8 text")]
    InvalidText,

    #[error("Failed to extract PDF text: {message}")]
    Pdf { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachmentKind {
    Text,
    Pdf,
}

fn classify(path: &Path) -> Result<AttachmentKind, AttachmentError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());

    match ext.as_deref() {
        Some(e) if TEXT_EXTENSIONS.contains(&e) => Ok(AttachmentKind::Text),
        #[cfg(feature = "pdf")]
        Some(PDF_EXTENSION) => Ok(AttachmentKind::Pdf),
        _ => Err(AttachmentError::Unsupported { extension: ext }),
    }
}

/// Whether `path` has an extension this build can extract
pub fn is_supported(path: &Path) -> bool {
    classify(path).is_ok()
}

/// Wrap extracted document text in the attachment markers
pub fn attachment_block(name: &str, text: &str) -> String {
    format!(
        "\n\n--- Start of attached document: {name} ---\n\n{text}\n--- End of attached document: {name} ---\n\n"
    )
}

/// Read `path` and return its text wrapped as an attachment block
pub async fn extract_attachment(path: &Path) -> Result<String, AttachmentError> {
    let kind = classify(path)?;

    let size = tokio::fs::metadata(path).await?.len();
    if size > MAX_FILE_SIZE {
        return Err(AttachmentError::TooLarge {
            size,
            max: MAX_FILE_SIZE,
        });
    }

    let bytes = tokio::fs::read(path).await?;
    let text = match kind {
        AttachmentKind::Text => String::from_utf8(bytes).map_err(|_| AttachmentError::InvalidText)?,
        AttachmentKind::Pdf => extract_pdf_text(bytes).await?,
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!(file = %name, chars = text.len(), "Extracted attachment text");

    Ok(attachment_block(&name, &text))
}

#[cfg(feature = "pdf")]
async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, AttachmentError> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AttachmentError::Pdf {
            message: e.to_string(),
        })?
        .map_err(|e| AttachmentError::Pdf {
            message: e.to_string(),
        })
}

#[cfg(not(feature = "pdf"))]
async fn extract_pdf_text(_bytes: Vec<u8>) -> Result<String, AttachmentError> {
    Err(AttachmentError::Unsupported {
        extension: Some(PDF_EXTENSION.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_attachment_block_format() {
        assert_eq!(
            attachment_block("notes.txt", "hello"),
            "\n\n--- Start of attached document: notes.txt ---\n\nhello\n--- End of attached document: notes.txt ---\n\n"
        );
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("a.txt")));
        assert!(is_supported(Path::new("README.MD")));
        assert!(!is_supported(Path::new("photo.png")));
        assert!(!is_supported(Path::new("Makefile")));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_supported_with_feature() {
        assert!(is_supported(Path::new("paper.PDF")));
    }

    #[tokio::test]
    async fn test_extract_text_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        fs::write(&path, "line one\nline two").unwrap();

        let block = extract_attachment(&path).await.unwrap();

        assert!(block.starts_with("\n\n--- Start of attached document: notes.txt ---\n\n"));
        assert!(block.contains("line one\nline two\n--- End of attached document: notes.txt ---"));
    }

    #[tokio::test]
    async fn test_extract_unsupported_type() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("image.png");
        fs::write(&path, [0u8; 16]).unwrap();

        let err = extract_attachment(&path).await.unwrap_err();
        assert!(matches!(err, AttachmentError::Unsupported { .. }));
        assert_eq!(
            err.to_string(),
            "Unsupported file type. Please select a .txt or .pdf file."
        );
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = extract_attachment(&tmp.path().join("gone.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Io(_)));
    }

    #[tokio::test]
    async fn test_extract_too_large() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.txt");
        fs::write(&path, vec![b'a'; (MAX_FILE_SIZE + 1) as usize]).unwrap();

        let err = extract_attachment(&path).await.unwrap_err();
        assert!(matches!(err, AttachmentError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_extract_invalid_utf8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bin.txt");
        fs::write(&path, [0xffu8, 0xfe, 0x00]).unwrap();

        let err = extract_attachment(&path).await.unwrap_err();
        assert!(matches!(err, AttachmentError::InvalidText));
    }
}
