//! Uploaded artifact → Unicode text.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::ExtractError;
use crate::pipeline::types::EmailInput;

/// Default cap on PDF text extraction.
pub const DEFAULT_PDF_TIMEOUT: Duration = Duration::from_secs(30);

/// Accepted upload media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    PlainText,
}

impl MediaType {
    /// Parse a declared MIME type. Parameters such as `charset` are ignored.
    pub fn from_mime(mime: &str) -> Result<Self, ExtractError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/pdf" => Ok(Self::Pdf),
            "text/plain" => Ok(Self::PlainText),
            _ => Err(ExtractError::UnsupportedMediaType {
                media_type: mime.to_string(),
            }),
        }
    }
}

/// Extracts text from an [`EmailInput`]. Pure over the provided bytes.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    pdf_timeout: Duration,
}

impl TextExtractor {
    pub fn new() -> Self {
        Self {
            pdf_timeout: DEFAULT_PDF_TIMEOUT,
        }
    }

    pub fn with_pdf_timeout(mut self, timeout: Duration) -> Self {
        self.pdf_timeout = timeout;
        self
    }

    pub async fn extract(&self, input: EmailInput) -> Result<String, ExtractError> {
        match input {
            EmailInput::Text(text) => Ok(text),
            EmailInput::PlainText(bytes) => decode_plain_text(bytes),
            EmailInput::Pdf(bytes) => self.extract_pdf(bytes).await,
        }
    }

    async fn extract_pdf(&self, bytes: Vec<u8>) -> Result<String, ExtractError> {
        let size = bytes.len();
        debug!(bytes = size, "Extracting PDF text");

        // A timed-out parse is detached, not cancelled: it holds its blocking
        // thread until it finishes. The request body limit bounds its input.
        let pages = tokio::time::timeout(
            self.pdf_timeout,
            tokio::task::spawn_blocking(move || pdf_pages(&bytes)),
        )
        .await
        .map_err(|_| ExtractError::Task("PDF extraction timed out".to_string()))?
        .map_err(|e| ExtractError::Task(format!("task join error: {e}")))??;

        info!(page_count = pages.len(), bytes = size, "PDF text extraction complete");
        Ok(pages.concat())
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Strict UTF-8 decode, verbatim.
pub fn decode_plain_text(bytes: Vec<u8>) -> Result<String, ExtractError> {
    Ok(String::from_utf8(bytes)?)
}

/// Text of every page in page order. Pages without a text layer come back empty.
pub fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))
}
