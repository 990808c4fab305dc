//! Resolving a request's candidate inputs into one [`EmailInput`].
//!
//! Priority is fixed: uploaded file, then JSON `text`, then form `text`.

use crate::error::InputError;
use crate::pipeline::extract::MediaType;
use crate::pipeline::types::EmailInput;

/// A file part from a multipart upload.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Browsers submit an empty part when the file input is left blank.
    pub fn is_blank(&self) -> bool {
        self.file_name.as_deref().is_none_or(str::is_empty) && self.bytes.is_empty()
    }
}

/// Everything a `/classify` request carried that could hold the email.
#[derive(Debug, Clone, Default)]
pub struct InputSources {
    pub file: Option<UploadedFile>,
    /// `Some` whenever the body was JSON; holds `""` if `text` was absent.
    pub json_text: Option<String>,
    pub form_text: Option<String>,
}

impl InputSources {
    /// Pick exactly one input. Fails with `MissingInput` if nothing usable was
    /// sent, or `UnsupportedMediaType` if the chosen file has another type.
    pub fn resolve(self) -> Result<EmailInput, InputError> {
        if let Some(file) = self.file.filter(|f| !f.is_blank()) {
            let declared = file.content_type.as_deref().unwrap_or_default();
            return Ok(match MediaType::from_mime(declared)? {
                MediaType::Pdf => EmailInput::Pdf(file.bytes),
                MediaType::PlainText => EmailInput::PlainText(file.bytes),
            });
        }

        if let Some(text) = self.json_text {
            return Ok(EmailInput::Text(text));
        }

        match self.form_text {
            Some(text) if !text.is_empty() => Ok(EmailInput::Text(text)),
            _ => Err(InputError::MissingInput),
        }
    }
}

/// Reject text that is empty after trimming. Runs after extraction and before
/// normalization, so no model call is made for blank emails.
pub fn require_content(text: String) -> Result<String, InputError> {
    if text.trim().is_empty() {
        Err(InputError::EmptyContent)
    } else {
        Ok(text)
    }
}
