//! Error types for the email triage service.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Errors turning an uploaded artifact into text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Declared media type is neither `application/pdf` nor `text/plain`.
    #[error("Tipo de arquivo não suportado (.txt ou .pdf)")]
    UnsupportedMediaType { media_type: String },

    #[error("Arquivo de texto não está em UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Falha ao ler o PDF: {0}")]
    Pdf(String),

    #[error("Falha na extração de texto: {0}")]
    Task(String),
}

/// Request input errors, raised before any LLM call is made.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Nenhum texto ou arquivo enviado")]
    MissingInput,

    #[error("Conteúdo vazio")]
    EmptyContent,

    #[error(transparent)]
    Extract(#[from] ExtractError),
}
