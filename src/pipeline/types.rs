//! Shared types for the classification pipeline.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

// ── Input ───────────────────────────────────────────────────────────

/// The email as it arrived, before extraction. Exactly one variant per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailInput {
    /// Raw text from a JSON body or form field.
    Text(String),
    /// Bytes of an uploaded `text/plain` file.
    PlainText(Vec<u8>),
    /// Bytes of an uploaded `application/pdf` file.
    Pdf(Vec<u8>),
}

// ── Classification ──────────────────────────────────────────────────

/// Productivity label. Serialized with the Portuguese labels the model is
/// asked to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Produtivo")]
    Productive,
    #[serde(rename = "Improdutivo")]
    Unproductive,
    #[serde(rename = "Desconhecido")]
    Unknown,
}

impl Classification {
    /// Wire label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Productive => "Produtivo",
            Self::Unproductive => "Improdutivo",
            Self::Unknown => "Desconhecido",
        }
    }

    /// Parse a label emitted by the model. Accepts Portuguese or English,
    /// case-insensitive. `Unknown` is never parsed from model output.
    pub fn from_model_label(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "produtivo" | "productive" => Some(Self::Productive),
            "improdutivo" | "unproductive" => Some(Self::Unproductive),
            _ => None,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification plus suggested reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub suggestion: String,
}

/// A regenerated suggested reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionResult {
    pub suggestion: String,
}

// ── Outcome ─────────────────────────────────────────────────────────

/// Why a model call ended in a fallback value.
#[derive(Debug, thiserror::Error)]
pub enum FallbackCause {
    /// Network, auth, quota, or timeout failure.
    #[error("provider failure: {0}")]
    Provider(#[from] LlmError),
    /// The model answered, but not with the expected JSON.
    #[error("malformed model output: {0}")]
    Malformed(String),
}

/// Result of a model-backed operation: either the model's answer or a fixed
/// fallback, tagged with the cause.
#[derive(Debug)]
pub enum Outcome<T> {
    Answered(T),
    Fallback { value: T, cause: FallbackCause },
}

impl<T> Outcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Answered(value) | Self::Fallback { value, .. } => value,
        }
    }

    /// Collapse to the value, discarding the cause.
    pub fn into_value(self) -> T {
        match self {
            Self::Answered(value) | Self::Fallback { value, .. } => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_serializes_with_portuguese_labels() {
        let result = ClassificationResult {
            classification: Classification::Productive,
            suggestion: "Prezado, segue o relatório.".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["classification"], "Produtivo");
        assert_eq!(
            serde_json::to_value(Classification::Unknown).unwrap(),
            "Desconhecido"
        );
        assert_eq!(
            serde_json::to_value(Classification::Unproductive).unwrap(),
            "Improdutivo"
        );
    }

    #[test]
    fn model_labels_parse_in_either_language() {
        assert_eq!(
            Classification::from_model_label(" Produtivo "),
            Some(Classification::Productive)
        );
        assert_eq!(
            Classification::from_model_label("IMPRODUTIVO"),
            Some(Classification::Unproductive)
        );
        assert_eq!(
            Classification::from_model_label("productive"),
            Some(Classification::Productive)
        );
        assert_eq!(Classification::from_model_label("Desconhecido"), None);
        assert_eq!(Classification::from_model_label("urgente"), None);
    }

    #[test]
    fn label_matches_display() {
        assert_eq!(Classification::Productive.to_string(), "Produtivo");
    }

    #[test]
    fn outcome_collapses_to_value() {
        let answered = Outcome::Answered(1);
        assert!(!answered.is_fallback());
        assert_eq!(answered.into_value(), 1);

        let fallback = Outcome::Fallback {
            value: 2,
            cause: FallbackCause::Malformed("not json".into()),
        };
        assert!(fallback.is_fallback());
        assert_eq!(*fallback.value(), 2);
        assert_eq!(fallback.into_value(), 2);
    }
}
