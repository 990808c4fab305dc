//! Email triage pipeline.
//!
//! A `/classify` request flows through:
//! 1. `InputSources::resolve()` picks one input (file, JSON text, form text)
//! 2. `TextExtractor::extract()` turns it into Unicode text
//! 3. `TextNormalizer::normalize()` folds, filters, drops stopwords and stems
//! 4. `ClassificationClient::classify()` asks the LLM for a label and reply
//!
//! Model failures never surface as errors; the client answers with a fallback.

pub mod classifier;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod stopwords;
pub mod types;
