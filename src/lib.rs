//! Email triage: classify emails as productive or unproductive and draft a reply.

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
