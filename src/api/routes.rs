//! REST endpoints for email classification.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State, rejection::JsonRejection},
    http::{HeaderValue, Method, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::ApiError;
use crate::config::ServerConfig;
use crate::llm::LlmProvider;
use crate::pipeline::classifier::ClassificationClient;
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::input::{InputSources, UploadedFile, require_content};
use crate::pipeline::normalize::TextNormalizer;

const REGENERATE_FIELDS_REQUIRED: &str = "Campos 'text' e 'classification' são obrigatórios";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub extractor: TextExtractor,
    pub normalizer: Arc<TextNormalizer>,
    pub classifier: Arc<ClassificationClient>,
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            extractor: TextExtractor::new(),
            normalizer: Arc::new(TextNormalizer::new()),
            classifier: Arc::new(ClassificationClient::new(llm)),
        }
    }

    pub fn with_pdf_timeout(mut self, timeout: Duration) -> Self {
        self.extractor = self.extractor.with_pdf_timeout(timeout);
        self
    }
}

/// Build the Axum router with classification routes, CORS and request tracing.
pub fn api_routes(state: AppState, config: &ServerConfig) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    Router::new()
        .route("/health", get(health))
        .route("/classify", post(classify))
        .route("/regenerate-suggestion", post(regenerate_suggestion))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(trace_layer)
        .layer(cors_layer(config.allowed_origins.as_deref()))
        .with_state(state)
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    match allowed_origins {
        None => cors.allow_origin(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            cors.allow_origin(AllowOrigin::list(origins))
        }
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "email-triage"
    }))
}

// ── Classification ──────────────────────────────────────────────────────

async fn classify(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let input = read_input_sources(request, &state).await?.resolve()?;
    let text = require_content(state.extractor.extract(input).await?)?;

    let normalized = state.normalizer.normalize(&text);
    debug!(chars = text.chars().count(), normalized_chars = normalized.len(), "Email normalized");

    let result = state.classifier.classify(&normalized).await;
    info!(classification = %result.classification, "Email classified");

    Ok(Json(serde_json::json!({ "result": result })))
}

/// Collect every candidate input the request carries, by body type.
async fn read_input_sources(request: Request, state: &AppState) -> Result<InputSources, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/json") {
        let body = Bytes::from_request(request, state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("JSON inválido: {e}")))?;
        let text = value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(InputSources {
            json_text: Some(text),
            ..Default::default()
        })
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(request, state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        Ok(InputSources {
            form_text: fields.get("text").cloned(),
            ..Default::default()
        })
    } else {
        Ok(InputSources::default())
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<InputSources, ApiError> {
    let mut sources = InputSources::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") if sources.file.is_none() => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                debug!(
                    file_name = ?file_name,
                    content_type = ?content_type,
                    bytes = bytes.len(),
                    "Received file part"
                );
                sources.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("text") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                sources.form_text = Some(text);
            }
            _ => {}
        }
    }

    Ok(sources)
}

// ── Regeneration ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RegenerateRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    classification: Option<String>,
}

async fn regenerate_suggestion(
    State(state): State<AppState>,
    payload: Result<Json<RegenerateRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let present = |field: Option<String>| field.filter(|v| !v.trim().is_empty());
    let (Some(text), Some(classification)) = (present(body.text), present(body.classification))
    else {
        return Err(ApiError::bad_request(REGENERATE_FIELDS_REQUIRED));
    };

    let result = state
        .classifier
        .regenerate_suggestion(&text, &classification)
        .await;

    Ok(Json(serde_json::json!({ "result": result })))
}
