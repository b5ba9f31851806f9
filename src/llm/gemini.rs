// ABOUTME: Google Gemini completion provider with streaming and Imagen image generation
// ABOUTME: Talks to the Generative Language API for text, vision, and image requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # Gemini Provider
//!
//! Implementation of the [`CompletionProvider`] trait for Google's Gemini
//! models, plus Imagen image generation.
//!
//! ## Configuration
//!
//! Set the `GEMINI_API_KEY` environment variable with your API key from
//! Google AI Studio. `GEMINI_MODEL` and `GEMINI_IMAGE_MODEL` optionally
//! override the default models.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nutriplan_server::llm::{ChatMessage, CompletionProvider, CompletionRequest, GeminiClient};
//! use nutriplan_server::errors::AppError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let provider = GeminiClient::from_env()?;
//!     let request = CompletionRequest::new(vec![
//!         ChatMessage::user("Suggest a balanced lunch."),
//!     ]);
//!     let response = provider.complete(&request).await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::{
    create_sse_stream, ChatMessage, CompletionProvider, CompletionRequest, CompletionResponse,
    CompletionStream, GeneratedImage, LlmCapabilities, MessagePart, MessageRole, StreamChunk,
    TokenUsage,
};
use crate::errors::AppError;

/// Environment variable for the Gemini API key
const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the default text model
const GEMINI_MODEL_ENV: &str = "GEMINI_MODEL";

/// Environment variable overriding the default image model
const GEMINI_IMAGE_MODEL_ENV: &str = "GEMINI_IMAGE_MODEL";

/// Default text model
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default image-generation model
const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Base URL for the Generative Language API
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Gemini API request structure
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// Content structure for the Gemini API
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

/// Part of content: text, or inline base64 data for vision requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    /// Text content
    Text { text: String },
    /// Inline base64 data with a declared MIME type
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineDataPart,
    },
}

/// Inline data payload for vision requests
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InlineDataPart {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: String,
    data: String,
}

/// Generation configuration
#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_count: Option<u32>,
    /// Structured-output hint: "application/json" asks for JSON output
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

/// Gemini API response structure
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
    error: Option<GeminiError>,
}

/// Response candidate
#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

/// Usage metadata from a Gemini API response
#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates: Option<u32>,
    #[serde(rename = "totalTokenCount")]
    total: Option<u32>,
}

/// API error response from Gemini
#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

/// Streaming response chunk
#[derive(Debug, Deserialize)]
struct StreamingResponse {
    candidates: Option<Vec<Candidate>>,
}

/// Imagen predict request
#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<ImagenInstance>,
    parameters: ImagenParameters,
}

/// One prompt instance for Imagen
#[derive(Debug, Serialize)]
struct ImagenInstance {
    prompt: String,
}

/// Imagen generation parameters
#[derive(Debug, Serialize)]
struct ImagenParameters {
    #[serde(rename = "sampleCount")]
    sample_count: u32,
    #[serde(rename = "outputMimeType")]
    output_mime_type: String,
}

/// Imagen predict response
#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Option<Vec<ImagenPrediction>>,
}

/// One generated image from Imagen
#[derive(Debug, Deserialize)]
struct ImagenPrediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Google Gemini completion provider
pub struct GeminiClient {
    api_key: String,
    client: Client,
    base_url: String,
    default_model: String,
    image_model: String,
}

impl GeminiClient {
    /// Create a new Gemini client with an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: API_BASE_URL.to_owned(),
            default_model: DEFAULT_MODEL.to_owned(),
            image_model: DEFAULT_IMAGE_MODEL.to_owned(),
        }
    }

    /// Create a client from the `GEMINI_API_KEY` environment variable
    ///
    /// `GEMINI_MODEL` and `GEMINI_IMAGE_MODEL` override the default models
    /// when set. Intended to be called once at startup so a missing
    /// credential fails the process before any request is accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if `GEMINI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = env::var(GEMINI_API_KEY_ENV).map_err(|_| {
            AppError::config(format!("{GEMINI_API_KEY_ENV} environment variable not set"))
        })?;

        let mut client = Self::new(api_key);
        if let Ok(model) = env::var(GEMINI_MODEL_ENV) {
            client = client.with_default_model(model);
        }
        if let Ok(model) = env::var(GEMINI_IMAGE_MODEL_ENV) {
            client.image_model = model;
        }
        Ok(client)
    }

    /// Set a custom default text model
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Point the client at a different API base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Convert our message role to Gemini's role format
    ///
    /// System messages are handled separately via the `system_instruction`
    /// field; if one appears here, map it to "user" for compatibility.
    const fn convert_role(role: MessageRole) -> &'static str {
        match role {
            MessageRole::System | MessageRole::User => "user",
            MessageRole::Assistant => "model",
        }
    }

    /// Build the API URL for a model and method
    fn build_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{model}:{method}?key={}",
            self.base_url, self.api_key
        )
    }

    /// Convert a message part to the Gemini wire format
    fn convert_part(part: &MessagePart) -> GeminiPart {
        match part {
            MessagePart::Text(text) => GeminiPart::Text { text: text.clone() },
            MessagePart::InlineImage(image) => GeminiPart::InlineData {
                inline_data: InlineDataPart {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            },
        }
    }

    /// Convert chat messages to Gemini format
    fn convert_messages(messages: &[ChatMessage]) -> (Vec<GeminiContent>, Option<GeminiContent>) {
        let mut contents = Vec::new();
        let mut system_instruction = None;

        for message in messages {
            let parts = message.parts.iter().map(Self::convert_part).collect();
            if message.role == MessageRole::System {
                // Gemini uses a separate system_instruction field
                system_instruction = Some(GeminiContent { role: None, parts });
            } else {
                contents.push(GeminiContent {
                    role: Some(Self::convert_role(message.role).to_owned()),
                    parts,
                });
            }
        }

        (contents, system_instruction)
    }

    /// Build a Gemini API request from a [`CompletionRequest`]
    fn build_gemini_request(request: &CompletionRequest) -> GeminiRequest {
        let (contents, system_instruction) = Self::convert_messages(&request.messages);

        let needs_config =
            request.temperature.is_some() || request.max_output_tokens.is_some() || request.json_mode;
        let generation_config = needs_config.then(|| GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
            candidate_count: Some(1),
            response_mime_type: request.json_mode.then(|| "application/json".to_owned()),
        });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    /// Extract text content from a Gemini response
    ///
    /// A response with no candidates at all is treated as an empty
    /// completion; the router reports it with the fixed empty-response error.
    fn extract_content(response: &GeminiResponse) -> Result<String, AppError> {
        let part = response
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .ok_or_else(AppError::empty_completion)?;

        match part {
            GeminiPart::Text { text } => Ok(text.clone()),
            GeminiPart::InlineData { .. } => Err(AppError::internal(
                "Unexpected inline data in model output",
            )),
        }
    }

    /// Convert usage metadata to our token usage format
    fn convert_usage(metadata: &UsageMetadata) -> TokenUsage {
        TokenUsage {
            prompt_tokens: metadata.prompt.unwrap_or(0),
            completion_tokens: metadata.candidates.unwrap_or(0),
            total_tokens: metadata.total.unwrap_or(0),
        }
    }

    /// Map an API error status to the appropriate error type
    ///
    /// For rate limit (429) and quota errors, returns a user-friendly error
    /// that exposes the actual message from Gemini.
    fn map_api_error(status: u16, response_text: &str) -> AppError {
        let message = serde_json::from_str::<GeminiResponse>(response_text)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| response_text.to_owned(), |e| e.message);

        match status {
            429 => AppError::rate_limited(Self::extract_quota_message(&message)),
            _ => AppError::external_service("Gemini", format!("API error ({status}): {message}")),
        }
    }

    /// Extract a user-friendly quota/rate limit message from a Gemini error
    fn extract_quota_message(message: &str) -> String {
        // Look for "Please retry in X" and extract the time value,
        // e.g. "Please retry in 6.406453963s."
        if let Some(retry_pos) = message.find("Please retry in ") {
            let after_prefix = &message[retry_pos + 16..];
            if let Some(s_pos) = after_prefix.find('s') {
                let time_str = &after_prefix[..s_pos];
                if let Ok(seconds) = time_str.parse::<f64>() {
                    let seconds_int = seconds.ceil() as u64;
                    return format!(
                        "AI service quota exceeded. Please try again in {seconds_int} seconds."
                    );
                }
            }
        }
        "AI service quota exceeded. Please wait a moment and try again.".to_owned()
    }

    /// Parse one streaming SSE payload into a stream chunk
    fn parse_stream_data(data: &str) -> Option<Result<StreamChunk, AppError>> {
        match serde_json::from_str::<StreamingResponse>(data) {
            Ok(response) => {
                let candidate = response.candidates.as_ref().and_then(|c| c.first())?;
                let part = candidate
                    .content
                    .as_ref()
                    .and_then(|content| content.parts.first())?;

                let delta = match part {
                    GeminiPart::Text { text } => text.clone(),
                    GeminiPart::InlineData { .. } => return None,
                };

                let is_final = candidate
                    .finish_reason
                    .as_ref()
                    .is_some_and(|reason| reason == "STOP");

                Some(Ok(StreamChunk {
                    delta,
                    is_final,
                    finish_reason: candidate.finish_reason.clone(),
                }))
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse streaming chunk");
                None
            }
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Google Gemini"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::full_featured()
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(DEFAULT_MODEL)))]
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, AppError> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let url = self.build_url(model, "generateContent");

        let gemini_request = Self::build_gemini_request(request);

        debug!("Sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| AppError::external_service("Gemini", format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            AppError::external_service("Gemini", format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            error!(status = %status, "Gemini API error");
            return Err(Self::map_api_error(status.as_u16(), &response_text));
        }

        let gemini_response: GeminiResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                error!(error = %e, "Failed to parse Gemini response");
                AppError::external_service("Gemini", format!("Failed to parse response: {e}"))
            })?;

        if let Some(api_error) = gemini_response.error {
            return Err(AppError::external_service("Gemini", api_error.message));
        }

        let content = Self::extract_content(&gemini_response)?;
        let usage = gemini_response
            .usage_metadata
            .as_ref()
            .map(Self::convert_usage);
        let finish_reason = gemini_response
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.finish_reason.clone());

        debug!("Successfully received Gemini response");

        Ok(CompletionResponse {
            content,
            model: model.to_owned(),
            usage,
            finish_reason,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(DEFAULT_MODEL)))]
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, AppError> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let url = self.build_url(model, "streamGenerateContent");

        let gemini_request = Self::build_gemini_request(request);

        debug!("Starting streaming request to Gemini API");

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse")])
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| AppError::external_service("Gemini", format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            return Err(Self::map_api_error(status.as_u16(), &error_text));
        }

        Ok(create_sse_stream(
            response.bytes_stream(),
            Self::parse_stream_data,
            "Gemini",
        ))
    }

    #[instrument(skip(self, prompt))]
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, AppError> {
        let url = self.build_url(&self.image_model, "predict");

        let predict_request = PredictRequest {
            instances: vec![ImagenInstance {
                prompt: prompt.to_owned(),
            }],
            parameters: ImagenParameters {
                sample_count: 1,
                output_mime_type: "image/jpeg".to_owned(),
            },
        };

        debug!(model = %self.image_model, "Sending image generation request");

        let response = self
            .client
            .post(&url)
            .json(&predict_request)
            .send()
            .await
            .map_err(|e| AppError::external_service("Gemini", format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            AppError::external_service("Gemini", format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            error!(status = %status, "Imagen API error");
            return Err(Self::map_api_error(status.as_u16(), &response_text));
        }

        let predict_response: PredictResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                AppError::external_service("Gemini", format!("Failed to parse response: {e}"))
            })?;

        let prediction = predict_response
            .predictions
            .and_then(|mut predictions| {
                if predictions.is_empty() {
                    None
                } else {
                    Some(predictions.swap_remove(0))
                }
            })
            .ok_or_else(|| {
                AppError::external_service("Gemini", "The AI could not generate an image")
            })?;

        let data = prediction.bytes_base64_encoded.ok_or_else(|| {
            AppError::external_service("Gemini", "The generated image contained no data")
        })?;

        Ok(GeneratedImage {
            data,
            mime_type: prediction
                .mime_type
                .unwrap_or_else(|| "image/jpeg".to_owned()),
        })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, AppError> {
        // Listing models verifies the API key without spending tokens.
        let url = format!("{}/models?key={}", self.base_url, self.api_key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::external_service("Gemini", format!("Health check failed: {e}")))?;

        Ok(response.status().is_success())
    }
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiClient")
            .field("default_model", &self.default_model)
            .field("image_model", &self.image_model)
            .field("api_key", &"[REDACTED]")
            // Omit `client` as HTTP clients are not useful to debug
            .finish_non_exhaustive()
    }
}
