// ABOUTME: The assistant action endpoint: envelope dispatch, normalization, streaming relay
// ABOUTME: One POST route covering the whole action catalog
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! Assistant routes
//!
//! A single `POST /api/assistant` endpoint accepts `{action, payload}`
//! envelopes, builds the action's prompt, invokes the injected completion
//! provider, normalizes the result, and replies with `{result}`. The chat
//! action instead relays the provider's incremental fragments as
//! newline-delimited JSON. Every failure surfaces as the `{error}` envelope,
//! except mid-stream failures, which can only truncate the stream.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use std::{convert::Infallible, sync::Arc};
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::{
    actions::{self, ActionPlan, Postprocess, Prompt},
    errors::AppError,
    llm::{ChatMessage, CompletionRequest, CompletionResponse, MessageRole},
    normalize,
    server::AppState,
};

/// Assistant routes handler
pub struct AssistantRoutes;

impl AssistantRoutes {
    /// Create the assistant routes
    pub fn routes(state: Arc<AppState>) -> Router {
        Router::new()
            .route(
                "/api/assistant",
                post(Self::dispatch).fallback(Self::method_not_allowed),
            )
            .with_state(state)
    }

    /// Reject non-POST methods with the JSON error envelope
    async fn method_not_allowed() -> Response {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({"error": "Method not allowed"})),
        )
            .into_response()
    }

    /// Decode the envelope and execute the selected action
    async fn dispatch(
        State(state): State<Arc<AppState>>,
        Json(envelope): Json<Value>,
    ) -> Result<Response, AppError> {
        let request = actions::decode_envelope(envelope)?;
        let action = request.name();
        info!(action, "dispatching assistant action");

        match request.into_plan()? {
            ActionPlan::Complete { prompt, post } => Self::complete(&state, prompt, post).await,
            ActionPlan::GenerateImage { prompt } => Self::generate_image(&state, &prompt).await,
            ActionPlan::StreamChat { messages } => Self::relay_chat(&state, messages).await,
        }
    }

    /// Run a single-shot completion and normalize the response
    async fn complete(
        state: &AppState,
        prompt: Prompt,
        post: Postprocess,
    ) -> Result<Response, AppError> {
        let request =
            CompletionRequest::new(vec![ChatMessage::from_parts(MessageRole::User, prompt.parts)])
                .with_json_mode(prompt.json_mode);

        let response = Self::run_completion(state, &request).await?;

        let result = match post {
            Postprocess::Structured => normalize::parse_structured(&response.content)?,
            Postprocess::WeeklyFold => {
                normalize::fold_weekly_plan(normalize::parse_structured(&response.content)?)?
            }
            Postprocess::PlainText => {
                if response.content.trim().is_empty() {
                    return Err(AppError::empty_completion());
                }
                Value::String(response.content)
            }
        };

        Ok((StatusCode::OK, Json(json!({ "result": result }))).into_response())
    }

    /// Generate one image and relay its base64 bytes
    ///
    /// The caller prefixes `data:image/jpeg;base64,` to form a displayable
    /// data URL.
    async fn generate_image(state: &AppState, prompt: &str) -> Result<Response, AppError> {
        let image = tokio::time::timeout(
            state.config.provider_timeout,
            state.provider.generate_image(prompt),
        )
        .await
        .map_err(|_| Self::timeout_error(state))??;

        Ok((StatusCode::OK, Json(json!({ "result": image.data }))).into_response())
    }

    /// Relay a streaming chat completion as newline-delimited JSON
    ///
    /// Fragments are forwarded in arrival order with no aggregation or
    /// reordering, one `{"text": fragment}` object per line. A failure
    /// before the first byte surfaces as a JSON error; a failure after
    /// streaming has begun can only close the connection - the client must
    /// treat the truncated stream as a failure.
    async fn relay_chat(
        state: &AppState,
        messages: Vec<ChatMessage>,
    ) -> Result<Response, AppError> {
        let request = CompletionRequest::new(messages);

        // The time bound covers only the initial request; once fragments
        // flow, the stream runs until the upstream completes.
        let mut upstream = tokio::time::timeout(
            state.config.provider_timeout,
            state.provider.complete_stream(&request),
        )
        .await
        .map_err(|_| Self::timeout_error(state))??;

        // The response body owns the upstream stream: a downstream
        // disconnect drops the body, which stops the upstream pull.
        let body_stream = async_stream::stream! {
            while let Some(chunk) = upstream.next().await {
                match chunk {
                    Ok(chunk) => {
                        if chunk.delta.is_empty() {
                            continue;
                        }
                        let frame = json!({ "text": chunk.delta });
                        yield Ok::<Bytes, Infallible>(Bytes::from(format!("{frame}\n")));
                    }
                    Err(e) => {
                        warn!(error = %e, "upstream stream failed mid-flight; closing relay");
                        break;
                    }
                }
            }
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from_stream(body_stream))
            .map_err(|e| AppError::internal(format!("Failed to build streaming response: {e}")))
    }

    /// Invoke the provider with the configured time bound
    async fn run_completion(
        state: &AppState,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, AppError> {
        tokio::time::timeout(state.config.provider_timeout, state.provider.complete(request))
            .await
            .map_err(|_| Self::timeout_error(state))?
    }

    /// The error reported when a provider call exceeds its time bound
    fn timeout_error(state: &AppState) -> AppError {
        AppError::external_service(
            state.provider.name(),
            format!(
                "completion call exceeded the {}s time limit",
                state.config.provider_timeout.as_secs()
            ),
        )
    }
}
