// ABOUTME: LLM provider abstraction layer for pluggable AI model integration
// ABOUTME: Defines the completion-service contract with streaming and image generation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # Completion Provider Interface
//!
//! This module defines the contract the completion service must satisfy to
//! back the assistant. The provider is constructed once at startup and
//! injected into the router as a trait object; tests supply a scripted
//! implementation instead of the network.
//!
//! ## Key Concepts
//!
//! - **`LlmCapabilities`**: bitflags describing provider features
//! - **`CompletionProvider`**: async trait for single-shot, streaming, and
//!   image generation calls
//! - **`ChatMessage`**: role-based message built from text and inline-image
//!   parts
//!
//! ## Example: Using a Provider
//!
//! ```rust,no_run
//! use nutriplan_server::llm::{ChatMessage, CompletionProvider, CompletionRequest};
//!
//! async fn example(provider: &dyn CompletionProvider) {
//!     let request = CompletionRequest::new(vec![
//!         ChatMessage::user("Suggest a high-protein breakfast."),
//!     ]);
//!     let response = provider.complete(&request).await;
//! }
//! ```

mod gemini;
mod sse;

pub use gemini::GeminiClient;
pub use sse::{create_sse_stream, SseEvent, SseLineBuffer};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

use crate::errors::AppError;
use crate::image::InlineImage;

// ============================================================================
// Capability Flags
// ============================================================================

bitflags::bitflags! {
    /// Completion provider capability flags
    ///
    /// Indicates which features a provider supports. Used to decide request
    /// handling (e.g., whether a JSON-output hint can be sent).
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LlmCapabilities: u8 {
        /// Provider supports streaming responses
        const STREAMING = 0b0000_0001;
        /// Provider supports vision/image input
        const VISION = 0b0000_0010;
        /// Provider supports JSON mode output
        const JSON_MODE = 0b0000_0100;
        /// Provider supports system messages
        const SYSTEM_MESSAGES = 0b0000_1000;
        /// Provider supports text-to-image generation
        const IMAGE_GENERATION = 0b0001_0000;
    }
}

impl LlmCapabilities {
    /// Capabilities of a basic text-only provider
    #[must_use]
    pub const fn text_only() -> Self {
        Self::STREAMING.union(Self::SYSTEM_MESSAGES)
    }

    /// Capabilities of a full-featured provider (like Gemini + Imagen)
    #[must_use]
    pub const fn full_featured() -> Self {
        Self::STREAMING
            .union(Self::VISION)
            .union(Self::JSON_MODE)
            .union(Self::SYSTEM_MESSAGES)
            .union(Self::IMAGE_GENERATION)
    }

    /// Check if streaming is supported
    #[must_use]
    pub const fn supports_streaming(&self) -> bool {
        self.contains(Self::STREAMING)
    }

    /// Check if vision input is supported
    #[must_use]
    pub const fn supports_vision(&self) -> bool {
        self.contains(Self::VISION)
    }

    /// Check if JSON mode is supported
    #[must_use]
    pub const fn supports_json_mode(&self) -> bool {
        self.contains(Self::JSON_MODE)
    }

    /// Check if system messages are supported
    #[must_use]
    pub const fn supports_system_messages(&self) -> bool {
        self.contains(Self::SYSTEM_MESSAGES)
    }

    /// Check if image generation is supported
    #[must_use]
    pub const fn supports_image_generation(&self) -> bool {
        self.contains(Self::IMAGE_GENERATION)
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for API calls
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One part of a message: text, or an inline base64 image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessagePart {
    /// Text content
    Text(String),
    /// Inline base64 image content for vision requests
    InlineImage(InlineImage),
}

/// A single message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content parts, in order
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    /// Create a message from explicit parts
    #[must_use]
    pub const fn from_parts(role: MessageRole, parts: Vec<MessagePart>) -> Self {
        Self { role, parts }
    }

    /// Create a text-only message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![MessagePart::Text(content.into())],
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// The message's first text part, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            MessagePart::Text(text) => Some(text.as_str()),
            MessagePart::InlineImage(_) => None,
        })
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Configuration for a completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Model identifier (provider-specific)
    pub model: Option<String>,
    /// Temperature for response randomness (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_output_tokens: Option<u32>,
    /// Ask the provider for JSON-formatted output (structured-output hint)
    pub json_mode: bool,
}

impl CompletionRequest {
    /// Create a new completion request with messages
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_output_tokens: None,
            json_mode: false,
        }
    }

    /// Set the model to use
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum output tokens
    #[must_use]
    pub const fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Request JSON-formatted output
    #[must_use]
    pub const fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

/// Response from a completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated message content
    pub content: String,
    /// Model used for generation
    pub model: String,
    /// Token usage statistics
    pub usage: Option<TokenUsage>,
    /// Finish reason (stop, length, etc.)
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,
    /// Number of tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens used
    pub total_tokens: u32,
}

/// A chunk of a streaming response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Content delta for this chunk
    pub delta: String,
    /// Whether this is the final chunk
    pub is_final: bool,
    /// Finish reason if final
    pub finish_reason: Option<String>,
}

/// Stream type for streaming completion responses
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AppError>> + Send>>;

/// A generated image as base64 bytes with its MIME type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type of the encoded bytes
    pub mime_type: String,
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Completion provider trait backing the assistant
///
/// Implement this trait to back the action router with a different
/// completion service. The design follows the async trait pattern for
/// compatibility with the tokio-based runtime.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Unique provider identifier (e.g., "gemini")
    fn name(&self) -> &'static str;

    /// Human-readable display name for the provider
    fn display_name(&self) -> &'static str;

    /// Provider capabilities (streaming, vision, image generation, etc.)
    fn capabilities(&self) -> LlmCapabilities;

    /// Default model to use if not specified in request
    fn default_model(&self) -> &str;

    /// Perform a completion (non-streaming)
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, AppError>;

    /// Perform a streaming completion
    ///
    /// Returns a stream of chunks that can be consumed incrementally.
    async fn complete_stream(&self, request: &CompletionRequest)
        -> Result<CompletionStream, AppError>;

    /// Generate a single image from a text prompt
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, AppError>;

    /// Check if the provider is healthy and its credential is valid
    async fn health_check(&self) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_text_only() {
        let caps = LlmCapabilities::text_only();
        assert!(caps.supports_streaming());
        assert!(caps.supports_system_messages());
        assert!(!caps.supports_vision());
        assert!(!caps.supports_json_mode());
        assert!(!caps.supports_image_generation());
    }

    #[test]
    fn test_capabilities_full_featured() {
        let caps = LlmCapabilities::full_featured();
        assert!(caps.supports_streaming());
        assert!(caps.supports_vision());
        assert!(caps.supports_json_mode());
        assert!(caps.supports_system_messages());
        assert!(caps.supports_image_generation());
    }

    #[test]
    fn test_chat_message_constructors() {
        let message = ChatMessage::user("hello");
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.text(), Some("hello"));

        let message = ChatMessage::assistant("hi");
        assert_eq!(message.role, MessageRole::Assistant);
    }

    #[test]
    fn test_chat_message_text_skips_images() {
        use crate::image::InlineImage;

        let message = ChatMessage::from_parts(
            MessageRole::User,
            vec![
                MessagePart::InlineImage(InlineImage {
                    mime_type: "image/png".to_owned(),
                    data: "AAAA".to_owned(),
                }),
                MessagePart::Text("what is this?".to_owned()),
            ],
        );
        assert_eq!(message.text(), Some("what is this?"));
    }

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")])
            .with_model("gemini-2.5-flash")
            .with_temperature(0.4)
            .with_max_output_tokens(512)
            .with_json_mode(true);

        assert_eq!(request.model.as_deref(), Some("gemini-2.5-flash"));
        assert!(request.json_mode);
        assert_eq!(request.max_output_tokens, Some(512));
    }
}
