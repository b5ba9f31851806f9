// ABOUTME: Scripted completion provider for driving the router without the network
// ABOUTME: Records every request so tests can assert prompts and invocation counts

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use nutriplan_server::errors::AppError;
use nutriplan_server::llm::{
    CompletionProvider, CompletionRequest, CompletionResponse, CompletionStream, GeneratedImage,
    LlmCapabilities, StreamChunk,
};

/// One scripted fragment of a streaming reply
#[derive(Debug, Clone)]
pub enum StreamFragment {
    /// A text delta forwarded to the relay
    Text(String),
    /// A mid-stream failure with the given message
    Error(String),
}

impl StreamFragment {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// Scripted [`CompletionProvider`] used by integration tests
///
/// Responses are consumed in order; every request is recorded for prompt
/// assertions, and a call counter backs "never invokes the provider" checks.
#[derive(Default)]
pub struct MockProvider {
    completions: Mutex<VecDeque<Result<String, AppError>>>,
    stream_script: Mutex<Vec<StreamFragment>>,
    stream_error: Mutex<Option<AppError>>,
    image: Mutex<Option<Result<String, AppError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// A provider that answers every completion with the same text
    pub fn text(response: &str) -> Self {
        let provider = Self::default();
        provider
            .completions
            .lock()
            .unwrap()
            .push_back(Ok(response.to_owned()));
        provider
    }

    /// A provider whose next completion fails with the given error
    pub fn failing(error: AppError) -> Self {
        let provider = Self::default();
        provider.completions.lock().unwrap().push_back(Err(error));
        provider
    }

    /// A provider that streams the given fragments in order
    pub fn streaming(fragments: Vec<StreamFragment>) -> Self {
        let provider = Self::default();
        *provider.stream_script.lock().unwrap() = fragments;
        provider
    }

    /// A provider whose streaming call fails before any fragment is produced
    pub fn stream_failing(error: AppError) -> Self {
        let provider = Self::default();
        *provider.stream_error.lock().unwrap() = Some(error);
        provider
    }

    /// A provider that generates one image with the given base64 bytes
    pub fn image(data: &str) -> Self {
        let provider = Self::default();
        *provider.image.lock().unwrap() = Some(Ok(data.to_owned()));
        provider
    }

    /// A provider whose image generation fails with the given error
    pub fn image_failing(error: AppError) -> Self {
        let provider = Self::default();
        *provider.image.lock().unwrap() = Some(Err(error));
        provider
    }

    /// Total provider invocations across all call kinds
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests recorded so far, in order
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn display_name(&self) -> &'static str {
        "Mock Provider"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::full_featured()
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let scripted = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::internal("mock completion script exhausted")));

        scripted.map(|content| CompletionResponse {
            content,
            model: "mock-model".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(error) = self.stream_error.lock().unwrap().take() {
            return Err(error);
        }

        let fragments = std::mem::take(&mut *self.stream_script.lock().unwrap());
        let chunks = fragments.into_iter().map(|fragment| match fragment {
            StreamFragment::Text(delta) => Ok(StreamChunk {
                delta,
                is_final: false,
                finish_reason: None,
            }),
            StreamFragment::Error(message) => Err(AppError::external_service("mock", message)),
        });

        Ok(Box::pin(tokio_stream::iter(chunks)))
    }

    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .image
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(AppError::internal("mock image script exhausted")));

        scripted.map(|data| GeneratedImage {
            data,
            mime_type: "image/jpeg".to_owned(),
        })
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}
