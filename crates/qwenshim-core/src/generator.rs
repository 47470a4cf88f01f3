use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use qwenshim_protocol::gemini::count_tokens::{CountTokensRequest, CountTokensResponse};
use qwenshim_protocol::gemini::embed_content::{EmbedContentRequest, EmbedContentResponse};
use qwenshim_protocol::gemini::generate_content::{
    GenerateContentRequest, GenerateContentResponse,
};
use qwenshim_protocol::openai::create_chat_completions::{
    CreateChatCompletionResponse, CreateChatCompletionStreamResponse,
};
use qwenshim_protocol::sse::{SseEvent, SseParser};
use qwenshim_transform::count_tokens;
use qwenshim_transform::generate_content::gemini2openai_chat_completions::{
    OpenAIChatCompletionToGeminiStreamState, TranslateOptions, resolve_model, transform_request,
    transform_response,
};
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Operation};
use crate::models::ModelCapabilities;
use crate::upstream_client::{ByteStream, UpstreamClient};

pub const EMBEDDING_UNSUPPORTED: &str =
    "Qwen does not support embeddings (通义千问暂不支持嵌入功能)";

pub type GenerateContentStream =
    Pin<Box<dyn Stream<Item = Result<GenerateContentResponse, GeneratorError>> + Send>>;

/// Contents-schema generation backend.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeneratorError>;

    /// Partial responses in upstream arrival order. Failures before the first
    /// byte surface from the call itself; later ones as the last stream item.
    async fn generate_content_stream(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentStream, GeneratorError>;

    async fn count_tokens(
        &self,
        request: CountTokensRequest,
    ) -> Result<CountTokensResponse, GeneratorError>;

    async fn embed_content(
        &self,
        request: EmbedContentRequest,
    ) -> Result<EmbedContentResponse, GeneratorError>;
}

/// [`ContentGenerator`] backed by an OpenAI-compatible chat-completions
/// endpoint (DashScope compatible mode by default).
#[derive(Clone)]
pub struct QwenContentGenerator {
    config: GeneratorConfig,
    upstream: UpstreamClient,
}

impl QwenContentGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let upstream = UpstreamClient::new(&config)?;
        Ok(Self { config, upstream })
    }

    pub fn from_env() -> Result<Self, GeneratorError> {
        Self::new(GeneratorConfig::from_env_with(Default::default())?)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn prepare(
        &self,
        request: GenerateContentRequest,
        stream: bool,
    ) -> Result<(String, ModelCapabilities, Bytes), serde_json::Error> {
        let model = resolve_model(request.model.as_deref(), &self.config.default_model);
        let capabilities = ModelCapabilities::for_model(&model);
        let options = TranslateOptions {
            supports_vision: capabilities.vision,
            stream,
        };
        let upstream_request = transform_request(request, model.clone(), options);
        let body = serde_json::to_vec(&upstream_request)?;
        Ok((model, capabilities, Bytes::from(body)))
    }
}

#[async_trait]
impl ContentGenerator for QwenContentGenerator {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeneratorError> {
        let op = Operation::Generate;
        let (model, _, body) = self
            .prepare(request, false)
            .map_err(|err| GeneratorError::encode(op, err))?;

        let resp = self
            .upstream
            .send_chat_completion("generate_content", &model, body, false)
            .await
            .map_err(|err| GeneratorError::transport(op, err))?;
        let bytes = UpstreamClient::read_body(resp)
            .await
            .map_err(|err| GeneratorError::transport(op, err))?;

        let completion: CreateChatCompletionResponse =
            serde_json::from_slice(&bytes).map_err(|err| GeneratorError::decode(op, err))?;
        Ok(transform_response(completion))
    }

    async fn generate_content_stream(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentStream, GeneratorError> {
        let op = Operation::Stream;
        let (model, capabilities, body) = self
            .prepare(request, true)
            .map_err(|err| GeneratorError::encode(op, err))?;

        let resp = self
            .upstream
            .send_chat_completion("generate_content_stream", &model, body, true)
            .await
            .map_err(|err| GeneratorError::transport(op, err))?;

        let driver = StreamDriver::new(
            self.upstream.byte_stream(resp),
            OpenAIChatCompletionToGeminiStreamState::new(capabilities.reasoning),
        );
        Ok(Box::pin(stream::unfold(driver, StreamDriver::next)))
    }

    async fn count_tokens(
        &self,
        request: CountTokensRequest,
    ) -> Result<CountTokensResponse, GeneratorError> {
        Ok(count_tokens::transform_request(request))
    }

    async fn embed_content(
        &self,
        _request: EmbedContentRequest,
    ) -> Result<EmbedContentResponse, GeneratorError> {
        Err(GeneratorError::UnsupportedOperation(EMBEDDING_UNSUPPORTED))
    }
}

type StreamItem = Result<GenerateContentResponse, GeneratorError>;

/// Pulls body chunks on demand and feeds decoded chunks through the stream
/// state. Stops for good after `[DONE]`, end of body, or the first error.
struct StreamDriver {
    body: ByteStream,
    parser: SseParser,
    state: Option<OpenAIChatCompletionToGeminiStreamState>,
    pending: VecDeque<StreamItem>,
    done: bool,
}

impl StreamDriver {
    fn new(body: ByteStream, state: OpenAIChatCompletionToGeminiStreamState) -> Self {
        Self {
            body,
            parser: SseParser::new(),
            state: Some(state),
            pending: VecDeque::new(),
            done: false,
        }
    }

    async fn next(mut self) -> Option<(StreamItem, Self)> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some((item, self));
            }
            if self.done {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => {
                    let events = self.parser.push_bytes(&chunk);
                    self.handle_events(events);
                }
                Some(Err(err)) => self.fail(GeneratorError::transport(Operation::Stream, err)),
                None => {
                    let events = self.parser.finish();
                    self.handle_events(events);
                    self.finish_state();
                }
            }
        }
    }

    fn handle_events(&mut self, events: Vec<SseEvent>) {
        for event in events {
            if self.done {
                return;
            }
            if event.is_done() {
                self.finish_state();
                return;
            }
            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            match serde_json::from_str::<CreateChatCompletionStreamResponse>(data) {
                Ok(chunk) => {
                    if let Some(state) = self.state.as_mut() {
                        self.pending
                            .extend(state.transform_chunk(chunk).into_iter().map(Ok));
                    }
                }
                Err(err) => {
                    debug!(event = "stream_chunk_invalid", data = %data);
                    self.fail(GeneratorError::decode(Operation::Stream, err));
                }
            }
        }
    }

    fn finish_state(&mut self) {
        if let Some(state) = self.state.take() {
            self.pending.extend(state.finish().into_iter().map(Ok));
        }
        self.done = true;
    }

    fn fail(&mut self, err: GeneratorError) {
        self.state = None;
        self.pending.push_back(Err(err));
        self.done = true;
    }
}
