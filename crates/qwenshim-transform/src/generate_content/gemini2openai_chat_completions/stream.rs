use std::collections::BTreeMap;

use qwenshim_protocol::gemini::count_tokens::types::{
    FunctionCall as GeminiFunctionCall, Part as GeminiPart,
};
use qwenshim_protocol::gemini::generate_content::response::GenerateContentResponse;
use qwenshim_protocol::gemini::generate_content::types::{Candidate, FinishReason, UsageMetadata};
use qwenshim_protocol::openai::create_chat_completions::stream::CreateChatCompletionStreamResponse;
use qwenshim_protocol::openai::create_chat_completions::types::ChatCompletionMessageToolCallChunk;

use super::response::{map_finish_reason, map_usage, model_content, non_empty, parse_arguments};

/// Emitted once, before the first reasoning fragment.
pub const REASONING_HEADER: &str = "[思考过程] ";
/// Emitted once, between the reasoning text and the first answer fragment.
pub const ANSWER_SEPARATOR: &str = "\n\n[完整回复]\n\n";

#[derive(Debug, Clone, Default)]
struct ToolCallState {
    id: Option<String>,
    r#type: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl ToolCallState {
    fn merge(&mut self, chunk: ChatCompletionMessageToolCallChunk) {
        if let Some(id) = chunk.id.filter(|id| !id.is_empty()) {
            self.id = Some(id);
        }
        if let Some(kind) = chunk.r#type {
            self.r#type = Some(kind);
        }
        if let Some(function) = chunk.function {
            if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                self.name = Some(name);
            }
            if let Some(arguments) = function.arguments {
                self.arguments.push_str(&arguments);
            }
        }
    }

    /// `None` unless the entry was typed `function` and received a name.
    fn finalize(self) -> Option<GeminiFunctionCall> {
        if self.r#type.as_deref() != Some("function") {
            return None;
        }
        let name = self.name?;
        Some(GeminiFunctionCall {
            id: self.id,
            name,
            args: Some(parse_arguments(&self.arguments)),
        })
    }
}

/// Re-assembles streamed chat-completion chunks into contents-style responses.
///
/// Text fragments are forwarded as they arrive. Tool-call fragments are held
/// back per index until the first chunk carrying a finish reason, then
/// released together in one response. Usage is remembered and emitted by
/// [`finish`](Self::finish) once the upstream stream has ended.
#[derive(Debug, Clone)]
pub struct OpenAIChatCompletionToGeminiStreamState {
    supports_reasoning: bool,
    response_id: Option<String>,
    model_version: Option<String>,
    answer: String,
    reasoning: String,
    answering: bool,
    tool_calls: BTreeMap<usize, ToolCallState>,
    usage: Option<UsageMetadata>,
}

impl OpenAIChatCompletionToGeminiStreamState {
    pub fn new(supports_reasoning: bool) -> Self {
        Self {
            supports_reasoning,
            response_id: None,
            model_version: None,
            answer: String::new(),
            reasoning: String::new(),
            answering: false,
            tool_calls: BTreeMap::new(),
            usage: None,
        }
    }

    pub fn transform_chunk(
        &mut self,
        chunk: CreateChatCompletionStreamResponse,
    ) -> Vec<GenerateContentResponse> {
        self.update_from_chunk(&chunk);

        let mut responses = Vec::new();
        if let Some(choice) = chunk.choices.into_iter().next() {
            let finish_reason = choice.finish_reason.as_ref().map(map_finish_reason);
            let delta = choice.delta;

            if self.supports_reasoning
                && let Some(reasoning) = delta.reasoning_content.filter(|text| !text.is_empty())
            {
                if self.reasoning.is_empty() {
                    responses.push(self.text_response(REASONING_HEADER.to_string(), None));
                }
                self.reasoning.push_str(&reasoning);
                responses.push(self.text_response(reasoning, None));
            }

            if let Some(content) = delta.content.filter(|text| !text.is_empty()) {
                if self.supports_reasoning && !self.reasoning.is_empty() && !self.answering {
                    responses.push(self.text_response(ANSWER_SEPARATOR.to_string(), None));
                    self.answering = true;
                }
                self.answer.push_str(&content);
                responses.push(self.text_response(content, finish_reason));
            }

            for tool_call in delta.tool_calls.into_iter().flatten() {
                self.tool_calls
                    .entry(tool_call.index)
                    .or_default()
                    .merge(tool_call);
            }

            if finish_reason.is_some() && !self.tool_calls.is_empty() {
                responses.extend(self.flush_tool_calls());
            }
        }

        if let Some(usage) = &chunk.usage {
            self.usage = Some(map_usage(usage));
        }

        responses
    }

    /// Consumes the state once the upstream stream has ended.
    pub fn finish(self) -> Vec<GenerateContentResponse> {
        let Some(usage) = self.usage else {
            return Vec::new();
        };
        vec![GenerateContentResponse {
            candidates: Vec::new(),
            function_calls: None,
            usage_metadata: Some(usage),
            model_version: self.model_version,
            response_id: self.response_id,
        }]
    }

    pub fn answer_text(&self) -> &str {
        &self.answer
    }

    pub fn reasoning_text(&self) -> &str {
        &self.reasoning
    }

    fn flush_tool_calls(&mut self) -> Option<GenerateContentResponse> {
        let pending = std::mem::take(&mut self.tool_calls);
        let calls: Vec<GeminiFunctionCall> = pending
            .into_values()
            .filter_map(ToolCallState::finalize)
            .collect();
        if calls.is_empty() {
            return None;
        }

        Some(GenerateContentResponse {
            candidates: Vec::new(),
            function_calls: Some(calls),
            usage_metadata: None,
            model_version: self.model_version.clone(),
            response_id: self.response_id.clone(),
        })
    }

    fn text_response(
        &self,
        text: String,
        finish_reason: Option<FinishReason>,
    ) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: model_content(vec![GeminiPart::text(text)]),
                finish_reason,
                index: Some(0),
            }],
            function_calls: None,
            usage_metadata: None,
            model_version: self.model_version.clone(),
            response_id: self.response_id.clone(),
        }
    }

    fn update_from_chunk(&mut self, chunk: &CreateChatCompletionStreamResponse) {
        if let Some(id) = non_empty(chunk.id.clone()) {
            self.response_id = Some(id);
        }
        if let Some(model) = non_empty(chunk.model.clone()) {
            self.model_version = Some(model);
        }
    }
}

impl Default for OpenAIChatCompletionToGeminiStreamState {
    fn default() -> Self {
        Self::new(false)
    }
}
