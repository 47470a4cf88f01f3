use qwenshim_protocol::gemini::count_tokens::types::{
    Content as GeminiContent, ContentRole as GeminiContentRole, FunctionCall as GeminiFunctionCall,
    Part as GeminiPart,
};
use qwenshim_protocol::gemini::generate_content::response::GenerateContentResponse as GeminiGenerateContentResponse;
use qwenshim_protocol::gemini::generate_content::types::{Candidate, FinishReason, UsageMetadata};
use qwenshim_protocol::openai::create_chat_completions::response::{
    ChatCompletionChoice, CreateChatCompletionResponse,
};
use qwenshim_protocol::openai::create_chat_completions::types::{
    ChatCompletionFinishReason, ChatCompletionMessageToolCall, ChatCompletionToolCallType,
    CompletionUsage,
};
use serde_json::Value as JsonValue;

/// Convert a chat completion into a contents-style response with one candidate.
pub fn transform_response(response: CreateChatCompletionResponse) -> GeminiGenerateContentResponse {
    let candidate = match response.choices.first() {
        Some(choice) => map_choice_to_candidate(choice),
        None => Candidate {
            content: model_content(Vec::new()),
            finish_reason: None,
            index: Some(0),
        },
    };
    let usage = response.usage.unwrap_or_default();

    GeminiGenerateContentResponse {
        candidates: vec![candidate],
        function_calls: None,
        usage_metadata: Some(map_usage(&usage)),
        model_version: non_empty(response.model),
        response_id: non_empty(response.id),
    }
}

fn map_choice_to_candidate(choice: &ChatCompletionChoice) -> Candidate {
    let message = &choice.message;
    let mut parts = Vec::new();

    if let Some(text) = &message.content
        && !text.is_empty()
    {
        parts.push(GeminiPart::text(text.clone()));
    }

    if let Some(tool_calls) = &message.tool_calls {
        parts.extend(
            tool_calls
                .iter()
                .filter(|call| call.r#type == ChatCompletionToolCallType::Function)
                .map(map_tool_call),
        );
    }

    Candidate {
        content: model_content(parts),
        finish_reason: choice.finish_reason.as_ref().map(map_finish_reason),
        index: u32::try_from(choice.index).ok(),
    }
}

fn map_tool_call(call: &ChatCompletionMessageToolCall) -> GeminiPart {
    GeminiPart::function_call(GeminiFunctionCall {
        id: non_empty(call.id.clone()),
        name: call.function.name.clone(),
        args: Some(parse_arguments(&call.function.arguments)),
    })
}

pub(crate) fn model_content(parts: Vec<GeminiPart>) -> GeminiContent {
    GeminiContent {
        parts,
        role: Some(GeminiContentRole::Model),
    }
}

/// Parses tool-call arguments. Anything that is not a JSON object becomes `{}`.
pub(crate) fn parse_arguments(arguments: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(arguments) {
        Ok(value @ JsonValue::Object(_)) => value,
        _ => JsonValue::Object(Default::default()),
    }
}

pub(crate) fn map_finish_reason(reason: &ChatCompletionFinishReason) -> FinishReason {
    match reason {
        ChatCompletionFinishReason::Stop => FinishReason::Stop,
        ChatCompletionFinishReason::Length => FinishReason::MaxTokens,
        ChatCompletionFinishReason::ContentFilter => FinishReason::Safety,
        _ => FinishReason::Other,
    }
}

pub(crate) fn map_usage(usage: &CompletionUsage) -> UsageMetadata {
    UsageMetadata {
        prompt_token_count: Some(usage.prompt_tokens),
        candidates_token_count: Some(usage.completion_tokens),
        total_token_count: Some(usage.total_tokens),
    }
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
