use qwenshim_protocol::gemini::count_tokens::types::{
    Content as GeminiContent, ContentRole as GeminiContentRole,
    FunctionResponse as GeminiFunctionResponse,
};
use qwenshim_protocol::gemini::generate_content::request::{
    GenerateContentConfig, GenerateContentRequest as GeminiGenerateContentRequest,
};
use qwenshim_protocol::gemini::generate_content::types::{FunctionDeclaration, ToolListUnion};
use qwenshim_protocol::openai::create_chat_completions::request::{
    CreateChatCompletionRequest, StopConfiguration,
};
use qwenshim_protocol::openai::create_chat_completions::types::{
    ChatCompletionImageUrl, ChatCompletionMessageToolCall, ChatCompletionMessageToolCallFunction,
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
    ChatCompletionRequestUserMessage, ChatCompletionStreamOptions, ChatCompletionToolCallType,
    ChatCompletionToolChoiceMode, ChatCompletionToolDefinition, ChatCompletionUserContent,
    ChatCompletionUserContentPart, ChatCompletionVideoUrl, FunctionObject,
};
use serde_json::json;
use tracing::warn;

use crate::contents::{Turn, TurnPart, extract_text, normalize_contents};

/// Per-call switches that depend on the target model or the call kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Send media as `image_url` / `video_url` blocks instead of placeholders.
    pub supports_vision: bool,
    pub stream: bool,
}

/// Picks the requested model id, falling back when it is absent or blank.
pub fn resolve_model(requested: Option<&str>, default_model: &str) -> String {
    match requested.map(str::trim) {
        Some(model) if !model.is_empty() => model.to_string(),
        _ => default_model.to_string(),
    }
}

/// Convert a contents-style request into a chat-completions request for `model`.
pub fn transform_request(
    request: GeminiGenerateContentRequest,
    model: String,
    options: TranslateOptions,
) -> CreateChatCompletionRequest {
    let config = request.config.unwrap_or_default();

    let mut messages = Vec::new();
    if let Some(system_instruction) = &config.system_instruction
        && let Some(message) = map_system_instruction(system_instruction)
    {
        messages.push(message);
    }

    for turn in normalize_contents(request.contents) {
        messages.extend(map_turn_to_messages(turn, options));
    }

    let tools = map_tools(config.tools.as_deref());
    let tool_choice = tools.as_ref().map(|_| ChatCompletionToolChoiceMode::Auto);
    let stop = map_stop_sequences(&config);

    CreateChatCompletionRequest {
        model,
        messages,
        temperature: config.temperature,
        max_tokens: config.max_output_tokens,
        top_p: config.top_p,
        stop,
        stream: options.stream,
        stream_options: options.stream.then_some(ChatCompletionStreamOptions {
            include_usage: Some(true),
        }),
        tools,
        tool_choice,
    }
}

fn map_system_instruction(system: &GeminiContent) -> Option<ChatCompletionRequestMessage> {
    let texts: Vec<&str> = system
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .filter(|text| !text.is_empty())
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage {
                content: texts.join("\n"),
            },
        ))
    }
}

fn map_turn_to_messages(turn: Turn, options: TranslateOptions) -> Vec<ChatCompletionRequestMessage> {
    match turn.role.clone() {
        GeminiContentRole::User => map_user_turn_to_messages(turn, options),
        GeminiContentRole::Model => map_model_turn_to_messages(turn),
        GeminiContentRole::Function => vec![map_function_turn_to_message(turn)],
        GeminiContentRole::System => vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage {
                content: turn.text(),
            },
        )],
        GeminiContentRole::Other(role) => {
            warn!(event = "unknown_content_role", role = %role, "treating turn as user");
            map_user_turn_to_messages(turn, options)
        }
    }
}

fn map_user_turn_to_messages(
    turn: Turn,
    options: TranslateOptions,
) -> Vec<ChatCompletionRequestMessage> {
    let mut messages = Vec::new();
    let mut parts = Vec::with_capacity(turn.parts.len());

    for part in turn.parts {
        match part {
            TurnPart::FunctionResponse(response) => messages.push(
                ChatCompletionRequestMessage::Tool(map_function_response_to_tool_message(
                    &response,
                )),
            ),
            other => parts.push(other),
        }
    }

    let had_tool_results = !messages.is_empty();
    let multimodal = options.supports_vision && parts.iter().any(TurnPart::is_media);
    let content = if multimodal {
        Some(ChatCompletionUserContent::Parts(map_parts_to_user_blocks(
            &parts,
        )))
    } else {
        let text = extract_text(&parts);
        if text.is_empty() && had_tool_results {
            None
        } else {
            Some(ChatCompletionUserContent::Text(text))
        }
    };

    if let Some(content) = content {
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage { content },
        ));
    }

    messages
}

fn map_model_turn_to_messages(turn: Turn) -> Vec<ChatCompletionRequestMessage> {
    let text = turn.text();
    let tool_calls: Vec<ChatCompletionMessageToolCall> = turn
        .parts
        .iter()
        .filter_map(|part| match part {
            TurnPart::FunctionCall(call) if !call.name.is_empty() => {
                let arguments = call
                    .args
                    .as_ref()
                    .and_then(|value| serde_json::to_string(value).ok())
                    .unwrap_or_else(|| "{}".to_string());
                Some(ChatCompletionMessageToolCall {
                    id: call.id.clone().unwrap_or_else(next_tool_call_id),
                    r#type: ChatCompletionToolCallType::Function,
                    function: ChatCompletionMessageToolCallFunction {
                        name: call.name.clone(),
                        arguments,
                    },
                })
            }
            _ => None,
        })
        .collect();

    let content = if text.is_empty() && !tool_calls.is_empty() {
        None
    } else {
        Some(text)
    };

    vec![ChatCompletionRequestMessage::Assistant(
        ChatCompletionRequestAssistantMessage {
            content,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
        },
    )]
}

fn map_function_turn_to_message(turn: Turn) -> ChatCompletionRequestMessage {
    let response = turn.parts.iter().find_map(|part| match part {
        TurnPart::FunctionResponse(response) => Some(response),
        _ => None,
    });

    let mut content = turn.text();
    if content.is_empty()
        && let Some(response) = response
    {
        content = serialize_response(response);
    }

    ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
        content,
        tool_call_id: response
            .map(|response| response.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(next_tool_call_id),
    })
}

fn map_function_response_to_tool_message(
    response: &GeminiFunctionResponse,
) -> ChatCompletionRequestToolMessage {
    ChatCompletionRequestToolMessage {
        content: serialize_response(response),
        tool_call_id: tool_call_id_for(response),
    }
}

/// Id for tool results sent inside user turns: response id, then name.
fn tool_call_id_for(response: &GeminiFunctionResponse) -> String {
    match (&response.id, response.name.is_empty()) {
        (Some(id), _) if !id.is_empty() => id.clone(),
        (_, false) => response.name.clone(),
        _ => next_tool_call_id(),
    }
}

fn serialize_response(response: &GeminiFunctionResponse) -> String {
    match &response.response {
        serde_json::Value::String(text) => text.clone(),
        value => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn map_parts_to_user_blocks(parts: &[TurnPart]) -> Vec<ChatCompletionUserContentPart> {
    let mut blocks = Vec::new();

    for part in parts {
        match part {
            TurnPart::Text(text) if !text.is_empty() => {
                blocks.push(ChatCompletionUserContentPart::Text { text: text.clone() });
            }
            TurnPart::InlineData { mime_type, data } => {
                let url = format!("data:{};base64,{}", mime_type, data);
                if let Some(block) = media_block(mime_type, url) {
                    blocks.push(block);
                }
            }
            TurnPart::FileData {
                mime_type: Some(mime_type),
                file_uri,
            } => {
                if let Some(block) = media_block(mime_type, file_uri.clone()) {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }

    if blocks.is_empty() {
        blocks.push(ChatCompletionUserContentPart::Text {
            text: String::new(),
        });
    }

    blocks
}

fn media_block(mime_type: &str, url: String) -> Option<ChatCompletionUserContentPart> {
    if mime_type.starts_with("image/") {
        Some(ChatCompletionUserContentPart::ImageUrl {
            image_url: ChatCompletionImageUrl { url },
        })
    } else if mime_type.starts_with("video/") {
        Some(ChatCompletionUserContentPart::VideoUrl {
            video_url: ChatCompletionVideoUrl { url },
        })
    } else {
        None
    }
}

fn next_tool_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

fn map_tools(tools: Option<&[ToolListUnion]>) -> Option<Vec<ChatCompletionToolDefinition>> {
    let tools: Vec<ChatCompletionToolDefinition> = tools?
        .iter()
        .flat_map(ToolListUnion::declarations)
        .map(|declaration| ChatCompletionToolDefinition::Function {
            function: map_function_tool(declaration),
        })
        .collect();

    if tools.is_empty() { None } else { Some(tools) }
}

fn map_function_tool(declaration: &FunctionDeclaration) -> FunctionObject {
    FunctionObject {
        name: declaration.name.clone(),
        description: if declaration.description.is_empty() {
            None
        } else {
            Some(declaration.description.clone())
        },
        parameters: declaration
            .parameters
            .clone()
            .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
    }
}

fn map_stop_sequences(config: &GenerateContentConfig) -> Option<StopConfiguration> {
    let stops = config.stop_sequences.as_ref()?;
    match stops.len() {
        0 => None,
        1 => Some(StopConfiguration::Single(stops[0].clone())),
        _ => Some(StopConfiguration::Many(stops.clone())),
    }
}
