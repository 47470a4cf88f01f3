use super::*;
use qwenshim_protocol::gemini::count_tokens::types::ContentListUnion;
use qwenshim_protocol::gemini::generate_content::request::{
    GenerateContentConfig, GenerateContentRequest,
};
use qwenshim_protocol::gemini::generate_content::response::GenerateContentResponse;
use qwenshim_protocol::gemini::generate_content::types::FinishReason;
use qwenshim_protocol::openai::create_chat_completions::response::CreateChatCompletionResponse;
use qwenshim_protocol::openai::create_chat_completions::stream::CreateChatCompletionStreamResponse;
use qwenshim_protocol::openai::create_chat_completions::types::{
    ChatCompletionRequestMessage, ChatCompletionToolChoiceMode, ChatCompletionUserContent,
};
use serde_json::{Value, json};

fn contents(value: Value) -> ContentListUnion {
    serde_json::from_value(value).unwrap()
}

fn translate(value: Value, options: TranslateOptions) -> Vec<Value> {
    let request = GenerateContentRequest::new("qwen-plus", contents(value));
    let out = transform_request(request, "qwen-plus".to_string(), options);
    out.messages
        .iter()
        .map(|message| serde_json::to_value(message).unwrap())
        .collect()
}

fn chunk(value: Value) -> CreateChatCompletionStreamResponse {
    serde_json::from_value(value).unwrap()
}

fn texts(responses: &[GenerateContentResponse]) -> Vec<String> {
    responses.iter().filter_map(|r| r.text()).collect()
}

#[test]
fn resolve_model_falls_back_on_blank() {
    assert_eq!(resolve_model(None, "qwen-plus"), "qwen-plus");
    assert_eq!(resolve_model(Some("  "), "qwen-plus"), "qwen-plus");
    assert_eq!(resolve_model(Some("qvq-max-latest"), "qwen-plus"), "qvq-max-latest");
}

#[test]
fn plain_string_is_one_user_message() {
    let messages = translate(json!("hello"), TranslateOptions::default());
    assert_eq!(messages, vec![json!({"role": "user", "content": "hello"})]);
}

#[test]
fn roles_map_to_chat_messages() {
    let messages = translate(
        json!([
            {"role": "system", "parts": [{"text": "be brief"}]},
            {"role": "user", "parts": [{"text": "weather?"}]},
            {"role": "model", "parts": [{"functionCall": {"id": "c1", "name": "get_weather", "args": {"city": "Paris"}}}]},
            {"role": "function", "parts": [{"functionResponse": {"id": "c1", "name": "get_weather", "response": {"temp": 20}}}]},
            {"role": "narrator", "parts": [{"text": "odd"}]}
        ]),
        TranslateOptions::default(),
    );

    assert_eq!(messages[0], json!({"role": "system", "content": "be brief"}));
    assert_eq!(messages[1], json!({"role": "user", "content": "weather?"}));
    assert_eq!(
        messages[2],
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "c1",
                "type": "function",
                "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
            }]
        })
    );
    assert_eq!(
        messages[3],
        json!({"role": "tool", "content": "{\"temp\":20}", "tool_call_id": "get_weather"})
    );
    assert_eq!(messages[4], json!({"role": "user", "content": "odd"}));
}

#[test]
fn function_turn_id_falls_back_to_name_then_synthesized() {
    let messages = translate(
        json!([
            {"role": "function", "parts": [{"functionResponse": {"name": "lookup", "response": {}}}]},
            {"role": "function", "parts": [{"text": "done"}]}
        ]),
        TranslateOptions::default(),
    );
    assert_eq!(messages[0]["tool_call_id"], "lookup");
    assert_eq!(messages[1]["content"], "done");
    assert!(
        messages[1]["tool_call_id"]
            .as_str()
            .unwrap()
            .starts_with("call_")
    );
}

#[test]
fn model_turn_synthesizes_ids_and_drops_nameless_calls() {
    let messages = translate(
        json!([{"role": "model", "parts": [
            {"text": "checking"},
            {"functionCall": {"name": "search"}},
            {"functionCall": {"name": ""}}
        ]}]),
        TranslateOptions::default(),
    );
    let calls = messages[0]["tool_calls"].as_array().unwrap();
    assert_eq!(messages[0]["content"], "checking");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["function"]["arguments"], "{}");
    assert!(calls[0]["id"].as_str().unwrap().starts_with("call_"));
}

#[test]
fn user_function_responses_become_tool_messages_first() {
    let messages = translate(
        json!([{"role": "user", "parts": [
            {"functionResponse": {"id": "c9", "name": "calc", "response": {"result": 3}}}
        ]}]),
        TranslateOptions::default(),
    );
    assert_eq!(
        messages,
        vec![json!({"role": "tool", "content": "{\"result\":3}", "tool_call_id": "c9"})]
    );
}

#[test]
fn media_uses_placeholders_without_vision() {
    let messages = translate(
        json!([{"role": "user", "parts": [
            {"text": "see "},
            {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
            {"fileData": {"mimeType": "application/pdf", "fileUri": "gs://doc"}}
        ]}]),
        TranslateOptions::default(),
    );
    assert_eq!(messages[0]["content"], "see [图片内容][文件内容]");
}

#[test]
fn media_becomes_blocks_with_vision() {
    let request = GenerateContentRequest::new(
        "qvq-max-latest",
        contents(json!([{"role": "user", "parts": [
            {"text": "describe"},
            {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
            {"inlineData": {"mimeType": "video/mp4", "data": "BBBB"}},
            {"fileData": {"mimeType": "image/jpeg", "fileUri": "https://x/y.jpg"}},
            {"inlineData": {"mimeType": "audio/wav", "data": "CCCC"}}
        ]}])),
    );
    let out = transform_request(
        request,
        "qvq-max-latest".to_string(),
        TranslateOptions {
            supports_vision: true,
            stream: false,
        },
    );

    let ChatCompletionRequestMessage::User(user) = &out.messages[0] else {
        panic!("expected user message");
    };
    let ChatCompletionUserContent::Parts(blocks) = &user.content else {
        panic!("expected content blocks");
    };
    assert_eq!(blocks.len(), 4);
    assert_eq!(
        serde_json::to_value(&blocks[1]).unwrap(),
        json!({"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}})
    );
    assert_eq!(
        serde_json::to_value(&blocks[2]).unwrap(),
        json!({"type": "video_url", "video_url": {"url": "data:video/mp4;base64,BBBB"}})
    );
    assert_eq!(
        serde_json::to_value(&blocks[3]).unwrap(),
        json!({"type": "image_url", "image_url": {"url": "https://x/y.jpg"}})
    );
}

#[test]
fn unsupported_media_only_yields_one_empty_text_block() {
    let messages = translate(
        json!([{"role": "user", "parts": [
            {"inlineData": {"mimeType": "audio/wav", "data": "CCCC"}}
        ]}]),
        TranslateOptions {
            supports_vision: true,
            stream: false,
        },
    );
    assert_eq!(messages[0]["content"], json!([{"type": "text", "text": ""}]));
}

#[test]
fn config_tools_and_stream_flags() {
    let config: GenerateContentConfig = serde_json::from_value(json!({
        "temperature": 0.2,
        "maxOutputTokens": 128,
        "topP": 0.9,
        "stopSequences": ["END"],
        "systemInstruction": {"parts": [{"text": "sys"}]},
        "tools": [
            {"functionDeclarations": [{"name": "a", "description": "first"}]},
            {"name": "b", "description": "second", "parameters": {"type": "object", "properties": {"x": {"type": "number"}}}}
        ]
    }))
    .unwrap();
    let request = GenerateContentRequest::new("qwen-plus", "hi").with_config(config);
    let out = transform_request(
        request,
        "qwen-plus".to_string(),
        TranslateOptions {
            supports_vision: false,
            stream: true,
        },
    );
    let body = serde_json::to_value(&out).unwrap();

    assert_eq!(body["model"], "qwen-plus");
    assert_eq!(body["temperature"], 0.2);
    assert_eq!(body["max_tokens"], 128);
    assert_eq!(body["top_p"], 0.9);
    assert_eq!(body["stop"], "END");
    assert_eq!(body["stream"], true);
    assert_eq!(body["stream_options"], json!({"include_usage": true}));
    assert_eq!(body["messages"][0], json!({"role": "system", "content": "sys"}));
    assert_eq!(
        body["tools"][0]["function"]["parameters"],
        json!({"type": "object", "properties": {}})
    );
    assert_eq!(body["tools"][1]["function"]["name"], "b");
    assert_eq!(out.tool_choice, Some(ChatCompletionToolChoiceMode::Auto));
}

#[test]
fn without_tools_no_tool_choice_is_sent() {
    let out = transform_request(
        GenerateContentRequest::new("qwen-plus", "hi"),
        "qwen-plus".to_string(),
        TranslateOptions::default(),
    );
    let body = serde_json::to_value(&out).unwrap();
    assert!(body.get("tools").is_none());
    assert!(body.get("tool_choice").is_none());
    assert!(body.get("stream_options").is_none());
    assert_eq!(body["stream"], false);
}

#[test]
fn text_completion_maps_to_one_candidate() {
    let response: CreateChatCompletionResponse = serde_json::from_value(json!({
        "id": "chatcmpl-1",
        "model": "qwen-plus",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi there"}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
    }))
    .unwrap();
    let out = transform_response(response);

    assert_eq!(out.candidates.len(), 1);
    assert_eq!(out.text().as_deref(), Some("Hi there"));
    assert_eq!(out.candidates[0].content.parts.len(), 1);
    assert_eq!(out.candidates[0].finish_reason, Some(FinishReason::Stop));
    let usage = out.usage_metadata.unwrap();
    assert_eq!(usage.total_token_count, Some(5));
    assert_eq!(out.response_id.as_deref(), Some("chatcmpl-1"));
    assert_eq!(out.model_version.as_deref(), Some("qwen-plus"));
}

#[test]
fn tool_call_completion_maps_to_function_call_part() {
    let response: CreateChatCompletionResponse = serde_json::from_value(json!({
        "id": "chatcmpl-2",
        "model": "qwen-plus",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": null, "tool_calls": [
            {"id": "call_a", "type": "function", "function": {"name": "foo", "arguments": "{\"x\":1}"}},
            {"id": "call_b", "type": "function", "function": {"name": "bar", "arguments": "{oops"}}
        ]}, "finish_reason": "tool_calls"}]
    }))
    .unwrap();
    let out = transform_response(response);

    let calls = out.all_function_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].name, "foo");
    assert_eq!(calls[0].args, Some(json!({"x": 1})));
    assert_eq!(calls[1].args, Some(json!({})));
    assert_eq!(out.candidates[0].finish_reason, Some(FinishReason::Other));
    assert_eq!(out.usage_metadata.unwrap().prompt_token_count, Some(0));
}

#[test]
fn non_function_tool_calls_are_skipped() {
    let response: CreateChatCompletionResponse = serde_json::from_value(json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok", "tool_calls": [
            {"id": "call_x", "type": "code_interpreter", "function": {"name": "run", "arguments": "{}"}},
            {"id": "call_y", "type": "function", "function": {"name": "foo", "arguments": "{}"}}
        ]}, "finish_reason": "tool_calls"}]
    }))
    .unwrap();
    let out = transform_response(response);

    assert_eq!(out.text().as_deref(), Some("ok"));
    let calls = out.all_function_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "foo");
}

#[test]
fn finish_reasons_and_empty_choices() {
    for (reason, expected) in [
        (json!("length"), Some(FinishReason::MaxTokens)),
        (json!("content_filter"), Some(FinishReason::Safety)),
        (json!("weird"), Some(FinishReason::Other)),
        (Value::Null, None),
    ] {
        let response: CreateChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "x"}, "finish_reason": reason}]
        }))
        .unwrap();
        assert_eq!(transform_response(response).candidates[0].finish_reason, expected);
    }

    let empty: CreateChatCompletionResponse =
        serde_json::from_value(json!({"id": "e", "choices": []})).unwrap();
    let out = transform_response(empty);
    assert_eq!(out.candidates.len(), 1);
    assert!(out.candidates[0].content.parts.is_empty());
    assert_eq!(out.candidates[0].finish_reason, None);
}

#[test]
fn stream_text_fragments_are_forwarded_in_order() {
    let mut state = OpenAIChatCompletionToGeminiStreamState::new(false);
    let mut out = Vec::new();
    out.extend(state.transform_chunk(chunk(json!({"id": "s1", "model": "qwen-plus", "choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hel"}}]}))));
    out.extend(state.transform_chunk(chunk(json!({"id": "s1", "model": "qwen-plus", "choices": [{"index": 0, "delta": {"content": "lo"}, "finish_reason": "stop"}]}))));
    out.extend(state.transform_chunk(chunk(json!({"id": "s1", "model": "qwen-plus", "choices": [], "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}}))));

    assert_eq!(texts(&out), vec!["Hel", "lo"]);
    assert_eq!(out[1].candidates[0].finish_reason, Some(FinishReason::Stop));
    assert_eq!(state.answer_text(), "Hello");

    let tail = state.finish();
    assert_eq!(tail.len(), 1);
    assert!(tail[0].candidates.is_empty());
    assert_eq!(tail[0].usage_metadata.as_ref().unwrap().total_token_count, Some(3));
    assert_eq!(tail[0].response_id.as_deref(), Some("s1"));
}

#[test]
fn stream_tool_call_fragments_are_accumulated() {
    let mut state = OpenAIChatCompletionToGeminiStreamState::new(false);
    let mut out = Vec::new();
    for delta in [
        json!({"tool_calls": [{"index": 0, "id": "call_1", "type": "function", "function": {"name": "foo", "arguments": ""}}]}),
        json!({"tool_calls": [{"index": 0, "function": {"arguments": "{\"x\""}}]}),
        json!({"tool_calls": [{"index": 0, "function": {"arguments": ":"}}]}),
        json!({"tool_calls": [{"index": 0, "function": {"arguments": "1}"}}]}),
    ] {
        out.extend(state.transform_chunk(chunk(json!({"choices": [{"index": 0, "delta": delta}]}))));
    }
    assert!(out.is_empty());

    out.extend(state.transform_chunk(chunk(
        json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
    )));
    assert_eq!(out.len(), 1);
    assert!(out[0].candidates.is_empty());
    let calls = out[0].function_calls.as_ref().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id.as_deref(), Some("call_1"));
    assert_eq!(calls[0].name, "foo");
    assert_eq!(calls[0].args, Some(json!({"x": 1})));

    // A second finish signal must not re-emit the same calls.
    let again = state.transform_chunk(chunk(
        json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
    ));
    assert!(again.is_empty());
    assert!(state.finish().is_empty());
}

#[test]
fn stream_tool_call_name_arrives_after_id() {
    let mut state = OpenAIChatCompletionToGeminiStreamState::new(false);
    let mut out = Vec::new();
    for delta in [
        json!({"tool_calls": [{"index": 0, "id": "call_1", "type": "function"}]}),
        json!({"tool_calls": [{"index": 0, "function": {"name": "foo"}}]}),
        json!({"tool_calls": [{"index": 0, "function": {"arguments": "{\"x\":"}}]}),
        json!({"tool_calls": [{"index": 0, "function": {"arguments": "1}"}}]}),
    ] {
        out.extend(state.transform_chunk(chunk(json!({"choices": [{"index": 0, "delta": delta}]}))));
    }
    out.extend(state.transform_chunk(chunk(
        json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
    )));

    assert_eq!(out.len(), 1);
    let calls = out[0].all_function_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id.as_deref(), Some("call_1"));
    assert_eq!(calls[0].name, "foo");
    assert_eq!(calls[0].args, Some(json!({"x": 1})));
}

#[test]
fn stream_only_function_typed_calls_are_released() {
    let mut state = OpenAIChatCompletionToGeminiStreamState::new(false);
    state.transform_chunk(chunk(json!({"choices": [{"index": 0, "delta": {"tool_calls": [
        {"index": 0, "id": "a", "type": "function", "function": {"name": "kept", "arguments": "{}"}},
        {"index": 1, "id": "b", "type": "code_interpreter", "function": {"name": "other", "arguments": "{}"}},
        {"index": 2, "id": "c", "function": {"name": "untyped", "arguments": "{}"}}
    ]}}]})));
    let out = state.transform_chunk(chunk(
        json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
    ));

    assert_eq!(out.len(), 1);
    let names: Vec<&str> = out[0]
        .all_function_calls()
        .iter()
        .map(|call| call.name.as_str())
        .collect();
    assert_eq!(names, vec!["kept"]);
}

#[test]
fn stream_malformed_arguments_become_empty_object() {
    let mut state = OpenAIChatCompletionToGeminiStreamState::new(false);
    state.transform_chunk(chunk(json!({"choices": [{"index": 0, "delta": {"tool_calls": [
        {"index": 0, "id": "c", "type": "function", "function": {"name": "f", "arguments": "{not json"}},
        {"index": 1, "type": "function", "function": {"arguments": "{}"}}
    ]}}]})));
    let out = state.transform_chunk(chunk(
        json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}),
    ));
    let calls = out[0].function_calls.as_ref().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, Some(json!({})));
}

#[test]
fn stream_reasoning_is_framed_by_markers() {
    let mut state = OpenAIChatCompletionToGeminiStreamState::new(true);
    let mut out = Vec::new();
    for delta in [
        json!({"reasoning_content": "think 1"}),
        json!({"reasoning_content": " think 2"}),
        json!({"content": "answer"}),
        json!({"content": " more"}),
    ] {
        out.extend(state.transform_chunk(chunk(json!({"choices": [{"index": 0, "delta": delta}]}))));
    }

    assert_eq!(
        texts(&out),
        vec![
            "[思考过程] ",
            "think 1",
            " think 2",
            "\n\n[完整回复]\n\n",
            "answer",
            " more"
        ]
    );
    assert_eq!(state.reasoning_text(), "think 1 think 2");
}

#[test]
fn stream_reasoning_is_ignored_for_plain_models() {
    let mut state = OpenAIChatCompletionToGeminiStreamState::new(false);
    let out = state.transform_chunk(chunk(json!({"choices": [{"index": 0, "delta": {
        "reasoning_content": "hidden",
        "content": "visible"
    }}]})));
    assert_eq!(texts(&out), vec!["visible"]);
}
