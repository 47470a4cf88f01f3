//! Normalization of the loose `contents` input into ordered turns.

use qwenshim_protocol::gemini::count_tokens::types::{
    Content, ContentListUnion, ContentRole, FunctionCall, FunctionResponse, Part,
};

pub const IMAGE_PLACEHOLDER: &str = "[图片内容]";
pub const FILE_PLACEHOLDER: &str = "[文件内容]";

/// One resolved part. Exactly one payload per part.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPart {
    Text(String),
    InlineData { mime_type: String, data: String },
    FileData { mime_type: Option<String>, file_uri: String },
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

impl TurnPart {
    pub fn is_media(&self) -> bool {
        matches!(self, TurnPart::InlineData { .. } | TurnPart::FileData { .. })
    }
}

impl From<Part> for TurnPart {
    fn from(part: Part) -> Self {
        if let Some(text) = part.text {
            return TurnPart::Text(text);
        }
        if let Some(blob) = part.inline_data {
            return TurnPart::InlineData {
                mime_type: blob.mime_type,
                data: blob.data,
            };
        }
        if let Some(file) = part.file_data {
            return TurnPart::FileData {
                mime_type: file.mime_type,
                file_uri: file.file_uri,
            };
        }
        if let Some(call) = part.function_call {
            return TurnPart::FunctionCall(call);
        }
        if let Some(response) = part.function_response {
            return TurnPart::FunctionResponse(response);
        }
        TurnPart::Text(String::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: ContentRole,
    pub parts: Vec<TurnPart>,
}

impl Turn {
    fn user(parts: Vec<TurnPart>) -> Self {
        Self {
            role: ContentRole::User,
            parts,
        }
    }

    pub fn text(&self) -> String {
        extract_text(&self.parts)
    }

    pub fn has_media(&self) -> bool {
        self.parts.iter().any(TurnPart::is_media)
    }
}

pub fn normalize_contents(contents: ContentListUnion) -> Vec<Turn> {
    match contents {
        ContentListUnion::Text(text) => vec![Turn::user(vec![TurnPart::Text(text)])],
        ContentListUnion::Part(part) => vec![Turn::user(vec![part.into()])],
        ContentListUnion::Parts(parts) => {
            vec![Turn::user(parts.into_iter().map(TurnPart::from).collect())]
        }
        ContentListUnion::Content(content) => vec![content_to_turn(content)],
        ContentListUnion::Contents(contents) => {
            contents.into_iter().map(content_to_turn).collect()
        }
    }
}

fn content_to_turn(content: Content) -> Turn {
    Turn {
        role: content.role.unwrap_or(ContentRole::User),
        parts: content.parts.into_iter().map(TurnPart::from).collect(),
    }
}

/// Text of a turn as plain chat content. Media becomes a placeholder and
/// function traffic contributes nothing.
pub fn extract_text(parts: &[TurnPart]) -> String {
    let mut text = String::new();
    for part in parts {
        match part {
            TurnPart::Text(value) => text.push_str(value),
            TurnPart::InlineData { .. } => text.push_str(IMAGE_PLACEHOLDER),
            TurnPart::FileData { .. } => text.push_str(FILE_PLACEHOLDER),
            TurnPart::FunctionCall(_) | TurnPart::FunctionResponse(_) => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwenshim_protocol::gemini::count_tokens::types::Blob;

    #[test]
    fn plain_string_becomes_one_user_turn() {
        let turns = normalize_contents(ContentListUnion::from("hello"));
        assert_eq!(
            turns,
            vec![Turn {
                role: ContentRole::User,
                parts: vec![TurnPart::Text("hello".to_string())],
            }]
        );
    }

    #[test]
    fn decoded_shapes_normalize_by_kind() {
        let parts: ContentListUnion =
            serde_json::from_str(r#"[{"text":"a"},{"text":"b"}]"#).unwrap();
        let turns = normalize_contents(parts);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].parts.len(), 2);

        let contents: ContentListUnion = serde_json::from_str(
            r#"[{"role":"user","parts":[{"text":"q"}]},{"role":"model","parts":[{"text":"a"}]}]"#,
        )
        .unwrap();
        let turns = normalize_contents(contents);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, ContentRole::Model);

        let single: ContentListUnion = serde_json::from_str(r#"{"parts":[{"text":"x"}]}"#).unwrap();
        let turns = normalize_contents(single);
        assert_eq!(turns[0].role, ContentRole::User);

        let empty: ContentListUnion = serde_json::from_str("[]").unwrap();
        assert!(normalize_contents(empty).is_empty());
    }

    #[test]
    fn turn_without_parts_keeps_the_conversation() {
        let contents: ContentListUnion = serde_json::from_str(
            r#"[{"role":"user","parts":[{"text":"hi"}]},{"role":"model"}]"#,
        )
        .unwrap();
        let turns = normalize_contents(contents);
        assert_eq!(
            turns,
            vec![
                Turn {
                    role: ContentRole::User,
                    parts: vec![TurnPart::Text("hi".to_string())],
                },
                Turn {
                    role: ContentRole::Model,
                    parts: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn malformed_part_is_a_decode_error() {
        let result = serde_json::from_str::<ContentListUnion>(
            r#"[
                {"role":"model","parts":[{"text":"earlier answer"}]},
                {"role":"user","parts":[{"inlineData":{"mimeType":"image/png"}},{"text":"question"}]}
            ]"#,
        );
        assert!(result.is_err());

        let result =
            serde_json::from_str::<ContentListUnion>(r#"{"inlineData":{"mimeType":"image/png"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn content_shaped_entry_in_part_list_is_rejected() {
        let result = serde_json::from_str::<ContentListUnion>(
            r#"[{"text":"a"},{"role":"model","parts":[{"text":"b"}]}]"#,
        );
        assert!(result.is_err());
        assert!(serde_json::from_str::<ContentListUnion>("42").is_err());
    }

    #[test]
    fn unknown_role_is_preserved() {
        let contents: ContentListUnion =
            serde_json::from_str(r#"{"role":"narrator","parts":[{"text":"x"}]}"#).unwrap();
        let turns = normalize_contents(contents);
        assert_eq!(turns[0].role, ContentRole::Other("narrator".to_string()));
    }

    #[test]
    fn extract_text_uses_placeholders() {
        let content = Content::new(
            ContentRole::User,
            vec![
                Part::text("look: "),
                Part {
                    inline_data: Some(Blob {
                        mime_type: "image/png".to_string(),
                        data: "AAAA".to_string(),
                    }),
                    ..Part::default()
                },
                Part::function_call(FunctionCall {
                    id: None,
                    name: "f".to_string(),
                    args: None,
                }),
                Part::default(),
            ],
        );
        let turns = normalize_contents(content.into());
        assert_eq!(turns[0].text(), "look: [图片内容]");
        assert!(turns[0].has_media());
    }
}
