use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type JsonValue = Value;

/// Turn author. Roles outside the known set are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentRole {
    User,
    Model,
    Function,
    System,
    Other(String),
}

impl ContentRole {
    pub fn as_str(&self) -> &str {
        match self {
            ContentRole::User => "user",
            ContentRole::Model => "model",
            ContentRole::Function => "function",
            ContentRole::System => "system",
            ContentRole::Other(value) => value.as_str(),
        }
    }
}

impl From<String> for ContentRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => ContentRole::User,
            "model" => ContentRole::Model,
            "function" => ContentRole::Function,
            "system" => ContentRole::System,
            _ => ContentRole::Other(value),
        }
    }
}

impl From<ContentRole> for String {
    fn from(value: ContentRole) -> Self {
        match value {
            ContentRole::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    /// A content without a role is a user turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ContentRole>,
}

impl Content {
    pub fn new(role: ContentRole, parts: Vec<Part>) -> Self {
        Self {
            parts,
            role: Some(role),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WirePart")]
pub struct Part {
    /// Only one of the data fields (text/inline_data/file_data/function_call/function_response)
    /// should be set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

/// Decoding shape of [`Part`]. Also captures the content-level keys so a turn
/// placed where a part is expected is rejected instead of read as empty.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    inline_data: Option<Blob>,
    file_data: Option<FileData>,
    function_call: Option<FunctionCall>,
    function_response: Option<FunctionResponse>,
    thought: Option<bool>,
    role: Option<Value>,
    parts: Option<Value>,
}

impl TryFrom<WirePart> for Part {
    type Error = String;

    fn try_from(value: WirePart) -> Result<Self, Self::Error> {
        if value.role.is_some() || value.parts.is_some() {
            return Err("expected a part, found a content with `role`/`parts`".to_string());
        }
        Ok(Self {
            text: value.text,
            inline_data: value.inline_data,
            file_data: value.file_data,
            function_call: value.function_call,
            function_response: value.function_response,
            thought: value.thought,
        })
    }
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// The IANA standard MIME type of the source data. Examples: - image/png - image/jpeg
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub response: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_uri: String,
}

/// Every shape a caller may hand in as `contents`.
///
/// Decoding looks at the JSON shape instead of trying variants in turn: a
/// string is text, an object with `role` or `parts` is a content, any other
/// object is a part. A list follows its first element. Entries that do not
/// match the chosen shape are decode errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentListUnion {
    Text(String),
    Contents(Vec<Content>),
    Parts(Vec<Part>),
    Content(Content),
    Part(Part),
}

fn is_content_object(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|object| object.contains_key("role") || object.contains_key("parts"))
}

impl<'de> Deserialize<'de> for ContentListUnion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(text) => Ok(ContentListUnion::Text(text)),
            Value::Array(items) => {
                if items.is_empty() || items.first().is_some_and(is_content_object) {
                    serde_json::from_value(Value::Array(items))
                        .map(ContentListUnion::Contents)
                        .map_err(D::Error::custom)
                } else {
                    serde_json::from_value(Value::Array(items))
                        .map(ContentListUnion::Parts)
                        .map_err(D::Error::custom)
                }
            }
            Value::Object(_) if is_content_object(&value) => serde_json::from_value(value)
                .map(ContentListUnion::Content)
                .map_err(D::Error::custom),
            Value::Object(_) => serde_json::from_value(value)
                .map(ContentListUnion::Part)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "invalid contents: expected a string, object or array, found {other}"
            ))),
        }
    }
}

impl From<&str> for ContentListUnion {
    fn from(value: &str) -> Self {
        ContentListUnion::Text(value.to_string())
    }
}

impl From<String> for ContentListUnion {
    fn from(value: String) -> Self {
        ContentListUnion::Text(value)
    }
}

impl From<Vec<Content>> for ContentListUnion {
    fn from(value: Vec<Content>) -> Self {
        ContentListUnion::Contents(value)
    }
}

impl From<Content> for ContentListUnion {
    fn from(value: Content) -> Self {
        ContentListUnion::Content(value)
    }
}
