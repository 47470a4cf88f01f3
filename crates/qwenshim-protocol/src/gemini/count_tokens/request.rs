use serde::{Deserialize, Serialize};

use crate::gemini::count_tokens::types::ContentListUnion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensRequest {
    /// Falls back to the generator's default model when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub contents: ContentListUnion,
}
