use serde::{Deserialize, Serialize};

use crate::gemini::count_tokens::types::{FunctionCall, Part};
use crate::gemini::generate_content::types::{Candidate, UsageMetadata};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    /// Completed calls emitted by the streaming path, outside any candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_calls: Option<Vec<FunctionCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        Some(text)
    }

    /// Function calls from the first candidate's parts followed by any
    /// top-level calls.
    pub fn all_function_calls(&self) -> Vec<&FunctionCall> {
        let from_parts = self
            .candidates
            .first()
            .into_iter()
            .flat_map(|candidate| candidate.content.parts.iter())
            .filter_map(|part: &Part| part.function_call.as_ref());
        let top_level = self.function_calls.iter().flatten();
        from_parts.chain(top_level).collect()
    }
}
