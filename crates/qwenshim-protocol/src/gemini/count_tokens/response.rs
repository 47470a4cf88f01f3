use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    /// Heuristic estimate; the upstream has no tokenizer endpoint.
    pub total_tokens: u32,
}
