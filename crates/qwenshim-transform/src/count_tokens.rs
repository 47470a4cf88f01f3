use qwenshim_protocol::gemini::count_tokens::request::CountTokensRequest;
use qwenshim_protocol::gemini::count_tokens::response::CountTokensResponse;
use qwenshim_protocol::gemini::count_tokens::types::ContentListUnion;

use crate::contents::normalize_contents;

/// Roughly four characters per token. Counts Unicode scalar values of the
/// turn texts joined by single spaces, rounded up.
pub fn estimate_tokens(contents: ContentListUnion) -> u32 {
    let text = normalize_contents(contents)
        .iter()
        .map(|turn| turn.text())
        .collect::<Vec<_>>()
        .join(" ");
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
}

pub fn transform_request(request: CountTokensRequest) -> CountTokensResponse {
    CountTokensResponse {
        total_tokens: estimate_tokens(request.contents),
    }
}
