pub use crate::gemini::count_tokens::types::*;
pub use crate::gemini::count_tokens::{CountTokensRequest, CountTokensResponse};
pub use crate::gemini::embed_content::{
    ContentEmbedding, EmbedContentRequest, EmbedContentResponse,
};
pub use crate::gemini::generate_content::types::*;
pub use crate::gemini::generate_content::{
    GenerateContentConfig, GenerateContentRequest, GenerateContentResponse,
};
