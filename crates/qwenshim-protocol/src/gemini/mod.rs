pub mod count_tokens;
pub mod embed_content;
pub mod generate_content;
pub mod types;
