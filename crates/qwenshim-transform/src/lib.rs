//! Pure translation between the contents schema and the chat-completions schema.
//!
//! Every function here is infallible: malformed tool arguments become `{}`,
//! unknown roles are treated as user turns, and unsupported media is dropped.

pub mod contents;
pub mod count_tokens;
pub mod generate_content;
