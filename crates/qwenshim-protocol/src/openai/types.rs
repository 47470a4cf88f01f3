pub use crate::openai::create_chat_completions::request::{
    CreateChatCompletionRequest, StopConfiguration,
};
pub use crate::openai::create_chat_completions::response::{
    ChatCompletionChoice, CreateChatCompletionResponse,
};
pub use crate::openai::create_chat_completions::stream::{
    ChatCompletionStreamChoice, CreateChatCompletionStreamResponse,
};
pub use crate::openai::create_chat_completions::types::*;
