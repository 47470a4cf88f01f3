pub mod request;
pub mod response;
pub mod stream;
pub mod types;

pub use request::{CreateChatCompletionRequest, StopConfiguration};
pub use response::{ChatCompletionChoice, CreateChatCompletionResponse};
pub use stream::{ChatCompletionStreamChoice, CreateChatCompletionStreamResponse};
