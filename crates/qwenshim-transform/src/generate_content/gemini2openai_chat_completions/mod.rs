pub mod request;
pub mod response;
pub mod stream;

#[cfg(test)]
mod tests;

pub use request::{TranslateOptions, resolve_model, transform_request};
pub use response::transform_response;
pub use stream::OpenAIChatCompletionToGeminiStreamState;
