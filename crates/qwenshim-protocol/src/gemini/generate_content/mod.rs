pub mod request;
pub mod response;
pub mod types;

pub use request::{GenerateContentConfig, GenerateContentRequest};
pub use response::GenerateContentResponse;
pub use types::*;
