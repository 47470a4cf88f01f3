pub mod request;
pub mod response;
pub mod types;

pub use request::CountTokensRequest;
pub use response::CountTokensResponse;
pub use types::{
    Blob, Content, ContentListUnion, ContentRole, FileData, FunctionCall, FunctionResponse,
    JsonValue, Part,
};
