pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod upstream_client;

pub use config::{ConfigError, GeneratorConfig, GeneratorConfigPatch};
pub use error::{GeneratorError, Operation, UpstreamFailure, UpstreamTransportErrorKind};
pub use generator::{
    ContentGenerator, EMBEDDING_UNSUPPORTED, GenerateContentStream, QwenContentGenerator,
};
pub use models::{DEFAULT_QWEN_MODEL, ModelCapabilities, QWEN_MODELS};
pub use upstream_client::UpstreamClient;
