use std::fmt;

use bytes::Bytes;

use crate::config::ConfigError;

/// Coarse classification of failures that never produced an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamTransportErrorKind {
    Timeout,
    Connect,
    Dns,
    Tls,
    Other,
}

impl UpstreamTransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UpstreamTransportErrorKind::Timeout => "timeout",
            UpstreamTransportErrorKind::Connect => "connect",
            UpstreamTransportErrorKind::Dns => "dns",
            UpstreamTransportErrorKind::Tls => "tls",
            UpstreamTransportErrorKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone)]
pub enum UpstreamFailure {
    /// Transport-level failures (no HTTP response, or the body broke off).
    Transport {
        kind: UpstreamTransportErrorKind,
        message: String,
    },
    /// Non-2xx response captured as bytes.
    Http { status: u16, body: Bytes },
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamFailure::Transport { kind, message } => {
                write!(f, "{} error: {message}", kind.as_str())
            }
            UpstreamFailure::Http { status, body } => {
                write!(f, "HTTP {status}: {}", String::from_utf8_lossy(body))
            }
        }
    }
}

impl std::error::Error for UpstreamFailure {}

/// Which public operation an error surfaced from. Picks the message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Generate,
    Stream,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Generate => f.write_str("Qwen API call failed (通义千问API调用失败)"),
            Operation::Stream => {
                f.write_str("Qwen streaming API call failed (通义千问流式API调用失败)")
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("{operation}: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: UpstreamFailure,
    },
    #[error("{operation}: invalid upstream payload: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation}: failed to encode upstream request: {source}")]
    Encode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    UnsupportedOperation(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GeneratorError {
    pub fn transport(operation: Operation, source: UpstreamFailure) -> Self {
        GeneratorError::Transport { operation, source }
    }

    pub fn decode(operation: Operation, source: serde_json::Error) -> Self {
        GeneratorError::Decode { operation, source }
    }

    pub fn encode(operation: Operation, source: serde_json::Error) -> Self {
        GeneratorError::Encode { operation, source }
    }

    /// HTTP status of the upstream response, when the failure carried one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            GeneratorError::Transport {
                source: UpstreamFailure::Http { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }
}
