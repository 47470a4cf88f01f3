use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use tracing::{debug, info, warn};
use wreq::{Client, Method, Proxy};

use crate::config::{ConfigError, GeneratorConfig};
use crate::error::{UpstreamFailure, UpstreamTransportErrorKind};

pub type Headers = Vec<(String, String)>;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamFailure>> + Send>>;

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Thin wrapper over one `wreq::Client` bound to a chat-completions endpoint.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    url: String,
    api_key: String,
    stream_idle_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        let client = build_client(config).map_err(|err| ConfigError::Client(err.to_string()))?;
        Ok(Self {
            client,
            url: build_url(&config.base_url, CHAT_COMPLETIONS_PATH),
            api_key: config.api_key.clone(),
            stream_idle_timeout: config.stream_idle_timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POSTs a serialized chat-completions body. Non-2xx responses are read
    /// to the end and returned as [`UpstreamFailure::Http`].
    pub async fn send_chat_completion(
        &self,
        op: &str,
        model: &str,
        body: Bytes,
        is_stream: bool,
    ) -> Result<wreq::Response, UpstreamFailure> {
        let started = log_upstream_request(op, &self.url, model, is_stream);
        debug!(
            event = "upstream_request_body",
            op = %op,
            body = %String::from_utf8_lossy(&body)
        );

        let mut builder = self.client.request(Method::POST, &self.url);
        for (k, v) in self.request_headers(is_stream) {
            builder = builder.header(k, v);
        }

        let result = match builder.body(body).send().await {
            Ok(resp) => check_status(resp).await,
            Err(err) => Err(map_wreq_error(err)),
        };

        let elapsed_ms = started.elapsed().as_millis();
        match &result {
            Ok(resp) => log_upstream_response_ok(op, resp.status().as_u16(), elapsed_ms, is_stream),
            Err(err) => log_upstream_response_err(op, elapsed_ms, err),
        }
        result
    }

    /// Reads the whole body of a successful response.
    pub async fn read_body(resp: wreq::Response) -> Result<Bytes, UpstreamFailure> {
        resp.bytes().await.map_err(map_wreq_error)
    }

    /// Body chunks of a successful response. A gap longer than the idle
    /// timeout yields one timeout failure.
    pub fn byte_stream(&self, resp: wreq::Response) -> ByteStream {
        let idle = self.stream_idle_timeout;
        let inner = Box::pin(resp.bytes_stream());
        Box::pin(stream::unfold(inner, move |mut inner| async move {
            match tokio::time::timeout(idle, inner.next()).await {
                Ok(Some(Ok(chunk))) => Some((Ok(chunk), inner)),
                Ok(Some(Err(err))) => Some((Err(map_wreq_error(err)), inner)),
                Ok(None) => None,
                Err(_) => Some((
                    Err(UpstreamFailure::Transport {
                        kind: UpstreamTransportErrorKind::Timeout,
                        message: format!("no upstream data for {}s", idle.as_secs()),
                    }),
                    inner,
                )),
            }
        }))
    }

    fn request_headers(&self, is_stream: bool) -> Headers {
        let mut headers = Headers::new();
        header_set(
            &mut headers,
            "Authorization",
            &format!("Bearer {}", self.api_key),
        );
        header_set(&mut headers, "Content-Type", "application/json");
        header_set(
            &mut headers,
            "Accept",
            if is_stream {
                "text/event-stream"
            } else {
                "application/json"
            },
        );
        headers
    }
}

fn header_set(headers: &mut Headers, name: &str, value: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}

fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn build_client(config: &GeneratorConfig) -> Result<Client, wreq::Error> {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .read_timeout(config.stream_idle_timeout);

    if let Some(proxy) = config.proxy.as_deref() {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

async fn check_status(resp: wreq::Response) -> Result<wreq::Response, UpstreamFailure> {
    let status = resp.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(resp);
    }
    let body = resp.bytes().await.unwrap_or_default();
    Err(UpstreamFailure::Http { status, body })
}

fn log_upstream_request(op: &str, url: &str, model: &str, is_stream: bool) -> Instant {
    info!(
        event = "upstream_request",
        op = %op,
        method = "POST",
        url = %url,
        model = %model,
        is_stream = is_stream
    );
    Instant::now()
}

fn log_upstream_response_ok(op: &str, status: u16, elapsed_ms: u128, is_stream: bool) {
    info!(
        event = "upstream_response",
        op = %op,
        status = status,
        elapsed_ms = elapsed_ms,
        is_stream = is_stream
    );
}

fn log_upstream_response_err(op: &str, elapsed_ms: u128, err: &UpstreamFailure) {
    warn!(
        event = "upstream_response",
        op = %op,
        status = "error",
        elapsed_ms = elapsed_ms,
        error = %err
    );
}

fn map_wreq_error(err: wreq::Error) -> UpstreamFailure {
    let kind = classify_wreq_error(&err);
    UpstreamFailure::Transport {
        kind,
        message: err.to_string(),
    }
}

fn classify_wreq_error(err: &wreq::Error) -> UpstreamTransportErrorKind {
    let message = err.to_string().to_ascii_lowercase();
    if err.is_timeout() {
        return UpstreamTransportErrorKind::Timeout;
    }
    if err.is_connect() {
        if message.contains("dns") || message.contains("resolve") {
            return UpstreamTransportErrorKind::Dns;
        }
        if message.contains("tls") || message.contains("ssl") {
            return UpstreamTransportErrorKind::Tls;
        }
        return UpstreamTransportErrorKind::Connect;
    }
    if err.is_connection_reset() {
        return UpstreamTransportErrorKind::Connect;
    }
    if message.contains("tls") || message.contains("ssl") {
        return UpstreamTransportErrorKind::Tls;
    }
    UpstreamTransportErrorKind::Other
}
