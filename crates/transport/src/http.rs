//! HttpTransport - real outbound HTTP via reqwest
//!
//! The whole exchange (connect, send, status, body) runs under one
//! `tokio::time::timeout`. Responses are read as text and never parsed.

use std::time::Duration;

use contracts::{DispatchFailure, DispatchResult, HttpCall, HttpMethod, ResponseMode, Transport};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::classify::{preview, result_for_status};
use crate::error::TransportError;

const DEFAULT_PREVIEW_CHARS: usize = 120;

/// Transport performing real HTTP calls
#[derive(Debug, Clone)]
pub struct HttpTransport {
    name: String,
    client: reqwest::Client,
    preview_chars: usize,
}

impl HttpTransport {
    /// Create a transport with its own connection pool
    pub fn new(name: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dispatch-engine/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(name, client))
    }

    /// Create a transport around an existing client
    pub fn with_client(name: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            client,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    fn build_request(&self, call: &HttpCall) -> Result<reqwest::RequestBuilder, DispatchFailure> {
        let method = match call.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut headers = HeaderMap::with_capacity(call.headers.len());
        for (name, value) in &call.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DispatchFailure::Configuration(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| DispatchFailure::Configuration(format!("invalid header value for '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let mut builder = self.client.request(method, &call.url).headers(headers);
        if !call.body.is_empty() {
            builder = builder.body(call.body.clone());
        }
        Ok(builder)
    }

    async fn exchange(
        &self,
        request: reqwest::RequestBuilder,
        mode: ResponseMode,
        started: Instant,
    ) -> DispatchResult {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return DispatchResult::failed(
                    DispatchFailure::Transport(e.to_string()),
                    elapsed_ms(started),
                );
            }
        };

        let status = response.status();
        let detail = match mode {
            ResponseMode::Opaque => "sent, outcome unobservable".to_string(),
            ResponseMode::Observed => match response.text().await {
                Ok(body) => preview(&body, self.preview_chars),
                Err(e) => {
                    debug!(transport = %self.name, error = %e, "Response body unreadable");
                    String::new()
                }
            },
        };

        result_for_status(
            status.as_u16(),
            status.canonical_reason(),
            &detail,
            elapsed_ms(started),
            mode,
        )
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_transport_send",
        skip(self, call),
        fields(transport = %self.name, method = %call.method, url = %call.url)
    )]
    async fn send(&self, call: &HttpCall, timeout: Duration) -> DispatchResult {
        let started = Instant::now();

        let request = match self.build_request(call) {
            Ok(request) => request,
            Err(failure) => {
                warn!(transport = %self.name, error = %failure, "Request could not be built");
                return DispatchResult::failed(failure, 0);
            }
        };

        match tokio::time::timeout(timeout, self.exchange(request, call.response_mode, started)).await {
            Ok(result) => {
                debug!(
                    outcome = %result.outcome,
                    status = ?result.http_status,
                    latency_ms = result.latency_ms,
                    "Call completed"
                );
                result
            }
            Err(_) => {
                debug!(timeout_ms = timeout.as_millis() as u64, "Call timed out");
                DispatchResult::failed(DispatchFailure::Timeout, elapsed_ms(started))
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
