//! Forwarder - allowlisted HTTPS relay
//!
//! Validates the destination, strips hop-by-hop headers and relays the call.
//! The upstream status and body bytes are passed back untouched.

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use contracts::{ForwarderConfig, HostAllowlist};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, instrument, warn};
use url::Url;

use crate::cors::CorsOrigins;
use crate::error::ForwardError;
use crate::headers::strip_hop_by_hop;

const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Inbound forwarding request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    #[serde(alias = "serviceUrl")]
    pub url: String,

    #[serde(default = "default_method", alias = "serviceMethod")]
    pub method: String,

    #[serde(default, alias = "serviceHeaders")]
    pub headers: BTreeMap<String, String>,

    /// JSON values are sent serialized, strings as-is
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Reachability summary returned to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardEnvelope {
    pub reachable: bool,
    /// Upstream answered with 2xx
    pub ok: bool,
    pub upstream_status: Option<u16>,
}

/// Result of a forwarded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardResponse {
    /// Upstream status (None when unreachable)
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// Upstream body bytes, empty when unreachable
    pub body: Bytes,
    pub envelope: ForwardEnvelope,
    /// Why the upstream could not be reached
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl ForwardResponse {
    fn upstream(status: u16, content_type: Option<String>, body: Bytes, latency_ms: u64) -> Self {
        Self {
            status: Some(status),
            content_type,
            body,
            envelope: ForwardEnvelope {
                reachable: true,
                ok: (200..300).contains(&status),
                upstream_status: Some(status),
            },
            error: None,
            latency_ms,
        }
    }

    fn unreachable(reason: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            status: None,
            content_type: None,
            body: Bytes::new(),
            envelope: ForwardEnvelope {
                reachable: false,
                ok: false,
                upstream_status: None,
            },
            error: Some(reason.into()),
            latency_ms,
        }
    }
}

/// A request that passed policy checks
#[derive(Debug)]
pub struct PreparedForward {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    allowlist: HostAllowlist,
    timeout: Duration,
    allow_plain_http: bool,
    cors: CorsOrigins,
}

impl Forwarder {
    pub fn new(config: &ForwarderConfig) -> Result<Self, ForwardError> {
        // redirects could leave the allowlist
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("dispatch-engine-forwarder/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: reqwest::Client, config: &ForwarderConfig) -> Result<Self, ForwardError> {
        Ok(Self {
            client,
            allowlist: config.allowed_hosts.clone(),
            timeout: Duration::from_millis(config.upstream_timeout_ms),
            allow_plain_http: config.allow_plain_http,
            cors: CorsOrigins::parse(&config.cors_origins)?,
        })
    }

    pub fn allowlist(&self) -> &HostAllowlist {
        &self.allowlist
    }

    pub fn cors(&self) -> &CorsOrigins {
        &self.cors
    }

    /// Apply the forwarding policy without sending anything
    pub fn prepare(&self, request: &ForwardRequest) -> Result<PreparedForward, ForwardError> {
        let url = Url::parse(request.url.trim()).map_err(|e| ForwardError::invalid_url(&request.url, e))?;
        match url.scheme() {
            "https" => {}
            "http" if self.allow_plain_http => {}
            other => {
                return Err(ForwardError::InsecureScheme {
                    scheme: other.to_string(),
                })
            }
        }
        let host = url
            .host_str()
            .ok_or_else(|| ForwardError::invalid_url(&request.url, "missing host"))?;
        if !self.allowlist.allows_url(&url) {
            return Err(ForwardError::NotAllowlisted {
                host: host.to_string(),
            });
        }

        let method_name = request.method.trim().to_ascii_uppercase();
        if !ALLOWED_METHODS.contains(&method_name.as_str()) {
            return Err(ForwardError::InvalidMethod(request.method.clone()));
        }
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| ForwardError::InvalidMethod(request.method.clone()))?;

        let mut headers = HeaderMap::new();
        for (name, value) in strip_hop_by_hop(&request.headers) {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ForwardError::invalid_header(&name, e))?;
            let header_value = HeaderValue::from_str(&value).map_err(|e| ForwardError::invalid_header(&name, e))?;
            headers.insert(header_name, header_value);
        }

        let body = match (&request.body, method == Method::GET || method == Method::HEAD) {
            (_, true) | (None, _) | (Some(serde_json::Value::Null), _) => Bytes::new(),
            (Some(serde_json::Value::String(text)), _) => Bytes::from(text.clone()),
            (Some(value), _) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Bytes::from(value.to_string())
            }
        };

        Ok(PreparedForward {
            url,
            method,
            headers,
            body,
        })
    }

    /// Relay one request
    ///
    /// # Errors
    /// Policy or input rejections only; upstream failures come back as an
    /// unreachable `ForwardResponse`.
    #[instrument(name = "forwarder_forward", skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, ForwardError> {
        let prepared = match self.prepare(&request) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "Forward rejected");
                return Err(e);
            }
        };

        let started = Instant::now();
        let call = async {
            let response = self
                .client
                .request(prepared.method, prepared.url)
                .headers(prepared.headers)
                .body(prepared.body)
                .send()
                .await?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, content_type, body))
        };

        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok((status, content_type, body))) => {
                ForwardResponse::upstream(status, content_type, body, elapsed_ms(started))
            }
            Ok(Err(e)) => ForwardResponse::unreachable(e.to_string(), elapsed_ms(started)),
            Err(_) => ForwardResponse::unreachable("upstream timeout", elapsed_ms(started)),
        };

        observability::record_forward(response.status);
        info!(
            reachable = response.envelope.reachable,
            upstream_status = ?response.status,
            latency_ms = response.latency_ms,
            "Forward completed"
        );
        Ok(response)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
