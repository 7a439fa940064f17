//! HTTP surface of the forwarder
//!
//! `POST /forward` relays one request, `GET /healthz` answers liveness.
//! A reached upstream is answered with its own status, content type and body
//! bytes; the envelope travels in `x-forward-*` headers. An unreachable
//! upstream gets a 502 with the envelope as JSON.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::info;

use crate::cors::{OK_HEADER, REACHABLE_HEADER, UPSTREAM_STATUS_HEADER};
use crate::error::ForwardError;
use crate::forwarder::{ForwardEnvelope, ForwardRequest, Forwarder};

#[derive(Debug, Serialize)]
struct UnreachableBody {
    #[serde(flatten)]
    envelope: ForwardEnvelope,
    error: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = if self.is_policy() {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::BAD_REQUEST
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(forwarder: Forwarder) -> Router {
    let cors = forwarder.cors().layer();
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/forward", post(forward))
        .with_state(Arc::new(forwarder));
    match cors {
        Some(layer) => router.layer(layer),
        None => router,
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn forward(
    State(forwarder): State<Arc<Forwarder>>,
    Json(request): Json<ForwardRequest>,
) -> Result<Response, ForwardError> {
    let response = forwarder.forward(request).await?;
    let mut headers = envelope_headers(&response.envelope);

    let Some(status) = response.status else {
        let body = UnreachableBody {
            envelope: response.envelope,
            error: response.error.unwrap_or_default(),
        };
        return Ok((StatusCode::BAD_GATEWAY, headers, Json(body)).into_response());
    };

    // upstream status is relayed as-is
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    if let Some(content_type) = response
        .content_type
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
    {
        headers.insert(CONTENT_TYPE, content_type);
    }
    Ok((status, headers, response.body).into_response())
}

fn envelope_headers(envelope: &ForwardEnvelope) -> HeaderMap {
    let flag = |on: bool| HeaderValue::from_static(if on { "true" } else { "false" });
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(REACHABLE_HEADER), flag(envelope.reachable));
    headers.insert(HeaderName::from_static(OK_HEADER), flag(envelope.ok));
    if let Some(status) = envelope.upstream_status {
        headers.insert(HeaderName::from_static(UPSTREAM_STATUS_HEADER), HeaderValue::from(status));
    }
    headers
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(forwarder: Forwarder, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Forwarder listening");
    serve_on(forwarder, listener, shutdown).await
}

/// Serve on an already bound listener
pub async fn serve_on<F>(forwarder: Forwarder, listener: TcpListener, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(forwarder))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Forwarder stopped");
    Ok(())
}
