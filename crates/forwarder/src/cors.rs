//! Browser access to the forwarder

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::ForwardError;

/// Response headers carrying the reachability envelope
pub const REACHABLE_HEADER: &str = "x-forward-reachable";
pub const OK_HEADER: &str = "x-forward-ok";
pub const UPSTREAM_STATUS_HEADER: &str = "x-forward-upstream-status";

/// Origins allowed to call the forwarder from a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Disabled,
    Any,
    List(Vec<HeaderValue>),
}

impl CorsOrigins {
    pub fn parse(origins: &[String]) -> Result<Self, ForwardError> {
        if origins.is_empty() {
            return Ok(Self::Disabled);
        }
        if origins.iter().any(|o| o.trim() == "*") {
            return Ok(Self::Any);
        }
        origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim().trim_end_matches('/')).map_err(|e| {
                    ForwardError::InvalidCorsOrigin {
                        origin: origin.clone(),
                        message: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::List)
    }

    /// `None` when CORS handling is off
    pub fn layer(&self) -> Option<CorsLayer> {
        let origin = match self {
            Self::Disabled => return None,
            Self::Any => AllowOrigin::any(),
            Self::List(origins) => AllowOrigin::list(origins.clone()),
        };
        Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(Any)
                .expose_headers([
                    CONTENT_TYPE,
                    HeaderName::from_static(REACHABLE_HEADER),
                    HeaderName::from_static(OK_HEADER),
                    HeaderName::from_static(UPSTREAM_STATUS_HEADER),
                ]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(CorsOrigins::parse(&[]).unwrap(), CorsOrigins::Disabled);
        assert_eq!(
            CorsOrigins::parse(&["https://app.example.com".into(), "*".into()]).unwrap(),
            CorsOrigins::Any
        );
        assert_eq!(
            CorsOrigins::parse(&["https://app.example.com/".into()]).unwrap(),
            CorsOrigins::List(vec![HeaderValue::from_static("https://app.example.com")])
        );
        assert!(CorsOrigins::parse(&["bad\norigin".into()]).is_err());
        assert!(CorsOrigins::Disabled.layer().is_none());
    }
}
