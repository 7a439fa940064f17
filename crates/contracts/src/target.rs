//! TargetDescriptor - one catalog entry
//!
//! Pure data: endpoint, method and the header/body templates the builder renders.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TargetId;

/// HTTP verb used for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the caller can observe the real outcome of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Status code is read and classified
    #[default]
    Observed,
    /// Request is sent but its status is not trusted; completes as `SentUnconfirmed`
    Opaque,
}

/// Body template, rendered by the payload builder.
///
/// String leaves may contain `{{name}}` placeholders.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyTemplate {
    /// No request body
    #[default]
    Empty,
    /// JSON document; placeholders are substituted inside string values
    Json { value: serde_json::Value },
    /// `application/x-www-form-urlencoded` fields, emitted in key order
    Form { fields: BTreeMap<String, String> },
    /// Raw text body
    Text { content: String },
}

impl BodyTemplate {
    /// Default content type for this body shape, if any
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::Json { .. } => Some("application/json"),
            Self::Form { .. } => Some("application/x-www-form-urlencoded"),
            Self::Text { .. } => Some("text/plain; charset=utf-8"),
        }
    }
}

/// Static description of one remote target.
///
/// Immutable once the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Unique key
    pub id: TargetId,

    /// Display name
    pub name: String,

    /// Absolute URL
    pub endpoint: String,

    /// HTTP verb
    #[serde(default)]
    pub method: HttpMethod,

    /// Header name -> value template
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Primary body template
    #[serde(default)]
    pub body: BodyTemplate,

    /// Alternative body shapes tried in order when the primary one is rejected
    #[serde(default)]
    pub fallback_bodies: Vec<BodyTemplate>,

    /// Outcome observation mode
    #[serde(default)]
    pub response_mode: ResponseMode,
}

impl TargetDescriptor {
    /// Minimal descriptor with an empty body (mostly for tests and examples)
    pub fn new(id: impl Into<TargetId>, name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            method: HttpMethod::default(),
            headers: BTreeMap::new(),
            body: BodyTemplate::Empty,
            fallback_bodies: Vec::new(),
            response_mode: ResponseMode::Observed,
        }
    }

    /// All body templates in attempt order (primary first)
    pub fn body_candidates(&self) -> impl Iterator<Item = &BodyTemplate> {
        std::iter::once(&self.body).chain(self.fallback_bodies.iter())
    }
}
