//! Payload/Header Builder
//!
//! Turns a `TargetDescriptor` plus `RuntimeParams` into concrete bytes and
//! headers. Output is deterministic: headers are kept in a `BTreeMap`, JSON is
//! serialized from an ordered map and form fields are emitted in key order.

use std::collections::BTreeMap;

use bytes::Bytes;
use contracts::{BodyTemplate, ContractError, HttpCall, RuntimeParams, TargetDescriptor};
use serde_json::Value;
use tracing::{instrument, trace};
use url::form_urlencoded;

use crate::template::{render_str, TemplateError};

/// One rendered (body, headers) candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPayload {
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl RenderedPayload {
    /// Combine with the target's endpoint into a transport call
    pub fn into_call(self, target: &TargetDescriptor) -> HttpCall {
        HttpCall {
            url: target.endpoint.clone(),
            method: target.method,
            headers: self.headers,
            body: self.body,
            response_mode: target.response_mode,
        }
    }
}

/// Stateless builder
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadBuilder;

impl PayloadBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render the primary body and the header set
    ///
    /// # Errors
    /// `MissingParameter` when a placeholder has no value, `ConfigValidation`
    /// when a template does not compile.
    pub fn build(
        &self,
        target: &TargetDescriptor,
        params: &RuntimeParams,
    ) -> Result<RenderedPayload, ContractError> {
        self.render(target, &target.body, params)
    }

    /// Render every body candidate (primary first, then fallbacks)
    #[instrument(name = "payload_build_candidates", skip(self, target, params), fields(target = %target.id))]
    pub fn build_candidates(
        &self,
        target: &TargetDescriptor,
        params: &RuntimeParams,
    ) -> Result<Vec<RenderedPayload>, ContractError> {
        let candidates = target
            .body_candidates()
            .map(|body| self.render(target, body, params))
            .collect::<Result<Vec<_>, _>>()?;
        trace!(count = candidates.len(), "Rendered payload candidates");
        Ok(candidates)
    }

    fn render(
        &self,
        target: &TargetDescriptor,
        body: &BodyTemplate,
        params: &RuntimeParams,
    ) -> Result<RenderedPayload, ContractError> {
        let mut headers = BTreeMap::new();
        for (name, value) in &target.headers {
            let rendered = render_str(value, params)
                .map_err(|e| template_error(target, &format!("headers.{name}"), e))?;
            headers.insert(name.clone(), rendered);
        }

        let body_bytes = render_body(body, params).map_err(|e| template_error(target, "body", e))?;

        if let Some(content_type) = body.content_type() {
            let has_content_type = headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case("content-type"));
            if !has_content_type {
                headers.insert("content-type".to_string(), content_type.to_string());
            }
        }

        Ok(RenderedPayload {
            headers,
            body: body_bytes,
        })
    }
}

fn render_body(body: &BodyTemplate, params: &RuntimeParams) -> Result<Bytes, TemplateError> {
    match body {
        BodyTemplate::Empty => Ok(Bytes::new()),
        BodyTemplate::Text { content } => Ok(Bytes::from(render_str(content, params)?)),
        BodyTemplate::Form { fields } => {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (key, value) in fields {
                serializer.append_pair(key, &render_str(value, params)?);
            }
            Ok(Bytes::from(serializer.finish()))
        }
        BodyTemplate::Json { value } => {
            let rendered = render_json(value, params)?;
            Ok(Bytes::from(rendered.to_string()))
        }
    }
}

fn render_json(value: &Value, params: &RuntimeParams) -> Result<Value, TemplateError> {
    Ok(match value {
        Value::String(s) => Value::String(render_str(s, params)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_json(item, params))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            // sorted insertion keeps key order stable even with `preserve_order`
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((k.clone(), render_json(v, params)?)))
                    .collect::<Result<_, TemplateError>>()?,
            )
        }
        other => other.clone(),
    })
}

fn template_error(target: &TargetDescriptor, field: &str, err: TemplateError) -> ContractError {
    match err {
        TemplateError::Missing(parameter) => ContractError::missing_parameter(target.id.as_str(), parameter),
        other => ContractError::config_validation(
            format!("targets[id={}].{field}", target.id),
            other.to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::HttpMethod;
    use serde_json::json;

    fn params() -> RuntimeParams {
        RuntimeParams::from([("correlation_id".to_string(), "c-42".to_string())])
    }

    fn json_target() -> TargetDescriptor {
        let mut target = TargetDescriptor::new("status", "Status", "https://status.example.com/ping");
        target
            .headers
            .insert("x-request-id".into(), "{{correlation_id}}".into());
        target.body = BodyTemplate::Json {
            value: json!({"zeta": "{{correlation_id}}", "alpha": ["{{correlation_id}}", 1, true]}),
        };
        target
    }

    #[test]
    fn test_build_json_body() {
        let payload = PayloadBuilder::new().build(&json_target(), &params()).unwrap();
        assert_eq!(
            payload.body,
            Bytes::from_static(br#"{"alpha":["c-42",1,true],"zeta":"c-42"}"#)
        );
        assert_eq!(payload.headers["x-request-id"], "c-42");
        assert_eq!(payload.headers["content-type"], "application/json");
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PayloadBuilder::new();
        let target = json_target();
        let first = builder.build(&target, &params()).unwrap();
        let second = builder.build(&target, &params()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.body.as_ref(), second.body.as_ref());
    }

    #[test]
    fn test_build_does_not_mutate_target() {
        let target = json_target();
        let before = target.clone();
        let _ = PayloadBuilder::new().build(&target, &params()).unwrap();
        assert_eq!(target, before);
    }

    #[test]
    fn test_missing_parameter_is_an_error() {
        let err = PayloadBuilder::new()
            .build(&json_target(), &RuntimeParams::new())
            .unwrap_err();
        assert!(
            matches!(err, ContractError::MissingParameter { ref parameter, .. } if parameter == "correlation_id"),
            "got: {err}"
        );
    }

    #[test]
    fn test_form_body_in_key_order() {
        let mut target = TargetDescriptor::new("f", "Form", "https://f.example.com");
        target.method = HttpMethod::Post;
        target.body = BodyTemplate::Form {
            fields: [
                ("b".to_string(), "x y".to_string()),
                ("a".to_string(), "{{correlation_id}}".to_string()),
            ]
            .into(),
        };
        let payload = PayloadBuilder::new().build(&target, &params()).unwrap();
        assert_eq!(payload.body, Bytes::from_static(b"a=c-42&b=x+y"));
        assert_eq!(
            payload.headers["content-type"],
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_explicit_content_type_wins() {
        let mut target = json_target();
        target
            .headers
            .insert("Content-Type".into(), "application/vnd.custom+json".into());
        let payload = PayloadBuilder::new().build(&target, &params()).unwrap();
        assert_eq!(payload.headers.get("content-type"), None);
        assert_eq!(payload.headers["Content-Type"], "application/vnd.custom+json");
    }

    #[test]
    fn test_candidates_in_order() {
        let mut target = json_target();
        target.fallback_bodies = vec![BodyTemplate::Text {
            content: "id {{correlation_id}}".into(),
        }];
        let candidates = PayloadBuilder::new()
            .build_candidates(&target, &params())
            .unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].body, Bytes::from_static(b"id c-42"));
        assert_eq!(candidates[1].headers["content-type"], "text/plain; charset=utf-8");
    }

    #[test]
    fn test_empty_body_has_no_content_type() {
        let target = TargetDescriptor::new("e", "Empty", "https://e.example.com");
        let payload = PayloadBuilder::new().build(&target, &params()).unwrap();
        assert!(payload.body.is_empty());
        assert!(payload.headers.is_empty());
    }
}
