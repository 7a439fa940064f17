//! `{{name}}` placeholder templates
//!
//! A template is compiled once into literal / placeholder segments and can then
//! be rendered against any `RuntimeParams`. Rendering never produces partial
//! output: the first unresolved placeholder aborts it.

use std::collections::BTreeSet;

use contracts::RuntimeParams;
use thiserror::Error;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Template compile / render errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated placeholder starting at byte {offset}")]
    Unterminated { offset: usize },

    #[error("empty placeholder at byte {offset}")]
    EmptyName { offset: usize },

    #[error("no value for parameter '{0}'")]
    Missing(String),

    #[error("placeholders are only rendered in values, found one in key '{0}'")]
    PlaceholderInKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Compiled template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Compile `source`
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open
                .find(CLOSE)
                .ok_or(TemplateError::Unterminated {
                    offset: offset + start,
                })?;
            let name = after_open[..end].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyName {
                    offset: offset + start,
                });
            }
            segments.push(Segment::Param(name.to_string()));

            let consumed = start + OPEN.len() + end + CLOSE.len();
            rest = &rest[consumed..];
            offset += consumed;
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Placeholder names referenced by this template
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Render with every placeholder substituted
    pub fn render(&self, params: &RuntimeParams) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| TemplateError::Missing(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Compile `source` and render it in one step
pub fn render_str(source: &str, params: &RuntimeParams) -> Result<String, TemplateError> {
    Template::parse(source)?.render(params)
}

/// Collect placeholder names from `source` into `names`
pub fn collect_placeholders(
    source: &str,
    names: &mut BTreeSet<String>,
) -> Result<(), TemplateError> {
    let template = Template::parse(source)?;
    names.extend(template.placeholders().map(str::to_string));
    Ok(())
}

/// Keys (header names, form fields, JSON object keys) are sent verbatim
pub fn reject_key_placeholder(key: &str) -> Result<(), TemplateError> {
    if key.contains("{{") {
        return Err(TemplateError::PlaceholderInKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RuntimeParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_mixed_segments() {
        let t = Template::parse("id={{ correlation_id }}&n={{n}}!").unwrap();
        let out = t
            .render(&params(&[("correlation_id", "abc"), ("n", "3")]))
            .unwrap();
        assert_eq!(out, "id=abc&n=3!");
    }

    #[test]
    fn test_plain_text_has_no_placeholders() {
        let t = Template::parse("no params here").unwrap();
        assert_eq!(t.placeholders().count(), 0);
        assert_eq!(t.render(&RuntimeParams::new()).unwrap(), "no params here");
    }

    #[test]
    fn test_missing_parameter() {
        let t = Template::parse("{{token}}").unwrap();
        let err = t.render(&RuntimeParams::new()).unwrap_err();
        assert_eq!(err, TemplateError::Missing("token".into()));
    }

    #[test]
    fn test_unterminated_placeholder() {
        let err = Template::parse("abc {{token").unwrap_err();
        assert_eq!(err, TemplateError::Unterminated { offset: 4 });
    }

    #[test]
    fn test_empty_placeholder() {
        let err = Template::parse("x{{  }}").unwrap_err();
        assert_eq!(err, TemplateError::EmptyName { offset: 1 });
    }

    #[test]
    fn test_collect_placeholders_dedups() {
        let mut names = BTreeSet::new();
        collect_placeholders("{{a}}{{b}}{{a}}", &mut names).unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
