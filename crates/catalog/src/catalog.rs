//! Target Catalog
//!
//! Read-only, validated once at construction. Descriptors are shared behind
//! `Arc` so every tick can hand them to spawned requests without copying.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use contracts::{BodyTemplate, ContractError, TargetDescriptor};
use tracing::{debug, instrument};
use url::Url;

use crate::template::{collect_placeholders, reject_key_placeholder, TemplateError};

/// Validated, immutable list of targets
#[derive(Debug, Clone)]
pub struct TargetCatalog {
    targets: Vec<Arc<TargetDescriptor>>,
    required_parameters: BTreeSet<String>,
}

impl TargetCatalog {
    /// Validate and freeze the descriptors
    ///
    /// # Errors
    /// Empty catalog, duplicate id, empty name, bad endpoint or a template
    /// that does not compile. All are fatal configuration errors.
    #[instrument(name = "catalog_new", skip(targets), fields(count = targets.len()))]
    pub fn new(targets: Vec<TargetDescriptor>) -> Result<Self, ContractError> {
        if targets.is_empty() {
            return Err(ContractError::config_validation(
                "targets",
                "catalog must contain at least one target",
            ));
        }

        let mut seen = HashSet::new();
        let mut required_parameters = BTreeSet::new();
        for target in &targets {
            if !seen.insert(target.id.clone()) {
                return Err(ContractError::config_validation(
                    format!("targets[id={}]", target.id),
                    "duplicate target id",
                ));
            }
            validate_descriptor(target, &mut required_parameters)?;
        }

        debug!(
            targets = targets.len(),
            parameters = ?required_parameters,
            "Target catalog loaded"
        );

        Ok(Self {
            targets: targets.into_iter().map(Arc::new).collect(),
            required_parameters,
        })
    }

    /// Number of targets (never zero)
    pub fn count(&self) -> usize {
        self.targets.len()
    }

    /// Target at `index`, for round-robin iteration
    pub fn at(&self, index: usize) -> Option<&Arc<TargetDescriptor>> {
        self.targets.get(index)
    }

    /// All targets, for concurrent fan-out
    pub fn all(&self) -> &[Arc<TargetDescriptor>] {
        &self.targets
    }

    /// Look a target up by id
    pub fn get(&self, id: &str) -> Option<&Arc<TargetDescriptor>> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Every placeholder name used by any target
    pub fn required_parameters(&self) -> &BTreeSet<String> {
        &self.required_parameters
    }
}

/// Check one descriptor and collect its placeholder names
pub fn validate_descriptor(
    target: &TargetDescriptor,
    parameters: &mut BTreeSet<String>,
) -> Result<(), ContractError> {
    let field = |suffix: &str| format!("targets[id={}].{suffix}", target.id);

    if target.id.is_empty() {
        return Err(ContractError::config_validation("targets[].id", "target id cannot be empty"));
    }
    if target.name.trim().is_empty() {
        return Err(ContractError::config_validation(field("name"), "target name cannot be empty"));
    }

    let url = Url::parse(&target.endpoint).map_err(|e| {
        ContractError::config_validation(field("endpoint"), format!("invalid URL '{}': {e}", target.endpoint))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ContractError::config_validation(
            field("endpoint"),
            format!("endpoint must be an http(s) URL with a host, got '{}'", target.endpoint),
        ));
    }

    let template_err = |suffix: String, e: TemplateError| ContractError::config_validation(field(&suffix), e.to_string());

    for (name, value) in &target.headers {
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(field("headers"), "header name cannot be empty"));
        }
        reject_key_placeholder(name).map_err(|e| template_err("headers".to_string(), e))?;
        collect_placeholders(value, parameters).map_err(|e| template_err(format!("headers.{name}"), e))?;
    }

    for (idx, body) in target.body_candidates().enumerate() {
        let suffix = if idx == 0 {
            "body".to_string()
        } else {
            format!("fallback_bodies[{}]", idx - 1)
        };
        collect_body_placeholders(body, parameters).map_err(|e| template_err(suffix, e))?;
    }

    Ok(())
}

fn collect_body_placeholders(
    body: &BodyTemplate,
    parameters: &mut BTreeSet<String>,
) -> Result<(), TemplateError> {
    match body {
        BodyTemplate::Empty => Ok(()),
        BodyTemplate::Text { content } => collect_placeholders(content, parameters),
        BodyTemplate::Form { fields } => fields.iter().try_for_each(|(k, v)| {
            reject_key_placeholder(k)?;
            collect_placeholders(v, parameters)
        }),
        BodyTemplate::Json { value } => collect_json_placeholders(value, parameters),
    }
}

fn collect_json_placeholders(
    value: &serde_json::Value,
    parameters: &mut BTreeSet<String>,
) -> Result<(), TemplateError> {
    match value {
        serde_json::Value::String(s) => collect_placeholders(s, parameters),
        serde_json::Value::Array(items) => items
            .iter()
            .try_for_each(|item| collect_json_placeholders(item, parameters)),
        serde_json::Value::Object(map) => map.iter().try_for_each(|(key, item)| {
            reject_key_placeholder(key)?;
            collect_json_placeholders(item, parameters)
        }),
        _ => Ok(()),
    }
}
