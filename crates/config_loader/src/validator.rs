//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (validator derive: 范围、长度)
//! - target id 唯一，endpoint / 模板合法
//! - 模拟器 min_latency_ms <= max_latency_ms，失败率与限流率之和 <= 1
//! - http 传输：allowlist 非空且覆盖每个 target 的 host
//! - forwarder：allowlist 非空

use std::collections::{BTreeSet, HashSet};

use contracts::{ContractError, EngineBlueprint, HostAllowlist, TransportKind};
use url::Url;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 EngineBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_targets(blueprint)?;
    validate_emulation(blueprint)?;
    validate_transport_allowlist(blueprint)?;
    validate_forwarder(blueprint)?;
    Ok(())
}

/// 非致命问题，供 `validate` 命令展示
pub fn warnings(blueprint: &EngineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut required = BTreeSet::new();
    for target in &blueprint.targets {
        // errors were already reported by validate()
        let _ = catalog::validate_descriptor(target, &mut required);
    }
    for name in required.iter().filter(|n| !blueprint.params.contains_key(*n)) {
        warnings.push(format!("parameter '{name}' has no default, pass it with --param {name}=..."));
    }
    for name in blueprint.params.keys().filter(|n| !required.contains(*n)) {
        warnings.push(format!("parameter '{name}' is not used by any target"));
    }

    if blueprint.engine.call_limit.is_none() {
        warnings.push("no call_limit set, the run only ends on stop".to_string());
    }
    if blueprint.transport.kind == TransportKind::Emulated && !blueprint.transport.allowed_hosts.is_empty() {
        warnings.push("transport.allowed_hosts is ignored by the emulated transport".to_string());
    }
    for target in &blueprint.targets {
        if target.endpoint.starts_with("http://") {
            warnings.push(format!("target '{}' uses plain http", target.id));
        }
    }
    warnings
}

/// 字段级规则 (validator derive)
fn validate_fields(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let (field, message) = first_error("", &errors)
            .unwrap_or_else(|| ("blueprint".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 取第一个字段错误 (按字段名排序，保证输出稳定)
fn first_error(prefix: &str, errors: &ValidationErrors) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                (path.clone(), message)
            }),
            ValidationErrorsKind::Struct(inner) => first_error(&path, inner),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_error(&format!("{path}[{idx}]"), inner)),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// 校验 target id 唯一性与每个 descriptor
fn validate_targets(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    let mut parameters = BTreeSet::new();
    for target in &blueprint.targets {
        if !seen.insert(&target.id) {
            return Err(ContractError::config_validation(
                format!("targets[id={}]", target.id),
                "duplicate target id",
            ));
        }
        catalog::validate_descriptor(target, &mut parameters)?;
    }
    Ok(())
}

/// 校验模拟器参数
fn validate_emulation(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    let emulation = &blueprint.transport.emulation;
    if emulation.min_latency_ms > emulation.max_latency_ms {
        return Err(ContractError::config_validation(
            "transport.emulation.min_latency_ms / transport.emulation.max_latency_ms",
            format!(
                "min_latency_ms ({}) must be <= max_latency_ms ({})",
                emulation.min_latency_ms, emulation.max_latency_ms
            ),
        ));
    }
    if emulation.failure_rate + emulation.rate_limit_rate > 1.0 {
        return Err(ContractError::config_validation(
            "transport.emulation",
            "failure_rate + rate_limit_rate must be <= 1",
        ));
    }
    Ok(())
}

/// http 传输只允许访问 allowlist 内的 host
fn validate_transport_allowlist(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    if blueprint.transport.kind != TransportKind::Http {
        return Ok(());
    }
    let allowlist = &blueprint.transport.allowed_hosts;
    require_allowlist("transport.allowed_hosts", allowlist)?;

    for target in &blueprint.targets {
        let allowed = Url::parse(&target.endpoint)
            .map(|url| allowlist.allows_url(&url))
            .unwrap_or(false);
        if !allowed {
            return Err(ContractError::config_validation(
                format!("targets[id={}].endpoint", target.id),
                format!("host of '{}' is not in transport.allowed_hosts", target.endpoint),
            ));
        }
    }
    Ok(())
}

/// 校验 forwarder 配置
fn validate_forwarder(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    match &blueprint.forwarder {
        Some(forwarder) => require_allowlist("forwarder.allowed_hosts", &forwarder.allowed_hosts),
        None => Ok(()),
    }
}

fn require_allowlist(field: &str, allowlist: &HostAllowlist) -> Result<(), ContractError> {
    if allowlist.is_empty() {
        return Err(ContractError::config_validation(
            field,
            "allowlist cannot be empty",
        ));
    }
    Ok(())
}
