//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::{BodyTemplate, EngineBlueprint, TargetDescriptor};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    engine: EngineInfo,
    transport: TransportInfo,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
    targets: Vec<TargetInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    forwarder: Option<ForwarderInfo>,
}

#[derive(Serialize)]
struct EngineInfo {
    mode: String,
    tick_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_limit: Option<u64>,
    request_timeout_ms: u64,
    circuit_breaker: Option<(u32, u64)>,
}

#[derive(Serialize)]
struct TransportInfo {
    kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    allowed_hosts: Vec<String>,
}

#[derive(Serialize)]
struct TargetInfo {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<TargetDetail>,
}

#[derive(Serialize)]
struct TargetDetail {
    method: String,
    endpoint: String,
    body: &'static str,
    fallback_bodies: usize,
    response_mode: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    headers: Vec<String>,
}

#[derive(Serialize)]
struct ForwarderInfo {
    bind: String,
    allowed_hosts: Vec<String>,
    upstream_timeout_ms: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn body_kind(body: &BodyTemplate) -> &'static str {
    match body {
        BodyTemplate::Empty => "empty",
        BodyTemplate::Json { .. } => "json",
        BodyTemplate::Form { .. } => "form",
        BodyTemplate::Text { .. } => "text",
    }
}

fn target_info(target: &TargetDescriptor, detailed: bool) -> TargetInfo {
    TargetInfo {
        id: target.id.to_string(),
        name: target.name.clone(),
        detail: detailed.then(|| TargetDetail {
            method: target.method.to_string(),
            endpoint: target.endpoint.clone(),
            body: body_kind(&target.body),
            fallback_bodies: target.fallback_bodies.len(),
            response_mode: format!("{:?}", target.response_mode),
            // values may hold credentials
            headers: target.headers.keys().cloned().collect(),
        }),
    }
}

fn build_config_info(blueprint: &EngineBlueprint, args: &InfoArgs) -> ConfigInfo {
    let breaker = &blueprint.engine.circuit_breaker;
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        engine: EngineInfo {
            mode: format!("{:?}", blueprint.engine.mode),
            tick_interval_ms: blueprint.engine.tick_interval_ms,
            call_limit: blueprint.engine.call_limit,
            request_timeout_ms: blueprint.engine.request_timeout_ms,
            circuit_breaker: breaker
                .enabled
                .then_some((breaker.failure_threshold, breaker.cooldown_ms)),
        },
        transport: TransportInfo {
            kind: format!("{:?}", blueprint.transport.kind),
            allowed_hosts: blueprint.transport.allowed_hosts.entries().to_vec(),
        },
        params: blueprint.params.clone(),
        targets: blueprint
            .targets
            .iter()
            .map(|t| target_info(t, args.targets))
            .collect(),
        forwarder: blueprint.forwarder.as_ref().map(|f| ForwarderInfo {
            bind: f.bind.clone(),
            allowed_hosts: f.allowed_hosts.entries().to_vec(),
            upstream_timeout_ms: f.upstream_timeout_ms,
        }),
    }
}

fn print_config_info(blueprint: &EngineBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Dispatch Engine Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let engine = &blueprint.engine;
    println!("⚙️  Engine");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Mode: {:?}", engine.mode);
    println!("   ├─ Tick: {} ms", engine.tick_interval_ms);
    match engine.call_limit {
        Some(limit) => println!("   ├─ Call limit: {}", limit),
        None => println!("   ├─ Call limit: unlimited"),
    }
    println!("   ├─ Request timeout: {} ms", engine.request_timeout_ms);
    if engine.circuit_breaker.enabled {
        println!(
            "   └─ Circuit breaker: {} failures, {} ms cooldown",
            engine.circuit_breaker.failure_threshold, engine.circuit_breaker.cooldown_ms
        );
    } else {
        println!("   └─ Circuit breaker: disabled");
    }

    println!("\n🔌 Transport: {:?}", blueprint.transport.kind);
    if !blueprint.transport.allowed_hosts.is_empty() {
        println!(
            "   └─ Allowed hosts: {}",
            blueprint.transport.allowed_hosts.entries().join(", ")
        );
    }

    println!("\n🎯 Targets ({})", blueprint.targets.len());
    for (i, target) in blueprint.targets.iter().enumerate() {
        let is_last = i == blueprint.targets.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({})", prefix, target.id, target.name);
        if args.targets {
            println!("   {}  ├─ {} {}", child_prefix, target.method, target.endpoint);
            println!(
                "   {}  ├─ Body: {} (+{} fallback)",
                child_prefix,
                body_kind(&target.body),
                target.fallback_bodies.len()
            );
            println!("   {}  └─ Response: {:?}", child_prefix, target.response_mode);
        }
    }

    if !blueprint.params.is_empty() {
        println!("\n🧩 Default parameters");
        for (key, value) in &blueprint.params {
            println!("   ├─ {} = {}", key, value);
        }
    }

    if let Some(forwarder) = &blueprint.forwarder {
        println!("\n📤 Forwarder");
        println!("   ├─ Bind: {}", forwarder.bind);
        println!("   ├─ Allowed hosts: {}", forwarder.allowed_hosts.entries().join(", "));
        println!("   └─ Upstream timeout: {} ms", forwarder.upstream_timeout_ms);
    }

    println!();
}
