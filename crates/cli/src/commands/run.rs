//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{EngineBlueprint, RuntimeParams};
use std::time::Duration;
use tracing::info;

use super::{load_blueprint, shutdown_signal};
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_dispatch(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;
    apply_overrides(&mut blueprint, args);
    // overrides must still pass validation
    config_loader::ConfigLoader::validate(&blueprint).context("Invalid command-line overrides")?;

    let params = merge_params(&blueprint.params, &args.params);

    info!(
        mode = ?blueprint.engine.mode,
        tick_ms = blueprint.engine.tick_interval_ms,
        call_limit = ?blueprint.engine.call_limit,
        transport = ?blueprint.transport.kind,
        targets = blueprint.targets.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint, &params);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        params,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Dispatch run failed")?;

    info!(
        total_sent = stats.total_sent(),
        duration_secs = stats.duration.as_secs_f64(),
        calls_per_sec = format!("{:.2}", stats.calls_per_sec()),
        "Run finished"
    );
    stats.print_summary();
    Ok(())
}

fn apply_overrides(blueprint: &mut EngineBlueprint, args: &RunArgs) {
    if let Some(mode) = args.mode {
        info!(mode = ?mode, "Overriding dispatch mode from CLI");
        blueprint.engine.mode = mode.into();
    }
    if let Some(tick_ms) = args.tick_ms {
        info!(tick_ms, "Overriding tick interval from CLI");
        blueprint.engine.tick_interval_ms = tick_ms;
    }
    if let Some(limit) = args.limit {
        info!(limit, "Overriding call limit from CLI");
        blueprint.engine.call_limit = (limit > 0).then_some(limit);
    }
}

/// Blueprint defaults, then `--param` entries in order (last one wins)
fn merge_params(defaults: &RuntimeParams, overrides: &[(String, String)]) -> RuntimeParams {
    let mut params = defaults.clone();
    params.extend(overrides.iter().cloned());
    params
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &EngineBlueprint, params: &RuntimeParams) {
    println!("\n=== Configuration Summary ===\n");
    println!("Engine:");
    println!("  Mode: {:?}", blueprint.engine.mode);
    println!("  Tick: {} ms", blueprint.engine.tick_interval_ms);
    match blueprint.engine.call_limit {
        Some(limit) => println!("  Call limit: {limit}"),
        None => println!("  Call limit: unlimited"),
    }
    println!("  Transport: {:?}", blueprint.transport.kind);

    println!("\nTargets ({}):", blueprint.targets.len());
    for target in &blueprint.targets {
        println!(
            "  - {} ({}) {} {}",
            target.id, target.name, target.method, target.endpoint
        );
    }

    if !params.is_empty() {
        println!("\nParameters:");
        for (key, value) in params {
            println!("  {key} = {value}");
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ModeArg;
    use contracts::DispatchMode;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("config.toml"),
            mode: None,
            tick_ms: None,
            limit: None,
            params: Vec::new(),
            timeout: 0,
            dry_run: false,
            metrics_port: 0,
        }
    }

    fn blueprint() -> EngineBlueprint {
        config_loader::ConfigLoader::load_from_str(
            r#"
[engine]
call_limit = 10

[params]
campaign = "default"

[[targets]]
id = "alpha"
name = "Alpha"
endpoint = "https://alpha.example.com/hook"
body = { kind = "text", content = "c={{campaign}}" }
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_apply() {
        let mut bp = blueprint();
        let mut a = args();
        a.mode = Some(ModeArg::Concurrent);
        a.tick_ms = Some(50);
        a.limit = Some(0);
        apply_overrides(&mut bp, &a);
        assert_eq!(bp.engine.mode, DispatchMode::Concurrent);
        assert_eq!(bp.engine.tick_interval_ms, 50);
        assert_eq!(bp.engine.call_limit, None);
    }

    #[test]
    fn test_zero_tick_override_rejected() {
        let mut bp = blueprint();
        let mut a = args();
        a.tick_ms = Some(0);
        apply_overrides(&mut bp, &a);
        assert!(config_loader::ConfigLoader::validate(&bp).is_err());
    }

    #[test]
    fn test_cli_params_override_defaults() {
        let bp = blueprint();
        let params = merge_params(
            &bp.params,
            &[
                ("campaign".into(), "first".into()),
                ("extra".into(), "x".into()),
                ("campaign".into(), "second".into()),
            ],
        );
        assert_eq!(params["campaign"], "second");
        assert_eq!(params["extra"], "x");
    }
}
