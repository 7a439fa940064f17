//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::EngineBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    mode: String,
    transport: String,
    target_count: usize,
    required_params: Vec<String>,
    forwarder: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            error: Some(format!("File not found: {config_path}")),
            config_path,
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: config_loader::ConfigLoader::warnings(&blueprint),
            summary: Some(summarize(&blueprint)),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

fn summarize(blueprint: &EngineBlueprint) -> ConfigSummary {
    let required_params = catalog::TargetCatalog::new(blueprint.targets.clone())
        .map(|c| c.required_parameters().iter().cloned().collect())
        .unwrap_or_default();
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        mode: format!("{:?}", blueprint.engine.mode),
        transport: format!("{:?}", blueprint.transport.kind),
        target_count: blueprint.targets.len(),
        required_params,
        forwarder: blueprint.forwarder.is_some(),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Mode: {}", summary.mode);
            println!("  Transport: {}", summary.transport);
            println!("  Targets: {}", summary.target_count);
            if !summary.required_params.is_empty() {
                println!("  Parameters: {}", summary.required_params.join(", "));
            }
            println!(
                "  Forwarder: {}",
                if summary.forwarder { "configured" } else { "none" }
            );
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = write_config(
            r#"
[[targets]]
id = "alpha"
name = "Alpha"
endpoint = "https://alpha.example.com/hook"
body = { kind = "text", content = "c={{campaign}}" }
"#,
        );
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });
        assert!(result.valid);
        assert!(!result.warnings.is_empty());
        let summary = result.summary.unwrap();
        assert_eq!(summary.target_count, 1);
        assert_eq!(summary.required_params, ["campaign"]);
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config(
            r#"
[engine]
tick_interval_ms = 0

[[targets]]
id = "alpha"
name = "Alpha"
endpoint = "https://alpha.example.com/hook"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("tick_interval_ms"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/engine.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
