//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use bookfolk_core::Config;

use crate::output::{Output, OutputFormat};

/// Keys whose values are masked in `config show`
const SECRET_KEYS: &[&str] = &["api_key", "catalog_api_key"];

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "backend": config.backend.to_string(),
                    "api_key": config.api_key.as_deref().map(mask),
                    "project_id": config.project_id,
                    "catalog_api_key": config.catalog_api_key.as_deref().map(mask),
                    "request_timeout_secs": config.request_timeout_secs,
                    "log_file": config.log_path()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            let unset = || "(not set)".to_string();

            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  backend:              {}", config.backend);
            println!(
                "  api_key:              {}",
                config.api_key.as_deref().map(mask).unwrap_or_else(unset)
            );
            println!(
                "  project_id:           {}",
                config.project_id.clone().unwrap_or_else(unset)
            );
            println!(
                "  catalog_api_key:      {}",
                config.catalog_api_key.as_deref().map(mask).unwrap_or_else(unset)
            );
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!("  log_file:             {}", config.log_path().display());
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    let cleared = value.is_empty() || value == "none";
    config.set(&key, if cleared { "" } else { &value })?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if SECRET_KEYS.contains(&key.as_str()) {
        mask(&value)
    } else {
        value.clone()
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

/// Keep the last four characters of a secret
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
