//! Command implementations for the opgen CLI

use opgen_core::config::{DEFAULT_GRAMMAR_PATH, DEFAULT_MAX_CHUNK_LENGTH};
use opgen_core::{ConfigLoader, Generator, GeneratorOptions, GrammarLayout, OpgenError, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::output::{self, SummaryPrinter};
use crate::{ConfigFormat, GenerateArgs, OutputFormat};

/// Config file layered under the command-line flags
fn resolve_options(args: GenerateArgs, config_path: Option<PathBuf>) -> Result<GeneratorOptions> {
    let mut options = ConfigLoader::load(config_path.as_deref(), Some(Path::new(".")))?;
    args.apply(&mut options);
    options.validate()?;
    debug!("Effective options: {:?}", options);
    Ok(options)
}

/// Generate command implementation
pub async fn generate_command(
    args: GenerateArgs,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let options = resolve_options(args, config_path)?;
    let summary = tokio::task::spawn_blocking(move || Generator::new(options).run())
        .await
        .map_err(|e| OpgenError::configuration(format!("Generation task failed: {e}")))??;

    SummaryPrinter::new(format).print(&summary)
}

/// Watch command implementation
pub async fn watch_command(args: GenerateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let options = resolve_options(args, config_path)?;
    println!(
        "Watching Openplanet metadata for {} (Ctrl-C to stop)",
        options.grammar_path().display()
    );
    opgen_core::watch(options, output::print_report).await
}

/// Config init command implementation
pub async fn config_init_command(format: ConfigFormat, force: bool, with_layout: bool) -> Result<()> {
    debug!("Initializing configuration file with format: {:?}", format);

    let filename = match format {
        ConfigFormat::Json => ".opgenrc.json",
        ConfigFormat::Toml => ".opgenrc.toml",
    };
    let config_path = PathBuf::from(filename);

    if config_path.exists() && !force {
        return Err(OpgenError::configuration(format!(
            "Configuration file '{filename}' already exists. Use --force to overwrite."
        )));
    }

    let mut starter = json!({
        "openplanetDirs": [],
        "includeHeaders": false,
        "grammar": DEFAULT_GRAMMAR_PATH,
        "maxChunkLength": DEFAULT_MAX_CHUNK_LENGTH,
    });
    if with_layout {
        let layout = serde_json::to_value(GrammarLayout::default())
            .map_err(|e| OpgenError::configuration(format!("Failed to serialize layout: {e}")))?;
        starter["layout"] = layout;
    }

    let content = serialize(&starter, format)?;
    std::fs::write(&config_path, content).map_err(|e| OpgenError::io(&config_path, e))?;

    println!("Created configuration file: {filename}");
    println!("   Edit openplanetDirs to point at your Openplanet installs.");
    Ok(())
}

/// Config show command implementation
pub async fn config_show_command(format: ConfigFormat, config_path: Option<PathBuf>) -> Result<()> {
    let options = ConfigLoader::load(config_path.as_deref(), Some(Path::new(".")))?;
    print!("{}", serialize(&options, format)?);
    Ok(())
}

/// Config schema command implementation
pub async fn config_schema_command() -> Result<()> {
    let schema = schemars::schema_for!(GeneratorOptions);
    let content = serde_json::to_string_pretty(&schema)
        .map_err(|e| OpgenError::configuration(format!("Failed to serialize schema: {e}")))?;
    println!("{content}");
    Ok(())
}

fn serialize<T: serde::Serialize>(value: &T, format: ConfigFormat) -> Result<String> {
    match format {
        ConfigFormat::Json => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| OpgenError::configuration(format!("Failed to serialize JSON: {e}"))),
        ConfigFormat::Toml => toml::to_string_pretty(value)
            .map_err(|e| OpgenError::configuration(format!("Failed to serialize TOML: {e}"))),
    }
}
