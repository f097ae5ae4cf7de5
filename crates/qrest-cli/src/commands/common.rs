//! Shared helpers for CLI commands.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use console::{StyledObject, style};

use qrest_hal::{
    AsyncResult, BackendConfig, BackendRegistry, HttpClient, JobDriver, JobFailure, JobPhase,
    SampleResult, ServerHelper,
};

use crate::ConfigArgs;

/// Return the default qrest state directory (~/.qrest/).
pub fn default_state_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let state_dir = home.join(".qrest");
    if !state_dir.exists() {
        fs::create_dir_all(&state_dir).with_context(|| {
            format!("Failed to create state directory: {}", state_dir.display())
        })?;
    }
    Ok(state_dir)
}

/// Directory holding saved job handles.
pub fn jobs_dir() -> Result<PathBuf> {
    Ok(default_state_dir()?.join("jobs"))
}

/// Map a `<handle>` argument to a handle file.
///
/// Existing paths and `.json` names are taken literally; anything else is a
/// job ID looked up under `jobs_dir`.
pub fn resolve_handle_path(handle: &str, jobs_dir: &Path) -> PathBuf {
    let path = Path::new(handle);
    if path.exists() || path.extension().is_some_and(|e| e == "json") {
        path.to_path_buf()
    } else {
        jobs_dir.join(format!("{handle}.json"))
    }
}

/// Registry with every backend compiled into the CLI.
pub fn create_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    qrest_adapter_fermioniq::register(&mut registry);
    registry
}

/// Driver over the HTTP transport.
pub fn create_driver() -> Result<JobDriver> {
    let transport = HttpClient::new().context("Failed to build HTTP client")?;
    Ok(JobDriver::new(
        Arc::new(create_registry()),
        Arc::new(transport),
    ))
}

/// Split a `--set KEY=VALUE` argument.
pub fn parse_assignment(arg: &str) -> Result<(String, String)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid --set '{arg}': expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Invalid --set '{arg}': empty key");
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse a flat YAML map into configuration entries.
///
/// Scalars are stringified; nested values are rejected.
pub fn parse_yaml_config(source: &str) -> Result<BackendConfig> {
    let map: BTreeMap<String, serde_yaml_ng::Value> = match serde_yaml_ng::from_str(source)
        .context("Invalid YAML configuration")?
    {
        Some(map) => map,
        None => return Ok(BackendConfig::new()),
    };

    let mut config = BackendConfig::new();
    for (key, value) in map {
        let value = match value {
            serde_yaml_ng::Value::String(s) => s,
            serde_yaml_ng::Value::Number(n) => n.to_string(),
            serde_yaml_ng::Value::Bool(b) => b.to_string(),
            serde_yaml_ng::Value::Null => continue,
            _ => anyhow::bail!("Configuration key '{key}' must be a scalar"),
        };
        config.insert(key, value);
    }
    Ok(config)
}

/// Build the backend configuration from a YAML file and `--set` overrides.
///
/// `--set` wins over the file. Keys absent from both fall through to the
/// adapter's environment variables and defaults.
pub fn load_config(args: &ConfigArgs) -> Result<BackendConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            parse_yaml_config(&source)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => BackendConfig::new(),
    };

    for arg in &args.set {
        let (key, value) = parse_assignment(arg)?;
        config.insert(key, value);
    }
    Ok(config)
}

/// Load a saved handle.
pub async fn load_handle(path: &Path) -> Result<AsyncResult> {
    AsyncResult::load(path)
        .await
        .with_context(|| format!("Failed to load job handle: {}", path.display()))
}

/// Save a handle, creating parent directories.
pub async fn save_handle(handle: &AsyncResult, path: &Path) -> Result<()> {
    handle
        .save(path)
        .await
        .with_context(|| format!("Failed to save job handle: {}", path.display()))
}

/// Reconnect to the backend of a stored handle.
pub async fn reconnect(
    driver: &JobDriver,
    handle: &AsyncResult,
    args: &ConfigArgs,
) -> Result<Arc<dyn ServerHelper>> {
    let overrides = load_config(args)?;
    driver
        .resume(handle, &overrides)
        .await
        .with_context(|| format!("Failed to reconnect to backend '{}'", handle.backend()))
}

/// Styled phase name.
pub fn styled_phase(phase: JobPhase) -> StyledObject<String> {
    let name = phase.to_string();
    match phase {
        JobPhase::Done => style(name).green().bold(),
        JobPhase::Failed => style(name).red().bold(),
        JobPhase::Created | JobPhase::Submitted => style(name).yellow().bold(),
        JobPhase::Polling => style(name).cyan().bold(),
    }
}

/// Print execution results in a table format (shared by submit, result, wait).
pub fn print_results(result: &SampleResult) {
    for execution in &result.executions {
        let total = execution.counts.total_shots();
        println!(
            "\n{} {} ({} shots):",
            style("✓").green().bold(),
            style(&execution.name).bold(),
            total
        );

        let sorted = execution.counts.sorted();
        for (bitstring, count) in sorted.iter().take(16) {
            let prob = if total == 0 {
                0.0
            } else {
                **count as f64 / total as f64 * 100.0
            };
            let bar_len = (prob / 2.0).round() as usize;
            let bar: String = "█".repeat(bar_len);

            println!(
                "  {}: {:>6} ({:>5.2}%) {}",
                style(bitstring).cyan(),
                count,
                prob,
                style(bar).green()
            );
        }

        if sorted.len() > 16 {
            println!("  ... and {} more outcomes", sorted.len() - 16);
        }
    }
}

/// Print a recorded failure.
pub fn print_failure(failure: &JobFailure) {
    match failure.code {
        Some(code) => println!(
            "{} Job failed ({:?}, code {}): {}",
            style("✗").red().bold(),
            failure.kind,
            code,
            style(&failure.message).red()
        ),
        None => println!(
            "{} Job failed ({:?}): {}",
            style("✗").red().bold(),
            failure.kind,
            style(&failure.message).red()
        ),
    }
}
