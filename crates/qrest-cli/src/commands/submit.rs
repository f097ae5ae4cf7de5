//! Submit command implementation.
//!
//! Read compiled circuits, submit them as one job and save the job handle.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;

use qrest_hal::KernelExecution;

use super::common::{create_driver, jobs_dir, load_config, print_results, save_handle};
use crate::ConfigArgs;

/// Read one compiled circuit; the file stem names the kernel.
pub fn load_kernel(path: &Path) -> Result<KernelExecution> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let code = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Cannot derive a kernel name from {}", path.display()))?;

    Ok(KernelExecution::new(name, code))
}

/// Execute the submit command.
pub async fn execute(
    backend: &str,
    inputs: &[PathBuf],
    config_args: &ConfigArgs,
    output: Option<&Path>,
    do_wait: bool,
) -> Result<()> {
    let kernels = inputs
        .iter()
        .map(|p| load_kernel(p))
        .collect::<Result<Vec<_>>>()?;
    let config = load_config(config_args)?;

    println!(
        "{} Submitting {} circuit(s) to {}",
        style("→").cyan().bold(),
        kernels.len(),
        style(backend).bold()
    );

    let driver = create_driver()?;
    let helper = driver
        .connect(backend, config)
        .await
        .with_context(|| format!("Failed to connect to backend '{backend}'"))?;
    let handle = driver
        .submit(helper.as_ref(), &kernels)
        .await
        .context("Submission failed")?;

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => jobs_dir()?.join(format!("{}.json", handle.job_id())),
    };
    save_handle(&handle, &path).await?;

    println!(
        "{} Job submitted: {}",
        style("✓").green().bold(),
        style(handle.job_id()).cyan()
    );
    println!("  Handle: {}", path.display());

    if do_wait {
        println!("\n{} Waiting for job to complete...", style("→").cyan().bold());
        let outcome = driver.wait(helper.as_ref(), &handle).await;
        save_handle(&handle, &path).await?;
        let result = outcome.context("Job did not complete")?;
        print_results(&result);
    } else {
        println!(
            "\n  Use '{}' to check progress.",
            style(format!("qrest status {}", path.display())).dim()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_kernel_names_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bell.qasm");
        fs::write(&path, "OPENQASM 2.0;\nqreg q[2];\n").unwrap();

        let kernel = load_kernel(&path).unwrap();
        assert_eq!(kernel.name, "bell");
        assert!(kernel.code.starts_with("OPENQASM 2.0;"));
    }

    #[test]
    fn test_load_kernel_missing_file() {
        let err = load_kernel(Path::new("/nonexistent/ghz.qasm")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
