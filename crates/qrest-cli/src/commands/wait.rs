//! Wait command implementation.
//!
//! Poll a saved job until it reaches a terminal state, then print results.

use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::common::{
    create_driver, jobs_dir, load_handle, print_results, reconnect, resolve_handle_path,
    save_handle,
};
use crate::ConfigArgs;

/// Execute the wait command.
pub async fn execute(handle_arg: &str, timeout: Option<u64>, config_args: &ConfigArgs) -> Result<()> {
    let path = resolve_handle_path(handle_arg, &jobs_dir()?);
    let handle = load_handle(&path).await?;

    if let Some(outcome) = handle.outcome() {
        let result = outcome.to_result().context("Job failed")?;
        print_results(&result);
        return Ok(());
    }

    let driver = create_driver()?;
    let helper = reconnect(&driver, &handle, config_args).await?;

    match timeout {
        Some(secs) => println!(
            "{} Waiting for job {} (timeout: {}s)",
            style("→").cyan().bold(),
            style(handle.job_id()).dim(),
            secs
        ),
        None => println!(
            "{} Waiting for job {}",
            style("→").cyan().bold(),
            style(handle.job_id()).dim()
        ),
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .context("Invalid progress template")?,
    );
    spinner.set_message(format!("Polling {}...", handle.backend()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = match timeout {
        Some(secs) => {
            driver
                .wait_with_timeout(helper.as_ref(), &handle, Duration::from_secs(secs))
                .await
        }
        None => driver.wait(helper.as_ref(), &handle).await.map(Some),
    };
    spinner.finish_and_clear();
    save_handle(&handle, &path).await?;

    match outcome.context("Job did not complete")? {
        Some(result) => {
            print_results(&result);
            Ok(())
        }
        None => anyhow::bail!(
            "Timeout after {}s. Job {} is still {}. Use 'qrest status {}' to check later.",
            timeout.unwrap_or_default(),
            handle.job_id(),
            handle.phase(),
            handle_arg
        ),
    }
}
