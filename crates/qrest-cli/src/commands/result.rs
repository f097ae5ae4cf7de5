//! Result command implementation.
//!
//! Print the results of a saved job, checking the backend once if the job
//! has not resolved yet.

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;

use qrest_hal::{AsyncResult, JobFailure, JobPhase, PollState, SampleResult};

use super::common::{
    create_driver, jobs_dir, load_handle, print_failure, print_results, reconnect,
    resolve_handle_path, save_handle, styled_phase,
};
use crate::ConfigArgs;

/// JSON view of a job.
#[derive(Debug, Serialize)]
pub struct ResultReport<'a> {
    pub backend: &'a str,
    pub job_id: &'a str,
    pub phase: JobPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'a SampleResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<&'a JobFailure>,
}

impl<'a> ResultReport<'a> {
    pub fn new(handle: &'a AsyncResult) -> Self {
        Self {
            backend: handle.backend(),
            job_id: handle.job_id().as_str(),
            phase: handle.phase(),
            result: handle.result(),
            failure: handle.failure(),
        }
    }
}

/// Execute the result command.
pub async fn execute(handle_arg: &str, format: &str, config_args: &ConfigArgs) -> Result<()> {
    let path = resolve_handle_path(handle_arg, &jobs_dir()?);
    let handle = load_handle(&path).await?;

    if !handle.is_resolved() {
        let driver = create_driver()?;
        let helper = reconnect(&driver, &handle, config_args).await?;
        let state = driver.poll_once(helper.as_ref(), &handle).await;
        save_handle(&handle, &path).await?;
        match state {
            Ok(PollState::Pending(_)) => anyhow::bail!(
                "Job {} is still {}. Use 'qrest wait {}' to block until it completes.",
                handle.job_id(),
                handle.phase(),
                handle_arg
            ),
            Err(e) if !handle.is_resolved() => {
                return Err(anyhow::Error::new(e).context("Status check failed"));
            }
            // A failed job is reported below from the stored outcome.
            _ => {}
        }
    }

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&ResultReport::new(&handle))
                .context("JSON serialization failed")?;
            println!("{json}");
        }
        _ => {
            println!(
                "{} Job {} {}",
                style("→").cyan().bold(),
                style(handle.job_id()).dim(),
                styled_phase(handle.phase())
            );
            if let Some(failure) = handle.failure() {
                print_failure(failure);
            }
            if let Some(result) = handle.result() {
                print_results(result);
            }
        }
    }

    Ok(())
}
