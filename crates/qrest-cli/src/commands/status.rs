//! Status command implementation.
//!
//! Make one status check for a saved job and record what was learned.

use anyhow::Result;
use console::style;
use tracing::warn;

use qrest_hal::PollState;

use super::common::{
    create_driver, jobs_dir, load_handle, print_failure, reconnect, resolve_handle_path,
    save_handle, styled_phase,
};
use crate::ConfigArgs;

/// Execute the status command.
pub async fn execute(handle_arg: &str, config_args: &ConfigArgs) -> Result<()> {
    let path = resolve_handle_path(handle_arg, &jobs_dir()?);
    let handle = load_handle(&path).await?;

    if !handle.is_resolved() {
        let driver = create_driver()?;
        let helper = reconnect(&driver, &handle, config_args).await?;
        match driver.poll_once(helper.as_ref(), &handle).await {
            Ok(PollState::Pending(next)) => {
                println!("  Next check suggested in {:?}", next);
            }
            Ok(PollState::Done(_)) => {}
            Err(e) if handle.is_resolved() => {
                warn!("Job resolved with error: {}", e);
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Status check failed")),
        }
        save_handle(&handle, &path).await?;
    }

    println!("{} Job {}\n", style("→").cyan().bold(), style(handle.job_id()).dim());
    println!("  Backend:   {}", handle.backend());
    println!("  Status:    {}", styled_phase(handle.phase()));
    println!("  Circuits:  {}", handle.kernel_names().join(", "));
    println!(
        "  Submitted: {}",
        handle
            .submitted_at()
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(failure) = handle.failure() {
        println!();
        print_failure(failure);
    } else if handle.result().is_some() {
        println!(
            "\n  Use '{}' to view results.",
            style(format!("qrest result {handle_arg}")).dim()
        );
    }

    Ok(())
}
