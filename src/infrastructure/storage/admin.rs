use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{HarnessError, HarnessResult};

/// Runs an administrative tool to completion.
///
/// A missing binary or a non-zero exit is a provisioning failure; setup
/// code does not retry.
pub async fn run_admin_command<I, S>(program: &str, args: I) -> HarnessResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    tracing::debug!(program = %program, ?args, "Running administrative command");

    let output = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            tracing::error!(program = %program, error = %e, "Failed to run administrative command");
            HarnessError::Provisioning(format!("could not run {}: {}", program, e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(
            program = %program,
            status = %output.status,
            stderr = %stderr.trim(),
            "Administrative command failed"
        );
        return Err(HarnessError::Provisioning(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

/// Runs a probe command, reporting whether it exited successfully.
///
/// Used for readiness checks, where a non-zero exit means "not yet".
pub async fn probe_command<I, S>(program: &str, args: I) -> HarnessResult<bool>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| HarnessError::Provisioning(format!("could not run {}: {}", program, e)))?;

    Ok(status.success())
}

/// Blocking variant for shutdown paths that run inside `Drop`.
pub fn run_blocking<I, S>(program: &str, args: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    match std::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::warn!(program = %program, %status, "Shutdown command failed"),
        Err(e) => tracing::warn!(program = %program, error = %e, "Could not run shutdown command"),
    }
}
