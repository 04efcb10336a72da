//! `execute` alarm channel.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ALARM_COMMAND_TIMEOUT_SECS;
use crate::error_handling::NotifyError;

/// Runs `command` through `sh -c`, writing the report to its stdin.
///
/// # Errors
///
/// Fails when the command can't be spawned, exits unsuccessfully or runs
/// longer than [`ALARM_COMMAND_TIMEOUT_SECS`].
pub async fn run_alarm_command(command: &str, html: &str) -> Result<(), NotifyError> {
    run_alarm_command_with_timeout(
        command,
        html,
        Duration::from_secs(ALARM_COMMAND_TIMEOUT_SECS),
    )
    .await
}

pub(crate) async fn run_alarm_command_with_timeout(
    command: &str,
    html: &str,
    limit: Duration,
) -> Result<(), NotifyError> {
    let failed = |message: String| NotifyError::Command {
        command: command.to_string(),
        message,
    };

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| failed(e.to_string()))?;

    let completed = timeout(limit, async {
        if let Some(mut stdin) = child.stdin.take() {
            // a command that ignores its input may close stdin early
            if let Err(e) = stdin.write_all(html.as_bytes()).await {
                log::debug!("Alarm command {:?} closed stdin: {}", command, e);
            }
        }
        child.wait().await
    })
    .await;

    let status = match completed {
        Ok(waited) => waited.map_err(|e| failed(e.to_string()))?,
        Err(_) => {
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill alarm command {:?}: {}", command, e);
            }
            return Err(failed(format!("timed out after {:?}", limit)));
        }
    };
    if status.success() {
        Ok(())
    } else {
        Err(failed(format!("exited with {status}")))
    }
}
