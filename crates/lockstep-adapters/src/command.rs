//! Subprocess helpers with timeouts

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use lockstep_core::error::{AdapterError, Result};

/// Run a shell command line in `dir`
pub(crate) async fn run_shell(command: &str, dir: &Path, timeout: Duration) -> Result<Output> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    run(cmd, command, dir, timeout).await
}

/// Run `program` with `args` in `dir`
pub(crate) async fn run_program(
    program: &Path,
    args: &[&str],
    dir: &Path,
    timeout: Duration,
) -> Result<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    let display = format!("{} {}", program.display(), args.join(" "));
    run(cmd, &display, dir, timeout).await
}

/// Fail with the command's stderr unless it exited successfully
pub(crate) fn check_success(command: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let reason = if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    };
    Err(AdapterError::CommandFailed {
        command: command.to_string(),
        reason,
    }
    .into())
}

async fn run(mut cmd: Command, command_line: &str, dir: &Path, timeout: Duration) -> Result<Output> {
    debug!(command = command_line, dir = %dir.display(), "running command");
    let start = Instant::now();

    cmd.current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| AdapterError::CommandTimeout {
            command: command_line.to_string(),
            timeout,
        })?
        .map_err(|e| AdapterError::CommandFailed {
            command: command_line.to_string(),
            reason: e.to_string(),
        })?;

    debug!(
        command = command_line,
        duration_ms = start.elapsed().as_millis(),
        success = output.status.success(),
        "command finished"
    );
    Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use lockstep_core::error::LockstepError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_shell() {
        let temp = TempDir::new().unwrap();
        let output = run_shell("echo hello", temp.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn test_check_success_reports_stderr() {
        let temp = TempDir::new().unwrap();
        let output = run_shell("echo broken >&2; exit 3", temp.path(), Duration::from_secs(10))
            .await
            .unwrap();
        let err = check_success("npm install", &output).unwrap_err();
        assert!(err.to_string().contains("broken"));
        assert!(err.to_string().contains("npm install"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let temp = TempDir::new().unwrap();
        let err = run_shell("sleep 5", temp.path(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LockstepError::Adapter(AdapterError::CommandTimeout { .. })
        ));
    }
}
