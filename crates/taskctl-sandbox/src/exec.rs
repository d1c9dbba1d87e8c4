//! Sandbox Executor — the only path to the filesystem and shell. Every other
//! manager in this crate composes `SandboxExecutor::exec` or plain `tokio::fs`;
//! nothing else spawns a process.

use std::process::Stdio;
use std::time::{Duration, Instant};

use taskctl_core::{ErrorKind, ExecutionResult};
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct SandboxExecutor {
    default_timeout: Duration,
    max_timeout: Duration,
    output_limit_bytes: usize,
}

impl SandboxExecutor {
    pub fn new(default_timeout: Duration, max_timeout: Duration, output_limit_bytes: usize) -> Self {
        Self { default_timeout, max_timeout, output_limit_bytes }
    }

    pub fn from_config(config: &taskctl_core::Config) -> Self {
        Self::new(config.bash_default_timeout, config.bash_max_timeout, config.bash_output_limit_bytes)
    }

    /// Runs `cmd` under `bash -c`. `block` is accepted but always honored as
    /// blocking — see the reserved poll-based API note in the design notes.
    pub async fn exec(
        &self,
        cmd: &str,
        _block: bool,
        timeout_secs: Option<u64>,
        cwd: Option<&str>,
    ) -> ExecutionResult {
        let requested = timeout_secs.map(Duration::from_secs).unwrap_or(self.default_timeout);
        let timeout = requested.min(self.max_timeout);

        let mut command = tokio::process::Command::new("bash");
        command.arg("-c").arg(cmd);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        command.kill_on_drop(true);
        #[cfg(unix)]
        {
            command.process_group(0);
        }

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "bash: failed to spawn");
                return ExecutionResult::error(ErrorKind::Internal, format!("failed to spawn: {e}"));
            }
        };

        let pid = child.id();
        let wait = tokio::time::timeout(timeout, child.wait_with_output());
        match wait.await {
            Ok(Ok(output)) => {
                let duration = started.elapsed();
                self.to_execution_result(output, duration, false)
            }
            Ok(Err(e)) => ExecutionResult::error(ErrorKind::Internal, format!("failed to wait on child: {e}")),
            Err(_) => {
                kill_process_group(pid);
                debug!(timeout_secs = timeout.as_secs(), "bash: timed out");
                ExecutionResult::error(
                    ErrorKind::Timeout,
                    format!("command timed out after {}s", timeout.as_secs()),
                )
            }
        }
    }

    fn to_execution_result(&self, output: std::process::Output, duration: Duration, timed_out: bool) -> ExecutionResult {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut combined = if stderr.is_empty() {
            stdout.trim_end().to_string()
        } else {
            format!("{}\n{}", stdout.trim_end(), stderr.trim_end())
        };
        if combined.is_empty() {
            combined = "(no output)".to_string();
        }

        let truncated = combined.len() > self.output_limit_bytes;
        if truncated {
            combined.truncate(self.output_limit_bytes);
            combined.push_str(&format!("\n[truncated, output exceeded {} bytes]", self.output_limit_bytes));
        }

        debug!(
            exit_code = output.status.code(),
            duration_ms = duration.as_millis() as u64,
            truncated,
            "bash: completed"
        );

        if timed_out {
            return ExecutionResult::error(ErrorKind::Timeout, "command timed out");
        }
        if truncated {
            return ExecutionResult::error_with_payload(
                ErrorKind::Truncated,
                format!("output truncated to {} bytes", self.output_limit_bytes),
                combined,
            );
        }
        if !output.status.success() {
            return ExecutionResult::error_with_payload(
                ErrorKind::NonZeroExit,
                format!("exit code {}", output.status.code().unwrap_or(-1)),
                combined,
            );
        }
        ExecutionResult::success(combined)
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exec_success_returns_stdout() {
        let exec = SandboxExecutor::new(Duration::from_secs(5), Duration::from_secs(30), 100 * 1024);
        let r = exec.exec("echo hi", true, None, None).await;
        assert!(r.ok);
        assert_eq!(r.payload, "hi");
    }

    #[tokio::test]
    async fn exec_non_zero_exit_carries_payload() {
        let exec = SandboxExecutor::new(Duration::from_secs(5), Duration::from_secs(30), 100 * 1024);
        let r = exec.exec("echo boom >&2; exit 3", true, None, None).await;
        assert!(!r.ok);
        assert_eq!(r.error_kind, Some(ErrorKind::NonZeroExit));
        assert!(r.payload.contains("boom"));
    }

    #[tokio::test]
    async fn exec_timeout_kills_and_reports() {
        let exec = SandboxExecutor::new(Duration::from_millis(100), Duration::from_secs(30), 100 * 1024);
        let r = exec.exec("sleep 5", true, None, None).await;
        assert!(!r.ok);
        assert_eq!(r.error_kind, Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn exec_output_over_limit_is_truncated() {
        let exec = SandboxExecutor::new(Duration::from_secs(5), Duration::from_secs(30), 10);
        let r = exec.exec("echo 0123456789ABCDEF", true, None, None).await;
        assert!(!r.ok);
        assert_eq!(r.error_kind, Some(ErrorKind::Truncated));
        assert!(r.payload.contains("[truncated"));
    }
}
