//! Stdio transport for tool server processes
//!
//! Newline-delimited JSON over the child's stdin/stdout. Each transport is
//! exclusively owned by one process handle; the internal mutexes serialize
//! channel access so concurrent callers never interleave frames.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

/// Bidirectional byte-stream channel to a spawned tool server.
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    child: Mutex<Child>,
    pid: Option<u32>,
}

impl StdioTransport {
    /// Spawn a tool server process.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        tracing::info!("Spawning tool server: {} {:?}", command, args);
        for (k, v) in env {
            // Mask secrets in logs
            let shown = if k.contains("API_KEY") || k.contains("TOKEN") {
                format!("{}...", v.chars().take(4).collect::<String>())
            } else {
                v.clone()
            };
            tracing::debug!("  env {}={}", k, shown);
        }

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("child has no stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child has no stdout"))?;
        let pid = child.id();

        Ok(Self {
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            child: Mutex::new(child),
            pid,
        })
    }

    /// OS process id, if the child is still attached.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Send one framed message (newline-delimited JSON).
    pub async fn send(&self, message: &str) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(message.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        tracing::debug!("Sent: {}", message);
        Ok(())
    }

    /// Receive one framed message, skipping non-JSON noise lines.
    pub async fn receive(&self) -> Result<String> {
        let mut stdout = self.stdout.lock().await;

        loop {
            let mut line = String::new();
            let bytes = stdout.read_line(&mut line).await?;

            if bytes == 0 {
                // EOF - check whether the process died
                let mut child = self.child.lock().await;
                return match child.try_wait() {
                    Ok(Some(status)) => Err(anyhow!("tool server exited with {}", status)),
                    Ok(None) => Err(anyhow!("tool server closed stdout unexpectedly")),
                    Err(e) => Err(anyhow!("error checking tool server status: {}", e)),
                };
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('{') {
                tracing::debug!("Received: {}", line);
                return Ok(line.to_string());
            }

            // Could be debug output from the server
            tracing::debug!("Skipping non-JSON line: {}", line);
        }
    }

    /// Non-blocking poll: `Some(exit_code)` once the process has exited.
    pub async fn poll_exit(&self) -> Option<Option<i32>> {
        let mut child = self.child.lock().await;
        match child.try_wait() {
            Ok(Some(status)) => Some(status.code()),
            _ => None,
        }
    }

    /// Check if the process is still running.
    pub async fn is_alive(&self) -> bool {
        let mut child = self.child.lock().await;
        matches!(child.try_wait(), Ok(None))
    }

    /// Ask the process to terminate gracefully (SIGTERM on unix).
    pub async fn terminate(&self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            let _ = std::process::Command::new("kill")
                .arg("-TERM")
                .arg(pid.to_string())
                .output();
            return;
        }

        // No graceful signal available; fall through to a hard kill
        let mut child = self.child.lock().await;
        let _ = child.start_kill();
    }

    /// Forcibly kill the process.
    pub async fn force_kill(&self) {
        let mut child = self.child.lock().await;
        let _ = child.start_kill();
    }

    /// Wait for exit with a timeout. Returns the exit code when the process
    /// ended in time.
    pub async fn wait_with_timeout(&self, timeout: std::time::Duration) -> Option<Option<i32>> {
        let mut child = self.child.lock().await;
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => Some(status.code()),
            Ok(Err(_)) | Err(_) => None,
        }
    }
}
