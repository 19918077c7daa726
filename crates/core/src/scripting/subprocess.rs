//! Shared subprocess management utilities.
//!
//! Provides [`run_command`], the spawn + pipe + capture logic used by the
//! out-of-process runtimes. A runtime builds a [`tokio::process::Command`]
//! for its interpreter and delegates the actual I/O here.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::executor::ScriptError;

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output exceeding this limit is truncated to prevent memory exhaustion
/// from extremely verbose scripts.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Captured output of a finished child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Complete stdout captured from the process.
    pub stdout: String,
    /// Complete stderr captured from the process.
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Spawn `cmd` as a child process, write `stdin_payload` to its stdin and
/// capture stdout/stderr until it exits.
///
/// There is no timeout. The child is killed if the returned future is
/// dropped before completion (for example when the job queue abandons
/// in-flight work on shutdown).
pub async fn run_command(
    cmd: &mut Command,
    stdin_payload: Vec<u8>,
) -> Result<ProcessOutput, ScriptError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(ScriptError::IoError)?;

    // Start draining the output pipes before feeding stdin so a chatty child
    // cannot block on a full pipe while we are still writing.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    if let Some(mut stdin) = child.stdin.take() {
        // Best-effort write; if the process closes stdin early, ignore the error.
        let _ = stdin.write_all(&stdin_payload).await;
        drop(stdin);
    }

    let status = child.wait().await.map_err(ScriptError::IoError)?;

    let duration_ms = start.elapsed().as_millis() as u64;
    let stdout_bytes = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        exit_code: status.code().unwrap_or(-1),
        duration_ms,
    })
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
