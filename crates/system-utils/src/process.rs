use std::io;
use std::process::{ExitStatus, Stdio};

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Stream sinks handed to a child process. Unset streams are wired to null.
#[derive(Default)]
pub struct ChildIo {
    pub stdin: Option<BoxedReader>,
    pub stdout: Option<BoxedWriter>,
    pub stderr: Option<BoxedWriter>,
}

/// Spawns `cmd`, pumps the configured streams while it runs and waits for it.
///
/// The exit status is returned as-is; interpreting it is up to the caller.
pub async fn run_with_io(
    cmd: &mut Command,
    io: ChildIo,
    command_timeout: Option<Duration>,
    label: &str,
) -> anyhow::Result<ExitStatus> {
    cmd.stdin(stdio_for(io.stdin.is_some()))
        .stdout(stdio_for(io.stdout.is_some()))
        .stderr(stdio_for(io.stderr.is_some()))
        .kill_on_drop(true);
    let mut child = cmd
        .spawn()
        .with_context(|| format!("{label} spawn failed"))?;

    let stdin_task = pump_input(io.stdin, child.stdin.take());
    let stdout_task = pump_output(child.stdout.take(), io.stdout);
    let stderr_task = pump_output(child.stderr.take(), io.stderr);

    let waited = match command_timeout {
        Some(limit) => match timeout(limit, child.wait()).await {
            Ok(result) => result,
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                for task in [stdin_task, stdout_task, stderr_task].into_iter().flatten() {
                    task.abort();
                }
                anyhow::bail!("{label} timed out after {}s", limit.as_secs());
            }
        },
        None => child.wait().await,
    };
    let status = waited.with_context(|| format!("{label} failed"))?;

    if let Some(task) = stdin_task {
        // The child may exit without draining its input.
        if let Ok(Err(err)) = task.await {
            tracing::debug!(error = %err, label, "stdin pump stopped early");
        }
    }
    join_pump(stdout_task, label, "stdout").await?;
    join_pump(stderr_task, label, "stderr").await?;
    Ok(status)
}

fn stdio_for(piped: bool) -> Stdio {
    if piped {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

fn pump_input<W>(source: Option<BoxedReader>, pipe: Option<W>) -> Option<JoinHandle<io::Result<()>>>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let (mut source, mut pipe) = (source?, pipe?);
    Some(tokio::spawn(async move {
        tokio::io::copy(&mut source, &mut pipe).await?;
        pipe.shutdown().await
    }))
}

fn pump_output<R>(pipe: Option<R>, sink: Option<BoxedWriter>) -> Option<JoinHandle<io::Result<()>>>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let (mut pipe, mut sink) = (pipe?, sink?);
    Some(tokio::spawn(async move {
        tokio::io::copy(&mut pipe, &mut sink).await?;
        sink.flush().await
    }))
}

async fn join_pump(
    task: Option<JoinHandle<io::Result<()>>>,
    label: &str,
    stream: &str,
) -> anyhow::Result<()> {
    let Some(task) = task else {
        return Ok(());
    };
    task.await
        .with_context(|| format!("{label} {stream} task join"))?
        .with_context(|| format!("{label} {stream} copy"))
}
