mod buffer;

use std::sync::Arc;

use async_trait::async_trait;
use system_utils::process::ChildIo;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{ExecError, StreamKind};

pub use buffer::SharedBuffer;

/// Something that can run a command and wire its streams: a local host, an
/// ssh destination, a container.
#[async_trait]
pub trait ExecTarget: Send + Sync {
    fn name(&self) -> &str;

    /// Runs `program` with `args`. A non-zero exit is an error.
    async fn exec(&self, program: &str, args: &[String], io: ChildIo) -> anyhow::Result<()>;
}

#[derive(Default)]
struct Wiring {
    stdin: bool,
    stdout: bool,
    stderr: bool,
}

/// One command invocation against one target.
///
/// Stream sinks are write-once: setting the same stream twice, or asking for
/// captured output once stdout is wired, fails with
/// [`ExecError::AlreadyConfigured`].
pub struct RemoteCommand {
    program: String,
    args: Vec<String>,
    io: ChildIo,
    wired: Wiring,
    target: Arc<dyn ExecTarget>,
}

impl RemoteCommand {
    pub fn new<I, S>(target: Arc<dyn ExecTarget>, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            io: ChildIo::default(),
            wired: Wiring::default(),
            target,
        }
    }

    /// The literal command line, as reported in errors.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    pub fn set_stdin<R>(&mut self, input: R) -> Result<(), ExecError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        claim(&mut self.wired.stdin, StreamKind::Stdin)?;
        self.io.stdin = Some(Box::new(input));
        Ok(())
    }

    pub fn set_stdout<W>(&mut self, output: W) -> Result<(), ExecError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        claim(&mut self.wired.stdout, StreamKind::Stdout)?;
        self.io.stdout = Some(Box::new(output));
        Ok(())
    }

    pub fn set_stderr<W>(&mut self, output: W) -> Result<(), ExecError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        claim(&mut self.wired.stderr, StreamKind::Stderr)?;
        self.io.stderr = Some(Box::new(output));
        Ok(())
    }

    /// Runs the command with whatever sinks are currently set. Unset streams
    /// are left to the transport default.
    pub async fn run(&mut self) -> Result<(), ExecError> {
        let io = std::mem::take(&mut self.io);
        tracing::debug!(
            target_name = %self.target.name(),
            command = %self.command_line(),
            "exec"
        );
        self.target
            .exec(&self.program, &self.args, io)
            .await
            .map_err(|err| ExecError::Transport {
                command: self.command_line(),
                source: err.into(),
            })
    }

    /// Runs the command with stdout captured in memory and returns it.
    ///
    /// When the caller did not wire stderr it is captured as well and
    /// attached to the error on failure.
    pub async fn capture_output(&mut self) -> Result<Vec<u8>, ExecError> {
        if self.wired.stdout {
            return Err(ExecError::AlreadyConfigured(StreamKind::Stdout));
        }
        let stdout = SharedBuffer::default();
        self.set_stdout(stdout.clone())?;

        let stderr = if self.wired.stderr {
            None
        } else {
            let buffer = SharedBuffer::default();
            self.set_stderr(buffer.clone())?;
            Some(buffer)
        };

        match self.run().await {
            Ok(()) => Ok(stdout.take()),
            Err(ExecError::Transport { command, source }) => match stderr {
                Some(stderr) => Err(ExecError::Command {
                    command,
                    stderr: stderr.to_string_lossy().trim_end().to_string(),
                    source,
                }),
                None => Err(ExecError::Transport { command, source }),
            },
            Err(err) => Err(err),
        }
    }
}

fn claim(flag: &mut bool, stream: StreamKind) -> Result<(), ExecError> {
    if *flag {
        return Err(ExecError::AlreadyConfigured(stream));
    }
    *flag = true;
    Ok(())
}
