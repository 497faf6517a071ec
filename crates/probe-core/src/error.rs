use std::fmt;
use std::path::PathBuf;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Stdin => "stdin",
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("{0} already set")]
    AlreadyConfigured(StreamKind),
    #[error("command {command:?} failed")]
    Transport {
        command: String,
        #[source]
        source: BoxError,
    },
    #[error("command {command:?} failed: {stderr}")]
    Command {
        command: String,
        stderr: String,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("no trace nodes given")]
    NoNodes,
    #[error("trace already in progress")]
    AlreadyTracing,
    #[error("no trace in progress")]
    NotTracing,
    #[error("starting trace failed")]
    Start {
        #[source]
        source: BoxError,
    },
    #[error("stopping trace failed")]
    Stop {
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to create {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed trace file {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },
}
