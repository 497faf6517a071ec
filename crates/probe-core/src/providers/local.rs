use std::time::Duration;

use async_trait::async_trait;
use system_utils::process::{run_with_io, ChildIo};
use tokio::process::Command;

use crate::exec::ExecTarget;

use super::ensure_success;

/// Runs commands as child processes of this host.
pub struct LocalTarget {
    name: String,
    timeout: Option<Duration>,
}

impl LocalTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ExecTarget for LocalTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exec(&self, program: &str, args: &[String], io: ChildIo) -> anyhow::Result<()> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        let status = run_with_io(&mut cmd, io, self.timeout, program).await?;
        ensure_success(status)
    }
}
