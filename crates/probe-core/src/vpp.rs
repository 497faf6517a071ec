use std::sync::Arc;

use crate::error::ExecError;
use crate::exec::{ExecTarget, RemoteCommand};
use crate::providers::DEFAULT_VPPCTL;

pub const SHOW_VERSION: &str = "show version";

/// The dataplane CLI of one instance, reached through `vppctl`.
#[derive(Clone)]
pub struct VppCli {
    target: Arc<dyn ExecTarget>,
    vppctl: String,
}

impl VppCli {
    pub fn new(target: Arc<dyn ExecTarget>, vppctl: impl Into<String>) -> Self {
        Self {
            target,
            vppctl: vppctl.into(),
        }
    }

    pub fn vppctl(&self) -> &str {
        &self.vppctl
    }

    pub fn target_name(&self) -> &str {
        self.target.name()
    }

    /// Builds the command for `cli` without running it. `vppctl` may carry
    /// its own flags, e.g. `vppctl -s /run/vpp/cli-vpp2.sock`.
    pub fn command(&self, cli: &str) -> RemoteCommand {
        let mut words = self.vppctl.split_whitespace();
        let program = words.next().unwrap_or(DEFAULT_VPPCTL);
        RemoteCommand::new(
            Arc::clone(&self.target),
            program,
            words.chain(cli.split_whitespace()),
        )
    }

    pub async fn run_cli(&self, cli: &str) -> Result<String, ExecError> {
        let out = self.command(cli).capture_output().await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// First line of `show version`, e.g. `vpp v23.10-release built by ...`.
    pub async fn version(&self) -> Result<String, ExecError> {
        let out = self.run_cli(SHOW_VERSION).await?;
        Ok(out.lines().next().unwrap_or_default().trim().to_string())
    }
}
