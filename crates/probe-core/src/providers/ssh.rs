use std::time::Duration;

use async_trait::async_trait;
use system_utils::process::{run_with_io, ChildIo};
use system_utils::ssh::{parse_ssh_destination, with_password_auth};
use tokio::process::Command;
use tracing::info;

use crate::exec::ExecTarget;

use super::ensure_success;

const SSH_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct SshDestination {
    pub destination: String,
    pub ssh_args: Vec<String>,
    pub ssh_password: Option<String>,
}

/// Runs commands on a remote host through the system ssh client.
pub struct SshTarget {
    name: String,
    ssh: SshDestination,
    timeout: Option<Duration>,
}

impl SshTarget {
    pub fn new(name: impl Into<String>, ssh: SshDestination) -> anyhow::Result<Self> {
        if parse_ssh_destination(&ssh.destination).is_none() {
            anyhow::bail!("ssh destination must be user@host, got {:?}", ssh.destination);
        }
        Ok(Self {
            name: name.into(),
            ssh,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn build_command(&self, program: &str, args: &[String]) -> anyhow::Result<Command> {
        let mut cmd = Command::new("ssh");
        if let Some(password) = self.ssh.ssh_password.as_deref() {
            info!(
                event = "ssh.auth.askpass",
                target_name = %self.name,
                "using SSH_ASKPASS for password auth"
            );
            with_password_auth(&mut cmd, password)?;
        }
        cmd.args(ssh_arguments(&self.ssh, program, args));
        Ok(cmd)
    }
}

fn ssh_arguments(ssh: &SshDestination, program: &str, args: &[String]) -> Vec<String> {
    let mut argv = vec![
        "-T".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={SSH_CONNECT_TIMEOUT_SECS}"),
    ];
    if ssh.ssh_password.is_none() {
        argv.push("-o".to_string());
        argv.push("BatchMode=yes".to_string());
    }
    argv.extend(ssh.ssh_args.iter().cloned());
    argv.push(ssh.destination.clone());
    argv.push(remote_command(program, args));
    argv
}

fn remote_command(program: &str, args: &[String]) -> String {
    shell_words::join(std::iter::once(program).chain(args.iter().map(String::as_str)))
}

#[async_trait]
impl ExecTarget for SshTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exec(&self, program: &str, args: &[String], io: ChildIo) -> anyhow::Result<()> {
        let mut cmd = self.build_command(program, args)?;
        let label = format!("ssh {}", self.ssh.destination);
        let status = run_with_io(&mut cmd, io, self.timeout, &label).await?;
        ensure_success(status)
    }
}
