use anyhow::Context;
use probe_core::providers::{LocalTarget, SshDestination, SshTarget, DEFAULT_VPPCTL};
use probe_core::{ExecTarget, Instance, InstanceInfo};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use system_utils::ssh::parse_ssh_destination;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STATUS: &str = "configured";

#[derive(Debug, Deserialize)]
pub(crate) struct ProbeConfig {
    #[serde(default)]
    pub(crate) defaults: Defaults,
    #[serde(default)]
    pub(crate) instances: Vec<InstanceConfig>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Defaults {
    #[serde(default = "default_vppctl")]
    pub(crate) vppctl: String,
    #[serde(default)]
    pub(crate) ssh_args: Vec<String>,
    #[serde(default)]
    pub(crate) ssh_password: Option<String>,
    /// Upper bound for a single dataplane command.
    #[serde(default = "default_timeout_secs")]
    pub(crate) timeout_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            vppctl: default_vppctl(),
            ssh_args: Vec::new(),
            ssh_password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_vppctl() -> String {
    DEFAULT_VPPCTL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstanceConfig {
    pub(crate) name: String,
    /// `user@host`; the instance runs locally when unset.
    pub(crate) ssh: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) vppctl: Option<String>,
    pub(crate) ssh_args: Option<Vec<String>>,
    pub(crate) ssh_password: Option<String>,
}

impl ProbeConfig {
    pub(crate) fn instances(&self) -> anyhow::Result<Vec<Instance>> {
        self.instances
            .iter()
            .map(|instance| self.build_instance(instance))
            .collect()
    }

    fn build_instance(&self, config: &InstanceConfig) -> anyhow::Result<Instance> {
        let name = config.name.trim();
        let timeout = Duration::from_secs(self.defaults.timeout_secs);
        let target: Arc<dyn ExecTarget> = match config.ssh.as_deref().map(str::trim) {
            Some(ssh) => {
                let destination = SshDestination {
                    destination: ssh.to_string(),
                    ssh_args: config
                        .ssh_args
                        .clone()
                        .unwrap_or_else(|| self.defaults.ssh_args.clone()),
                    ssh_password: config
                        .ssh_password
                        .clone()
                        .or_else(|| self.defaults.ssh_password.clone()),
                };
                Arc::new(
                    SshTarget::new(name, destination)
                        .with_context(|| format!("instance {name}"))?
                        .with_timeout(timeout),
                )
            }
            None => Arc::new(LocalTarget::new(name).with_timeout(timeout)),
        };
        let info = InstanceInfo {
            id: name.to_string(),
            status: config
                .status
                .clone()
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            version: config.version.clone().unwrap_or_default(),
        };
        let vppctl = config
            .vppctl
            .clone()
            .unwrap_or_else(|| self.defaults.vppctl.clone());
        Ok(Instance::new(info, target).with_vppctl(vppctl))
    }
}

fn validate_probe_config(config: &ProbeConfig) -> anyhow::Result<()> {
    if config.instances.is_empty() {
        anyhow::bail!("config must include at least one instance");
    }
    if config.defaults.vppctl.trim().is_empty() {
        anyhow::bail!("defaults.vppctl must not be empty");
    }
    let mut seen = HashSet::new();
    for (index, instance) in config.instances.iter().enumerate() {
        let name = instance.name.trim();
        if name.is_empty() {
            anyhow::bail!("instance[{}] must set name", index);
        }
        if !seen.insert(name) {
            anyhow::bail!("duplicate instance name {}", name);
        }
        if let Some(ssh) = instance.ssh.as_deref() {
            if parse_ssh_destination(ssh.trim()).is_none() {
                anyhow::bail!("instance {} ssh must be user@host", name);
            }
        }
        if instance.vppctl.as_deref().is_some_and(|v| v.trim().is_empty()) {
            anyhow::bail!("instance {} vppctl must not be empty", name);
        }
    }
    Ok(())
}

pub(crate) fn load_probe_config(path: &Path) -> anyhow::Result<ProbeConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: ProbeConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    validate_probe_config(&config)?;
    Ok(config)
}
