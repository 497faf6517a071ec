mod local;
mod ssh;

use std::process::ExitStatus;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::exec::ExecTarget;
use crate::vpp::VppCli;

pub use local::LocalTarget;
pub use ssh::{SshDestination, SshTarget};

pub const DEFAULT_VPPCTL: &str = "vppctl";

/// Identity and metadata of a discovered instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceInfo {
    pub id: String,
    pub status: String,
    pub version: String,
}

/// A discovered dataplane instance and the target used to probe it.
#[derive(Clone)]
pub struct Instance {
    info: InstanceInfo,
    target: Arc<dyn ExecTarget>,
    vppctl: String,
}

impl Instance {
    pub fn new(info: InstanceInfo, target: Arc<dyn ExecTarget>) -> Self {
        Self {
            info,
            target,
            vppctl: DEFAULT_VPPCTL.to_string(),
        }
    }

    pub fn with_vppctl(mut self, vppctl: impl Into<String>) -> Self {
        self.vppctl = vppctl.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn info(&self) -> &InstanceInfo {
        &self.info
    }

    pub fn target(&self) -> Arc<dyn ExecTarget> {
        Arc::clone(&self.target)
    }

    pub fn cli(&self) -> VppCli {
        VppCli::new(self.target(), self.vppctl.clone())
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("info", &self.info)
            .field("target", &self.target.name())
            .field("vppctl", &self.vppctl)
            .finish()
    }
}

/// Source of dataplane instances.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn discover(&self, queries: &[String]) -> anyhow::Result<Vec<Instance>>;
}

/// Discovery over a fixed inventory, filtered by queries.
///
/// A query is either `key=value` (`name`, `status`, `version`) or a bare
/// value matched against the instance name. An instance is kept when any
/// query matches it; no queries keeps everything.
pub struct StaticDiscovery {
    instances: Vec<Instance>,
}

impl StaticDiscovery {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover(&self, queries: &[String]) -> anyhow::Result<Vec<Instance>> {
        for query in queries {
            parse_query(query)?;
        }
        Ok(self
            .instances
            .iter()
            .filter(|instance| {
                queries.is_empty()
                    || queries
                        .iter()
                        .filter_map(|query| parse_query(query).ok())
                        .any(|(key, value)| query_matches(instance.info(), key, value))
            })
            .cloned()
            .collect())
    }
}

fn parse_query(query: &str) -> anyhow::Result<(&str, &str)> {
    let (key, value) = query.split_once('=').unwrap_or(("name", query));
    let key = key.trim();
    if !matches!(key, "name" | "status" | "version") {
        anyhow::bail!("unsupported query key {key:?} in {query:?}");
    }
    Ok((key, value.trim()))
}

fn query_matches(info: &InstanceInfo, key: &str, value: &str) -> bool {
    match key {
        "name" => info.id.contains(value),
        "status" => info.status == value,
        "version" => info.version.contains(value),
        _ => false,
    }
}

pub(crate) fn ensure_success(status: ExitStatus) -> anyhow::Result<()> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => anyhow::bail!("exit status {code}"),
        None => anyhow::bail!("terminated by signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTarget;

    fn instance(id: &str, status: &str, version: &str) -> Instance {
        Instance::new(
            InstanceInfo {
                id: id.to_string(),
                status: status.to_string(),
                version: version.to_string(),
            },
            Arc::new(ScriptedTarget::new(id)),
        )
    }

    fn discovery() -> StaticDiscovery {
        StaticDiscovery::new(vec![
            instance("pod/vpp-1", "running", "23.10"),
            instance("pod/vpp-2", "running", "24.02"),
            instance("host/edge", "stopped", "23.10"),
        ])
    }

    fn ids(instances: &[Instance]) -> Vec<&str> {
        instances.iter().map(Instance::id).collect()
    }

    #[tokio::test]
    async fn no_queries_returns_everything() {
        let found = discovery().discover(&[]).await.expect("discover");
        assert_eq!(ids(&found), ["pod/vpp-1", "pod/vpp-2", "host/edge"]);
    }

    #[tokio::test]
    async fn queries_are_or_combined() {
        let queries = vec!["vpp-2".to_string(), "status=stopped".to_string()];
        let found = discovery().discover(&queries).await.expect("discover");
        assert_eq!(ids(&found), ["pod/vpp-2", "host/edge"]);
    }

    #[tokio::test]
    async fn unknown_query_key_is_an_error() {
        let queries = vec!["zone=a".to_string()];
        assert!(discovery().discover(&queries).await.is_err());
    }

    #[test]
    fn instance_cli_uses_vppctl_override() {
        let cli = instance("vpp", "running", "").with_vppctl("/opt/vpp/vppctl").cli();
        assert_eq!(cli.vppctl(), "/opt/vpp/vppctl");
    }
}
