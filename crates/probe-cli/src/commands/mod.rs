pub(crate) mod discover;
pub(crate) mod exec;
pub(crate) mod trace;

use anyhow::Context;
use probe_core::providers::StaticDiscovery;
use probe_core::{Discovery, Instance};

use crate::output::StylePolicy;

/// What every subcommand needs: the inventory, the instance filter and how
/// to style reports.
pub(crate) struct CommandContext {
    pub(crate) discovery: StaticDiscovery,
    pub(crate) queries: Vec<String>,
    pub(crate) style: StylePolicy,
}

impl CommandContext {
    pub(crate) async fn instances(&self) -> anyhow::Result<Vec<Instance>> {
        let instances = self
            .discovery
            .discover(&self.queries)
            .await
            .context("instance discovery failed")?;
        if instances.is_empty() {
            anyhow::bail!("no instances match {:?}", self.queries);
        }
        Ok(instances)
    }
}
