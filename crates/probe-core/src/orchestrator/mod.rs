mod trace;

use std::collections::BTreeSet;

use anyhow::Context;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::aggregate::{AggregatedRecord, IpsecCorrelation, IPSEC_SA_CLI};
use crate::providers::{Discovery, Instance};

pub use trace::{run_trace, TraceOptions, TraceOutcome};

#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// Extra dataplane CLI commands captured for every instance.
    pub extra_clis: Vec<String>,
    /// Instances are NSM-managed dataplanes.
    pub nsm: bool,
    /// Correlate IPsec SAs across instances (NSM only).
    pub ipsec_agg: bool,
}

impl DiscoverOptions {
    pub fn aggregate_ipsec(&self) -> bool {
        self.nsm && self.ipsec_agg
    }

    fn clis(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut clis = Vec::new();
        let aggregated = self
            .aggregate_ipsec()
            .then(|| IPSEC_SA_CLI.to_string());
        for cli in self.extra_clis.iter().cloned().chain(aggregated) {
            let cli = cli.trim().to_string();
            if !cli.is_empty() && seen.insert(cli.clone()) {
                clis.push(cli);
            }
        }
        clis
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliOutput {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Diagnostic record of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRecord {
    pub id: String,
    pub status: String,
    pub version: String,
    pub clis: Vec<CliOutput>,
}

impl InstanceRecord {
    pub fn cli_output(&self, command: &str) -> Option<&str> {
        self.clis
            .iter()
            .find(|cli| cli.command == command)
            .and_then(|cli| cli.output.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InstanceOutcome {
    Ready(InstanceRecord),
    Failed { id: String, error: String },
}

impl InstanceOutcome {
    pub fn id(&self) -> &str {
        match self {
            InstanceOutcome::Ready(record) => &record.id,
            InstanceOutcome::Failed { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverReport {
    pub outcomes: Vec<InstanceOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipsec: Option<IpsecCorrelation>,
}

impl DiscoverReport {
    pub fn records(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            InstanceOutcome::Ready(record) => Some(record),
            InstanceOutcome::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            InstanceOutcome::Failed { id, error } => Some((id.as_str(), error.as_str())),
            InstanceOutcome::Ready(_) => None,
        })
    }
}

/// Discovers instances, builds a record for each one concurrently and,
/// when requested, correlates IPsec state across the successful ones.
///
/// Only a failing discovery is an error; per-instance failures end up in
/// the report as [`InstanceOutcome::Failed`].
pub async fn run_discover(
    discovery: &dyn Discovery,
    queries: &[String],
    opts: &DiscoverOptions,
) -> anyhow::Result<DiscoverReport> {
    let instances = discovery
        .discover(queries)
        .await
        .context("instance discovery failed")?;
    info!(count = instances.len(), "discovered vpp instances");

    let outcomes = probe_instances(instances, opts.clis()).await;
    log_outcomes(&outcomes);

    let ipsec = if opts.aggregate_ipsec() {
        let aggregated = AggregatedRecord::from_outcomes(&outcomes);
        if aggregated.is_empty() {
            warn!("no instance records to correlate IPsec state across");
        } else {
            info!(instances = aggregated.len(), "aggregating NSM IPsec info for instances");
        }
        Some(aggregated.correlate_ipsec())
    } else {
        None
    };
    Ok(DiscoverReport { outcomes, ipsec })
}

/// Runs one pipeline per instance and waits for all of them. Output order
/// follows discovery order.
pub async fn probe_instances(instances: Vec<Instance>, clis: Vec<String>) -> Vec<InstanceOutcome> {
    let ids: Vec<String> = instances.iter().map(|i| i.id().to_string()).collect();
    let handles = instances.into_iter().map(|instance| {
        let clis = clis.clone();
        tokio::spawn(async move {
            debug!(instance = %instance.id(), status = %instance.info().status, "probing instance");
            match build_record(&instance, &clis).await {
                Ok(record) => InstanceOutcome::Ready(record),
                Err(err) => InstanceOutcome::Failed {
                    id: instance.id().to_string(),
                    error: format!("{err:#}"),
                },
            }
        })
    });
    join_all(handles)
        .await
        .into_iter()
        .zip(ids)
        .map(|(joined, id)| {
            joined.unwrap_or_else(|err| InstanceOutcome::Failed {
                id,
                error: format!("instance task failed: {err}"),
            })
        })
        .collect()
}

/// Builds the record of one instance. Fails only when the dataplane CLI
/// cannot be reached at all; individual CLI errors are kept in the record.
pub async fn build_record(instance: &Instance, clis: &[String]) -> anyhow::Result<InstanceRecord> {
    let cli = instance.cli();
    let probed = cli
        .version()
        .await
        .context("dataplane cli unreachable")?;
    let info = instance.info();
    let version = if info.version.trim().is_empty() {
        probed
    } else {
        info.version.clone()
    };

    let mut outputs = Vec::with_capacity(clis.len());
    for command in clis {
        let output = match cli.run_cli(command).await {
            Ok(out) => CliOutput {
                command: command.clone(),
                output: Some(out),
                error: None,
            },
            Err(err) => {
                debug!(instance = %info.id, command = %command, error = %err, "cli failed");
                CliOutput {
                    command: command.clone(),
                    output: None,
                    error: Some(format!("{:#}", anyhow::Error::from(err))),
                }
            }
        };
        outputs.push(output);
    }

    Ok(InstanceRecord {
        id: info.id.clone(),
        status: info.status.clone(),
        version,
        clis: outputs,
    })
}

fn log_outcomes(outcomes: &[InstanceOutcome]) {
    for outcome in outcomes {
        if let InstanceOutcome::Failed { id, error } = outcome {
            error!(event = "instance.failed", instance = %id, error = %error, "instance error");
        }
    }
}
