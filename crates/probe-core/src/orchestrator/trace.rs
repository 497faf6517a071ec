use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::persist::{save_trace_data, TraceArtifact};
use crate::providers::{Instance, InstanceInfo};
use crate::trace::{CliTracer, TraceResult, TraceSession, DEFAULT_MAX_PACKETS};

#[derive(Debug, Clone)]
pub struct TraceOptions {
    pub nodes: Vec<String>,
    pub max_packets: u32,
    /// How long to capture before ending the trace.
    pub duration: Duration,
    /// Where to save trace artifacts; nothing is saved when unset.
    pub result_dir: Option<PathBuf>,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            nodes: crate::trace::common_nodes(),
            max_packets: DEFAULT_MAX_PACKETS,
            duration: Duration::from_secs(5),
            result_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum TraceOutcome {
    Captured {
        instance: InstanceInfo,
        result: TraceResult,
        captured_at: SystemTime,
        /// Artifact path, or why saving it failed. `None` when not saving.
        saved: Option<Result<PathBuf, String>>,
    },
    Failed {
        id: String,
        error: String,
    },
}

impl TraceOutcome {
    pub fn id(&self) -> &str {
        match self {
            TraceOutcome::Captured { instance, .. } => &instance.id,
            TraceOutcome::Failed { id, .. } => id,
        }
    }
}

/// Traces every instance concurrently: begin, wait for `opts.duration` (or
/// until `cancel` fires), end, then save. Each instance owns its session, so
/// trace calls and artifact writes for one instance never overlap.
pub async fn run_trace(
    instances: Vec<Instance>,
    opts: &TraceOptions,
    cancel: CancellationToken,
) -> Vec<TraceOutcome> {
    let ids: Vec<String> = instances.iter().map(|i| i.id().to_string()).collect();
    let handles = instances.into_iter().map(|instance| {
        let opts = opts.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { trace_instance(instance, &opts, cancel).await })
    });
    let outcomes: Vec<TraceOutcome> = join_all(handles)
        .await
        .into_iter()
        .zip(ids)
        .map(|(joined, id)| {
            joined.unwrap_or_else(|err| TraceOutcome::Failed {
                id,
                error: format!("trace task failed: {err}"),
            })
        })
        .collect();
    for outcome in &outcomes {
        if let TraceOutcome::Failed { id, error } = outcome {
            error!(event = "instance.failed", instance = %id, error = %error, "trace error");
        }
    }
    outcomes
}

async fn trace_instance(
    instance: Instance,
    opts: &TraceOptions,
    cancel: CancellationToken,
) -> TraceOutcome {
    let info = instance.info().clone();
    let mut session = TraceSession::new(info.clone(), CliTracer::new(instance.cli()));
    session.set_max_packets(opts.max_packets);

    if let Err(err) = session.begin_trace(&opts.nodes).await {
        return TraceOutcome::Failed {
            id: info.id,
            error: format!("{:#}", anyhow::Error::from(err)),
        };
    }

    tokio::select! {
        _ = tokio::time::sleep(opts.duration) => {}
        _ = cancel.cancelled() => {
            info!(instance = %info.id, "trace interrupted, collecting early");
        }
    }

    let result = match session.end_trace().await {
        Ok(result) => result.clone(),
        Err(err) => {
            return TraceOutcome::Failed {
                id: info.id,
                error: format!("{:#}", anyhow::Error::from(err)),
            }
        }
    };
    let captured_at = session.captured_at().unwrap_or_else(SystemTime::now);

    let saved = match &opts.result_dir {
        Some(dir) => {
            let artifact = TraceArtifact {
                instance: &info,
                captured_at,
                result: &result,
            };
            Some(match save_trace_data(dir, &artifact).await {
                Ok(path) => {
                    info!(instance = %info.id, path = %path.display(), "trace data saved");
                    Ok(path)
                }
                Err(err) => {
                    error!(instance = %info.id, error = %err, "saving trace data failed");
                    Err(format!("{:#}", anyhow::Error::from(err)))
                }
            })
        }
        None => None,
    };

    TraceOutcome::Captured {
        instance: info,
        result,
        captured_at,
        saved,
    }
}
