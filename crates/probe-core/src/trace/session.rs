use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::error::TraceError;
use crate::providers::InstanceInfo;

use super::{TraceControl, TraceResult};

pub const DEFAULT_MAX_PACKETS: u32 = 10_000;

#[derive(Debug)]
pub enum TraceState {
    Idle,
    Tracing,
    Captured {
        result: TraceResult,
        captured_at: SystemTime,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracePhase {
    Idle,
    Tracing,
    Captured,
    Failed,
}

impl TraceState {
    pub fn phase(&self) -> TracePhase {
        match self {
            TraceState::Idle => TracePhase::Idle,
            TraceState::Tracing => TracePhase::Tracing,
            TraceState::Captured { .. } => TracePhase::Captured,
            TraceState::Failed { .. } => TracePhase::Failed,
        }
    }
}

/// Begin/end lifecycle of a packet trace on one instance.
///
/// `Idle -> Tracing` only through [`begin_trace`](Self::begin_trace),
/// `Tracing -> Captured | Failed` only through [`end_trace`](Self::end_trace).
/// A finished session (captured or failed) may begin again; a session that is
/// still tracing may not.
pub struct TraceSession<C> {
    instance: InstanceInfo,
    control: C,
    max_packets: u32,
    nodes: Vec<String>,
    state: TraceState,
}

impl<C: TraceControl> TraceSession<C> {
    pub fn new(instance: InstanceInfo, control: C) -> Self {
        Self {
            instance,
            control,
            max_packets: DEFAULT_MAX_PACKETS,
            nodes: Vec::new(),
            state: TraceState::Idle,
        }
    }

    /// Packet ceiling used by the next [`begin_trace`](Self::begin_trace).
    pub fn set_max_packets(&mut self, max_packets: u32) {
        self.max_packets = max_packets;
    }

    pub fn max_packets(&self) -> u32 {
        self.max_packets
    }

    pub fn instance(&self) -> &InstanceInfo {
        &self.instance
    }

    pub fn state(&self) -> &TraceState {
        &self.state
    }

    pub fn phase(&self) -> TracePhase {
        self.state.phase()
    }

    pub async fn begin_trace(&mut self, nodes: &[String]) -> Result<(), TraceError> {
        if self.phase() == TracePhase::Tracing {
            return Err(TraceError::AlreadyTracing);
        }
        if nodes.is_empty() {
            return Err(TraceError::NoNodes);
        }
        self.control
            .start_trace(nodes, self.max_packets)
            .await
            .map_err(|err| TraceError::Start { source: err.into() })?;
        info!(
            event = "trace.begin",
            instance = %self.instance.id,
            nodes = nodes.len(),
            max_packets = self.max_packets,
            "tracing started"
        );
        self.nodes = nodes.to_vec();
        self.state = TraceState::Tracing;
        Ok(())
    }

    pub async fn end_trace(&mut self) -> Result<&TraceResult, TraceError> {
        if self.phase() != TracePhase::Tracing {
            debug!(instance = %self.instance.id, phase = ?self.phase(), "end without begin");
            return Err(TraceError::NotTracing);
        }
        match self.control.stop_trace().await {
            Ok(result) => {
                info!(
                    event = "trace.end",
                    instance = %self.instance.id,
                    nodes = %self.nodes.join(","),
                    packets = result.packets().len(),
                    "tracing stopped"
                );
                self.state = TraceState::Captured {
                    result,
                    captured_at: SystemTime::now(),
                };
                self.result().ok_or(TraceError::NotTracing)
            }
            Err(err) => {
                warn!(
                    event = "trace.failed",
                    instance = %self.instance.id,
                    error = %err,
                    "stopping trace failed"
                );
                self.state = TraceState::Failed {
                    reason: format!("{err:#}"),
                };
                Err(TraceError::Stop { source: err.into() })
            }
        }
    }

    pub fn result(&self) -> Option<&TraceResult> {
        match &self.state {
            TraceState::Captured { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn captured_at(&self) -> Option<SystemTime> {
        match &self.state {
            TraceState::Captured { captured_at, .. } => Some(*captured_at),
            _ => None,
        }
    }
}
