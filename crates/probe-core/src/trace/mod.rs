mod control;
mod parse;
mod session;

use std::time::Duration;

use serde::Serialize;

pub use control::{CliTracer, TraceControl};
pub use parse::parse_trace;
pub use session::{TracePhase, TraceSession, TraceState, DEFAULT_MAX_PACKETS};

/// Input nodes traced when none are given explicitly.
///
/// Not every VPP build has all of them, and a node the instance lacks makes
/// its trace start fail. Pass an explicit node list for such builds.
pub const COMMON_NODES: &[&str] = &[
    "af-packet-input",
    "avf-input",
    "bond-process",
    "memif-input",
    "p2p-ethernet-input",
    "pg-input",
    "punt-socket-rx",
    "rdma-input",
    "session-queue",
    "tapcli-rx",
    "tuntap-rx",
    "vhost-user-input",
    "virtio-input",
    "vmxnet3-input",
];

pub fn common_nodes() -> Vec<String> {
    COMMON_NODES.iter().map(|node| node.to_string()).collect()
}

/// What one graph node logged about one packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    pub name: String,
    /// Offset reported by the node. Zero means the node reported no time.
    pub start: Duration,
    pub content: String,
}

/// A packet and the nodes it went through, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    id: u32,
    captures: Vec<Capture>,
}

impl Packet {
    /// Returns `None` for an empty capture list.
    pub fn new(id: u32, captures: Vec<Capture>) -> Option<Self> {
        if captures.is_empty() {
            return None;
        }
        Some(Self { id, captures })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn first_capture(&self) -> &Capture {
        &self.captures[0]
    }

    pub fn last_capture(&self) -> &Capture {
        &self.captures[self.captures.len() - 1]
    }

    pub fn start(&self) -> Duration {
        self.first_capture().start
    }

    /// Time between entering the first node and the last one.
    pub fn transit(&self) -> Duration {
        self.last_capture().start.saturating_sub(self.start())
    }
}

/// Parsed packets plus the capture text they were parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceResult {
    packets: Vec<Packet>,
    raw: String,
}

impl TraceResult {
    pub fn new(packets: Vec<Packet>, raw: impl Into<String>) -> Self {
        Self {
            packets,
            raw: raw.into(),
        }
    }

    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let packets = parse_trace(&raw);
        Self { packets, raw }
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}
