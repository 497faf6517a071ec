//! Diagnostic session engine for VPP dataplane instances.
//!
//! Commands reach an instance through [`exec::RemoteCommand`] regardless of
//! transport. Packet traces are driven by [`trace::TraceSession`], rendered by
//! [`render`] and archived by [`persist`]. [`orchestrator`] runs the
//! per-instance pipelines and feeds [`aggregate`].

pub mod aggregate;
pub mod error;
pub mod exec;
pub mod orchestrator;
pub mod persist;
pub mod providers;
pub mod render;
pub mod trace;
pub mod vpp;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ExecError, PersistError, TraceError};
pub use exec::{ExecTarget, RemoteCommand};
pub use providers::{Discovery, Instance, InstanceInfo};
pub use trace::{Capture, Packet, TraceControl, TraceResult, TraceSession};
