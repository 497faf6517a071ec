use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::vpp::VppCli;

use super::TraceResult;

/// Starts and stops packet capture on one instance.
#[async_trait]
pub trait TraceControl: Send + Sync {
    async fn start_trace(&self, nodes: &[String], max_packets: u32) -> anyhow::Result<()>;

    async fn stop_trace(&self) -> anyhow::Result<TraceResult>;
}

/// Trace control through `vppctl` (`trace add`, `show trace`, `clear trace`).
pub struct CliTracer {
    cli: VppCli,
    max_packets: AtomicU32,
}

impl CliTracer {
    pub fn new(cli: VppCli) -> Self {
        Self {
            cli,
            max_packets: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TraceControl for CliTracer {
    async fn start_trace(&self, nodes: &[String], max_packets: u32) -> anyhow::Result<()> {
        self.cli.run_cli("clear trace").await?;
        for node in nodes {
            let out = self
                .cli
                .run_cli(&format!("trace add {node} {max_packets}"))
                .await?;
            // vppctl exits 0 on CLI errors; trace add is silent on success.
            let out = out.trim();
            if !out.is_empty() {
                // Nodes added so far would keep capturing.
                self.clear_buffer().await;
                anyhow::bail!("trace add {node} rejected: {out}");
            }
        }
        self.max_packets.store(max_packets, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_trace(&self) -> anyhow::Result<TraceResult> {
        let max = self.max_packets.load(Ordering::SeqCst);
        let raw = self.cli.run_cli(&format!("show trace max {max}")).await?;
        let result = TraceResult::parse(raw);
        self.clear_buffer().await;
        Ok(result)
    }
}

impl CliTracer {
    async fn clear_buffer(&self) {
        if let Err(err) = self.cli.run_cli("clear trace").await {
            tracing::warn!(
                target_name = %self.cli.target_name(),
                error = %err,
                "clearing trace buffer failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTarget, SAMPLE_TRACE};
    use std::sync::Arc;

    #[tokio::test]
    async fn start_adds_each_node() {
        let target = Arc::new(
            ScriptedTarget::new("vpp")
                .respond("vppctl clear trace", "")
                .respond("vppctl trace add memif-input 50", "")
                .respond("vppctl trace add pg-input 50", ""),
        );
        let tracer = CliTracer::new(VppCli::new(target.clone(), "vppctl"));
        let nodes = vec!["memif-input".to_string(), "pg-input".to_string()];
        tracer.start_trace(&nodes, 50).await.expect("start");
        assert_eq!(
            target.calls(),
            [
                "vppctl clear trace",
                "vppctl trace add memif-input 50",
                "vppctl trace add pg-input 50"
            ]
        );
    }

    #[tokio::test]
    async fn unknown_node_is_rejected() {
        let target = Arc::new(
            ScriptedTarget::new("vpp")
                .respond("vppctl clear trace", "")
                .respond(
                    "vppctl trace add bogus 10",
                    "trace add: node 'bogus' not found\n",
                ),
        );
        let tracer = CliTracer::new(VppCli::new(target, "vppctl"));
        let err = tracer
            .start_trace(&["bogus".to_string()], 10)
            .await
            .expect_err("rejected");
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn rejected_node_clears_nodes_already_added() {
        let target = Arc::new(
            ScriptedTarget::new("vpp")
                .respond("vppctl clear trace", "")
                .respond("vppctl trace add memif-input 50", "")
                .respond(
                    "vppctl trace add bogus 50",
                    "trace add: node 'bogus' not found\n",
                ),
        );
        let tracer = CliTracer::new(VppCli::new(target.clone(), "vppctl"));
        let nodes = vec!["memif-input".to_string(), "bogus".to_string()];
        tracer.start_trace(&nodes, 50).await.expect_err("rejected");
        assert_eq!(
            target.calls(),
            [
                "vppctl clear trace",
                "vppctl trace add memif-input 50",
                "vppctl trace add bogus 50",
                "vppctl clear trace"
            ]
        );
    }

    #[tokio::test]
    async fn stop_parses_and_clears() {
        let target = Arc::new(
            ScriptedTarget::new("vpp")
                .respond("vppctl clear trace", "")
                .respond("vppctl trace add pg-input 20", "")
                .respond("vppctl show trace max 20", SAMPLE_TRACE),
        );
        let tracer = CliTracer::new(VppCli::new(target.clone(), "vppctl"));
        tracer
            .start_trace(&["pg-input".to_string()], 20)
            .await
            .expect("start");
        let result = tracer.stop_trace().await.expect("stop");
        assert_eq!(result.packets().len(), 2);
        assert_eq!(result.raw(), SAMPLE_TRACE);
        assert_eq!(target.calls().last().map(String::as_str), Some("vppctl clear trace"));
    }
}
