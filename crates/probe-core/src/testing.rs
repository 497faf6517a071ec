use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use system_utils::process::ChildIo;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

use crate::exec::ExecTarget;

/// Target answering fixed command lines with canned stdout or stderr.
pub(crate) struct ScriptedTarget {
    name: String,
    responses: HashMap<String, Result<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTarget {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn respond(mut self, command: &str, stdout: &str) -> Self {
        self.responses
            .insert(command.to_string(), Ok(stdout.to_string()));
        self
    }

    pub(crate) fn fail(mut self, command: &str, stderr: &str) -> Self {
        self.responses
            .insert(command.to_string(), Err(stderr.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ExecTarget for ScriptedTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exec(&self, program: &str, args: &[String], io: ChildIo) -> anyhow::Result<()> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().expect("calls lock").push(line.clone());
        let response = self
            .responses
            .get(&line)
            .cloned()
            .unwrap_or_else(|| Err(format!("unexpected command {line}")));
        match response {
            Ok(stdout) => {
                if let Some(mut sink) = io.stdout {
                    sink.write_all(stdout.as_bytes()).await?;
                    sink.flush().await?;
                }
                Ok(())
            }
            Err(stderr) => {
                if let Some(mut sink) = io.stderr {
                    sink.write_all(stderr.as_bytes()).await?;
                    sink.flush().await?;
                }
                anyhow::bail!("exit status 1")
            }
        }
    }
}

/// JSON log lines collected from a scoped subscriber.
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Installs a subscriber for the current thread; logging stops when the
    /// guard drops. Use with the current-thread test runtime.
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(self.clone());
        tracing::subscriber::set_default(tracing_subscriber::registry().with(layer))
    }

    /// Lines logged with `event = <event>`.
    pub(crate) fn count_event(&self, event: &str) -> usize {
        let needle = format!("\"event\":\"{event}\"");
        let buf = self.buf.lock().expect("log lock");
        String::from_utf8_lossy(&buf)
            .lines()
            .filter(|line| line.contains(&needle))
            .count()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().expect("log lock").extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub(crate) fn temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{prefix}-{nanos}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub(crate) const SAMPLE_TRACE: &str = "------------------- Start of thread 0 vpp_main -------------------
Packet 1

00:00:05:123456: af-packet-input
  af_packet: hw_if_index 1 next-index 4
    tpacket2_hdr:
      status 0x20000001 len 98 snaplen 98 mac 66 net 80
00:00:05:123470: ethernet-input
  IP4: 02:fe:12:34:56:78 -> 02:fe:87:65:43:21
00:00:05:123490: ip4-input
  ICMP: 10.0.0.1 -> 10.0.0.2
00:00:05:123520: ip4-lookup
  fib 0 dpo-idx 5 flow hash: 0x00000000

Packet 2

00:00:06:000100: af-packet-input
  af_packet: hw_if_index 1 next-index 4
00:00:06:000220: error-drop
  rx:host-eth0
00:00:06:000230: drop
  ethernet-input: no error

";
