use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use super::{Capture, Packet};

fn packet_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Packet\s+(\d+)\s*$").expect("packet header regex"))
}

fn capture_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+):(\d{2}):(\d{2}):(\d{6}):\s+)?([A-Za-z0-9_][A-Za-z0-9_.-]*)\s*$")
            .expect("capture header regex")
    })
}

/// Parses `show trace` output into packets.
///
/// Capture headers look like `00:00:05:123456: ethernet-input`; the lines
/// indented below a header are that node's content. Thread banners and
/// anything outside a packet are ignored, as are packets with no captures.
pub fn parse_trace(raw: &str) -> Vec<Packet> {
    let mut parser = Parser::default();
    for line in raw.lines() {
        parser.line(line.trim_end());
    }
    parser.finish()
}

#[derive(Default)]
struct Parser {
    packets: Vec<Packet>,
    packet_id: Option<u32>,
    captures: Vec<Capture>,
    current: Option<Capture>,
}

impl Parser {
    fn line(&mut self, line: &str) {
        if line.is_empty() || line.starts_with("---") {
            return;
        }
        if let Some(caps) = packet_header().captures(line) {
            self.flush_packet();
            self.packet_id = caps[1].parse().ok();
            return;
        }
        if self.packet_id.is_none() {
            return;
        }
        if line.starts_with(char::is_whitespace) {
            if let Some(current) = self.current.as_mut() {
                if !current.content.is_empty() {
                    current.content.push('\n');
                }
                current.content.push_str(strip_indent(line));
            }
            return;
        }
        if let Some(caps) = capture_header().captures(line) {
            self.flush_capture();
            let start = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
                (Some(h), Some(m), Some(s), Some(us)) => {
                    timestamp(h.as_str(), m.as_str(), s.as_str(), us.as_str())
                }
                _ => Duration::ZERO,
            };
            self.current = Some(Capture {
                name: caps[5].to_string(),
                start,
                content: String::new(),
            });
        }
    }

    fn flush_capture(&mut self) {
        if let Some(capture) = self.current.take() {
            self.captures.push(capture);
        }
    }

    fn flush_packet(&mut self) {
        self.flush_capture();
        let captures = std::mem::take(&mut self.captures);
        if let Some(packet) = self.packet_id.take().and_then(|id| Packet::new(id, captures)) {
            self.packets.push(packet);
        }
    }

    fn finish(mut self) -> Vec<Packet> {
        self.flush_packet();
        self.packets
    }
}

fn strip_indent(line: &str) -> &str {
    line.strip_prefix("  ").unwrap_or_else(|| line.trim_start())
}

fn timestamp(hours: &str, minutes: &str, seconds: &str, micros: &str) -> Duration {
    let field = |value: &str| value.parse::<u64>().unwrap_or(0);
    let secs = field(hours) * 3600 + field(minutes) * 60 + field(seconds);
    Duration::from_secs(secs) + Duration::from_micros(field(micros))
}
