use crate::trace::{Capture, Packet, TraceResult};

use super::format::{format_duration, format_timestamp};
use super::{Line, Report, Style};

const FIELD_SEPARATOR: &str = " | ";
const CONTENT_INDENT: &str = "\t";

/// Whether `node` discards packets. Drop destinations signal packet loss.
pub fn is_drop_node(node: &str) -> bool {
    node == "drop" || node.ends_with("-drop")
}

fn node_style(node: &str) -> Style {
    if is_drop_node(node) {
        Style::DropNode
    } else {
        Style::Node
    }
}

/// One line per packet:
/// `Packet 1 | ⏲  00:00:05.12345 | af-packet-input  ￫  drop | took 120ms | nodes 3`.
pub fn render_packet_summary(packet: &Packet) -> Line {
    let first = packet.first_capture();
    let last = packet.last_capture();
    let mut line = Line::new();
    line.push("Packet ", Style::Label)
        .push(packet.id().to_string(), Style::Value)
        .push(FIELD_SEPARATOR, Style::Plain)
        .push("⏲  ", Style::Plain)
        .push(format_timestamp(packet.start()), Style::Value)
        .push(FIELD_SEPARATOR, Style::Plain)
        .push(first.name.clone(), node_style(&first.name))
        .push("  ￫  ", Style::Plain)
        .push(last.name.clone(), node_style(&last.name))
        .push(FIELD_SEPARATOR, Style::Plain)
        .push("took ", Style::Label)
        .push(format_duration(packet.transit()), Style::Value)
        .push(FIELD_SEPARATOR, Style::Plain)
        .push("nodes ", Style::Label)
        .push(packet.captures().len().to_string(), Style::Value);
    line
}

fn render_capture(packet: &Packet, capture: &Capture, report: &mut Report) {
    let mut heading = Line::new();
    heading
        .push("- ", Style::Plain)
        .push(capture.name.clone(), Style::CaptureNode);
    let offset = capture.start.saturating_sub(packet.start());
    if !capture.start.is_zero() && !offset.is_zero() {
        heading
            .push(" (", Style::Plain)
            .push(format!("+{}", format_duration(offset)), Style::Value)
            .push(")", Style::Plain);
    }
    report.push(heading);

    for content in capture.content.lines() {
        let mut line = Line::new();
        line.push(format!("{CONTENT_INDENT}{content}"), Style::Plain);
        report.push(line);
    }
}

/// Summary line plus per-node capture blocks for every packet.
pub fn render_trace_report(result: &TraceResult) -> Report {
    let mut report = Report::default();
    for packet in result.packets() {
        let mut summary = Line::new();
        summary.push("# ", Style::Plain);
        summary.spans.extend(render_packet_summary(packet).spans);
        report.push(summary);
        for capture in packet.captures() {
            render_capture(packet, capture, &mut report);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SAMPLE_TRACE;
    use crate::trace::Capture;
    use std::time::Duration;

    fn capture(name: &str, start: Duration, content: &str) -> Capture {
        Capture {
            name: name.to_string(),
            start,
            content: content.to_string(),
        }
    }

    #[test]
    fn drop_destination_is_tagged() {
        let packet = Packet::new(
            1,
            vec![
                capture("ethernet-input", Duration::ZERO, ""),
                capture("drop", Duration::from_millis(120), ""),
            ],
        )
        .expect("packet");
        let line = render_packet_summary(&packet);
        let drop = line.find(Style::DropNode).expect("drop span");
        assert_eq!(drop.text, "drop");
        assert_eq!(line.find(Style::Node).expect("origin").text, "ethernet-input");
        assert!(line.plain_text().contains("took 120ms"));
        assert!(line.plain_text().contains("nodes 2"));
    }

    #[test]
    fn regular_destination_is_not_a_drop() {
        let packet = Packet::new(
            4,
            vec![
                capture("memif-input", Duration::from_millis(1), ""),
                capture("interface-output", Duration::from_millis(2), ""),
            ],
        )
        .expect("packet");
        let line = render_packet_summary(&packet);
        assert!(line.find(Style::DropNode).is_none());
        assert_eq!(
            line.plain_text(),
            "Packet 4 | ⏲  00:00:00.00100 | memif-input  ￫  interface-output | took 1ms | nodes 2"
        );
    }

    #[test]
    fn drop_suffix_nodes_count_as_drops() {
        assert!(is_drop_node("drop"));
        assert!(is_drop_node("error-drop"));
        assert!(is_drop_node("ip4-drop"));
        assert!(!is_drop_node("dropper-input"));
    }

    #[test]
    fn capture_blocks_indent_content_and_skip_zero_offsets() {
        let result = TraceResult::parse(SAMPLE_TRACE);
        let text = render_trace_report(&result).to_plain_string();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("# Packet 1 | ⏲  00:00:05.12345 | af-packet-input"));
        assert_eq!(lines[1], "- af-packet-input");
        assert_eq!(lines[2], "\taf_packet: hw_if_index 1 next-index 4");
        assert_eq!(lines[3], "\t  tpacket2_hdr:");
        assert!(lines.contains(&"- ethernet-input (+14us)"));
        assert!(lines
            .iter()
            .any(|line| line.starts_with("# Packet 2") && line.contains("￫  drop")));
    }

    #[test]
    fn unreported_times_are_not_rendered() {
        let packet = Packet::new(
            1,
            vec![
                capture("pg-input", Duration::from_millis(5), ""),
                capture("ip4-input", Duration::ZERO, "IP4: a -> b"),
            ],
        )
        .expect("packet");
        let result = TraceResult::new(vec![packet], "");
        let text = render_trace_report(&result).to_plain_string();
        assert!(text.contains("- ip4-input\n\tIP4: a -> b\n"));
    }
}
