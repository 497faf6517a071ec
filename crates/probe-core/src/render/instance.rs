use crate::aggregate::{Direction, IpsecCorrelation, SecurityAssociation};
use crate::orchestrator::InstanceRecord;

use super::{Line, Report, Style};

pub fn render_instance(record: &InstanceRecord) -> Report {
    let mut line = Line::new();
    line.push("Instance ", Style::Label)
        .push(record.id.clone(), Style::Value)
        .push(" | ", Style::Plain)
        .push("status ", Style::Label)
        .push(record.status.clone(), Style::Plain)
        .push(" | ", Style::Plain)
        .push("version ", Style::Label)
        .push(record.version.clone(), Style::Value);
    let failed = record.clis.iter().filter(|cli| cli.error.is_some()).count();
    if failed > 0 {
        line.push(" | ", Style::Plain)
            .push(format!("{failed} cli errors"), Style::Error);
    }
    Report { lines: vec![line] }
}

/// Output of every captured CLI command, indented under its command line.
pub fn render_cli_outputs(record: &InstanceRecord) -> Report {
    let mut report = Report::default();
    for cli in &record.clis {
        let mut heading = Line::new();
        heading
            .push("vpp# ", Style::Label)
            .push(cli.command.clone(), Style::CaptureNode);
        report.push(heading);
        if let Some(error) = &cli.error {
            let mut line = Line::new();
            line.push(format!("\t{error}"), Style::Error);
            report.push(line);
        }
        for content in cli.output.as_deref().unwrap_or_default().lines() {
            let mut line = Line::new();
            line.push(format!("\t{content}"), Style::Plain);
            report.push(line);
        }
    }
    report
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Inbound => "inbound",
        Direction::Outbound => "outbound",
    }
}

fn sa_ref(sa: &SecurityAssociation) -> String {
    format!("{}[{}]", sa.instance, sa.index)
}

pub fn render_ipsec_correlation(correlation: &IpsecCorrelation) -> Report {
    let mut report = Report::default();
    let mut title = Line::new();
    title
        .push("IPsec tunnels across ", Style::Label)
        .push(correlation.instances.to_string(), Style::Value)
        .push(" instances", Style::Label);
    report.push(title);

    for leg in &correlation.legs {
        let mut line = Line::new();
        line.push("  spi ", Style::Label)
            .push(leg.spi.to_string(), Style::Value)
            .push(" | ", Style::Plain)
            .push(sa_ref(&leg.outbound), Style::Node)
            .push("  ￫  ", Style::Plain)
            .push(sa_ref(&leg.inbound), Style::Node);
        report.push(line);
    }
    for sa in &correlation.unmatched {
        let mut line = Line::new();
        line.push("  spi ", Style::Label)
            .push(sa.spi.to_string(), Style::Value)
            .push(" | ", Style::Plain)
            .push(sa_ref(sa), Style::Node)
            .push(" | ", Style::Plain)
            .push(format!("no peer for {} SA", direction_name(sa.direction)), Style::Error);
        report.push(line);
    }
    report
}
