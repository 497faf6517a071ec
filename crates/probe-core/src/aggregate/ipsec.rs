use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::AggregatedRecord;

pub const IPSEC_SA_CLI: &str = "show ipsec sa";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityAssociation {
    pub instance: String,
    pub index: u32,
    pub spi: u32,
    pub direction: Direction,
}

/// Outbound SA on one instance paired with the inbound SA that shares its
/// SPI on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunnelLeg {
    pub spi: u32,
    pub outbound: SecurityAssociation,
    pub inbound: SecurityAssociation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IpsecCorrelation {
    pub instances: usize,
    pub legs: Vec<TunnelLeg>,
    pub unmatched: Vec<SecurityAssociation>,
}

fn sa_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\[(\d+)\]\s+sa\s+\S+\s+spi\s+(\d+)\b.*?(?:flags:\[([^\]]*)\])?\s*$")
            .expect("ipsec sa regex")
    })
}

/// Parses the one-line-per-SA summary printed by `show ipsec sa`:
///
/// `[1] sa 0x2 spi 1000 (0x000003e8) protocol:esp flags:[esn anti-replay inbound ]`
pub fn parse_ipsec_sas(instance: &str, output: &str) -> Vec<SecurityAssociation> {
    output
        .lines()
        .filter_map(|line| {
            let caps = sa_line().captures(line)?;
            let index = caps[1].parse().ok()?;
            let spi = caps[2].parse().ok()?;
            let inbound = caps
                .get(3)
                .map(|flags| flags.as_str().split_whitespace().any(|f| f == "inbound"))
                .unwrap_or(false);
            Some(SecurityAssociation {
                instance: instance.to_string(),
                index,
                spi,
                direction: if inbound {
                    Direction::Inbound
                } else {
                    Direction::Outbound
                },
            })
        })
        .collect()
}

/// Matches SAs across instances by SPI. SAs that pair with nothing are
/// reported as unmatched, in SPI order.
pub fn correlate_ipsec(aggregated: &AggregatedRecord) -> IpsecCorrelation {
    let mut by_spi: BTreeMap<u32, Vec<SecurityAssociation>> = BTreeMap::new();
    for (id, record) in &aggregated.entries {
        let Some(output) = record.cli_output(IPSEC_SA_CLI) else {
            continue;
        };
        for sa in parse_ipsec_sas(id, output) {
            by_spi.entry(sa.spi).or_default().push(sa);
        }
    }

    let mut correlation = IpsecCorrelation {
        instances: aggregated.len(),
        ..IpsecCorrelation::default()
    };
    for (spi, sas) in by_spi {
        let mut paired = vec![false; sas.len()];
        for (out_idx, outbound) in sas.iter().enumerate() {
            if outbound.direction != Direction::Outbound {
                continue;
            }
            for (in_idx, inbound) in sas.iter().enumerate() {
                if inbound.direction != Direction::Inbound || inbound.instance == outbound.instance {
                    continue;
                }
                paired[out_idx] = true;
                paired[in_idx] = true;
                correlation.legs.push(TunnelLeg {
                    spi,
                    outbound: outbound.clone(),
                    inbound: inbound.clone(),
                });
            }
        }
        correlation.unmatched.extend(
            sas.into_iter()
                .zip(paired)
                .filter(|(_, paired)| !paired)
                .map(|(sa, _)| sa),
        );
    }
    correlation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{CliOutput, InstanceRecord};

    const NSC_SAS: &str = "\
[0] sa 0x1 spi 1001 (0x000003e9) protocol:esp flags:[esn anti-replay ]
[1] sa 0x2 spi 1000 (0x000003e8) protocol:esp flags:[esn anti-replay inbound ]
[2] sa 0x3 spi 4242 (0x00001092) protocol:esp flags:[]
";

    const NSE_SAS: &str = "\
[0] sa 0x10 spi 1000 (0x000003e8) protocol:esp flags:[esn anti-replay ]
[1] sa 0x11 spi 1001 (0x000003e9) protocol:esp flags:[esn anti-replay inbound ]
";

    fn record(id: &str, sas: Option<&str>) -> InstanceRecord {
        InstanceRecord {
            id: id.to_string(),
            status: "running".to_string(),
            version: "23.10".to_string(),
            clis: sas
                .map(|sas| CliOutput {
                    command: IPSEC_SA_CLI.to_string(),
                    output: Some(sas.to_string()),
                    error: None,
                })
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn parses_sa_summary_lines() {
        let sas = parse_ipsec_sas("nsc", NSC_SAS);
        assert_eq!(sas.len(), 3);
        assert_eq!(sas[0].spi, 1001);
        assert_eq!(sas[0].direction, Direction::Outbound);
        assert_eq!(sas[1].index, 1);
        assert_eq!(sas[1].direction, Direction::Inbound);
        assert_eq!(sas[2].direction, Direction::Outbound);
        assert!(parse_ipsec_sas("nsc", "no SAs configured\n").is_empty());
    }

    #[test]
    fn pairs_outbound_with_remote_inbound() {
        let mut aggregated = AggregatedRecord::default();
        for record in [
            record("nsc", Some(NSC_SAS)),
            record("nse", Some(NSE_SAS)),
            record("other", None),
        ] {
            aggregated.entries.insert(record.id.clone(), record);
        }
        let correlation = correlate_ipsec(&aggregated);
        assert_eq!(correlation.instances, 3);
        let legs: Vec<(u32, &str, &str)> = correlation
            .legs
            .iter()
            .map(|leg| (leg.spi, leg.outbound.instance.as_str(), leg.inbound.instance.as_str()))
            .collect();
        assert_eq!(legs, [(1000, "nse", "nsc"), (1001, "nsc", "nse")]);
        assert_eq!(correlation.unmatched.len(), 1);
        assert_eq!(correlation.unmatched[0].spi, 4242);
    }

    #[test]
    fn same_instance_sas_do_not_pair() {
        let local = "\
[0] sa 0x1 spi 7 (0x7) protocol:esp flags:[]
[1] sa 0x2 spi 7 (0x7) protocol:esp flags:[inbound ]
";
        let mut aggregated = AggregatedRecord::default();
        aggregated
            .entries
            .insert("solo".to_string(), record("solo", Some(local)));
        let correlation = correlate_ipsec(&aggregated);
        assert!(correlation.legs.is_empty());
        assert_eq!(correlation.unmatched.len(), 2);
    }
}
