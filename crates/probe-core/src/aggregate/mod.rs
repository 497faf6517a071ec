mod ipsec;

use std::collections::BTreeMap;

use crate::orchestrator::{InstanceOutcome, InstanceRecord};

pub use ipsec::{
    correlate_ipsec, parse_ipsec_sas, Direction, IpsecCorrelation, SecurityAssociation,
    TunnelLeg, IPSEC_SA_CLI,
};

/// Records of every successfully processed instance, keyed by instance id.
#[derive(Debug, Clone, Default)]
pub struct AggregatedRecord {
    pub entries: BTreeMap<String, InstanceRecord>,
    /// Instances left out because building their record failed.
    pub failed: usize,
}

impl AggregatedRecord {
    pub fn from_outcomes(outcomes: &[InstanceOutcome]) -> Self {
        let mut aggregated = Self::default();
        for outcome in outcomes {
            match outcome {
                InstanceOutcome::Ready(record) => {
                    aggregated
                        .entries
                        .insert(record.id.clone(), record.clone());
                }
                InstanceOutcome::Failed { .. } => aggregated.failed += 1,
            }
        }
        aggregated
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn correlate_ipsec(&self) -> IpsecCorrelation {
        correlate_ipsec(self)
    }
}
