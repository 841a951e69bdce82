//! Misprediction taxonomy.

use std::collections::BTreeMap;
use std::fmt;

use partcost_core::config::PenaltyWeights;
use serde::{Deserialize, Serialize};

/// One kind of divergence between an estimated and an actual path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Penalty {
    /// Terminal mispredicted for a transaction that wrote one partition.
    MissedAbortSingle,
    /// Terminal mispredicted for a transaction that wrote several partitions;
    /// coordination may already have fanned out.
    MissedAbortMulti,
    /// Read a partition the estimate did not include.
    MissingReadPartition,
    MissingWritePartition,
    /// Estimate included a read partition that was never read.
    ExtraReadPartition,
    ExtraWritePartition,
}

impl Penalty {
    pub const ALL: [Penalty; 6] = [
        Penalty::MissedAbortSingle,
        Penalty::MissedAbortMulti,
        Penalty::MissingReadPartition,
        Penalty::MissingWritePartition,
        Penalty::ExtraReadPartition,
        Penalty::ExtraWritePartition,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Penalty::MissedAbortSingle => "MISSED_ABORT_SINGLE",
            Penalty::MissedAbortMulti => "MISSED_ABORT_MULTI",
            Penalty::MissingReadPartition => "MISSING_READ_PARTITION",
            Penalty::MissingWritePartition => "MISSING_WRITE_PARTITION",
            Penalty::ExtraReadPartition => "EXTRA_READ_PARTITION",
            Penalty::ExtraWritePartition => "EXTRA_WRITE_PARTITION",
        }
    }

    pub fn weight(self, weights: &PenaltyWeights) -> f64 {
        match self {
            Penalty::MissedAbortSingle => weights.missed_abort_single,
            Penalty::MissedAbortMulti => weights.missed_abort_multi,
            Penalty::MissingReadPartition => weights.missing_read_partition,
            Penalty::MissingWritePartition => weights.missing_write_partition,
            Penalty::ExtraReadPartition => weights.extra_read_partition,
            Penalty::ExtraWritePartition => weights.extra_write_partition,
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How often each penalty fired across many transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyHistogram {
    counts: BTreeMap<Penalty, u64>,
}

impl PenaltyHistogram {
    pub fn record(&mut self, penalties: &[Penalty]) {
        for p in penalties {
            *self.counts.entry(*p).or_default() += 1;
        }
    }

    pub fn get(&self, penalty: Penalty) -> u64 {
        self.counts.get(&penalty).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Penalty, u64)> + '_ {
        self.counts.iter().map(|(p, n)| (*p, *n))
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_name_matches_display() {
        for p in Penalty::ALL {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{p}\""));
        }
    }

    #[test]
    fn weights_come_from_config() {
        let mut w = PenaltyWeights::default();
        w.missing_read_partition = 3.0;
        assert_eq!(Penalty::MissingReadPartition.weight(&w), 3.0);
        assert_ne!(
            Penalty::MissingWritePartition.weight(&w),
            Penalty::MissingReadPartition.weight(&w)
        );
    }

    #[test]
    fn histogram_counts_repeats() {
        let mut h = PenaltyHistogram::default();
        h.record(&[Penalty::MissingReadPartition, Penalty::MissingReadPartition]);
        h.record(&[Penalty::MissedAbortMulti]);
        assert_eq!(h.get(Penalty::MissingReadPartition), 2);
        assert_eq!(h.total(), 3);
    }
}
