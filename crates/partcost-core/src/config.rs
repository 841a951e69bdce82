//! Cost-model configuration that downstream crates can serialize/deserialize.
//!
//! Weights live here rather than in the scorers so planning policies can
//! re-weight misprediction severity without touching code.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-transaction weights used by the single-sited workload estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleSitedWeights {
    /// Cost of a transaction that touches exactly one partition.
    pub single_partition_cost: f64,

    /// Flat cost of a transaction that needs distributed coordination.
    pub multi_partition_cost: f64,

    /// Added per partition beyond the first for multi-partition transactions.
    pub remote_partition_cost: f64,
}

impl Default for SingleSitedWeights {
    fn default() -> Self {
        Self {
            single_partition_cost: 0.0,
            multi_partition_cost: 1.0,
            remote_partition_cost: 0.25,
        }
    }
}

/// Weight table for the path penalty taxonomy.
///
/// The symmetric write/extra kinds are tuned separately from the read kind;
/// do not assume they are interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    pub missed_abort_single: f64,
    pub missed_abort_multi: f64,
    pub missing_read_partition: f64,
    pub missing_write_partition: f64,
    pub extra_read_partition: f64,
    pub extra_write_partition: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            missed_abort_single: 0.5,
            missed_abort_multi: 1.0,
            missing_read_partition: 0.5,
            missing_write_partition: 0.75,
            extra_read_partition: 0.1,
            extra_write_partition: 0.25,
        }
    }
}

impl PenaltyWeights {
    fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("missed_abort_single", self.missed_abort_single),
            ("missed_abort_multi", self.missed_abort_multi),
            ("missing_read_partition", self.missing_read_partition),
            ("missing_write_partition", self.missing_write_partition),
            ("extra_read_partition", self.extra_read_partition),
            ("extra_write_partition", self.extra_write_partition),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostModelConfig {
    #[serde(default)]
    pub single_sited: SingleSitedWeights,

    #[serde(default)]
    pub penalties: PenaltyWeights,
}

impl CostModelConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PARTCOST_SINGLE_PARTITION_COST`
    /// - `PARTCOST_MULTI_PARTITION_COST`
    /// - `PARTCOST_REMOTE_PARTITION_COST`
    /// - `PARTCOST_PENALTY_<KIND>` where `<KIND>` is one of `MISSED_ABORT_SINGLE`,
    ///   `MISSED_ABORT_MULTI`, `MISSING_READ_PARTITION`, `MISSING_WRITE_PARTITION`,
    ///   `EXTRA_READ_PARTITION`, `EXTRA_WRITE_PARTITION`
    ///
    /// Unparseable values are ignored. Call [`CostModelConfig::validate`] afterwards.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        let ss = &mut cfg.single_sited;
        env_f64("PARTCOST_SINGLE_PARTITION_COST", &mut ss.single_partition_cost);
        env_f64("PARTCOST_MULTI_PARTITION_COST", &mut ss.multi_partition_cost);
        env_f64("PARTCOST_REMOTE_PARTITION_COST", &mut ss.remote_partition_cost);

        let p = &mut cfg.penalties;
        env_f64("PARTCOST_PENALTY_MISSED_ABORT_SINGLE", &mut p.missed_abort_single);
        env_f64("PARTCOST_PENALTY_MISSED_ABORT_MULTI", &mut p.missed_abort_multi);
        env_f64("PARTCOST_PENALTY_MISSING_READ_PARTITION", &mut p.missing_read_partition);
        env_f64("PARTCOST_PENALTY_MISSING_WRITE_PARTITION", &mut p.missing_write_partition);
        env_f64("PARTCOST_PENALTY_EXTRA_READ_PARTITION", &mut p.extra_read_partition);
        env_f64("PARTCOST_PENALTY_EXTRA_WRITE_PARTITION", &mut p.extra_write_partition);

        cfg
    }

    /// Every weight must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let ss = &self.single_sited;
        let single = [
            ("single_partition_cost", ss.single_partition_cost),
            ("multi_partition_cost", ss.multi_partition_cost),
            ("remote_partition_cost", ss.remote_partition_cost),
        ];
        for (name, w) in single.into_iter().chain(self.penalties.entries()) {
            check_weight(name, w)?;
        }
        Ok(())
    }
}

fn check_weight(name: &str, w: f64) -> Result<()> {
    if !w.is_finite() || w < 0.0 {
        return Err(Error::Config(format!(
            "weight '{name}' must be finite and non-negative, got {w}"
        )));
    }
    Ok(())
}

fn env_f64(key: &str, slot: &mut f64) {
    if let Ok(s) = std::env::var(key) {
        if let Ok(v) = s.parse::<f64>() {
            *slot = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        CostModelConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_negative_weight() {
        let mut cfg = CostModelConfig::default();
        cfg.penalties.missing_read_partition = -1.0;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("missing_read_partition")));
    }

    #[test]
    fn rejects_nan_weight() {
        let mut cfg = CostModelConfig::default();
        cfg.single_sited.remote_partition_cost = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{"single_sited":{
            "single_partition_cost":0.1,
            "multi_partition_cost":2.0,
            "remote_partition_cost":0.0
        }}"#;
        let cfg: CostModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.single_sited.multi_partition_cost, 2.0);
        assert_eq!(cfg.penalties, PenaltyWeights::default());
    }
}
