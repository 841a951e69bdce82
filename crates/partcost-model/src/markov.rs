//! Penalty scoring for predicted vs. actual execution paths.
//!
//! The scorer owns a `PathComparator` and reuses its retained partition sets
//! when asked to score the same pair it just compared, including any what-if
//! edits made to those sets in between.

use partcost_core::config::{CostModelConfig, PenaltyWeights};
use partcost_core::error::{Error, Result};
use partcost_core::id::PartitionId;
use partcost_markov::{MarkovGraph, MarkovGraphsContainer, Path, TransactionPathState};
use std::collections::BTreeSet;

use crate::comparator::PathComparator;
use crate::metrics::emit_span;
use crate::penalty::{Penalty, PenaltyHistogram};

#[derive(Debug, Clone)]
pub struct MarkovCostModel {
    weights: PenaltyWeights,
    comparator: PathComparator,
    last_penalties: Vec<Penalty>,
    histogram: PenaltyHistogram,
}

impl MarkovCostModel {
    /// Validates every weight in `config`; bad weights fail here, not while scoring.
    pub fn new(config: &CostModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            weights: config.penalties.clone(),
            comparator: PathComparator::new(),
            last_penalties: Vec::new(),
            histogram: PenaltyHistogram::default(),
        })
    }

    pub fn with_weights(weights: PenaltyWeights) -> Result<Self> {
        Self::new(&CostModelConfig {
            penalties: weights,
            ..Default::default()
        })
    }

    pub fn weights(&self) -> &PenaltyWeights {
        &self.weights
    }

    pub fn compare_paths_fast(
        &mut self,
        graph: &MarkovGraph,
        estimated: &Path,
        actual: &Path,
    ) -> Result<bool> {
        self.comparator.compare_paths_fast(graph, estimated, actual)
    }

    /// Weighted divergence cost of `state`'s estimated path against its actual path.
    ///
    /// Emits one partition penalty per missing or extra partition, so the
    /// cost grows with every partition the estimate got wrong. Repeated calls
    /// on an unchanged state return the same cost and penalty list.
    pub fn compare_paths_full(
        &mut self,
        graph: &MarkovGraph,
        state: &TransactionPathState,
    ) -> Result<f64> {
        let estimated = state.estimated_path();
        let actual = state.actual_path();
        let e_commit = estimated.validate(graph)?.is_commit();
        let a_commit = actual.validate(graph)?.is_commit();

        if !self.comparator.is_current(graph, estimated, actual) {
            self.comparator.compare_paths_fast(graph, estimated, actual)?;
        }
        let sets = self.comparator.last_partitions();

        let mut penalties = Vec::new();
        if e_commit != a_commit {
            penalties.push(if sets.actual_write.len() > 1 {
                Penalty::MissedAbortMulti
            } else {
                Penalty::MissedAbortSingle
            });
        }
        for (kind, have, expected) in [
            (Penalty::MissingReadPartition, &sets.actual_read, &sets.estimated_read),
            (Penalty::MissingWritePartition, &sets.actual_write, &sets.estimated_write),
            (Penalty::ExtraReadPartition, &sets.estimated_read, &sets.actual_read),
            (Penalty::ExtraWritePartition, &sets.estimated_write, &sets.actual_write),
        ] {
            // One penalty per partition the estimate got wrong.
            penalties.extend(have.difference(expected).map(|_| kind));
        }

        let cost: f64 = penalties.iter().map(|p| p.weight(&self.weights)).sum();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            txn = %state.txn_id,
            procedure = %state.procedure,
            cost,
            penalties = penalties.len(),
            "scored path divergence"
        );

        self.last_penalties = penalties;
        Ok(cost)
    }

    /// Score one transaction against its graph. Structurally equal paths cost
    /// nothing and skip the full scan.
    pub fn estimate_transaction_cost(
        &mut self,
        graphs: &MarkovGraphsContainer,
        state: &TransactionPathState,
    ) -> Result<f64> {
        let graph = graphs
            .get(state.base_partition, &state.procedure)
            .ok_or_else(|| {
                Error::InconsistentGraph(format!(
                    "no graph for '{}' at base partition {}",
                    state.procedure, state.base_partition
                ))
            })?;
        if self.compare_paths_fast(graph, state.estimated_path(), state.actual_path())? {
            self.last_penalties.clear();
            return Ok(0.0);
        }
        let cost = self.compare_paths_full(graph, state)?;
        self.histogram.record(&self.last_penalties);
        Ok(cost)
    }

    /// Sum of per-transaction costs, in order.
    pub fn estimate_workload_cost(
        &mut self,
        graphs: &MarkovGraphsContainer,
        states: &[TransactionPathState],
    ) -> Result<f64> {
        let mut total = 0.0;
        let mut mispredicted = 0usize;
        for state in states {
            let cost = self.estimate_transaction_cost(graphs, state)?;
            if !self.last_penalties.is_empty() {
                mispredicted += 1;
            }
            total += cost;
        }
        emit_span(
            "markov_workload_cost",
            &[
                ("txns", states.len().to_string()),
                ("mispredicted", mispredicted.to_string()),
                ("total", format!("{total:.4}")),
            ],
        );
        Ok(total)
    }

    pub fn last_penalties(&self) -> &[Penalty] {
        &self.last_penalties
    }

    pub fn histogram(&self) -> &PenaltyHistogram {
        &self.histogram
    }

    pub fn reset_histogram(&mut self) {
        self.histogram.clear();
    }

    pub fn comparator(&self) -> &PathComparator {
        &self.comparator
    }

    pub fn comparator_mut(&mut self) -> &mut PathComparator {
        &mut self.comparator
    }

    pub fn last_estimated_read_partitions(&self) -> &BTreeSet<PartitionId> {
        self.comparator.last_estimated_read_partitions()
    }

    pub fn last_actual_read_partitions(&self) -> &BTreeSet<PartitionId> {
        self.comparator.last_actual_read_partitions()
    }

    pub fn last_estimated_write_partitions(&self) -> &BTreeSet<PartitionId> {
        self.comparator.last_estimated_write_partitions()
    }

    pub fn last_actual_write_partitions(&self) -> &BTreeSet<PartitionId> {
        self.comparator.last_actual_write_partitions()
    }

    pub fn last_estimated_read_partitions_mut(&mut self) -> &mut BTreeSet<PartitionId> {
        self.comparator.last_estimated_read_partitions_mut()
    }

    pub fn last_actual_read_partitions_mut(&mut self) -> &mut BTreeSet<PartitionId> {
        self.comparator.last_actual_read_partitions_mut()
    }

    pub fn last_estimated_write_partitions_mut(&mut self) -> &mut BTreeSet<PartitionId> {
        self.comparator.last_estimated_write_partitions_mut()
    }

    pub fn last_actual_write_partitions_mut(&mut self) -> &mut BTreeSet<PartitionId> {
        self.comparator.last_actual_write_partitions_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partcost_core::id::{TxnId, VertexId};

    fn p(n: u32) -> PartitionId {
        PartitionId::new(n)
    }

    fn state_for(g: &MarkovGraph, est: Vec<VertexId>, act: Vec<VertexId>) -> TransactionPathState {
        TransactionPathState::new(
            TxnId::new(1),
            g.procedure(),
            g.base_partition(),
            Path::new(est),
            Path::new(act),
        )
    }

    #[test]
    fn identical_paths_cost_nothing() {
        let mut g = MarkovGraph::new("payment", p(0));
        let q = g.add_query_vertex("getWarehouse", 0, [p(0)], [p(0)]);
        let path = vec![g.start_vertex(), q, g.commit_vertex()];
        let state = state_for(&g, path.clone(), path);
        let mut m = MarkovCostModel::new(&CostModelConfig::default()).unwrap();
        assert_eq!(m.compare_paths_full(&g, &state).unwrap(), 0.0);
        assert!(m.last_penalties().is_empty());
    }

    #[test]
    fn single_partition_abort_is_the_lighter_penalty() {
        let mut g = MarkovGraph::new("payment", p(0));
        let q = g.add_query_vertex("updateWarehouse", 0, [p(0)], [p(0)]);
        let state = state_for(
            &g,
            vec![g.start_vertex(), q, g.commit_vertex()],
            vec![g.start_vertex(), q, g.abort_vertex()],
        );
        let mut m = MarkovCostModel::new(&CostModelConfig::default()).unwrap();
        let cost = m.compare_paths_full(&g, &state).unwrap();
        assert_eq!(m.last_penalties(), &[Penalty::MissedAbortSingle]);
        assert_eq!(cost, m.weights().missed_abort_single);
    }

    #[test]
    fn missing_partitions_scale_cost() {
        let mut g = MarkovGraph::new("neworder", p(0));
        let narrow = g.add_query_vertex("getStock", 0, [p(0)], []);
        let wide = g.add_query_vertex("getStock", 0, [p(0), p(1), p(2)], []);
        let state = state_for(
            &g,
            vec![g.start_vertex(), narrow, g.commit_vertex()],
            vec![g.start_vertex(), wide, g.commit_vertex()],
        );
        let mut m = MarkovCostModel::new(&CostModelConfig::default()).unwrap();
        let cost = m.compare_paths_full(&g, &state).unwrap();
        assert_eq!(
            m.last_penalties(),
            &[Penalty::MissingReadPartition, Penalty::MissingReadPartition]
        );
        assert!((cost - 2.0 * m.weights().missing_read_partition).abs() < 1e-12);
    }

    #[test]
    fn zero_weights_are_allowed_but_negative_are_not() {
        let mut w = PenaltyWeights::default();
        w.extra_read_partition = 0.0;
        assert!(MarkovCostModel::with_weights(w.clone()).is_ok());
        w.extra_read_partition = -0.5;
        assert!(matches!(
            MarkovCostModel::with_weights(w),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn missing_graph_is_reported() {
        let g = MarkovGraph::new("payment", p(0));
        let state = state_for(&g, vec![g.commit_vertex()], vec![g.commit_vertex()]);
        let mut m = MarkovCostModel::new(&CostModelConfig::default()).unwrap();
        let err = m
            .estimate_transaction_cost(&MarkovGraphsContainer::new(), &state)
            .unwrap_err();
        assert!(matches!(err, Error::InconsistentGraph(_)));
    }
}
