//! Shared fixtures: a TPC-C style catalog, a deterministic workload over it,
//! and Markov graphs plus path states derived from that workload.

#![allow(dead_code)]

use std::collections::BTreeMap;

use partcost_core::catalog::{Catalog, Procedure, Statement, Table};
use partcost_core::id::{PartitionId, TxnId, VertexId};
use partcost_core::workload::{QueryTrace, TransactionTrace, Workload};
use partcost_markov::{MarkovGraph, MarkovGraphsContainer, Path, TransactionPathState};
use partcost_model::{HashPartitionEstimator, PartitionEstimator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const NUM_PARTITIONS: u32 = 5;
pub const NUM_TXNS: usize = 500;
pub const SEED: u64 = 0x5eed_cafe;

fn table(name: &str, column: &str) -> Table {
    Table {
        name: name.into(),
        partition_column: Some(column.into()),
        replicated: false,
    }
}

fn stmt(name: &str, reads: &[&str], writes: &[&str]) -> Statement {
    Statement {
        name: name.into(),
        tables_read: reads.iter().map(|s| s.to_string()).collect(),
        tables_written: writes.iter().map(|s| s.to_string()).collect(),
    }
}

fn procedure(name: &str, statements: Vec<Statement>) -> Procedure {
    Procedure {
        name: name.into(),
        partition_param: Some(0),
        statements,
    }
}

/// Every partitioned table is keyed on its warehouse id, so a warehouse id
/// maps straight to a partition.
pub fn tpcc_catalog(num_partitions: u32) -> Catalog {
    let mut c = Catalog::new(num_partitions);
    for t in [
        table("WAREHOUSE", "W_ID"),
        table("DISTRICT", "D_W_ID"),
        table("CUSTOMER", "C_W_ID"),
        table("STOCK", "S_W_ID"),
        table("ORDERS", "O_W_ID"),
        table("NEW_ORDER", "NO_W_ID"),
        table("ORDER_LINE", "OL_W_ID"),
        table("HISTORY", "H_W_ID"),
        Table {
            name: "ITEM".into(),
            partition_column: None,
            replicated: true,
        },
    ] {
        c.add_table(t);
    }

    c.add_procedure(procedure(
        "neworder",
        vec![
            stmt("getWarehouseTaxRate", &["WAREHOUSE"], &[]),
            stmt("getDistrict", &["DISTRICT"], &[]),
            stmt("incrementNextOrderId", &[], &["DISTRICT"]),
            stmt("getCustomer", &["CUSTOMER"], &[]),
            stmt("createOrder", &[], &["ORDERS"]),
            stmt("createNewOrder", &[], &["NEW_ORDER"]),
            stmt("getItemInfo", &["ITEM"], &[]),
            stmt("getStockInfo", &["STOCK"], &[]),
            stmt("updateStock", &[], &["STOCK"]),
            stmt("createOrderLine", &[], &["ORDER_LINE"]),
        ],
    ));
    c.add_procedure(procedure(
        "payment",
        vec![
            stmt("getWarehouse", &["WAREHOUSE"], &[]),
            stmt("updateWarehouseBalance", &[], &["WAREHOUSE"]),
            stmt("getDistrict", &["DISTRICT"], &[]),
            stmt("updateDistrictBalance", &[], &["DISTRICT"]),
            stmt("getCustomerByCustomerId", &["CUSTOMER"], &[]),
            stmt("updateCustomerBalance", &[], &["CUSTOMER"]),
            stmt("insertHistory", &[], &["HISTORY"]),
        ],
    ));
    c.add_procedure(procedure(
        "delivery",
        vec![
            stmt("getNewOrder", &["NEW_ORDER"], &[]),
            stmt("deleteNewOrder", &[], &["NEW_ORDER"]),
            stmt("getCId", &["ORDERS"], &[]),
            stmt("updateOrders", &[], &["ORDERS"]),
            stmt("updateOrderLine", &[], &["ORDER_LINE"]),
            stmt("sumOLAmount", &["ORDER_LINE"], &[]),
            stmt("updateCustomer", &[], &["CUSTOMER"]),
        ],
    ));
    c.add_procedure(procedure(
        "ostatByCustomerId",
        vec![
            stmt("getCustomerByCustomerId", &["CUSTOMER"], &[]),
            stmt("getLastOrder", &["ORDERS"], &[]),
            stmt("getOrderLines", &["ORDER_LINE"], &[]),
        ],
    ));
    c.add_procedure(procedure(
        "slev",
        vec![
            stmt("getOId", &["DISTRICT"], &[]),
            stmt("getStockCount", &["ORDER_LINE", "STOCK"], &[]),
        ],
    ));
    c
}

fn q(statement: &str, key: i64) -> QueryTrace {
    QueryTrace::new(statement, vec![key])
}

fn other_warehouse(rng: &mut StdRng, w: i64, num_warehouses: i64) -> i64 {
    if num_warehouses < 2 {
        return w;
    }
    (w + rng.gen_range(1..num_warehouses)) % num_warehouses
}

fn neworder(rng: &mut StdRng, txn_id: u64, w: i64, warehouses: i64) -> TransactionTrace {
    let mut queries = vec![
        q("getWarehouseTaxRate", w),
        q("getDistrict", w),
        q("incrementNextOrderId", w),
        q("getCustomer", w),
        q("createOrder", w),
        q("createNewOrder", w),
    ];
    let items = rng.gen_range(5..=10);
    for _ in 0..items {
        // Roughly one order line in ten is supplied by a remote warehouse.
        let supply = if rng.gen_range(0..10) == 0 {
            other_warehouse(rng, w, warehouses)
        } else {
            w
        };
        queries.push(QueryTrace::new("getItemInfo", vec![]));
        queries.push(q("getStockInfo", supply));
        queries.push(q("updateStock", supply));
        queries.push(q("createOrderLine", w));
    }
    TransactionTrace {
        txn_id: TxnId::new(txn_id),
        procedure: "neworder".into(),
        params: vec![w],
        queries,
    }
}

fn payment(rng: &mut StdRng, txn_id: u64, w: i64, warehouses: i64) -> TransactionTrace {
    let c_w = if rng.gen_range(0..100) < 15 {
        other_warehouse(rng, w, warehouses)
    } else {
        w
    };
    TransactionTrace {
        txn_id: TxnId::new(txn_id),
        procedure: "payment".into(),
        params: vec![w, c_w],
        queries: vec![
            q("getWarehouse", w),
            q("updateWarehouseBalance", w),
            q("getDistrict", w),
            q("updateDistrictBalance", w),
            q("getCustomerByCustomerId", c_w),
            q("updateCustomerBalance", c_w),
            q("insertHistory", w),
        ],
    }
}

fn local(txn_id: u64, procedure: &str, w: i64, statements: &[&str]) -> TransactionTrace {
    TransactionTrace {
        txn_id: TxnId::new(txn_id),
        procedure: procedure.into(),
        params: vec![w],
        queries: statements.iter().map(|s| q(s, w)).collect(),
    }
}

/// Standard-ish TPC-C mix with one warehouse per partition.
pub fn tpcc_workload(num_partitions: u32, num_txns: usize, seed: u64) -> Workload {
    let warehouses = i64::from(num_partitions);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut txns = Vec::with_capacity(num_txns);
    for i in 0..num_txns {
        let id = 1000 + i as u64;
        let w = rng.gen_range(0..warehouses);
        let txn = match rng.gen_range(0..100) {
            0..=44 => neworder(&mut rng, id, w, warehouses),
            45..=87 => payment(&mut rng, id, w, warehouses),
            88..=91 => local(
                id,
                "delivery",
                w,
                &[
                    "getNewOrder",
                    "deleteNewOrder",
                    "getCId",
                    "updateOrders",
                    "updateOrderLine",
                    "sumOLAmount",
                    "updateCustomer",
                ],
            ),
            92..=95 => local(
                id,
                "ostatByCustomerId",
                w,
                &["getCustomerByCustomerId", "getLastOrder", "getOrderLines"],
            ),
            _ => local(id, "slev", w, &["getOId", "getStockCount"]),
        };
        txns.push(txn);
    }
    Workload::new(txns)
}

pub fn default_fixture() -> (Catalog, Workload) {
    (
        tpcc_catalog(NUM_PARTITIONS),
        tpcc_workload(NUM_PARTITIONS, NUM_TXNS, SEED),
    )
}

type VertexKey = (String, u32, Vec<PartitionId>, Vec<PartitionId>);

#[derive(Default)]
struct GraphBuilder {
    graph: Option<MarkovGraph>,
    vertices: BTreeMap<VertexKey, VertexId>,
    transitions: BTreeMap<VertexId, BTreeMap<VertexId, u64>>,
}

impl GraphBuilder {
    fn graph(&mut self, procedure: &str, base: PartitionId) -> &mut MarkovGraph {
        self.graph
            .get_or_insert_with(|| MarkovGraph::new(procedure, base))
    }

    fn intern(&mut self, procedure: &str, base: PartitionId, key: VertexKey) -> VertexId {
        if let Some(id) = self.vertices.get(&key) {
            return *id;
        }
        let (stmt, counter, reads, writes) = key.clone();
        let id = self
            .graph(procedure, base)
            .add_query_vertex(stmt, counter, reads, writes);
        self.vertices.insert(key, id);
        id
    }

    fn observe(&mut self, path: &Path) {
        for pair in path.as_slice().windows(2) {
            *self
                .transitions
                .entry(pair[0])
                .or_default()
                .entry(pair[1])
                .or_default() += 1;
        }
    }

    fn finish(mut self) -> Option<MarkovGraph> {
        let mut graph = self.graph.take()?;
        for (from, outs) in &self.transitions {
            let total: u64 = outs.values().sum();
            for (to, n) in outs {
                graph
                    .add_edge(*from, *to, *n as f64 / total as f64)
                    .expect("fixture edges reference interned vertices");
            }
        }
        Some(graph)
    }
}

/// Walk a transaction's queries as a path of interned vertices.
fn trace_path(
    builder: &mut GraphBuilder,
    catalog: &Catalog,
    txn: &TransactionTrace,
    base: PartitionId,
    predicted: bool,
    aborted: bool,
) -> Path {
    let proc_ = catalog.procedure(&txn.procedure).expect("fixture procedure");
    let mut counters: BTreeMap<&str, u32> = BTreeMap::new();
    let start = builder.graph(&txn.procedure, base).start_vertex();
    let mut path = Path::new(vec![start]);
    for query in &txn.queries {
        let stmt = proc_.statement(&query.statement).expect("fixture statement");
        // The predictor assumes every keyed query stays on the base partition.
        let routed = if predicted && !query.keys.is_empty() {
            QueryTrace::new(query.statement.clone(), vec![i64::from(base.get())])
        } else {
            query.clone()
        };
        let parts = HashPartitionEstimator
            .query_partitions(catalog, base, stmt, &routed)
            .expect("fixture routing");
        let counter = counters.entry(query.statement.as_str()).or_insert(0);
        let key = (
            query.statement.clone(),
            *counter,
            parts.read.into_iter().collect(),
            parts.write.into_iter().collect(),
        );
        *counter += 1;
        path.push(builder.intern(&txn.procedure, base, key));
    }
    let graph = builder.graph(&txn.procedure, base);
    path.push(if aborted {
        graph.abort_vertex()
    } else {
        graph.commit_vertex()
    });
    path
}

/// Graphs trained on the actual paths of `workload`, and one path state per
/// transaction whose estimate assumes every query is local. About one
/// neworder in a hundred aborts where the estimate predicted a commit.
pub fn markov_fixture(
    catalog: &Catalog,
    workload: &Workload,
) -> (MarkovGraphsContainer, Vec<TransactionPathState>) {
    let mut builders: BTreeMap<(PartitionId, String), GraphBuilder> = BTreeMap::new();
    let mut paths = Vec::with_capacity(workload.len());
    for txn in &workload.transactions {
        let base = HashPartitionEstimator
            .base_partition(catalog, txn)
            .expect("fixture base partition");
        let aborted = txn.procedure == "neworder" && txn.txn_id.get() % 100 == 7;
        let builder = builders
            .entry((base, txn.procedure.clone()))
            .or_default();
        let actual = trace_path(builder, catalog, txn, base, false, aborted);
        let estimated = trace_path(builder, catalog, txn, base, true, false);
        builder.observe(&actual);
        paths.push(TransactionPathState::new(
            txn.txn_id,
            txn.procedure.clone(),
            base,
            estimated,
            actual,
        ));
    }

    let mut graphs = MarkovGraphsContainer::new();
    for builder in builders.into_values() {
        if let Some(graph) = builder.finish() {
            graphs.insert(graph);
        }
    }
    (graphs, paths)
}

/// All states whose estimated and actual paths differ in vertices.
pub fn divergent_states(states: &[TransactionPathState]) -> Vec<&TransactionPathState> {
    states
        .iter()
        .filter(|s| s.estimated_path() != s.actual_path())
        .collect()
}
