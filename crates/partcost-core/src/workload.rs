//! Materialized transaction traces.
//!
//! Trace parsing and filtering happen upstream; the estimator walks
//! `Workload::transactions` in order.

use serde::{Deserialize, Serialize};

use crate::hash::{Fingerprint, Hash256};
use crate::id::TxnId;

/// One executed query inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTrace {
    /// Statement name, unqualified (resolved against the invoking procedure).
    pub statement: String,
    /// Partitioning-column values the query touched. Empty means the query
    /// carried no routing key and must be broadcast.
    #[serde(default)]
    pub keys: Vec<i64>,
}

impl QueryTrace {
    pub fn new(statement: impl Into<String>, keys: Vec<i64>) -> Self {
        Self {
            statement: statement.into(),
            keys,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTrace {
    pub txn_id: TxnId,
    pub procedure: String,
    #[serde(default)]
    pub params: Vec<i64>,
    #[serde(default)]
    pub queries: Vec<QueryTrace>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub transactions: Vec<TransactionTrace>,
}

impl Workload {
    pub fn new(transactions: Vec<TransactionTrace>) -> Self {
        Self { transactions }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Ordered digest of every trace: ids, procedures, params and each
    /// query's statement and keys. Two workloads with the same fingerprint
    /// are treated as the same workload by cost caches.
    pub fn fingerprint(&self) -> Hash256 {
        let mut fp = Fingerprint::new();
        fp.update_u64(self.transactions.len() as u64);
        for txn in &self.transactions {
            fp.update_u64(txn.txn_id.get()).update_str(&txn.procedure);
            update_keys(&mut fp, &txn.params);
            fp.update_u64(txn.queries.len() as u64);
            for query in &txn.queries {
                fp.update_str(&query.statement);
                update_keys(&mut fp, &query.keys);
            }
        }
        fp.finish()
    }

    /// Keep only transactions matching `pred`, preserving order.
    pub fn filtered(&self, mut pred: impl FnMut(&TransactionTrace) -> bool) -> Workload {
        Workload {
            transactions: self
                .transactions
                .iter()
                .filter(|t| pred(t))
                .cloned()
                .collect(),
        }
    }
}

/// Count-prefixed so adjacent lists cannot shift values between them.
fn update_keys(fp: &mut Fingerprint, keys: &[i64]) {
    fp.update_u64(keys.len() as u64);
    for k in keys {
        fp.update_u64(*k as u64);
    }
}
