//! In-memory catalog snapshot: tables, stored procedures and their statements,
//! plus the partitioning design under evaluation.
//!
//! The catalog loader owns and builds this; the cost subsystem only reads it
//! and uses [`CatalogKey`] as the stable identity of each entity.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::{Fingerprint, Hash256};
use crate::id::PartitionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Table,
    Procedure,
    Statement,
}

/// Stable identity of a catalog entity. Statement names are qualified as
/// `procedure.statement`. Serializes as the `kind:name` string so it can key
/// JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogKey {
    pub kind: EntityKind,
    pub name: String,
}

impl CatalogKey {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Table,
            name: name.into(),
        }
    }

    pub fn procedure(name: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Procedure,
            name: name.into(),
        }
    }

    pub fn statement(procedure: &str, statement: &str) -> Self {
        Self {
            kind: EntityKind::Statement,
            name: format!("{procedure}.{statement}"),
        }
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EntityKind::Table => "table",
            EntityKind::Procedure => "procedure",
            EntityKind::Statement => "statement",
        };
        write!(f, "{kind}:{}", self.name)
    }
}

impl std::str::FromStr for CatalogKey {
    type Err = String;

    /// Parses the `kind:name` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| format!("expected 'kind:name', got '{s}'"))?;
        let kind = match kind {
            "table" => EntityKind::Table,
            "procedure" => EntityKind::Procedure,
            "statement" => EntityKind::Statement,
            other => return Err(format!("unknown entity kind '{other}'")),
        };
        if name.is_empty() {
            return Err("empty entity name".to_string());
        }
        Ok(Self {
            kind,
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for CatalogKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CatalogKey> for String {
    fn from(key: CatalogKey) -> Self {
        key.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// Column whose values route rows to partitions. `None` together with
    /// `replicated == false` means rows can live anywhere.
    #[serde(default)]
    pub partition_column: Option<String>,
    /// Replicated tables keep a full copy on every partition.
    #[serde(default)]
    pub replicated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub name: String,
    #[serde(default)]
    pub tables_read: Vec<String>,
    #[serde(default)]
    pub tables_written: Vec<String>,
}

impl Statement {
    pub fn is_read_only(&self) -> bool {
        self.tables_written.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub name: String,
    /// Index of the invocation parameter that selects the base partition.
    #[serde(default)]
    pub partition_param: Option<usize>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl Procedure {
    pub fn statement(&self, name: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub num_partitions: u32,
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub procedures: BTreeMap<String, Procedure>,
}

impl Catalog {
    pub fn new(num_partitions: u32) -> Self {
        Self {
            num_partitions,
            tables: BTreeMap::new(),
            procedures: BTreeMap::new(),
        }
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn add_procedure(&mut self, proc_: Procedure) {
        self.procedures.insert(proc_.name.clone(), proc_);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name)
    }

    pub fn statement(&self, procedure: &str, statement: &str) -> Option<&Statement> {
        self.procedure(procedure)?.statement(statement)
    }

    /// Every table, procedure and statement key, in deterministic order.
    pub fn entity_keys(&self) -> Vec<CatalogKey> {
        let mut keys: Vec<CatalogKey> = self.tables.keys().map(CatalogKey::table).collect();
        for (name, proc_) in &self.procedures {
            keys.push(CatalogKey::procedure(name.as_str()));
            for stmt in &proc_.statements {
                keys.push(CatalogKey::statement(name, &stmt.name));
            }
        }
        keys
    }

    pub fn contains(&self, key: &CatalogKey) -> bool {
        match key.kind {
            EntityKind::Table => self.tables.contains_key(&key.name),
            EntityKind::Procedure => self.procedures.contains_key(&key.name),
            EntityKind::Statement => key
                .name
                .split_once('.')
                .is_some_and(|(p, s)| self.statement(p, s).is_some()),
        }
    }

    pub fn all_partitions(&self) -> impl Iterator<Item = PartitionId> {
        (0..self.num_partitions).map(PartitionId::new)
    }

    /// Flip a table between replicated and partitioned. Returns `false` if
    /// the table does not exist.
    pub fn set_replicated(&mut self, table: &str, replicated: bool) -> bool {
        match self.tables.get_mut(table) {
            Some(t) => {
                t.replicated = replicated;
                true
            }
            None => false,
        }
    }

    pub fn set_partition_column(&mut self, table: &str, column: Option<String>) -> bool {
        match self.tables.get_mut(table) {
            Some(t) => {
                t.partition_column = column;
                true
            }
            None => false,
        }
    }

    /// Identity of the partition layout only. Design mutations (replication,
    /// partition columns) leave it unchanged; changing the partition count
    /// does not.
    pub fn fingerprint(&self) -> Hash256 {
        Fingerprint::new()
            .update_u64(u64::from(self.num_partitions))
            .finish()
    }
}
