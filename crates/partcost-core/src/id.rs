//! Strongly-typed identifiers used across the cost subsystem.
//!
//! Downstream crates should *not* pass raw integers around for partitions,
//! transactions, or graph vertices.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident, $repr:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            pub const fn new(v: $repr) -> Self {
                Self(v)
            }
            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(PartitionId, u32);
new_id!(TxnId, u64);
new_id!(VertexId, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_id_kind() {
        assert_eq!(PartitionId::new(3).to_string(), "PartitionId(3)");
        assert_eq!(TxnId::new(42).get(), 42);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&VertexId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
