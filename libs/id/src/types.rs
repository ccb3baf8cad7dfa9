//! ID definitions for cluster records.

use crate::define_id;

// =============================================================================
// Cluster Records
// =============================================================================

define_id!(EvalId, "eval");
define_id!(AllocId, "alloc");
define_id!(NodeId, "node");

// =============================================================================
// Log Index
// =============================================================================

/// Log index stamped on a record at its last write.
///
/// Indexes are assigned monotonically by the write path, so comparing two
/// of them orders the writes that produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Index(u64);

impl Index {
    /// Index before any write has been applied.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns the index of the following write.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Index {
    fn from(index: u64) -> Self {
        Self(index)
    }
}

impl From<Index> for u64 {
    fn from(index: Index) -> Self {
        index.0
    }
}

impl serde::Serialize for Index {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Index {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Self)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_eval_id_prefix() {
        let id = EvalId::new();
        assert!(id.to_string().starts_with("eval_"));
    }

    #[test]
    fn test_alloc_id_rejects_node_prefix() {
        let node = NodeId::new().to_string();
        let err = node.parse::<AllocId>().unwrap_err();
        assert!(err.is_prefix_error());
        assert_eq!(
            err,
            crate::IdError::InvalidPrefix {
                expected: "alloc",
                actual: "node".to_string(),
            }
        );
    }

    #[test]
    fn test_node_id_missing_separator() {
        let result: Result<NodeId, _> = "node01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert!(matches!(
            result.unwrap_err(),
            crate::IdError::MissingSeparator
        ));
    }

    #[test]
    fn test_eval_id_empty() {
        let result: Result<EvalId, _> = "".parse();
        assert!(matches!(result.unwrap_err(), crate::IdError::Empty));
    }

    #[test]
    fn test_eval_id_invalid_ulid() {
        let result: Result<EvalId, _> = "eval_not-a-ulid".parse();
        assert!(matches!(result.unwrap_err(), crate::IdError::InvalidUlid(_)));
    }

    #[test]
    fn test_node_id_serializes_as_string() {
        let id = NodeId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn test_index_ordering_follows_writes() {
        let first = Index::ZERO.next();
        let second = first.next();
        assert!(first < second);
        assert_eq!(second.value(), 2);
        assert_eq!(serde_json::to_string(&second).unwrap(), "2");
    }

    #[test]
    fn test_id_prefixes_unique() {
        let prefixes = [EvalId::PREFIX, AllocId::PREFIX, NodeId::PREFIX];
        let unique: std::collections::HashSet<_> = prefixes.iter().collect();
        assert_eq!(prefixes.len(), unique.len());
    }

    proptest! {
        #[test]
        fn prop_eval_id_parses_its_own_display(raw in any::<u128>()) {
            let id = EvalId::from_ulid(crate::Ulid::from(raw));
            let parsed: EvalId = id.to_string().parse().unwrap();
            prop_assert_eq!(id, parsed);
        }
    }
}
