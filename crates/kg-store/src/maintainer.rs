//! Keeps a strategy's redundant key orderings consistent under writes.
//!
//! Every ordering a strategy maintains is a full copy of the same edge under
//! a different key permutation — there is no single "source of truth"
//! ordering the others derive from at read time, so an insert or removal
//! must touch every ordering in the same transaction.

use kg_model::{GraphTriple, TupleElement};
use thiserror::Error;

use crate::codec::Subspace;
use crate::kv::{KvError, Transaction};
use crate::strategy::IndexStrategy;

/// Errors raised maintaining an index entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    /// A triple position held a tuple element the declared field doesn't
    /// permit — distinct from a `Nil`/absent field, which
    /// is sparse-index territory and never an error.
    #[error("field '{field}' holds a value not permitted for this index strategy")]
    InvalidFieldType {
        /// Name of the offending field (`"from"`, `"edge"`, or `"to"`).
        field: &'static str,
    },
    /// The underlying store rejected a write (e.g. a key over the size
    /// limit).
    #[error(transparent)]
    Kv(#[from] KvError),
}

/// Maintains every ordering one [`IndexStrategy`] keeps for a graph index,
/// rooted at a single subspace.
pub struct GraphIndexMaintainer {
    root: Subspace,
    strategy: IndexStrategy,
}

impl GraphIndexMaintainer {
    /// A maintainer writing orderings for `strategy` under `root`.
    pub fn new(root: Subspace, strategy: IndexStrategy) -> Self {
        Self { root, strategy }
    }

    /// The strategy this maintainer writes.
    pub fn strategy(&self) -> IndexStrategy {
        self.strategy
    }

    /// The subspace a single ordering is stored under.
    pub fn ordering_subspace(&self, ordering: crate::strategy::Ordering) -> Subspace {
        self.root.child(ordering.child_index())
    }

    /// `None` means the edge component is absent and the strategy requires
    /// one — sparse index, caller emits no keys rather than treating it as
    /// an error.
    fn normalized_edge(&self, triple: &GraphTriple) -> Option<TupleElement> {
        if !triple.edge.is_nil() {
            return Some(triple.edge.clone());
        }
        if self.strategy.has_edge_component() {
            return None;
        }
        Some(TupleElement::from(""))
    }

    /// Every key this triple occupies under the strategy's orderings — one
    /// key per ordering, each a full-fidelity copy of the edge. Sparse
    /// indexing: if `from`/`to` is absent, or `edge` is
    /// absent under a strategy that requires one, no keys are produced —
    /// this is silent, not an error; `InvalidFieldType` is reserved for a
    /// component holding a value of a type the index can't pack at all.
    pub fn compute_index_keys(&self, triple: &GraphTriple) -> Result<Vec<Vec<u8>>, IndexError> {
        if triple.from.is_nil() || triple.to.is_nil() {
            return Ok(Vec::new());
        }
        let Some(edge) = self.normalized_edge(triple) else {
            return Ok(Vec::new());
        };

        let mut keys = Vec::with_capacity(self.strategy.orderings().len());
        for &ordering in self.strategy.orderings() {
            let mut components = ordering.permute(&triple.from, &edge, &triple.to);
            if let Some(graph) = &triple.graph {
                components.push(graph.clone());
            }
            keys.push(self.ordering_subspace(ordering).pack(&components));
        }
        Ok(keys)
    }

    /// Write every ordering's key for `triple` inside `txn`.
    pub fn update_index<T: Transaction>(&self, txn: &mut T, triple: &GraphTriple) -> Result<(), IndexError> {
        for key in self.compute_index_keys(triple)? {
            txn.set_value(&key, &[])?;
        }
        Ok(())
    }

    /// Remove every ordering's key for `triple` inside `txn`. Idempotent:
    /// clearing an absent key is not an error.
    pub fn remove_index<T: Transaction>(&self, txn: &mut T, triple: &GraphTriple) -> Result<(), IndexError> {
        for key in self.compute_index_keys(triple)? {
            txn.clear(&key)?;
        }
        Ok(())
    }

    /// Decode a key stored under a given ordering back into the triple it
    /// represents — used to sanity-check a stored entry or surface it for
    /// inspection (spec's `scanItem`).
    pub fn scan_item(
        &self,
        ordering: crate::strategy::Ordering,
        key: &[u8],
    ) -> Result<GraphTriple, crate::codec::CodecError> {
        let components = self.ordering_subspace(ordering).unpack(key)?;
        let (from, edge, to) = ordering
            .unpermute(&components)
            .ok_or(crate::codec::CodecError::MalformedTuple("key too short for its ordering"))?;
        Ok(match components.get(3) {
            Some(graph) => GraphTriple::with_graph(from, edge, to, graph.clone()),
            None => GraphTriple::new(from, edge, to),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{InMemoryStore, KvStore, TransactionConfig};
    use crate::strategy::Ordering;

    #[test]
    fn update_index_writes_one_key_per_ordering() {
        let store = InMemoryStore::new();
        let maintainer = GraphIndexMaintainer::new(Subspace::new(vec![1]), IndexStrategy::Hexastore);
        store
            .with_transaction::<_, (), IndexError>(TransactionConfig::default_config(), |txn| {
                maintainer.update_index(txn, &GraphTriple::new("a", "knows", "b"))
            })
            .unwrap();
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn remove_index_clears_every_ordering() {
        let store = InMemoryStore::new();
        let maintainer = GraphIndexMaintainer::new(Subspace::new(vec![1]), IndexStrategy::TripleStore);
        let triple = GraphTriple::new("a", "knows", "b");
        store
            .with_transaction::<_, (), IndexError>(TransactionConfig::default_config(), |txn| {
                maintainer.update_index(txn, &triple)
            })
            .unwrap();
        assert_eq!(store.len(), 3);
        store
            .with_transaction::<_, (), IndexError>(TransactionConfig::default_config(), |txn| {
                maintainer.remove_index(txn, &triple)
            })
            .unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn nil_from_or_to_yields_no_keys() {
        let maintainer = GraphIndexMaintainer::new(Subspace::new(vec![1]), IndexStrategy::Hexastore);
        let result = maintainer.compute_index_keys(&GraphTriple::new(TupleElement::Nil, "knows", "b"));
        assert_eq!(result, Ok(Vec::new()));
    }

    #[test]
    fn nil_edge_yields_no_keys_under_triple_store_but_is_allowed_under_adjacency() {
        let hexa = GraphIndexMaintainer::new(Subspace::new(vec![1]), IndexStrategy::Hexastore);
        assert_eq!(
            hexa.compute_index_keys(&GraphTriple::new("a", TupleElement::Nil, "b")),
            Ok(Vec::new())
        );

        let adjacency = GraphIndexMaintainer::new(Subspace::new(vec![1]), IndexStrategy::Adjacency);
        let keys = adjacency
            .compute_index_keys(&GraphTriple::new("a", TupleElement::Nil, "b"))
            .unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn scan_item_recovers_the_original_triple() {
        let maintainer = GraphIndexMaintainer::new(Subspace::new(vec![1]), IndexStrategy::Hexastore);
        let triple = GraphTriple::with_graph("a", "knows", "b", "g1");
        let keys = maintainer.compute_index_keys(&triple).unwrap();
        let spo_key = &keys[IndexStrategy::Hexastore
            .orderings()
            .iter()
            .position(|o| *o == Ordering::Spo)
            .unwrap()];
        let recovered = maintainer.scan_item(Ordering::Spo, spo_key).unwrap();
        assert_eq!(recovered, triple);
    }

    #[test]
    fn key_over_store_limit_surfaces_kv_error() {
        let store = InMemoryStore::with_max_key_size(4);
        let maintainer = GraphIndexMaintainer::new(Subspace::new(vec![1]), IndexStrategy::Adjacency);
        let result = store.with_transaction::<_, (), IndexError>(TransactionConfig::default_config(), |txn| {
            maintainer.update_index(txn, &GraphTriple::new("a-long-subject", "knows", "b"))
        });
        assert!(matches!(result, Err(IndexError::Kv(KvError::KeyTooLarge { .. }))));
    }
}
