//! Lazy, strategy-aware scans over the edge index.
//!
//! Every scan picks the storage ordering that turns the requested bound
//! shape into a single contiguous key range (`IndexStrategy::select_ordering`),
//! reads that range through the external [`Transaction::get_range`], and
//! decodes pairs into [`EdgeInfo`] as the returned iterator is pulled —
//! nothing is materialized ahead of need. When the chosen ordering's prefix
//! doesn't cover every bound position (the adjacency fallbacks documented on
//! `select_ordering`), the extra positions are filtered in memory as each
//! row is decoded.

use kg_model::{EdgeInfo, GraphTriple, TupleElement};

use crate::codec::Subspace;
use crate::kv::{KeySelector, Transaction};
use crate::strategy::{IndexStrategy, Ordering, Role};

/// Reads edges out of one strategy's set of index orderings.
pub struct EdgeScanner {
    strategy: IndexStrategy,
    subspaces: Vec<(Ordering, Subspace)>,
}

impl EdgeScanner {
    /// Build a scanner over `root`, deriving one child subspace per ordering
    /// the strategy maintains.
    pub fn new(root: &Subspace, strategy: IndexStrategy) -> Self {
        let subspaces = strategy
            .orderings()
            .iter()
            .map(|&ordering| (ordering, root.child(ordering.child_index())))
            .collect();
        Self { strategy, subspaces }
    }

    /// The strategy this scanner reads.
    pub fn strategy(&self) -> IndexStrategy {
        self.strategy
    }

    fn subspace(&self, ordering: Ordering) -> &Subspace {
        &self
            .subspaces
            .iter()
            .find(|(o, _)| *o == ordering)
            .expect("select_ordering only returns orderings the strategy maintains")
            .1
    }

    /// Every edge in the index, optionally filtered to a single label.
    pub fn scan_all_edges<'a, T: Transaction>(
        &'a self,
        txn: &'a T,
        label: Option<&TupleElement>,
    ) -> Box<dyn Iterator<Item = EdgeInfo> + 'a> {
        self.scan(txn, None, label, None)
    }

    /// Edges leaving `from`, optionally filtered to a single label.
    pub fn scan_outgoing<'a, T: Transaction>(
        &'a self,
        txn: &'a T,
        from: &TupleElement,
        label: Option<&TupleElement>,
    ) -> Box<dyn Iterator<Item = EdgeInfo> + 'a> {
        self.scan(txn, Some(from), label, None)
    }

    /// Edges arriving at `to`, optionally filtered to a single label.
    pub fn scan_incoming<'a, T: Transaction>(
        &'a self,
        txn: &'a T,
        to: &TupleElement,
        label: Option<&TupleElement>,
    ) -> Box<dyn Iterator<Item = EdgeInfo> + 'a> {
        self.scan(txn, None, label, Some(to))
    }

    /// Outgoing edges for each of `froms`, concatenated in order — spec's
    /// `batchScanOutgoing`.
    pub fn batch_scan_outgoing<'a, T: Transaction>(
        &'a self,
        txn: &'a T,
        froms: &'a [TupleElement],
        label: Option<&'a TupleElement>,
    ) -> Box<dyn Iterator<Item = EdgeInfo> + 'a> {
        Box::new(froms.iter().flat_map(move |from| self.scan_outgoing(txn, from, label)))
    }

    /// Incoming edges for each of `tos`, concatenated in order — spec's
    /// `batchScanIncoming`.
    pub fn batch_scan_incoming<'a, T: Transaction>(
        &'a self,
        txn: &'a T,
        tos: &'a [TupleElement],
        label: Option<&'a TupleElement>,
    ) -> Box<dyn Iterator<Item = EdgeInfo> + 'a> {
        Box::new(tos.iter().flat_map(move |to| self.scan_incoming(txn, to, label)))
    }

    fn scan<'a, T: Transaction>(
        &'a self,
        txn: &'a T,
        from: Option<&TupleElement>,
        edge: Option<&TupleElement>,
        to: Option<&TupleElement>,
    ) -> Box<dyn Iterator<Item = EdgeInfo> + 'a> {
        let ordering = self
            .strategy
            .select_ordering(from.is_some(), edge.is_some(), to.is_some());
        let subspace = self.subspace(ordering).clone();

        let mut prefix = Vec::with_capacity(3);
        for role in ordering.roles() {
            let bound = match role {
                Role::From => from,
                Role::Edge => edge,
                Role::To => to,
            };
            match bound {
                Some(v) => prefix.push(v.clone()),
                None => break,
            }
        }

        let (begin, end) = subspace.range_for_prefix(&prefix);
        let rows = txn.get_range(
            &KeySelector::FirstGreaterOrEqual(begin),
            &KeySelector::FirstGreaterOrEqual(end),
            true,
        );

        let from = from.cloned();
        let edge = edge.cloned();
        let to = to.cloned();
        Box::new(rows.filter_map(move |(key, _value)| {
            let components = subspace.unpack(&key).ok()?;
            let (f, e, t) = ordering.unpermute(&components)?;
            if matches!(&from, Some(want) if want != &f) {
                return None;
            }
            if matches!(&edge, Some(want) if want != &e) {
                return None;
            }
            if matches!(&to, Some(want) if want != &t) {
                return None;
            }
            let graph = components.get(3).cloned();
            let triple = match graph {
                Some(g) => GraphTriple::with_graph(f, e, t, g),
                None => GraphTriple::new(f, e, t),
            };
            Some(EdgeInfo::from_triple(triple))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{InMemoryStore, KvStore, TransactionConfig};
    use crate::maintainer::{GraphIndexMaintainer, IndexError};

    fn seeded_store(strategy: IndexStrategy) -> (InMemoryStore, Subspace) {
        let store = InMemoryStore::new();
        let root = Subspace::new(vec![0x10]);
        let maintainer = GraphIndexMaintainer::new(root.clone(), strategy);
        store
            .with_transaction::<_, (), IndexError>(TransactionConfig::default_config(), |txn| {
                maintainer.update_index(txn, &GraphTriple::new("a", "knows", "b"))?;
                maintainer.update_index(txn, &GraphTriple::new("a", "knows", "c"))?;
                maintainer.update_index(txn, &GraphTriple::new("b", "likes", "c"))?;
                Ok(())
            })
            .unwrap();
        (store, root)
    }

    #[test]
    fn scan_outgoing_filters_by_label_and_source() {
        let (store, root) = seeded_store(IndexStrategy::Hexastore);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Hexastore);
        store
            .with_transaction::<_, (), IndexError>(TransactionConfig::default_config(), |txn| {
                let edges: Vec<_> = scanner
                    .scan_outgoing(txn, &TupleElement::from("a"), Some(&TupleElement::from("knows")))
                    .collect();
                assert_eq!(edges.len(), 2);
                assert!(edges.iter().all(|e| e.source == TupleElement::from("a")));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn scan_all_edges_without_label_sees_everything() {
        let (store, root) = seeded_store(IndexStrategy::TripleStore);
        let scanner = EdgeScanner::new(&root, IndexStrategy::TripleStore);
        store
            .with_transaction::<_, (), IndexError>(TransactionConfig::default_config(), |txn| {
                let edges: Vec<_> = scanner.scan_all_edges(txn, None).collect();
                assert_eq!(edges.len(), 3);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn batch_scan_incoming_concatenates_per_target() {
        let (store, root) = seeded_store(IndexStrategy::Adjacency);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        let targets = vec![TupleElement::from("b"), TupleElement::from("c")];
        store
            .with_transaction::<_, (), IndexError>(TransactionConfig::default_config(), |txn| {
                let edges: Vec<_> = scanner.batch_scan_incoming(txn, &targets, None).collect();
                assert_eq!(edges.len(), 3);
                Ok(())
            })
            .unwrap();
    }
}
