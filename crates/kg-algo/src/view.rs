//! A read-only handle onto one scan of the edge index, shared by every
//! algorithm in this crate.

use kg_model::{EdgeInfo, TupleElement};
use kg_store::{EdgeScanner, Transaction};

/// Pairs an [`EdgeScanner`] with the transaction it reads through, so
/// algorithms don't have to thread both arguments separately.
pub struct GraphView<'a, T: Transaction> {
    scanner: &'a EdgeScanner,
    txn: &'a T,
}

impl<'a, T: Transaction> GraphView<'a, T> {
    /// Build a view over `scanner` reading inside `txn`.
    pub fn new(scanner: &'a EdgeScanner, txn: &'a T) -> Self {
        Self { scanner, txn }
    }

    /// Edges leaving `node`, optionally restricted to one label.
    pub fn outgoing(&self, node: &TupleElement, label: Option<&TupleElement>) -> Vec<EdgeInfo> {
        self.scanner.scan_outgoing(self.txn, node, label).collect()
    }

    /// Edges arriving at `node`, optionally restricted to one label.
    pub fn incoming(&self, node: &TupleElement, label: Option<&TupleElement>) -> Vec<EdgeInfo> {
        self.scanner.scan_incoming(self.txn, node, label).collect()
    }

    /// Every edge in the index, optionally restricted to one label.
    pub fn all_edges(&self, label: Option<&TupleElement>) -> Vec<EdgeInfo> {
        self.scanner.scan_all_edges(self.txn, label).collect()
    }

    /// Edges leaving any of `nodes`, concatenated — used to expand a whole
    /// BFS layer in one batch rather than one scan per node.
    pub fn outgoing_batch(&self, nodes: &[TupleElement], label: Option<&TupleElement>) -> Vec<EdgeInfo> {
        self.scanner.batch_scan_outgoing(self.txn, nodes, label).collect()
    }

    /// Edges arriving at any of `nodes`, concatenated.
    pub fn incoming_batch(&self, nodes: &[TupleElement], label: Option<&TupleElement>) -> Vec<EdgeInfo> {
        self.scanner.batch_scan_incoming(self.txn, nodes, label).collect()
    }
}
