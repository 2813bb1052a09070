//! Weighted shortest path: a textbook lazy-deletion Dijkstra —
//! stale heap entries (a node popped after a cheaper distance was already
//! recorded for it) are discarded rather than removed from the heap
//! in-place, since a binary heap has no efficient decrease-key.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::time::Duration;

use kg_model::{EdgeInfo, TupleElement};
use kg_store::Transaction;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::AlgoError;
use crate::result::{Completeness, Telemetry};
use crate::view::GraphView;

/// Extracts an edge weight. Negative weights are not rejected here — the
/// caller is expected to precondition against them; the
/// traversal itself just skips any edge that resolves to one.
pub trait WeightExtractor {
    /// The weight of traversing `edge`.
    fn weight(&self, edge: &EdgeInfo) -> Result<f64, AlgoError>;
}

impl<F> WeightExtractor for F
where
    F: Fn(&EdgeInfo) -> Result<f64, AlgoError>,
{
    fn weight(&self, edge: &EdgeInfo) -> Result<f64, AlgoError> {
        self(edge)
    }
}

/// Bounds on a weighted traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraLimits {
    /// Stop expanding past this accumulated weight.
    pub max_weight: Option<f64>,
    /// Maximum number of distinct nodes to visit.
    pub max_nodes: Option<usize>,
}

/// A min-heap entry ordered by accumulated distance, smallest first.
struct HeapEntry {
    distance: f64,
    node: TupleElement,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.distance.partial_cmp(&self.distance).unwrap_or(CmpOrdering::Equal)
    }
}

/// Single-target weighted shortest path.
#[derive(Debug, Clone)]
pub struct WeightedPathResult {
    /// Path and its total weight, or `None` if unreachable within bounds.
    pub path: Option<(Vec<TupleElement>, f64)>,
    /// Distinct nodes settled (popped with their final distance).
    pub nodes_explored: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Whether the search ran to completion.
    pub completeness: Completeness,
}

/// All single-source distances from `from`, reachable within the bounds.
#[derive(Debug, Clone)]
pub struct SingleSourceResult {
    /// Shortest distance to each reached node.
    pub distances: FxHashMap<TupleElement, f64>,
    /// Distinct nodes settled.
    pub nodes_explored: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Whether the search ran to completion.
    pub completeness: Completeness,
}

/// `Ok(None)` means the edge is skipped (negative weight, not an error);
/// `Err` only for a weight with no well-defined order at all.
fn validate_weight(w: f64) -> Result<Option<f64>, AlgoError> {
    if w.is_nan() || w.is_infinite() {
        return Err(AlgoError::NonFiniteWeight(w));
    }
    if w < 0.0 {
        return Ok(None);
    }
    Ok(Some(w))
}

/// Weighted shortest path from `from` to `to`.
pub fn shortest_path<T: Transaction, W: WeightExtractor>(
    view: &GraphView<'_, T>,
    from: &TupleElement,
    to: &TupleElement,
    label: Option<&TupleElement>,
    weight: &W,
    limits: DijkstraLimits,
) -> Result<WeightedPathResult, AlgoError> {
    let mut telemetry = Telemetry::start();
    let mut distance: FxHashMap<TupleElement, f64> = FxHashMap::default();
    let mut predecessor: FxHashMap<TupleElement, TupleElement> = FxHashMap::default();
    let mut settled: FxHashSet<TupleElement> = FxHashSet::default();
    let mut heap = BinaryHeap::new();

    distance.insert(from.clone(), 0.0);
    heap.push(HeapEntry { distance: 0.0, node: from.clone() });

    while let Some(HeapEntry { distance: d, node }) = heap.pop() {
        if settled.contains(&node) {
            continue; // stale entry: a cheaper distance was already settled
        }
        if distance.get(&node).copied().unwrap_or(f64::INFINITY) < d {
            continue;
        }
        settled.insert(node.clone());
        telemetry.visit();

        if node == *to {
            return Ok(WeightedPathResult {
                path: Some((reconstruct(&predecessor, from, to), d)),
                nodes_explored: telemetry.nodes_explored(),
                duration: telemetry.elapsed(),
                completeness: Completeness::Complete,
            });
        }
        if let Some(max_nodes) = limits.max_nodes {
            if telemetry.nodes_explored() >= max_nodes {
                return Ok(WeightedPathResult {
                    path: None,
                    nodes_explored: telemetry.nodes_explored(),
                    duration: telemetry.elapsed(),
                    completeness: Completeness::BoundReached,
                });
            }
        }

        for edge in view.outgoing(&node, label) {
            let Some(w) = validate_weight(weight.weight(&edge)?)? else {
                continue; // negative weight: skip, per spec
            };
            let candidate = d + w;
            if let Some(max_weight) = limits.max_weight {
                if candidate > max_weight {
                    continue;
                }
            }
            if candidate < distance.get(&edge.target).copied().unwrap_or(f64::INFINITY) {
                distance.insert(edge.target.clone(), candidate);
                predecessor.insert(edge.target.clone(), node.clone());
                heap.push(HeapEntry { distance: candidate, node: edge.target });
            }
        }
    }

    Ok(WeightedPathResult {
        path: None,
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: Completeness::Complete,
    })
}

/// Every reachable node's shortest distance from `from` — Dijkstra run to
/// exhaustion (or until a bound stops it) instead of stopping at one target.
pub fn single_source<T: Transaction, W: WeightExtractor>(
    view: &GraphView<'_, T>,
    from: &TupleElement,
    label: Option<&TupleElement>,
    weight: &W,
    limits: DijkstraLimits,
) -> Result<SingleSourceResult, AlgoError> {
    let mut telemetry = Telemetry::start();
    let mut distance: FxHashMap<TupleElement, f64> = FxHashMap::default();
    let mut settled: FxHashSet<TupleElement> = FxHashSet::default();
    let mut heap = BinaryHeap::new();

    distance.insert(from.clone(), 0.0);
    heap.push(HeapEntry { distance: 0.0, node: from.clone() });

    while let Some(HeapEntry { distance: d, node }) = heap.pop() {
        if settled.contains(&node) {
            continue;
        }
        if distance.get(&node).copied().unwrap_or(f64::INFINITY) < d {
            continue;
        }
        settled.insert(node.clone());
        telemetry.visit();

        if let Some(max_nodes) = limits.max_nodes {
            if telemetry.nodes_explored() >= max_nodes {
                return Ok(SingleSourceResult {
                    distances: distance,
                    nodes_explored: telemetry.nodes_explored(),
                    duration: telemetry.elapsed(),
                    completeness: Completeness::BoundReached,
                });
            }
        }

        for edge in view.outgoing(&node, label) {
            let Some(w) = validate_weight(weight.weight(&edge)?)? else {
                continue; // negative weight: skip, per spec
            };
            let candidate = d + w;
            if let Some(max_weight) = limits.max_weight {
                if candidate > max_weight {
                    continue;
                }
            }
            if candidate < distance.get(&edge.target).copied().unwrap_or(f64::INFINITY) {
                distance.insert(edge.target.clone(), candidate);
                heap.push(HeapEntry { distance: candidate, node: edge.target });
            }
        }
    }

    Ok(SingleSourceResult {
        distances: distance,
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: Completeness::Complete,
    })
}

fn reconstruct(predecessor: &FxHashMap<TupleElement, TupleElement>, from: &TupleElement, to: &TupleElement) -> Vec<TupleElement> {
    let mut path = vec![to.clone()];
    let mut current = to.clone();
    while current != *from {
        let prev = predecessor.get(&current).expect("every settled node but the source has a predecessor");
        path.push(prev.clone());
        current = prev.clone();
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_model::GraphTriple;
    use kg_store::{EdgeScanner, GraphIndexMaintainer, IndexStrategy, InMemoryStore, KvStore, Subspace, TransactionConfig};

    struct UnitWeight;
    impl WeightExtractor for UnitWeight {
        fn weight(&self, _edge: &EdgeInfo) -> Result<f64, AlgoError> {
            Ok(1.0)
        }
    }

    fn weight_by_label(edge: &EdgeInfo) -> Result<f64, AlgoError> {
        match &edge.edge_label {
            kg_model::TupleElement::Str(s) if s == "cheap" => Ok(1.0),
            kg_model::TupleElement::Str(s) if s == "expensive" => Ok(10.0),
            _ => Ok(1.0),
        }
    }

    fn diamond() -> (InMemoryStore, Subspace) {
        let store = InMemoryStore::new();
        let root = Subspace::new(vec![0x22]);
        let maintainer = GraphIndexMaintainer::new(root.clone(), IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                maintainer.update_index(txn, &GraphTriple::new("a", "expensive", "b"))?;
                maintainer.update_index(txn, &GraphTriple::new("a", "cheap", "c"))?;
                maintainer.update_index(txn, &GraphTriple::new("b", "cheap", "d"))?;
                maintainer.update_index(txn, &GraphTriple::new("c", "cheap", "d"))?;
                Ok(())
            })
            .unwrap();
        (store, root)
    }

    #[test]
    fn prefers_the_lower_weight_route() {
        let (store, root) = diamond();
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = shortest_path(
                    &view,
                    &TupleElement::from("a"),
                    &TupleElement::from("d"),
                    None,
                    &weight_by_label,
                    DijkstraLimits::default(),
                )
                .unwrap();
                let (path, total) = result.path.unwrap();
                assert_eq!(path, vec![TupleElement::from("a"), TupleElement::from("c"), TupleElement::from("d")]);
                assert_eq!(total, 2.0);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn negative_weight_edges_are_skipped_not_rejected() {
        let (store, root) = diamond();
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = shortest_path(
                    &view,
                    &TupleElement::from("a"),
                    &TupleElement::from("d"),
                    None,
                    &(|_edge: &EdgeInfo| Ok(-1.0)),
                    DijkstraLimits::default(),
                )
                .unwrap();
                // Every edge out of `a` resolves negative, so no path is ever relaxed.
                assert!(result.path.is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn non_finite_weight_is_rejected() {
        let (store, root) = diamond();
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = shortest_path(
                    &view,
                    &TupleElement::from("a"),
                    &TupleElement::from("d"),
                    None,
                    &(|_edge: &EdgeInfo| Ok(f64::NAN)),
                    DijkstraLimits::default(),
                );
                assert!(matches!(result, Err(AlgoError::NonFiniteWeight(_))));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn single_source_reaches_every_node() {
        let (store, root) = diamond();
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = single_source(&view, &TupleElement::from("a"), None, &UnitWeight, DijkstraLimits::default()).unwrap();
                assert_eq!(result.distances.len(), 4);
                Ok(())
            })
            .unwrap();
    }
}
