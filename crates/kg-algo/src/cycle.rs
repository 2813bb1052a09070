//! Cycle detection: iterative three-color DFS over the
//! outgoing-edge relation. White nodes are unvisited, gray nodes are on the
//! current DFS stack (an ancestor of the node being expanded), black nodes
//! are fully finished. A back-edge to a gray node is a cycle; the stack is
//! simulated explicitly so a deep graph can't blow the Rust call stack.

use std::time::Duration;

use kg_model::TupleElement;
use kg_store::Transaction;
use rustc_hash::FxHashMap;

use crate::error::AlgoError;
use crate::result::{Completeness, LimitReason, Telemetry};
use crate::view::GraphView;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Bounds on a cycle-detection traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleLimits {
    /// Maximum number of distinct nodes to visit before giving up.
    pub max_nodes_explored: Option<usize>,
    /// Stop once this many distinct cycles have been collected.
    pub max_cycles: Option<usize>,
}

/// Result of scanning the whole index (or the portion reachable from a root
/// set) for cycles.
#[derive(Debug, Clone)]
pub struct CycleResult {
    /// Every cycle found (up to `max_cycles`), each a sequence of nodes
    /// closing back on its first element. Empty if the explored portion is
    /// acyclic.
    pub cycles: Vec<Vec<TupleElement>>,
    /// Distinct nodes visited.
    pub nodes_explored: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Whether the search ran to completion.
    pub completeness: Completeness,
    /// Which bound, if any, cut the search short.
    pub limit_reason: Option<LimitReason>,
}

impl CycleResult {
    /// True if at least one cycle was found — definitive regardless of
    /// limits.
    pub fn has_cycle(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// The first cycle found, if any.
    pub fn cycle(&self) -> Option<&Vec<TupleElement>> {
        self.cycles.first()
    }

    /// True if the traversal ran to completion — an empty `cycles` is only a
    /// reliable "acyclic" answer when this is also true.
    pub fn is_complete(&self) -> bool {
        self.completeness.is_complete()
    }

    /// True when the traversal stopped early without having found a cycle:
    /// the graph may or may not be cyclic, this scan can't say.
    pub fn is_indeterminate(&self) -> bool {
        self.cycles.is_empty() && !self.is_complete()
    }
}

enum Frame {
    Enter(TupleElement),
    Leave(TupleElement),
}

/// Depth-first search for a cycle reachable from `roots` (or, if `roots` is
/// empty, from every node that has at least one outgoing edge).
pub fn detect_cycle<T: Transaction>(
    view: &GraphView<'_, T>,
    roots: &[TupleElement],
    label: Option<&TupleElement>,
    limits: CycleLimits,
) -> CycleResult {
    let mut telemetry = Telemetry::start();
    let mut color: FxHashMap<TupleElement, Color> = FxHashMap::default();
    let mut parent: FxHashMap<TupleElement, TupleElement> = FxHashMap::default();
    let mut cycles: Vec<Vec<TupleElement>> = Vec::new();

    let root_set: Vec<TupleElement> = if roots.is_empty() {
        view.all_edges(label).into_iter().map(|e| e.source).collect()
    } else {
        roots.to_vec()
    };

    macro_rules! cycles_full {
        () => {
            limits.max_cycles.is_some_and(|max| cycles.len() >= max)
        };
    }

    'roots: for root in root_set {
        if color.contains_key(&root) {
            continue;
        }
        let mut stack = vec![Frame::Enter(root)];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(node) => {
                    match color.get(&node) {
                        Some(Color::Black) | Some(Color::Gray) => continue,
                        _ => {}
                    }
                    color.insert(node.clone(), Color::Gray);
                    telemetry.visit();
                    if let Some(max_nodes) = limits.max_nodes_explored {
                        if telemetry.nodes_explored() >= max_nodes {
                            return CycleResult {
                                completeness: if cycles.is_empty() { Completeness::Indeterminate } else { Completeness::BoundReached },
                                limit_reason: Some(LimitReason::MaxNodesReached { explored: telemetry.nodes_explored(), limit: max_nodes }),
                                cycles,
                                nodes_explored: telemetry.nodes_explored(),
                                duration: telemetry.elapsed(),
                            };
                        }
                    }
                    stack.push(Frame::Leave(node.clone()));
                    for edge in view.outgoing(&node, label) {
                        match color.get(&edge.target) {
                            Some(Color::Gray) => {
                                cycles.push(reconstruct_cycle(&parent, &node, &edge.target));
                                if cycles_full!() {
                                    return CycleResult {
                                        cycles,
                                        nodes_explored: telemetry.nodes_explored(),
                                        duration: telemetry.elapsed(),
                                        completeness: Completeness::BoundReached,
                                        limit_reason: Some(LimitReason::MaxCyclesReached { found: limits.max_cycles.unwrap(), limit: limits.max_cycles.unwrap() }),
                                    };
                                }
                            }
                            Some(Color::Black) => continue,
                            _ => {
                                parent.insert(edge.target.clone(), node.clone());
                                stack.push(Frame::Enter(edge.target));
                            }
                        }
                    }
                }
                Frame::Leave(node) => {
                    color.insert(node, Color::Black);
                }
            }
        }
        if cycles_full!() {
            break 'roots;
        }
    }

    CycleResult {
        cycles,
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: Completeness::Complete,
        limit_reason: None,
    }
}

fn reconstruct_cycle(parent: &FxHashMap<TupleElement, TupleElement>, from: &TupleElement, back_to: &TupleElement) -> Vec<TupleElement> {
    let mut cycle = vec![from.clone()];
    let mut current = from.clone();
    while current != *back_to {
        let prev = parent.get(&current).expect("every ancestor on the DFS stack has a recorded parent");
        cycle.push(prev.clone());
        current = prev.clone();
    }
    cycle.reverse();
    cycle
}

/// Whether adding `from -> to` would close a cycle, i.e. `to` can already
/// reach `from`. Raises [`AlgoError::LimitReached`] if the reachability
/// search exhausts `limits` before it can answer either way — an
/// indeterminate answer must not be silently treated as "no cycle".
pub fn would_create_cycle<T: Transaction>(
    view: &GraphView<'_, T>,
    from: &TupleElement,
    to: &TupleElement,
    label: Option<&TupleElement>,
    limits: CycleLimits,
) -> Result<bool, AlgoError> {
    if from == to {
        return Ok(true);
    }
    let result = crate::bfs::shortest_path(
        view,
        to,
        from,
        label,
        crate::bfs::BfsLimits { max_depth: None, max_nodes_explored: limits.max_nodes_explored },
    );
    if !result.completeness.is_complete() {
        return Err(AlgoError::LimitReached("would_create_cycle reachability search"));
    }
    Ok(result.path.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_model::GraphTriple;
    use kg_store::{EdgeScanner, GraphIndexMaintainer, IndexStrategy, InMemoryStore, KvStore, Subspace, TransactionConfig};

    fn seed(edges: &[(&str, &str)]) -> (InMemoryStore, Subspace) {
        let store = InMemoryStore::new();
        let root = Subspace::new(vec![0x23]);
        let maintainer = GraphIndexMaintainer::new(root.clone(), IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                for (from, to) in edges {
                    maintainer.update_index(txn, &GraphTriple::new(*from, "e", *to))?;
                }
                Ok(())
            })
            .unwrap();
        (store, root)
    }

    #[test]
    fn acyclic_graph_reports_no_cycle() {
        let (store, root) = seed(&[("a", "b"), ("b", "c")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = detect_cycle(&view, &[], None, CycleLimits::default());
                assert!(!result.has_cycle());
                assert!(result.is_complete());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn back_edge_is_detected_as_a_cycle() {
        let (store, root) = seed(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = detect_cycle(&view, &[], None, CycleLimits::default());
                assert!(result.has_cycle());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn max_nodes_bound_yields_indeterminate_not_acyclic() {
        // A->B->C->A plus a disconnected D->E, matching spec scenario 2.
        let (store, root) = seed(&[("a", "b"), ("b", "c"), ("c", "a"), ("d", "e")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let full = detect_cycle(&view, &[], None, CycleLimits { max_cycles: Some(1), max_nodes_explored: Some(100) });
                assert!(full.has_cycle());
                assert!(full.is_complete());

                let starved = detect_cycle(&view, &[], None, CycleLimits { max_cycles: None, max_nodes_explored: Some(2) });
                assert!(!starved.has_cycle());
                assert!(!starved.is_complete());
                assert!(starved.is_indeterminate());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn would_create_cycle_detects_a_path_back_to_the_source() {
        let (store, root) = seed(&[("a", "b"), ("b", "c")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                // a -> b -> c already exists; proposing c -> a closes a cycle.
                assert!(would_create_cycle(&view, &TupleElement::from("c"), &TupleElement::from("a"), None, CycleLimits::default()).unwrap());
                // proposing a -> c does not, since c has no path back to a.
                assert!(!would_create_cycle(&view, &TupleElement::from("a"), &TupleElement::from("c"), None, CycleLimits::default()).unwrap());
                Ok(())
            })
            .unwrap();
    }
}
