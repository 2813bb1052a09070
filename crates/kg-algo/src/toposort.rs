//! Topological sort: Kahn's algorithm over the whole indexed
//! edge set (or a given node subset), plus the small derived queries a
//! dependency graph is usually asked — direct/transitive dependencies and
//! dependents, and the longest (critical) path through the DAG.

use std::collections::VecDeque;
use std::time::Duration;

use kg_model::TupleElement;
use kg_store::Transaction;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::result::{Completeness, LimitReason, Telemetry};
use crate::view::GraphView;

/// Bounds on a topological-sort traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopoSortLimits {
    /// Maximum number of nodes Kahn's algorithm may dequeue.
    pub max_nodes: Option<usize>,
}

/// Result of a topological sort attempt.
#[derive(Debug, Clone)]
pub struct TopoSortResult {
    /// Nodes in topological order, or `None` if the graph has a cycle (Kahn's
    /// algorithm stalls with unprocessed nodes remaining) or the traversal
    /// was cut short by `max_nodes`.
    pub order: Option<Vec<TupleElement>>,
    /// Nodes that never reached in-degree zero once the queue ran dry —
    /// these constitute the cycle(s) — populated only when the traversal
    /// completed (not bounded) and nodes remain unprocessed.
    pub cyclic_nodes: Vec<TupleElement>,
    /// Total distinct nodes touched by the full scan (before any bound cut
    /// the traversal short).
    pub total_nodes: usize,
    /// Distinct nodes visited.
    pub nodes_explored: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Whether the sort ran to completion.
    pub completeness: Completeness,
    /// Which bound, if any, cut the sort short.
    pub limit_reason: Option<LimitReason>,
}

impl TopoSortResult {
    /// True iff Kahn's algorithm found a cycle — only a reliable verdict
    /// when `completeness.is_complete()`; a bounded run withholds judgment.
    pub fn has_cycle(&self) -> bool {
        self.completeness.is_complete() && self.order.is_none()
    }
}

fn collect_edges<T: Transaction>(
    view: &GraphView<'_, T>,
    label: Option<&TupleElement>,
) -> (FxHashMap<TupleElement, Vec<TupleElement>>, FxHashMap<TupleElement, usize>) {
    let mut adjacency: FxHashMap<TupleElement, Vec<TupleElement>> = FxHashMap::default();
    let mut in_degree: FxHashMap<TupleElement, usize> = FxHashMap::default();
    for edge in view.all_edges(label) {
        in_degree.entry(edge.source.clone()).or_insert(0);
        *in_degree.entry(edge.target.clone()).or_insert(0) += 1;
        adjacency.entry(edge.source).or_default().push(edge.target);
    }
    (adjacency, in_degree)
}

/// Topologically sort every node touched by `label` (or the whole index if
/// `label` is `None`).
pub fn topological_sort<T: Transaction>(view: &GraphView<'_, T>, label: Option<&TupleElement>, limits: TopoSortLimits) -> TopoSortResult {
    let mut telemetry = Telemetry::start();
    let (adjacency, mut in_degree) = collect_edges(view, label);
    let total_nodes = in_degree.len();

    let mut queue: VecDeque<TupleElement> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(node, _)| node.clone())
        .collect();
    let mut order = Vec::with_capacity(total_nodes);

    while let Some(node) = queue.pop_front() {
        telemetry.visit();
        if let Some(max_nodes) = limits.max_nodes {
            if telemetry.nodes_explored() > max_nodes {
                return TopoSortResult {
                    order: None,
                    cyclic_nodes: Vec::new(),
                    total_nodes,
                    nodes_explored: telemetry.nodes_explored(),
                    duration: telemetry.elapsed(),
                    completeness: Completeness::BoundReached,
                    limit_reason: Some(LimitReason::MaxNodesReached { explored: telemetry.nodes_explored(), limit: max_nodes }),
                };
            }
        }
        order.push(node.clone());
        if let Some(neighbors) = adjacency.get(&node) {
            for next in neighbors {
                let deg = in_degree.get_mut(next).expect("every adjacency target has an in-degree entry");
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(next.clone());
                }
            }
        }
    }

    let processed: FxHashSet<TupleElement> = order.iter().cloned().collect();
    let cyclic_nodes: Vec<TupleElement> = in_degree.keys().filter(|n| !processed.contains(*n)).cloned().collect();
    let order = if cyclic_nodes.is_empty() { Some(order) } else { None };
    TopoSortResult {
        order,
        cyclic_nodes,
        total_nodes,
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: Completeness::Complete,
        limit_reason: None,
    }
}

/// Every node reachable by following incoming edges from `node` — its
/// transitive dependencies — in reverse-BFS order (deepest first).
pub fn dependencies<T: Transaction>(view: &GraphView<'_, T>, node: &TupleElement, label: Option<&TupleElement>) -> Vec<TupleElement> {
    let mut layers = bfs_layers(view, node, label, false);
    layers.reverse();
    layers.into_iter().flatten().collect()
}

/// Every node that transitively depends on `node` — nodes reachable by
/// following outgoing edges — in forward BFS order.
pub fn dependents<T: Transaction>(view: &GraphView<'_, T>, node: &TupleElement, label: Option<&TupleElement>) -> Vec<TupleElement> {
    bfs_layers(view, node, label, true).into_iter().flatten().collect()
}

/// BFS layers reachable from `start`, one `Vec` per depth, in visit order
/// within each layer. Layer 0 (the start node itself) is excluded.
fn bfs_layers<T: Transaction>(
    view: &GraphView<'_, T>,
    start: &TupleElement,
    label: Option<&TupleElement>,
    forward: bool,
) -> Vec<Vec<TupleElement>> {
    let mut visited: FxHashSet<TupleElement> = FxHashSet::default();
    visited.insert(start.clone());
    let mut frontier = vec![start.clone()];
    let mut layers = Vec::new();
    loop {
        let mut next_frontier = Vec::new();
        for node in &frontier {
            let edges = if forward { view.outgoing(node, label) } else { view.incoming(node, label) };
            for edge in edges {
                let next = if forward { edge.target } else { edge.source };
                if visited.insert(next.clone()) {
                    next_frontier.push(next);
                }
            }
        }
        if next_frontier.is_empty() {
            break;
        }
        layers.push(next_frontier.clone());
        frontier = next_frontier;
    }
    layers
}

/// The longest path through the DAG rooted at `start`, by edge count — the
/// critical path for a dependency graph where every edge has equal weight.
/// Only meaningful when the induced subgraph is acyclic; a cyclic subgraph
/// returns `None`.
pub fn critical_path<T: Transaction>(view: &GraphView<'_, T>, start: &TupleElement, label: Option<&TupleElement>) -> Option<Vec<TupleElement>> {
    let mut memo: FxHashMap<TupleElement, Option<Vec<TupleElement>>> = FxHashMap::default();
    let mut on_stack: FxHashSet<TupleElement> = FxHashSet::default();
    longest_path_from(view, start, label, &mut memo, &mut on_stack)
}

fn longest_path_from<T: Transaction>(
    view: &GraphView<'_, T>,
    node: &TupleElement,
    label: Option<&TupleElement>,
    memo: &mut FxHashMap<TupleElement, Option<Vec<TupleElement>>>,
    on_stack: &mut FxHashSet<TupleElement>,
) -> Option<Vec<TupleElement>> {
    if let Some(cached) = memo.get(node) {
        return cached.clone();
    }
    if !on_stack.insert(node.clone()) {
        return None; // cycle: no well-defined longest path
    }

    let mut best: Option<Vec<TupleElement>> = None;
    for edge in view.outgoing(node, label) {
        if let Some(mut candidate) = longest_path_from(view, &edge.target, label, memo, on_stack) {
            candidate.insert(0, node.clone());
            if best.as_ref().map(|b| b.len() < candidate.len()).unwrap_or(true) {
                best = Some(candidate);
            }
        } else if view.outgoing(&edge.target, label).is_empty() {
            let candidate = vec![node.clone(), edge.target.clone()];
            if best.as_ref().map(|b| b.len() < candidate.len()).unwrap_or(true) {
                best = Some(candidate);
            }
        }
    }
    let result = best.or_else(|| Some(vec![node.clone()]));
    on_stack.remove(node);
    memo.insert(node.clone(), result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_model::GraphTriple;
    use kg_store::{EdgeScanner, GraphIndexMaintainer, IndexStrategy, InMemoryStore, KvStore, Subspace, TransactionConfig};

    fn seed(edges: &[(&str, &str)]) -> (InMemoryStore, Subspace) {
        let store = InMemoryStore::new();
        let root = Subspace::new(vec![0x24]);
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
    fn sorts_a_simple_dag() {
        let (store, root) = seed(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = topological_sort(&view, None, TopoSortLimits::default());
                let order = result.order.unwrap();
                assert_eq!(order.len(), 4);
                let pos = |n: &str| order.iter().position(|x| x == &TupleElement::from(n)).unwrap();
                assert!(pos("a") < pos("b"));
                assert!(pos("b") < pos("d"));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn cyclic_graph_has_no_topological_order() {
        let (store, root) = seed(&[("a", "b"), ("b", "a")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                assert!(topological_sort(&view, None, TopoSortLimits::default()).order.is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn dependencies_walk_in_edges_and_dependents_walk_out_edges() {
        let (store, root) = seed(&[("a", "b"), ("b", "c")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                // dependencies(c) walks IN edges backward: b, then a.
                let deps = dependencies(&view, &TupleElement::from("c"), None);
                assert_eq!(deps, vec![TupleElement::from("a"), TupleElement::from("b")]);
                // dependents(a) walks OUT edges forward: b, then c.
                let dependents = dependents(&view, &TupleElement::from("a"), None);
                assert_eq!(dependents, vec![TupleElement::from("b"), TupleElement::from("c")]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn cycle_leaves_cyclic_nodes_when_unbounded() {
        let (store, root) = seed(&[("a", "b"), ("b", "c"), ("c", "b")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = topological_sort(&view, None, TopoSortLimits::default());
                assert!(result.order.is_none());
                assert!(result.completeness.is_complete());
                assert_eq!(result.total_nodes, 3);
                let mut cyclic: Vec<_> = result.cyclic_nodes.iter().map(|n| n.to_string()).collect();
                cyclic.sort();
                assert_eq!(cyclic, vec!["\"b\"".to_string(), "\"c\"".to_string()]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn critical_path_follows_the_longest_chain() {
        let (store, root) = seed(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let path = critical_path(&view, &TupleElement::from("a"), None).unwrap();
                assert_eq!(path.len(), 4);
                Ok(())
            })
            .unwrap();
    }
}
