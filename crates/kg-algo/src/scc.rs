//! Strongly connected components: an iterative Tarjan's
//! algorithm. Tarjan's is naturally recursive (DFS with a lowlink update on
//! return from each child); here the call stack is simulated explicitly as
//! a vector of frames, each tracking which neighbor index it's about to
//! visit next, so a long chain in the indexed graph can't overflow the
//! real stack.

use std::time::Duration;

use kg_model::TupleElement;
use kg_store::Transaction;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::result::{Completeness, LimitReason, Telemetry};
use crate::view::GraphView;

/// One frame of the simulated DFS call stack.
struct Frame {
    node: TupleElement,
    neighbors: Vec<TupleElement>,
    neighbor_cursor: usize,
}

/// Bounds on a Tarjan SCC scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct SccLimits {
    /// Maximum number of distinct nodes to visit.
    pub max_nodes: Option<usize>,
    /// Maximum number of components to emit.
    pub max_components: Option<usize>,
}

/// Result of running Tarjan's algorithm over the indexed edges.
#[derive(Debug, Clone)]
pub struct SccResult {
    /// Every strongly connected component found, each a set of nodes that
    /// can all reach each other.
    pub components: Vec<Vec<TupleElement>>,
    /// Distinct nodes visited.
    pub nodes_explored: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Whether the scan ran to completion.
    pub completeness: Completeness,
    /// Which bound, if any, cut the scan short.
    pub limit_reason: Option<LimitReason>,
}

impl SccResult {
    /// True if `a` and `b` were placed in the same component.
    pub fn is_strongly_connected(&self, a: &TupleElement, b: &TupleElement) -> bool {
        self.components.iter().any(|c| c.contains(a) && c.contains(b))
    }

    /// The DAG obtained by contracting every component to a single node:
    /// one edge `(i, j)` for each pair of distinct components `i != j` with
    /// at least one original edge crossing between them.
    pub fn condensation_graph<T: Transaction>(&self, view: &GraphView<'_, T>, label: Option<&TupleElement>) -> Vec<(usize, usize)> {
        let mut component_of: FxHashMap<&TupleElement, usize> = FxHashMap::default();
        for (idx, component) in self.components.iter().enumerate() {
            for node in component {
                component_of.insert(node, idx);
            }
        }
        let mut edges: FxHashSet<(usize, usize)> = FxHashSet::default();
        for edge in view.all_edges(label) {
            if let (Some(&from_c), Some(&to_c)) = (component_of.get(&edge.source), component_of.get(&edge.target)) {
                if from_c != to_c {
                    edges.insert((from_c, to_c));
                }
            }
        }
        edges.into_iter().collect()
    }
}

/// Run Tarjan's algorithm over every node touched by `label` (or the whole
/// index if `label` is `None`).
pub fn tarjan_scc<T: Transaction>(view: &GraphView<'_, T>, label: Option<&TupleElement>, limits: SccLimits) -> SccResult {
    let mut telemetry = Telemetry::start();
    let mut index: FxHashMap<TupleElement, usize> = FxHashMap::default();
    let mut lowlink: FxHashMap<TupleElement, usize> = FxHashMap::default();
    let mut on_stack: FxHashSet<TupleElement> = FxHashSet::default();
    let mut tarjan_stack: Vec<TupleElement> = Vec::new();
    let mut components = Vec::new();
    let mut next_index = 0usize;

    let mut node_set: FxHashSet<TupleElement> = FxHashSet::default();
    for edge in view.all_edges(label) {
        node_set.insert(edge.source);
        node_set.insert(edge.target);
    }
    let mut nodes: Vec<TupleElement> = node_set.into_iter().collect();
    nodes.sort();

    macro_rules! bound_reached {
        ($reason:expr) => {
            return SccResult {
                components,
                nodes_explored: telemetry.nodes_explored(),
                duration: telemetry.elapsed(),
                completeness: Completeness::BoundReached,
                limit_reason: Some($reason),
            }
        };
    }

    for start in nodes {
        if index.contains_key(&start) {
            continue;
        }
        push_frame(view, label, &start, &mut index, &mut lowlink, &mut on_stack, &mut tarjan_stack, &mut next_index, &mut telemetry);
        if let Some(max_nodes) = limits.max_nodes {
            if telemetry.nodes_explored() >= max_nodes {
                bound_reached!(LimitReason::MaxNodesReached { explored: telemetry.nodes_explored(), limit: max_nodes });
            }
        }
        let mut call_stack = vec![Frame {
            neighbors: view.outgoing(&start, label).into_iter().map(|e| e.target).collect(),
            node: start,
            neighbor_cursor: 0,
        }];

        while let Some(frame) = call_stack.last_mut() {
            if frame.neighbor_cursor < frame.neighbors.len() {
                let next = frame.neighbors[frame.neighbor_cursor].clone();
                frame.neighbor_cursor += 1;
                if !index.contains_key(&next) {
                    push_frame(view, label, &next, &mut index, &mut lowlink, &mut on_stack, &mut tarjan_stack, &mut next_index, &mut telemetry);
                    if let Some(max_nodes) = limits.max_nodes {
                        if telemetry.nodes_explored() >= max_nodes {
                            bound_reached!(LimitReason::MaxNodesReached { explored: telemetry.nodes_explored(), limit: max_nodes });
                        }
                    }
                    let neighbors = view.outgoing(&next, label).into_iter().map(|e| e.target).collect();
                    call_stack.push(Frame { node: next, neighbors, neighbor_cursor: 0 });
                } else if on_stack.contains(&next) {
                    let next_idx = index[&next];
                    let node = frame.node.clone();
                    let updated = lowlink[&node].min(next_idx);
                    lowlink.insert(node, updated);
                }
            } else {
                let finished = call_stack.pop().unwrap();
                let finished_low = lowlink[&finished.node];
                if let Some(parent) = call_stack.last() {
                    let updated = lowlink[&parent.node].min(finished_low);
                    lowlink.insert(parent.node.clone(), updated);
                }
                if finished_low == index[&finished.node] {
                    let mut component = Vec::new();
                    loop {
                        let w = tarjan_stack.pop().expect("tarjan stack holds every node not yet assigned to a component");
                        on_stack.remove(&w);
                        let is_root = w == finished.node;
                        component.push(w);
                        if is_root {
                            break;
                        }
                    }
                    components.push(component);
                    if let Some(max_components) = limits.max_components {
                        if components.len() >= max_components {
                            bound_reached!(LimitReason::MaxComponentsReached);
                        }
                    }
                }
            }
        }
    }

    SccResult {
        components,
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: Completeness::Complete,
        limit_reason: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn push_frame<T: Transaction>(
    _view: &GraphView<'_, T>,
    _label: Option<&TupleElement>,
    node: &TupleElement,
    index: &mut FxHashMap<TupleElement, usize>,
    lowlink: &mut FxHashMap<TupleElement, usize>,
    on_stack: &mut FxHashSet<TupleElement>,
    tarjan_stack: &mut Vec<TupleElement>,
    next_index: &mut usize,
    telemetry: &mut Telemetry,
) {
    index.insert(node.clone(), *next_index);
    lowlink.insert(node.clone(), *next_index);
    *next_index += 1;
    tarjan_stack.push(node.clone());
    on_stack.insert(node.clone());
    telemetry.visit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_model::GraphTriple;
    use kg_store::{EdgeScanner, GraphIndexMaintainer, IndexStrategy, InMemoryStore, KvStore, Subspace, TransactionConfig};

    fn seed(edges: &[(&str, &str)]) -> (InMemoryStore, Subspace) {
        let store = InMemoryStore::new();
        let root = Subspace::new(vec![0x25]);
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
    fn finds_a_single_cycle_as_one_component() {
        let (store, root) = seed(&[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = tarjan_scc(&view, None, SccLimits::default());
                assert!(result.is_strongly_connected(&TupleElement::from("a"), &TupleElement::from("c")));
                assert!(!result.is_strongly_connected(&TupleElement::from("a"), &TupleElement::from("d")));
                assert_eq!(result.components.len(), 2);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn acyclic_graph_has_one_component_per_node() {
        let (store, root) = seed(&[("a", "b"), ("b", "c")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = tarjan_scc(&view, None, SccLimits::default());
                assert_eq!(result.components.len(), 3);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn condensation_graph_links_components_that_had_crossing_edges() {
        let (store, root) = seed(&[("a", "b"), ("b", "a"), ("b", "c")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = tarjan_scc(&view, None, SccLimits::default());
                assert_eq!(result.components.len(), 2);
                let condensation = result.condensation_graph(&view, None);
                assert_eq!(condensation.len(), 1);
                Ok(())
            })
            .unwrap();
    }
}
