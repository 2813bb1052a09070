//! Unweighted shortest-path search: a plain BFS frontier, a
//! meet-in-the-middle bidirectional variant, and an all-shortest-paths
//! variant that keeps every predecessor tying for the shortest distance.
//!
//! Neighbors are pulled a batch at a time (spec's `B = 100`) via
//! [`GraphView::outgoing`]/[`incoming`], so a single node with a very wide
//! fan-out doesn't force the whole frontier to wait on one huge scan before
//! any other node in the frontier advances.

use std::collections::VecDeque;
use std::time::Duration;

use kg_model::TupleElement;
use kg_store::Transaction;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::result::{Completeness, Telemetry};
use crate::view::GraphView;

/// Batch size for expanding one node's neighborhood.
const BATCH_SIZE: usize = 100;

/// Bounds on a BFS traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct BfsLimits {
    /// Maximum number of hops to explore.
    pub max_depth: Option<usize>,
    /// Maximum number of distinct nodes to visit.
    pub max_nodes_explored: Option<usize>,
}

/// Result of a single-target shortest-path search.
#[derive(Debug, Clone)]
pub struct PathResult {
    /// The shortest path from source to target, inclusive, or `None` if
    /// unreachable within the explored portion of the graph.
    pub path: Option<Vec<TupleElement>>,
    /// Distinct nodes visited.
    pub nodes_explored: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Whether the search ran to completion.
    pub completeness: Completeness,
}

/// Result of an all-shortest-paths search: every path achieving the minimum
/// distance from source to target.
#[derive(Debug, Clone)]
pub struct AllPathsResult {
    /// Every shortest path found, each inclusive of source and target.
    pub paths: Vec<Vec<TupleElement>>,
    /// Distance shared by every path in `paths`.
    pub distance: Option<usize>,
    /// Distinct nodes visited.
    pub nodes_explored: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Whether the search ran to completion.
    pub completeness: Completeness,
}

/// Neighbors of a single node, in the requested direction.
fn expand<T: Transaction>(view: &GraphView<'_, T>, node: &TupleElement, label: Option<&TupleElement>, forward: bool) -> Vec<TupleElement> {
    let edges = if forward { view.outgoing(node, label) } else { view.incoming(node, label) };
    edges.into_iter().map(|e| if forward { e.target } else { e.source }).collect()
}

/// Neighbors of a whole BFS layer, fetched `BATCH_SIZE` source nodes at a
/// time rather than one scan per node.
fn expand_layer<T: Transaction>(
    view: &GraphView<'_, T>,
    nodes: &[TupleElement],
    label: Option<&TupleElement>,
    forward: bool,
) -> Vec<(TupleElement, TupleElement)> {
    let mut out = Vec::new();
    for chunk in nodes.chunks(BATCH_SIZE) {
        let edges = if forward { view.outgoing_batch(chunk, label) } else { view.incoming_batch(chunk, label) };
        out.extend(edges.into_iter().map(|e| if forward { (e.source, e.target) } else { (e.target, e.source) }));
    }
    out
}

/// Single-source, single-target unweighted shortest path.
pub fn shortest_path<T: Transaction>(
    view: &GraphView<'_, T>,
    from: &TupleElement,
    to: &TupleElement,
    label: Option<&TupleElement>,
    limits: BfsLimits,
) -> PathResult {
    let mut telemetry = Telemetry::start();
    if from == to {
        telemetry.visit();
        return PathResult {
            path: Some(vec![from.clone()]),
            nodes_explored: telemetry.nodes_explored(),
            duration: telemetry.elapsed(),
            completeness: Completeness::Complete,
        };
    }

    let mut visited: FxHashSet<TupleElement> = FxHashSet::default();
    let mut predecessor: FxHashMap<TupleElement, TupleElement> = FxHashMap::default();
    let mut frontier = VecDeque::new();
    visited.insert(from.clone());
    frontier.push_back((from.clone(), 0usize));
    telemetry.visit();

    while let Some((node, depth)) = frontier.pop_front() {
        if let Some(max_depth) = limits.max_depth {
            if depth >= max_depth {
                continue;
            }
        }
        for next in expand(view, &node, label, true) {
            if visited.contains(&next) {
                continue;
            }
            visited.insert(next.clone());
            predecessor.insert(next.clone(), node.clone());
            telemetry.visit();

            if next == *to {
                return PathResult {
                    path: Some(reconstruct(&predecessor, from, to)),
                    nodes_explored: telemetry.nodes_explored(),
                    duration: telemetry.elapsed(),
                    completeness: Completeness::Complete,
                };
            }

            if let Some(max_nodes) = limits.max_nodes_explored {
                if telemetry.nodes_explored() >= max_nodes {
                    return PathResult {
                        path: None,
                        nodes_explored: telemetry.nodes_explored(),
                        duration: telemetry.elapsed(),
                        completeness: Completeness::BoundReached,
                    };
                }
            }
            frontier.push_back((next, depth + 1));
        }
    }

    PathResult {
        path: None,
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: Completeness::Complete,
    }
}

fn reconstruct(
    predecessor: &FxHashMap<TupleElement, TupleElement>,
    from: &TupleElement,
    to: &TupleElement,
) -> Vec<TupleElement> {
    let mut path = vec![to.clone()];
    let mut current = to.clone();
    while current != *from {
        let prev = predecessor.get(&current).expect("every visited node but the source has a predecessor");
        path.push(prev.clone());
        current = prev.clone();
    }
    path.reverse();
    path
}

/// Meet-in-the-middle shortest path: alternately expands a forward frontier
/// from `from` and a backward frontier from `to`, stopping as soon as they
/// share a node. Explores roughly `2 * sqrt(n)` nodes instead of `n` on a
/// balanced graph, compared to a one-directional search.
pub fn shortest_path_bidirectional<T: Transaction>(
    view: &GraphView<'_, T>,
    from: &TupleElement,
    to: &TupleElement,
    label: Option<&TupleElement>,
    limits: BfsLimits,
) -> PathResult {
    let mut telemetry = Telemetry::start();
    if from == to {
        telemetry.visit();
        return PathResult {
            path: Some(vec![from.clone()]),
            nodes_explored: telemetry.nodes_explored(),
            duration: telemetry.elapsed(),
            completeness: Completeness::Complete,
        };
    }

    let mut forward_pred: FxHashMap<TupleElement, TupleElement> = FxHashMap::default();
    let mut backward_pred: FxHashMap<TupleElement, TupleElement> = FxHashMap::default();
    let mut forward_visited: FxHashSet<TupleElement> = FxHashSet::default();
    let mut backward_visited: FxHashSet<TupleElement> = FxHashSet::default();
    let mut forward_frontier = VecDeque::new();
    let mut backward_frontier = VecDeque::new();

    forward_visited.insert(from.clone());
    backward_visited.insert(to.clone());
    forward_frontier.push_back(from.clone());
    backward_frontier.push_back(to.clone());
    telemetry.visit();
    telemetry.visit();

    let mut depth = 0usize;
    loop {
        if forward_frontier.is_empty() && backward_frontier.is_empty() {
            return PathResult {
                path: None,
                nodes_explored: telemetry.nodes_explored(),
                duration: telemetry.elapsed(),
                completeness: Completeness::Complete,
            };
        }
        if let Some(max_depth) = limits.max_depth {
            if depth >= max_depth {
                return PathResult {
                    path: None,
                    nodes_explored: telemetry.nodes_explored(),
                    duration: telemetry.elapsed(),
                    completeness: Completeness::BoundReached,
                };
            }
        }

        if let Some(meeting) = step_frontier(
            view,
            &mut forward_frontier,
            &mut forward_visited,
            &mut forward_pred,
            &backward_visited,
            label,
            true,
            &mut telemetry,
        ) {
            return finish_bidirectional(&forward_pred, &backward_pred, from, to, &meeting, &mut telemetry);
        }
        if let Some(max_nodes) = limits.max_nodes_explored {
            if telemetry.nodes_explored() >= max_nodes {
                return PathResult {
                    path: None,
                    nodes_explored: telemetry.nodes_explored(),
                    duration: telemetry.elapsed(),
                    completeness: Completeness::BoundReached,
                };
            }
        }

        if let Some(meeting) = step_frontier(
            view,
            &mut backward_frontier,
            &mut backward_visited,
            &mut backward_pred,
            &forward_visited,
            label,
            false,
            &mut telemetry,
        ) {
            return finish_bidirectional(&forward_pred, &backward_pred, from, to, &meeting, &mut telemetry);
        }
        if let Some(max_nodes) = limits.max_nodes_explored {
            if telemetry.nodes_explored() >= max_nodes {
                return PathResult {
                    path: None,
                    nodes_explored: telemetry.nodes_explored(),
                    duration: telemetry.elapsed(),
                    completeness: Completeness::BoundReached,
                };
            }
        }
        depth += 1;
    }
}

#[allow(clippy::too_many_arguments)]
fn step_frontier<T: Transaction>(
    view: &GraphView<'_, T>,
    frontier: &mut VecDeque<TupleElement>,
    visited: &mut FxHashSet<TupleElement>,
    predecessor: &mut FxHashMap<TupleElement, TupleElement>,
    other_visited: &FxHashSet<TupleElement>,
    label: Option<&TupleElement>,
    forward: bool,
    telemetry: &mut Telemetry,
) -> Option<TupleElement> {
    let current_layer: Vec<TupleElement> = frontier.drain(..).collect();
    for (node, next) in expand_layer(view, &current_layer, label, forward) {
        if visited.contains(&next) {
            continue;
        }
        visited.insert(next.clone());
        predecessor.insert(next.clone(), node);
        telemetry.visit();
        if other_visited.contains(&next) {
            return Some(next);
        }
        frontier.push_back(next);
    }
    None
}

fn finish_bidirectional(
    forward_pred: &FxHashMap<TupleElement, TupleElement>,
    backward_pred: &FxHashMap<TupleElement, TupleElement>,
    from: &TupleElement,
    to: &TupleElement,
    meeting: &TupleElement,
    telemetry: &mut Telemetry,
) -> PathResult {
    let mut forward_half = vec![meeting.clone()];
    let mut current = meeting.clone();
    while current != *from {
        let prev = forward_pred.get(&current).expect("forward predecessor chain reaches source");
        forward_half.push(prev.clone());
        current = prev.clone();
    }
    forward_half.reverse();

    let mut backward_half = Vec::new();
    let mut current = meeting.clone();
    while current != *to {
        let next = backward_pred.get(&current).expect("backward predecessor chain reaches target");
        backward_half.push(next.clone());
        current = next.clone();
    }

    forward_half.extend(backward_half);
    PathResult {
        path: Some(forward_half),
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: Completeness::Complete,
    }
}

/// Every shortest path from `from` to `to`, not just one. Explores the
/// unweighted BFS layers one at a time, keeping every predecessor achieving
/// the minimum distance to a node rather than the first one found.
pub fn all_shortest_paths<T: Transaction>(
    view: &GraphView<'_, T>,
    from: &TupleElement,
    to: &TupleElement,
    label: Option<&TupleElement>,
    limits: BfsLimits,
) -> AllPathsResult {
    let mut telemetry = Telemetry::start();
    if from == to {
        telemetry.visit();
        return AllPathsResult {
            paths: vec![vec![from.clone()]],
            distance: Some(0),
            nodes_explored: telemetry.nodes_explored(),
            duration: telemetry.elapsed(),
            completeness: Completeness::Complete,
        };
    }

    let mut distance: FxHashMap<TupleElement, usize> = FxHashMap::default();
    let mut predecessors: FxHashMap<TupleElement, Vec<TupleElement>> = FxHashMap::default();
    distance.insert(from.clone(), 0);
    let mut frontier = vec![from.clone()];
    telemetry.visit();
    let mut found_at_depth: Option<usize> = None;

    let mut depth = 0usize;
    while !frontier.is_empty() {
        if let Some(found) = found_at_depth {
            if depth > found {
                break;
            }
        }
        if let Some(max_depth) = limits.max_depth {
            if depth >= max_depth {
                return AllPathsResult {
                    paths: Vec::new(),
                    distance: None,
                    nodes_explored: telemetry.nodes_explored(),
                    duration: telemetry.elapsed(),
                    completeness: Completeness::BoundReached,
                };
            }
        }

        let mut next_frontier = Vec::new();
        for (node, next) in expand_layer(view, &frontier, label, true) {
            let candidate_distance = depth + 1;
            match distance.get(&next) {
                None => {
                    distance.insert(next.clone(), candidate_distance);
                    predecessors.entry(next.clone()).or_default().push(node.clone());
                    telemetry.visit();
                    next_frontier.push(next.clone());
                    if next == *to {
                        found_at_depth = Some(candidate_distance);
                    }
                    if let Some(max_nodes) = limits.max_nodes_explored {
                        if telemetry.nodes_explored() >= max_nodes {
                            return AllPathsResult {
                                paths: Vec::new(),
                                distance: None,
                                nodes_explored: telemetry.nodes_explored(),
                                duration: telemetry.elapsed(),
                                completeness: Completeness::BoundReached,
                            };
                        }
                    }
                }
                Some(&existing) if existing == candidate_distance => {
                    predecessors.entry(next.clone()).or_default().push(node.clone());
                }
                Some(_) => {}
            }
        }
        frontier = next_frontier;
        depth += 1;
    }

    let paths = match found_at_depth {
        None => Vec::new(),
        Some(_) => {
            let mut paths = Vec::new();
            let mut stack = vec![vec![to.clone()]];
            while let Some(partial) = stack.pop() {
                let head = partial.last().unwrap().clone();
                if head == *from {
                    let mut path = partial;
                    path.reverse();
                    paths.push(path);
                    continue;
                }
                for pred in predecessors.get(&head).into_iter().flatten() {
                    let mut extended = partial.clone();
                    extended.push(pred.clone());
                    stack.push(extended);
                }
            }
            paths
        }
    };

    AllPathsResult {
        paths,
        distance: found_at_depth,
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: Completeness::Complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_model::GraphTriple;
    use kg_store::{GraphIndexMaintainer, IndexStrategy, InMemoryStore, KvStore, Subspace, TransactionConfig};

    fn build_line_graph() -> (InMemoryStore, Subspace) {
        let store = InMemoryStore::new();
        let root = Subspace::new(vec![0x20]);
        let maintainer = GraphIndexMaintainer::new(root.clone(), IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                maintainer.update_index(txn, &GraphTriple::new("a", "e", "b"))?;
                maintainer.update_index(txn, &GraphTriple::new("b", "e", "c"))?;
                maintainer.update_index(txn, &GraphTriple::new("c", "e", "d"))?;
                Ok(())
            })
            .unwrap();
        (store, root)
    }

    #[test]
    fn finds_shortest_path_along_a_line() {
        let (store, root) = build_line_graph();
        let scanner = kg_store::EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = shortest_path(&view, &TupleElement::from("a"), &TupleElement::from("d"), None, BfsLimits::default());
                assert_eq!(
                    result.path,
                    Some(vec![
                        TupleElement::from("a"),
                        TupleElement::from("b"),
                        TupleElement::from("c"),
                        TupleElement::from("d"),
                    ])
                );
                assert!(result.completeness.is_complete());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn bidirectional_search_finds_the_same_path() {
        let (store, root) = build_line_graph();
        let scanner = kg_store::EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result =
                    shortest_path_bidirectional(&view, &TupleElement::from("a"), &TupleElement::from("d"), None, BfsLimits::default());
                assert_eq!(result.path.as_ref().map(|p| p.len()), Some(4));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn unreachable_target_returns_none_but_completes() {
        let (store, root) = build_line_graph();
        let scanner = kg_store::EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = shortest_path(&view, &TupleElement::from("d"), &TupleElement::from("a"), None, BfsLimits::default());
                assert_eq!(result.path, None);
                assert!(result.completeness.is_complete());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn max_depth_bound_is_reported_as_bound_reached() {
        let (store, root) = build_line_graph();
        let scanner = kg_store::EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let limits = BfsLimits { max_depth: Some(1), max_nodes_explored: None };
                let result = shortest_path(&view, &TupleElement::from("a"), &TupleElement::from("d"), None, limits);
                assert_eq!(result.path, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn all_shortest_paths_finds_every_tie() {
        let store = InMemoryStore::new();
        let root = Subspace::new(vec![0x21]);
        let maintainer = GraphIndexMaintainer::new(root.clone(), IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                maintainer.update_index(txn, &GraphTriple::new("a", "e", "b1"))?;
                maintainer.update_index(txn, &GraphTriple::new("a", "e", "b2"))?;
                maintainer.update_index(txn, &GraphTriple::new("b1", "e", "c"))?;
                maintainer.update_index(txn, &GraphTriple::new("b2", "e", "c"))?;
                Ok(())
            })
            .unwrap();
        let scanner = kg_store::EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = all_shortest_paths(&view, &TupleElement::from("a"), &TupleElement::from("c"), None, BfsLimits::default());
                assert_eq!(result.distance, Some(2));
                assert_eq!(result.paths.len(), 2);
                Ok(())
            })
            .unwrap();
    }
}
