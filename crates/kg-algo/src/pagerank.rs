//! PageRank by power iteration, with a personalized variant
//! that teleports mass to a single start node instead of spreading it
//! uniformly.

use std::time::Duration;

use kg_model::TupleElement;
use kg_store::Transaction;
use rustc_hash::FxHashMap;

use crate::result::{Completeness, LimitReason, Telemetry};
use crate::view::GraphView;

/// Damping factor, convergence threshold, and iteration cap for one run.
#[derive(Debug, Clone, Copy)]
pub struct PageRankConfig {
    /// Probability mass that follows an outgoing edge rather than teleporting.
    pub damping: f64,
    /// Stop once the L1 norm of the score delta between iterations drops
    /// to or below this.
    pub epsilon: f64,
    /// Hard cap on iterations, reached regardless of convergence.
    pub max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self { damping: 0.85, epsilon: 1e-6, max_iterations: 100 }
    }
}

/// Result of a PageRank run: a point-in-time view, since the index may
/// change between the scans each iteration performs.
#[derive(Debug, Clone)]
pub struct PageRankResult {
    /// Converged (or best-effort, if `max_iterations` was hit first) score
    /// per node.
    pub scores: FxHashMap<TupleElement, f64>,
    /// Iterations actually run.
    pub iterations: usize,
    /// Distinct nodes visited across the run.
    pub nodes_explored: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Whether the L1 delta dropped to `epsilon` before `max_iterations`.
    pub completeness: Completeness,
    /// Populated when `max_iterations` cut the run short.
    pub limit_reason: Option<LimitReason>,
}

struct Topology {
    nodes: Vec<TupleElement>,
    out_degree: FxHashMap<TupleElement, usize>,
    incoming: FxHashMap<TupleElement, Vec<TupleElement>>,
}

fn build_topology<T: Transaction>(view: &GraphView<'_, T>, label: Option<&TupleElement>) -> Topology {
    let edges = view.all_edges(label);
    let mut out_degree: FxHashMap<TupleElement, usize> = FxHashMap::default();
    let mut incoming: FxHashMap<TupleElement, Vec<TupleElement>> = FxHashMap::default();
    let mut node_set: std::collections::BTreeSet<TupleElement> = std::collections::BTreeSet::new();

    for edge in edges {
        node_set.insert(edge.source.clone());
        node_set.insert(edge.target.clone());
        *out_degree.entry(edge.source.clone()).or_insert(0) += 1;
        incoming.entry(edge.target).or_default().push(edge.source);
    }

    Topology { nodes: node_set.into_iter().collect(), out_degree, incoming }
}

/// Standard PageRank: teleport mass spreads uniformly over all `N` nodes.
pub fn pagerank<T: Transaction>(view: &GraphView<'_, T>, label: Option<&TupleElement>, config: PageRankConfig) -> PageRankResult {
    run(view, label, config, None)
}

/// Personalized PageRank: teleport mass returns only to `start`, and the
/// initial score distribution places all mass on `start`.
pub fn personalized_pagerank<T: Transaction>(
    view: &GraphView<'_, T>,
    start: &TupleElement,
    label: Option<&TupleElement>,
    config: PageRankConfig,
) -> PageRankResult {
    run(view, label, config, Some(start))
}

fn run<T: Transaction>(view: &GraphView<'_, T>, label: Option<&TupleElement>, config: PageRankConfig, personalized: Option<&TupleElement>) -> PageRankResult {
    let mut telemetry = Telemetry::start();
    let topology = build_topology(view, label);
    let n = topology.nodes.len();
    for _ in &topology.nodes {
        telemetry.visit();
    }

    if n == 0 {
        return PageRankResult {
            scores: FxHashMap::default(),
            iterations: 0,
            nodes_explored: 0,
            duration: telemetry.elapsed(),
            completeness: Completeness::Complete,
            limit_reason: None,
        };
    }

    let mut scores: FxHashMap<TupleElement, f64> = match personalized {
        Some(start) => topology.nodes.iter().map(|node| (node.clone(), if node == start { 1.0 } else { 0.0 })).collect(),
        None => topology.nodes.iter().map(|node| (node.clone(), 1.0 / n as f64)).collect(),
    };

    let teleport_mass = |total: f64| -> f64 {
        match personalized {
            Some(_) => (1.0 - config.damping) * total,
            None => (1.0 - config.damping) / n as f64,
        }
    };

    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < config.max_iterations {
        let dangling_mass: f64 = topology
            .nodes
            .iter()
            .filter(|node| topology.out_degree.get(*node).copied().unwrap_or(0) == 0)
            .map(|node| scores[node])
            .sum();

        let mut next_scores: FxHashMap<TupleElement, f64> = FxHashMap::default();
        for node in &topology.nodes {
            let base = match personalized {
                Some(start) => teleport_mass(if node == start { 1.0 } else { 0.0 }),
                None => teleport_mass(1.0),
            };
            let mut contribution = 0.0;
            if let Some(sources) = topology.incoming.get(node) {
                for source in sources {
                    let out_deg = topology.out_degree.get(source).copied().unwrap_or(1).max(1);
                    contribution += scores[source] / out_deg as f64;
                }
            }
            // Dangling nodes (no outgoing edges) redistribute their mass
            // the same way teleport mass is distributed.
            let dangling_contribution = match personalized {
                Some(start) => if node == start { config.damping * dangling_mass } else { 0.0 },
                None => config.damping * dangling_mass / n as f64,
            };
            next_scores.insert(node.clone(), base + config.damping * contribution + dangling_contribution);
        }

        let l1_delta: f64 = topology.nodes.iter().map(|node| (next_scores[node] - scores[node]).abs()).sum();
        scores = next_scores;
        iterations += 1;

        if l1_delta <= config.epsilon {
            converged = true;
            break;
        }
    }

    PageRankResult {
        scores,
        iterations,
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: if converged { Completeness::Complete } else { Completeness::BoundReached },
        limit_reason: if converged { None } else { Some(LimitReason::MaxNodesReached { explored: iterations, limit: config.max_iterations }) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_model::GraphTriple;
    use kg_store::{EdgeScanner, GraphIndexMaintainer, IndexStrategy, InMemoryStore, KvStore, Subspace, TransactionConfig};

    fn seed(edges: &[(&str, &str)]) -> (InMemoryStore, Subspace) {
        let store = InMemoryStore::new();
        let root = Subspace::new(vec![0x28]);
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
    fn scores_sum_to_roughly_one_on_convergence() {
        let (store, root) = seed(&[("a", "b"), ("b", "c"), ("c", "a"), ("a", "c")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = pagerank(&view, None, PageRankConfig::default());
                assert!(result.completeness.is_complete());
                let total: f64 = result.scores.values().sum();
                assert!((total - 1.0).abs() < 1e-3, "expected scores to sum to ~1, got {total}");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn a_node_with_more_inlinks_ranks_higher() {
        let (store, root) = seed(&[("x", "hub"), ("y", "hub"), ("z", "hub"), ("hub", "leaf")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = pagerank(&view, None, PageRankConfig::default());
                let hub = result.scores[&TupleElement::from("hub")];
                let leaf = result.scores[&TupleElement::from("leaf")];
                assert!(hub > leaf, "hub {hub} should outrank leaf {leaf}");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn personalized_run_concentrates_mass_near_the_start_node() {
        let (store, root) = seed(&[("a", "b"), ("b", "c"), ("c", "d"), ("x", "y")]);
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let result = personalized_pagerank(&view, &TupleElement::from("a"), None, PageRankConfig::default());
                let near = result.scores[&TupleElement::from("b")];
                let far = result.scores[&TupleElement::from("y")];
                assert!(near > far, "node reachable from start ({near}) should outrank unrelated node ({far})");
                Ok(())
            })
            .unwrap();
    }
}
