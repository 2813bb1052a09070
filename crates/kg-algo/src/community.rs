//! Label propagation community detection: synchronous LPA
//! with an optional reproducible seed, a min-community-size post-filter,
//! modularity scoring, and a hop-bounded local variant.

use std::time::Duration;

use kg_model::TupleElement;
use kg_store::Transaction;
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::result::{Completeness, Telemetry};
use crate::view::GraphView;

/// Bounds and knobs for one LPA run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommunityConfig {
    /// Stop after this many synchronous rounds even if labels are still moving.
    pub max_iterations: Option<usize>,
    /// Communities smaller than this are folded into an adjacent larger one.
    pub min_community_size: Option<usize>,
    /// Reproducible run: fixes node order and the shuffle/tie-break RNG
    /// (spec's SplitMix seed-expansion + XorShift sequence). `None` uses the
    /// platform default RNG with no reproducibility guarantee.
    pub seed: Option<u64>,
}

/// Result of a label-propagation run.
#[derive(Debug, Clone)]
pub struct CommunityResult {
    /// Final label assigned to each node.
    pub labels: FxHashMap<TupleElement, TupleElement>,
    /// Rounds actually run.
    pub iterations: usize,
    /// Distinct nodes visited.
    pub nodes_explored: usize,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Whether propagation reached a stable fixed point before `max_iterations`.
    pub completeness: Completeness,
}

impl CommunityResult {
    /// Nodes grouped by their final label.
    pub fn communities(&self) -> Vec<Vec<TupleElement>> {
        let mut groups: FxHashMap<&TupleElement, Vec<TupleElement>> = FxHashMap::default();
        for (node, label) in &self.labels {
            groups.entry(label).or_default().push(node.clone());
        }
        groups.into_values().collect()
    }
}

/// A reproducible generator: a
/// SplitMix64 step expands the user seed into two 64-bit words, which then
/// seed an xorshift128+ sequence.
struct SeededRng {
    state: [u64; 2],
}

impl SeededRng {
    fn new(seed: u64) -> Self {
        let mut x = seed;
        let s0 = Self::splitmix64(&mut x);
        let s1 = Self::splitmix64(&mut x);
        Self { state: [s0, s1] }
    }

    fn splitmix64(seed: &mut u64) -> u64 {
        *seed = seed.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = *seed;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn next_u64(&mut self) -> u64 {
        let mut s1 = self.state[0];
        let s0 = self.state[1];
        let result = s0.wrapping_add(s1);
        self.state[0] = s0;
        s1 ^= s1 << 23;
        self.state[1] = s1 ^ s0 ^ (s1 >> 18) ^ (s0 >> 5);
        result
    }

    /// Uniform index in `[0, n)`.
    fn gen_range(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    /// Fisher-Yates shuffle using this generator.
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.gen_range(i + 1);
            slice.swap(i, j);
        }
    }
}

/// Either a seeded, reproducible source or the platform default — the two
/// RNG paths must never be conflated.
enum Rand {
    Seeded(SeededRng),
    Default(rand::rngs::ThreadRng),
}

impl Rand {
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        match self {
            Rand::Seeded(r) => r.shuffle(slice),
            Rand::Default(r) => slice.shuffle(r),
        }
    }

    fn gen_range(&mut self, n: usize) -> usize {
        match self {
            Rand::Seeded(r) => r.gen_range(n),
            Rand::Default(r) => r.gen_range(0..n),
        }
    }
}

fn neighbor_labels<T: Transaction>(
    view: &GraphView<'_, T>,
    node: &TupleElement,
    label: Option<&TupleElement>,
    labels: &FxHashMap<TupleElement, TupleElement>,
) -> FxHashMap<TupleElement, usize> {
    let mut counts: FxHashMap<TupleElement, usize> = FxHashMap::default();
    for edge in view.outgoing(node, label) {
        if let Some(l) = labels.get(&edge.target) {
            *counts.entry(l.clone()).or_insert(0) += 1;
        }
    }
    for edge in view.incoming(node, label) {
        if let Some(l) = labels.get(&edge.source) {
            *counts.entry(l.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Pick the most frequent label, breaking ties by sorting candidates and
/// then choosing uniformly among the tied set.
fn pick_label(counts: &FxHashMap<TupleElement, usize>, rng: &mut Rand) -> Option<TupleElement> {
    let max = *counts.values().max()?;
    let mut candidates: Vec<&TupleElement> = counts.iter().filter(|(_, &c)| c == max).map(|(l, _)| l).collect();
    candidates.sort();
    if candidates.len() == 1 {
        return Some(candidates[0].clone());
    }
    let idx = rng.gen_range(candidates.len());
    Some(candidates[idx].clone())
}

fn all_nodes<T: Transaction>(view: &GraphView<'_, T>, label: Option<&TupleElement>) -> Vec<TupleElement> {
    let mut set: FxHashSet<TupleElement> = FxHashSet::default();
    for edge in view.all_edges(label) {
        set.insert(edge.source);
        set.insert(edge.target);
    }
    let mut nodes: Vec<TupleElement> = set.into_iter().collect();
    nodes.sort();
    nodes
}

/// Run synchronous label propagation over every node touched by `label` (or
/// the whole index if `label` is `None`).
pub fn detect<T: Transaction>(view: &GraphView<'_, T>, label: Option<&TupleElement>, config: CommunityConfig) -> CommunityResult {
    let mut telemetry = Telemetry::start();
    let nodes = all_nodes(view, label);
    let mut labels: FxHashMap<TupleElement, TupleElement> = nodes.iter().map(|n| (n.clone(), n.clone())).collect();
    for _ in &nodes {
        telemetry.visit();
    }

    let mut rng = match config.seed {
        Some(seed) => Rand::Seeded(SeededRng::new(seed)),
        None => Rand::Default(rand::thread_rng()),
    };

    let max_iterations = config.max_iterations.unwrap_or(100);
    let mut iterations = 0usize;
    let mut stable = nodes.is_empty();

    while iterations < max_iterations && !stable {
        let mut order = nodes.clone();
        rng.shuffle(&mut order);
        let mut changed = false;
        let mut next_labels = labels.clone();
        for node in &order {
            let counts = neighbor_labels(view, node, label, &labels);
            if let Some(new_label) = pick_label(&counts, &mut rng) {
                if next_labels.get(node) != Some(&new_label) {
                    changed = true;
                }
                next_labels.insert(node.clone(), new_label);
            }
        }
        labels = next_labels;
        iterations += 1;
        stable = !changed;
    }

    if let Some(min_size) = config.min_community_size {
        apply_min_size_filter(view, label, &mut labels, min_size);
    }

    CommunityResult {
        labels,
        iterations,
        nodes_explored: telemetry.nodes_explored(),
        duration: telemetry.elapsed(),
        completeness: if stable { Completeness::Complete } else { Completeness::BoundReached },
    }
}

/// Fold communities smaller than `min_size` into the largest surviving
/// community adjacent to any of their members.
fn apply_min_size_filter<T: Transaction>(
    view: &GraphView<'_, T>,
    label: Option<&TupleElement>,
    labels: &mut FxHashMap<TupleElement, TupleElement>,
    min_size: usize,
) {
    let mut sizes: FxHashMap<TupleElement, usize> = FxHashMap::default();
    for l in labels.values() {
        *sizes.entry(l.clone()).or_insert(0) += 1;
    }
    let small: FxHashSet<TupleElement> = sizes.iter().filter(|(_, &c)| c < min_size).map(|(l, _)| l.clone()).collect();
    if small.is_empty() {
        return;
    }

    let small_nodes: Vec<TupleElement> = labels.iter().filter(|(_, l)| small.contains(*l)).map(|(n, _)| n.clone()).collect();
    for node in small_nodes {
        let mut neighbor_sizes: FxHashMap<TupleElement, usize> = FxHashMap::default();
        for edge in view.outgoing(&node, label).into_iter().chain(view.incoming(&node, label)) {
            let other = if edge.source == node { edge.target } else { edge.source };
            if let Some(l) = labels.get(&other) {
                if !small.contains(l) {
                    let size = sizes.get(l).copied().unwrap_or(0);
                    neighbor_sizes.insert(l.clone(), size);
                }
            }
        }
        if let Some((best, _)) = neighbor_sizes.into_iter().max_by_key(|(_, size)| *size) {
            labels.insert(node, best);
        }
    }
}

/// Modularity `Q` of the current label assignment:
/// `(inCommunityEdges / 2m) - Σ_C (Σ_{v∈C} deg(v))² / (4m)²`.
pub fn modularity<T: Transaction>(view: &GraphView<'_, T>, label: Option<&TupleElement>, labels: &FxHashMap<TupleElement, TupleElement>) -> f64 {
    let edges: Vec<_> = view.all_edges(label);
    let m = edges.len() as f64;
    if m == 0.0 {
        return 0.0;
    }

    let mut degree: FxHashMap<&TupleElement, f64> = FxHashMap::default();
    let mut in_community_edges = 0.0;
    for edge in &edges {
        *degree.entry(&edge.source).or_insert(0.0) += 1.0;
        *degree.entry(&edge.target).or_insert(0.0) += 1.0;
        if labels.get(&edge.source) == labels.get(&edge.target) {
            in_community_edges += 1.0;
        }
    }

    let mut community_degree: FxHashMap<&TupleElement, f64> = FxHashMap::default();
    for (node, label) in labels {
        *community_degree.entry(label).or_insert(0.0) += degree.get(node).copied().unwrap_or(0.0);
    }

    let sum_sq: f64 = community_degree.values().map(|d| d * d).sum();
    in_community_edges / (2.0 * m) - sum_sq / (4.0 * m * m)
}

/// LPA restricted to the `hops`-ball around `node`, returning the cohort
/// that ends up sharing `node`'s final label.
pub fn detect_local_community<T: Transaction>(
    view: &GraphView<'_, T>,
    node: &TupleElement,
    hops: usize,
    label: Option<&TupleElement>,
    config: CommunityConfig,
) -> Vec<TupleElement> {
    let ball = hop_ball(view, node, hops, label);
    let mut labels: FxHashMap<TupleElement, TupleElement> = ball.iter().map(|n| (n.clone(), n.clone())).collect();

    let mut rng = match config.seed {
        Some(seed) => Rand::Seeded(SeededRng::new(seed)),
        None => Rand::Default(rand::thread_rng()),
    };
    let max_iterations = config.max_iterations.unwrap_or(100);
    let mut sorted_ball: Vec<TupleElement> = ball.iter().cloned().collect();
    sorted_ball.sort();

    for _ in 0..max_iterations {
        let mut order = sorted_ball.clone();
        rng.shuffle(&mut order);
        let mut changed = false;
        let mut next_labels = labels.clone();
        for n in &order {
            let mut counts: FxHashMap<TupleElement, usize> = FxHashMap::default();
            for edge in view.outgoing(n, label).into_iter().chain(view.incoming(n, label)) {
                let other = if edge.source == *n { edge.target } else { edge.source };
                if let Some(l) = labels.get(&other) {
                    *counts.entry(l.clone()).or_insert(0) += 1;
                }
            }
            if let Some(new_label) = pick_label(&counts, &mut rng) {
                if next_labels.get(n) != Some(&new_label) {
                    changed = true;
                }
                next_labels.insert(n.clone(), new_label);
            }
        }
        labels = next_labels;
        if !changed {
            break;
        }
    }

    let target_label = labels.get(node).cloned();
    labels.into_iter().filter(|(_, l)| Some(l.clone()) == target_label).map(|(n, _)| n).collect()
}

fn hop_ball<T: Transaction>(view: &GraphView<'_, T>, start: &TupleElement, hops: usize, label: Option<&TupleElement>) -> FxHashSet<TupleElement> {
    let mut visited: FxHashSet<TupleElement> = FxHashSet::default();
    visited.insert(start.clone());
    let mut frontier = vec![start.clone()];
    for _ in 0..hops {
        let mut next = Vec::new();
        for node in &frontier {
            for edge in view.outgoing(node, label).into_iter().chain(view.incoming(node, label)) {
                let other = if edge.source == *node { edge.target } else { edge.source };
                if visited.insert(other.clone()) {
                    next.push(other);
                }
            }
        }
        frontier = next;
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_model::GraphTriple;
    use kg_store::{EdgeScanner, GraphIndexMaintainer, IndexStrategy, InMemoryStore, KvStore, Subspace, TransactionConfig};

    fn two_triangles() -> (InMemoryStore, Subspace) {
        let store = InMemoryStore::new();
        let root = Subspace::new(vec![0x30]);
        let maintainer = GraphIndexMaintainer::new(root.clone(), IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                for (a, b) in [("1", "2"), ("2", "3"), ("3", "1"), ("4", "5"), ("5", "6"), ("6", "4"), ("3", "4")] {
                    maintainer.update_index(txn, &GraphTriple::new(a, "e", b))?;
                }
                Ok(())
            })
            .unwrap();
        (store, root)
    }

    #[test]
    fn seeded_run_groups_each_triangle_together() {
        let (store, root) = two_triangles();
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let config = CommunityConfig { seed: Some(0xDEADBEEF), ..Default::default() };
                let result = detect(&view, None, config);
                let l1 = result.labels[&TupleElement::from("1")].clone();
                let l2 = result.labels[&TupleElement::from("2")].clone();
                let l3 = result.labels[&TupleElement::from("3")].clone();
                assert_eq!(l1, l2);
                assert_eq!(l2, l3);
                let l4 = result.labels[&TupleElement::from("4")].clone();
                let l5 = result.labels[&TupleElement::from("5")].clone();
                let l6 = result.labels[&TupleElement::from("6")].clone();
                assert_eq!(l4, l5);
                assert_eq!(l5, l6);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let (store, root) = two_triangles();
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let config = CommunityConfig { seed: Some(42), ..Default::default() };
                let a = detect(&view, None, config);
                let b = detect(&view, None, config);
                assert_eq!(a.labels, b.labels);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn modularity_is_positive_for_clear_community_structure() {
        let (store, root) = two_triangles();
        let scanner = EdgeScanner::new(&root, IndexStrategy::Adjacency);
        store
            .with_transaction::<_, (), kg_store::IndexError>(TransactionConfig::default_config(), |txn| {
                let view = GraphView::new(&scanner, txn);
                let config = CommunityConfig { seed: Some(7), ..Default::default() };
                let result = detect(&view, None, config);
                let q = modularity(&view, None, &result.labels);
                assert!(q > 0.0, "expected positive modularity, got {q}");
                Ok(())
            })
            .unwrap();
    }
}
