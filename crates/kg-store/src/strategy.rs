//! Index strategies: which key orderings a graph index maintains, and which
//! ordering best serves a given bound/unbound query shape.

use kg_model::TupleElement;

/// One of the six possible key orderings over `(from, edge, to)`. The
/// discriminant is the subspace child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ordering {
    /// `(edge, from, to)` — adjacency outgoing.
    Out = 0,
    /// `(edge, to, from)` — adjacency incoming.
    In = 1,
    /// `(from, edge, to)`.
    Spo = 2,
    /// `(edge, to, from)` — triple-store variant distinct from adjacency `In`.
    Pos = 3,
    /// `(to, from, edge)`.
    Osp = 4,
    /// `(from, to, edge)`.
    Sop = 5,
    /// `(edge, from, to)` — hexastore variant distinct from adjacency `Out`.
    Pso = 6,
    /// `(to, edge, from)`.
    Ops = 7,
}

/// Which logical triple position a key component holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Source node.
    From,
    /// Edge label.
    Edge,
    /// Target node.
    To,
}

impl Ordering {
    /// Subspace child integer this ordering is stored under.
    pub fn child_index(self) -> u8 {
        self as u8
    }

    /// The logical role held by each of this ordering's three key
    /// components, in storage order. Lets a caller build a bound prefix
    /// without needing concrete values for every position (see
    /// `kg_store::scanner`).
    pub fn roles(self) -> [Role; 3] {
        match self {
            Ordering::Out | Ordering::Pso => [Role::Edge, Role::From, Role::To],
            Ordering::In | Ordering::Pos => [Role::Edge, Role::To, Role::From],
            Ordering::Spo => [Role::From, Role::Edge, Role::To],
            Ordering::Osp => [Role::To, Role::From, Role::Edge],
            Ordering::Sop => [Role::From, Role::To, Role::Edge],
            Ordering::Ops => [Role::To, Role::Edge, Role::From],
        }
    }

    /// Permute `(from, edge, to)` into this ordering's component order.
    pub fn permute(self, from: &TupleElement, edge: &TupleElement, to: &TupleElement) -> Vec<TupleElement> {
        let (a, b, c) = match self {
            Ordering::Out | Ordering::Pso => (edge, from, to),
            Ordering::In | Ordering::Pos => (edge, to, from),
            Ordering::Spo => (from, edge, to),
            Ordering::Osp => (to, from, edge),
            Ordering::Sop => (from, to, edge),
            Ordering::Ops => (to, edge, from),
        };
        vec![a.clone(), b.clone(), c.clone()]
    }

    /// Recover `(from, edge, to)` from a tuple already decoded in this
    /// ordering's component order.
    pub fn unpermute(self, components: &[TupleElement]) -> Option<(TupleElement, TupleElement, TupleElement)> {
        if components.len() < 3 {
            return None;
        }
        let (a, b, c) = (components[0].clone(), components[1].clone(), components[2].clone());
        Some(match self {
            Ordering::Out | Ordering::Pso => (b, a, c), // a=edge,b=from,c=to
            Ordering::In | Ordering::Pos => (c, a, b),  // a=edge,b=to,c=from
            Ordering::Spo => (a, b, c),
            Ordering::Osp => (b, c, a), // a=to,b=from,c=edge
            Ordering::Sop => (a, c, b), // a=from,b=to,c=edge
            Ordering::Ops => (c, b, a), // a=to,b=edge,c=from
        })
    }
}

/// A family of storage strategies maintaining redundant key orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStrategy {
    /// Two orderings: OUT, IN. `edge` defaults to empty string if absent.
    Adjacency,
    /// Three orderings: SPO, POS, OSP.
    TripleStore,
    /// Six orderings: SPO, SOP, PSO, POS, OSP, OPS.
    Hexastore,
}

impl IndexStrategy {
    /// Every ordering this strategy maintains.
    pub fn orderings(self) -> &'static [Ordering] {
        match self {
            IndexStrategy::Adjacency => &[Ordering::Out, Ordering::In],
            IndexStrategy::TripleStore => &[Ordering::Spo, Ordering::Pos, Ordering::Osp],
            IndexStrategy::Hexastore => &[
                Ordering::Spo,
                Ordering::Sop,
                Ordering::Pso,
                Ordering::Pos,
                Ordering::Osp,
                Ordering::Ops,
            ],
        }
    }

    /// Whether this strategy has a dedicated edge-label component distinct
    /// from the adjacency orderings' `(label, node)` prefix.
    pub fn has_edge_component(self) -> bool {
        !matches!(self, IndexStrategy::Adjacency)
    }

    /// Shape of which triple positions are bound in a query: `(from, edge,
    /// to)`. Selects the ordering giving a single contiguous range scan when
    /// one exists.
    ///
    /// Adjacency only maintains OUT/IN, so two shapes
    /// (`T,F,T` and `F,T,F`) name an ordering (OSP, POS) adjacency never
    /// builds. For those, this falls back to OUT: adjacency widens to a
    /// full subspace scan and filters in memory whenever the requested
    /// slice isn't a prefix of OUT/IN. A fourth `(from, to)` adjacency
    /// index would close this gap but isn't implemented — the fallback
    /// does not change correctness, only how much is scanned before
    /// filtering.
    pub fn select_ordering(self, from_bound: bool, edge_bound: bool, to_bound: bool) -> Ordering {
        use IndexStrategy::*;
        match (self, from_bound, edge_bound, to_bound) {
            (Adjacency, false, _, true) => Ordering::In,
            (Adjacency, _, _, _) => Ordering::Out,

            (TripleStore, true, false, true) => Ordering::Osp,
            (TripleStore, true, _, _) => Ordering::Spo,
            (TripleStore, false, true, true) => Ordering::Pos,
            (TripleStore, false, true, false) => Ordering::Pos,
            (TripleStore, false, false, true) => Ordering::Osp,
            (TripleStore, false, false, false) => Ordering::Spo,

            (Hexastore, true, false, true) => Ordering::Sop,
            (Hexastore, true, _, _) => Ordering::Spo,
            (Hexastore, false, true, true) => Ordering::Pos,
            (Hexastore, false, true, false) => Ordering::Pso,
            (Hexastore, false, false, true) => Ordering::Osp,
            (Hexastore, false, false, false) => Ordering::Spo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_model::TupleElement as E;

    #[test]
    fn permute_and_unpermute_round_trip_every_ordering() {
        let from = E::from("s");
        let edge = E::from("p");
        let to = E::from("o");
        for ordering in IndexStrategy::Hexastore.orderings() {
            let permuted = ordering.permute(&from, &edge, &to);
            let (f, e, t) = ordering.unpermute(&permuted).unwrap();
            assert_eq!(f, from);
            assert_eq!(e, edge);
            assert_eq!(t, to);
        }
    }

    #[test]
    fn adjacency_has_two_orderings() {
        assert_eq!(IndexStrategy::Adjacency.orderings().len(), 2);
        assert_eq!(IndexStrategy::TripleStore.orderings().len(), 3);
        assert_eq!(IndexStrategy::Hexastore.orderings().len(), 6);
    }

    #[test]
    fn selector_matches_spec_table_sample_rows() {
        assert_eq!(
            IndexStrategy::Adjacency.select_ordering(true, true, true),
            Ordering::Out
        );
        assert_eq!(
            IndexStrategy::TripleStore.select_ordering(true, false, true),
            Ordering::Osp
        );
        assert_eq!(
            IndexStrategy::Hexastore.select_ordering(true, false, true),
            Ordering::Sop
        );
        assert_eq!(
            IndexStrategy::Hexastore.select_ordering(false, true, false),
            Ordering::Pso
        );
        assert_eq!(
            IndexStrategy::TripleStore.select_ordering(false, true, false),
            Ordering::Pos
        );
    }
}
