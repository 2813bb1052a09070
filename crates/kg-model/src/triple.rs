//! The generic `(from, edge, to, graph?)` triple the index core operates on.
//!
//! Unlike the RDF-flavored AST in `kg-query`, this triple is strategy- and
//! vocabulary-agnostic: positions are plain [`TupleElement`]s supplied by
//! whatever item the caller is indexing.

use crate::tuple::TupleElement;
use std::fmt;

/// One edge of the graph: `from -> to`, labeled `edge`, optionally scoped to
/// a named graph.
///
/// `edge` defaults to the empty string under the `adjacency` strategy (see
/// `kg-store::strategy`), which has no dedicated edge-label component.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTriple {
    /// Source node.
    pub from: TupleElement,
    /// Edge label.
    pub edge: TupleElement,
    /// Target node.
    pub to: TupleElement,
    /// Named-graph component. `None` when the index is not graph-aware.
    pub graph: Option<TupleElement>,
}

impl GraphTriple {
    /// Build a triple with no graph component.
    pub fn new(from: impl Into<TupleElement>, edge: impl Into<TupleElement>, to: impl Into<TupleElement>) -> Self {
        Self {
            from: from.into(),
            edge: edge.into(),
            to: to.into(),
            graph: None,
        }
    }

    /// Build a triple scoped to a named graph.
    pub fn with_graph(
        from: impl Into<TupleElement>,
        edge: impl Into<TupleElement>,
        to: impl Into<TupleElement>,
        graph: impl Into<TupleElement>,
    ) -> Self {
        Self {
            from: from.into(),
            edge: edge.into(),
            to: to.into(),
            graph: Some(graph.into()),
        }
    }
}

impl fmt::Display for GraphTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.graph {
            Some(g) => write!(f, "({} {} {} / {})", self.from, self.edge, self.to, g),
            None => write!(f, "({} {} {})", self.from, self.edge, self.to),
        }
    }
}

/// A single edge as yielded by a scanner: scanner-owned, lifetime tied to the
/// enclosing transaction in the external-facing trait, but the core hands
/// callers an owned value once the key has been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeInfo {
    /// Source node.
    pub source: TupleElement,
    /// Target node.
    pub target: TupleElement,
    /// Edge label.
    pub edge_label: TupleElement,
    /// Named-graph component, if the index is graph-aware.
    pub graph: Option<TupleElement>,
}

impl EdgeInfo {
    /// Construct from a decoded [`GraphTriple`].
    pub fn from_triple(t: GraphTriple) -> Self {
        Self {
            source: t.from,
            target: t.to,
            edge_label: t.edge,
            graph: t.graph,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_without_graph_displays_without_slash() {
        let t = GraphTriple::new("a", "p", "b");
        assert_eq!(format!("{t}"), "(\"a\" \"p\" \"b\")");
    }

    #[test]
    fn edge_info_round_trips_from_triple() {
        let t = GraphTriple::with_graph("a", "p", "b", "g1");
        let e = EdgeInfo::from_triple(t);
        assert_eq!(e.source, TupleElement::from("a"));
        assert_eq!(e.graph, Some(TupleElement::from("g1")));
    }
}
