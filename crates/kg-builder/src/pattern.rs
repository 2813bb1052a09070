//! Fluent construction of [`GraphPattern`] trees.
//!
//! Every method takes `self` by value and returns a new value: none of
//! these mutate a shared receiver, so a caller can branch a builder (clone
//! it, then chain different tails on each clone) without the branches
//! observing each other.

use kg_query::{Expression, GraphPattern, TriplePattern, Variable};

/// Wraps a [`GraphPattern`] under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternBuilder(GraphPattern);

impl PatternBuilder {
    /// Starts from the empty BGP (the neutral element for `Join`).
    pub fn new() -> Self {
        PatternBuilder(GraphPattern::empty())
    }

    /// Starts from an already-built pattern (e.g. the parser's output).
    pub fn from_pattern(pattern: GraphPattern) -> Self {
        PatternBuilder(pattern)
    }

    /// Appends one triple pattern. Consecutive calls fold into a single
    /// [`GraphPattern::Basic`] rather than nesting `Join`s, matching the
    /// canonical flattening required of adjacent basic patterns.
    pub fn triple(self, triple: TriplePattern) -> Self {
        match self.0 {
            GraphPattern::Basic(mut triples) => {
                triples.push(triple);
                PatternBuilder(GraphPattern::Basic(triples))
            }
            other if matches!(other, GraphPattern::Basic(ref v) if v.is_empty()) => {
                PatternBuilder(GraphPattern::Basic(vec![triple]))
            }
            other => PatternBuilder(GraphPattern::Join(
                Box::new(other),
                Box::new(GraphPattern::Basic(vec![triple])),
            )),
        }
    }

    /// `self JOIN other` (plain conjunction).
    pub fn join(self, other: GraphPattern) -> Self {
        if self.0.is_empty_basic() {
            return PatternBuilder(other);
        }
        PatternBuilder(GraphPattern::Join(Box::new(self.0), Box::new(other)))
    }

    /// `OPTIONAL { other }`, with an optional extra filter over the join.
    pub fn optional(self, other: GraphPattern, filter: Option<Expression>) -> Self {
        PatternBuilder(GraphPattern::LeftJoin(Box::new(self.0), Box::new(other), filter))
    }

    /// `MINUS { other }`.
    pub fn minus(self, other: GraphPattern) -> Self {
        PatternBuilder(GraphPattern::Minus(Box::new(self.0), Box::new(other)))
    }

    /// `{ self } UNION { other }`.
    pub fn union(self, other: GraphPattern) -> Self {
        PatternBuilder(GraphPattern::Union(Box::new(self.0), Box::new(other)))
    }

    /// `FILTER(expr)`.
    pub fn filter(self, expr: Expression) -> Self {
        PatternBuilder(GraphPattern::Filter(Box::new(self.0), expr))
    }

    /// `BIND(expr AS ?var)`.
    pub fn bind(self, var: Variable, expr: Expression) -> Self {
        PatternBuilder(GraphPattern::Bind(Box::new(self.0), var, expr))
    }

    /// Finishes the tree.
    pub fn build(self) -> GraphPattern {
        self.0
    }
}

impl Default for PatternBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_query::{Iri, Term};

    fn t(s: &str, p: &str, o: &str) -> TriplePattern {
        TriplePattern::new(Term::Iri(Iri::from(s)), Term::Iri(Iri::from(p)), Term::Iri(Iri::from(o)))
    }

    #[test]
    fn consecutive_triples_fold_into_one_basic() {
        let pattern = PatternBuilder::new().triple(t("a", "p", "b")).triple(t("a", "p", "c")).build();
        assert_eq!(pattern, GraphPattern::Basic(vec![t("a", "p", "b"), t("a", "p", "c")]));
    }

    #[test]
    fn branching_a_clone_does_not_affect_the_original() {
        let base = PatternBuilder::new().triple(t("a", "p", "b"));
        let branch_a = base.clone().triple(t("a", "p", "c")).build();
        let branch_b = base.clone().triple(t("a", "p", "d")).build();
        assert_ne!(branch_a, branch_b);
        assert_eq!(base.build(), GraphPattern::Basic(vec![t("a", "p", "b")]));
    }

    #[test]
    fn optional_wraps_as_left_join() {
        let inner = PatternBuilder::new().triple(t("a", "p", "b")).build();
        let pattern = PatternBuilder::new().triple(t("a", "q", "c")).optional(inner.clone(), None).build();
        assert!(matches!(pattern, GraphPattern::LeftJoin(_, r, None) if *r == inner));
    }
}
