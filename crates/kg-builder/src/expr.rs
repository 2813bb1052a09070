//! Small fluent helpers for building [`Expression`] trees without writing
//! out the boxed constructors by hand.

use kg_query::{CompareOp, Expression, Term};

/// Wraps an [`Expression`] under construction. Every combinator consumes
/// `self` and returns a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprBuilder(Expression);

impl ExprBuilder {
    /// Wraps a constant or variable term.
    pub fn term(term: Term) -> Self {
        ExprBuilder(Expression::Term(term))
    }

    /// Wraps an already-built expression.
    pub fn from_expr(expr: Expression) -> Self {
        ExprBuilder(expr)
    }

    /// `self OP other`.
    pub fn compare(self, op: CompareOp, other: ExprBuilder) -> Self {
        ExprBuilder(Expression::Compare(op, Box::new(self.0), Box::new(other.0)))
    }

    /// `self && other`.
    pub fn and(self, other: ExprBuilder) -> Self {
        ExprBuilder(Expression::And(Box::new(self.0), Box::new(other.0)))
    }

    /// `self || other`.
    pub fn or(self, other: ExprBuilder) -> Self {
        ExprBuilder(Expression::Or(Box::new(self.0), Box::new(other.0)))
    }

    /// `!self`.
    pub fn not(self) -> Self {
        ExprBuilder(Expression::Not(Box::new(self.0)))
    }

    /// Finishes the expression.
    pub fn build(self) -> Expression {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_query::{Iri, Variable};

    #[test]
    fn builds_a_compare_and_conjunction() {
        let expr = ExprBuilder::term(Term::Variable(Variable("x".into())))
            .compare(CompareOp::Eq, ExprBuilder::term(Term::Iri(Iri::from("a"))))
            .and(ExprBuilder::term(Term::Variable(Variable("y".into()))).not())
            .build();
        assert!(matches!(expr, Expression::And(_, _)));
    }
}
