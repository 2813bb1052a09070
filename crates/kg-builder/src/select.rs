//! Fluent construction of a [`SelectQuery`]: the builder
//! produces the same algebra the parser emits for `SELECT`, so downstream
//! code can consume either without branching on provenance.

use kg_query::{
    Dataset, Expression, GraphPattern, Iri, OrderCondition, Projection, ProjectionItem, Variable,
};
use kg_query::{SelectQuery, SolutionModifiers};

/// Builds a [`SelectQuery`] one clause at a time. Every method consumes
/// `self` and returns a new value: never mutate the receiver.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    distinct: bool,
    reduced: bool,
    projection: Projection,
    dataset: Dataset,
    pattern: GraphPattern,
    group_by: Vec<ProjectionItem>,
    having: Vec<Expression>,
    order_by: Vec<OrderCondition>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    /// Starts a `SELECT *` over the empty pattern.
    pub fn new() -> Self {
        SelectBuilder {
            distinct: false,
            reduced: false,
            projection: Projection::All,
            dataset: Dataset::default(),
            pattern: GraphPattern::empty(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// `SELECT DISTINCT`.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// `SELECT REDUCED`.
    pub fn reduced(mut self) -> Self {
        self.reduced = true;
        self
    }

    /// Projects a bare variable. The first call to `select_var`/`select_expr`
    /// switches the projection from the default `*` to an explicit list.
    pub fn select_var(mut self, var: Variable) -> Self {
        self.items_mut().push(ProjectionItem::Var(var));
        self
    }

    /// Projects `(expr AS ?v)`.
    pub fn select_expr(mut self, expr: Expression, var: Variable) -> Self {
        self.items_mut().push(ProjectionItem::Expr(expr, var));
        self
    }

    fn items_mut(&mut self) -> &mut Vec<ProjectionItem> {
        if matches!(self.projection, Projection::All) {
            self.projection = Projection::Items(Vec::new());
        }
        match &mut self.projection {
            Projection::Items(items) => items,
            Projection::All => unreachable!("just normalized to Items"),
        }
    }

    /// `FROM <iri>`.
    pub fn from_default(mut self, iri: Iri) -> Self {
        self.dataset.default.push(iri);
        self
    }

    /// `FROM NAMED <iri>`.
    pub fn from_named(mut self, iri: Iri) -> Self {
        self.dataset.named.push(iri);
        self
    }

    /// Sets the `WHERE` pattern, replacing whatever was there before.
    pub fn where_pattern(mut self, pattern: GraphPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// `GROUP BY` one key.
    pub fn group_by(mut self, item: ProjectionItem) -> Self {
        self.group_by.push(item);
        self
    }

    /// `HAVING` one condition.
    pub fn having(mut self, expr: Expression) -> Self {
        self.having.push(expr);
        self
    }

    /// `ORDER BY` one key.
    pub fn order_by(mut self, expr: Expression, descending: bool) -> Self {
        self.order_by.push(OrderCondition { expr, descending });
        self
    }

    /// `LIMIT`.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// `OFFSET`.
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Finishes the query.
    pub fn build(self) -> SelectQuery {
        SelectQuery {
            distinct: self.distinct,
            reduced: self.reduced,
            projection: self.projection,
            dataset: self.dataset,
            pattern: self.pattern,
            modifiers: SolutionModifiers {
                group_by: self.group_by,
                having: self.having,
                order_by: self.order_by,
                limit: self.limit,
                offset: self.offset,
            },
        }
    }
}

impl Default for SelectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_query::{Term, TriplePattern};

    #[test]
    fn builds_equivalent_query_to_what_the_parser_emits() {
        let built = SelectBuilder::new()
            .select_var(Variable("x".into()))
            .where_pattern(GraphPattern::Basic(vec![TriplePattern::new(
                Term::Variable(Variable("x".into())),
                Term::Iri(Iri::from("p")),
                Term::Variable(Variable("y".into())),
            )]))
            .limit(5)
            .build();
        let parsed = kg_query::parse_select("SELECT ?x WHERE { ?x <p> ?y } LIMIT 5").unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn chaining_does_not_mutate_a_retained_clone() {
        let base = SelectBuilder::new().select_var(Variable("x".into()));
        let extended = base.clone().select_var(Variable("y".into())).build();
        assert_eq!(base.build().projection, Projection::Items(vec![ProjectionItem::Var(Variable("x".into()))]));
        assert_eq!(
            extended.projection,
            Projection::Items(vec![ProjectionItem::Var(Variable("x".into())), ProjectionItem::Var(Variable("y".into()))])
        );
    }
}
