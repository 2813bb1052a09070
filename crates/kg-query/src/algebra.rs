//! Query algebra: graph patterns, property paths, expressions, and the four
//! SPARQL query forms plus Update.
//!
//! Every tree here is a pure owned value — no lifetimes, no shared
//! ownership. Recursive variants box their children so the enums stay a
//! fixed size; callers clone freely.

use crate::term::{Iri, Quad, Term, TriplePattern, Variable};

/// A property path expression (precedence: Alternative >
/// Sequence > Inverse > Elt).
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyPath {
    /// A plain predicate IRI used as a path of length exactly one.
    Iri(Iri),
    /// `^p` — traverse `p` backwards.
    Inverse(Box<PropertyPath>),
    /// `p/q` — concatenation.
    Sequence(Box<PropertyPath>, Box<PropertyPath>),
    /// `p|q` — either path matches.
    Alternative(Box<PropertyPath>, Box<PropertyPath>),
    /// `p*` — zero or more repetitions.
    ZeroOrMore(Box<PropertyPath>),
    /// `p+` — one or more repetitions.
    OneOrMore(Box<PropertyPath>),
    /// `p?` — zero or one repetition.
    ZeroOrOne(Box<PropertyPath>),
    /// `!(p1|...|pn)` — negated property set; each `pi` is an IRI or an
    /// inverted IRI (only this restricted form is allowed inside `!(...)`).
    Negation(Vec<NegatedPathItem>),
}

/// One element of a negated property set: a plain predicate or its inverse.
#[derive(Debug, Clone, PartialEq)]
pub enum NegatedPathItem {
    /// `p` — forward predicate excluded from the match.
    Forward(Iri),
    /// `^p` — inverse predicate excluded from the match.
    Inverse(Iri),
}

/// A basic-graph-pattern-or-higher node in the query algebra, following the
/// canonical `GroupGraphPatternSub` translation.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphPattern {
    /// Conjunction of triple patterns (a BGP). The canonical flattening of
    /// adjacent basic patterns during lowering.
    Basic(Vec<TriplePattern>),
    /// `l AND r` (plain join, e.g. adjacent blocks/VALUES/GRAPH/SERVICE in a
    /// `GroupGraphPatternSub`). Associative.
    Join(Box<GraphPattern>, Box<GraphPattern>),
    /// `OPTIONAL { r }` attached to `l`, with an optional filter expression
    /// evaluated as part of the join condition.
    LeftJoin(Box<GraphPattern>, Box<GraphPattern>, Option<Expression>),
    /// `MINUS { r }`.
    Minus(Box<GraphPattern>, Box<GraphPattern>),
    /// `{ l } UNION { r }`.
    Union(Box<GraphPattern>, Box<GraphPattern>),
    /// `FILTER(expr)` applied to `input`.
    Filter(Box<GraphPattern>, Expression),
    /// `BIND(expr AS ?var)` applied to `input`.
    Bind(Box<GraphPattern>, Variable, Expression),
    /// `GRAPH name { input }`.
    Graph(Term, Box<GraphPattern>),
    /// `SERVICE [SILENT] endpoint { input }`. Execution is external;
    /// the parser only recognizes the clause.
    Service(Term, Box<GraphPattern>, bool),
    /// `VALUES (vars) { rows }`. A row entry of `None` is `UNDEF`.
    Values(Vec<Variable>, Vec<Vec<Option<Term>>>),
    /// `LATERAL { r }` — `r` may reference variables bound by `l`.
    Lateral(Box<GraphPattern>, Box<GraphPattern>),
    /// A property path triple: `subject path object`.
    PropertyPath {
        /// Subject position.
        subject: Term,
        /// The path itself.
        path: PropertyPath,
        /// Object position.
        object: Term,
    },
    /// A nested `SELECT` used as a sub-pattern.
    Subquery(Box<SelectQuery>),
}

impl GraphPattern {
    /// The neutral element for `Join`: an empty BGP, used during lowering
    /// wherever the source grammar would have emitted a
    /// structurally-empty `basic([])`.
    pub fn empty() -> Self {
        GraphPattern::Basic(Vec::new())
    }

    /// True for the neutral empty BGP.
    pub fn is_empty_basic(&self) -> bool {
        matches!(self, GraphPattern::Basic(v) if v.is_empty())
    }
}

/// Ordering key for `ORDER BY`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCondition {
    /// The expression to sort by.
    pub expr: Expression,
    /// `true` for `DESC`, `false` for (implicit or explicit) `ASC`.
    pub descending: bool,
}

/// One item of a `SELECT` projection.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionItem {
    /// A bare projected variable.
    Var(Variable),
    /// `(expr AS ?v)`.
    Expr(Expression, Variable),
}

/// The `SELECT` clause's projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `SELECT *`.
    All,
    /// An explicit, ordered list of projected items.
    Items(Vec<ProjectionItem>),
}

/// `FROM`/`FROM NAMED` dataset clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// `FROM <iri>` entries (default graph).
    pub default: Vec<Iri>,
    /// `FROM NAMED <iri>` entries.
    pub named: Vec<Iri>,
}

/// Solution modifiers shared by every query form that has them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolutionModifiers {
    /// `GROUP BY` keys (plain variables or `(expr AS ?v)` forms, the latter
    /// introducing the bound variable into scope for `HAVING`/projection).
    pub group_by: Vec<ProjectionItem>,
    /// `HAVING` conditions, evaluated after grouping.
    pub having: Vec<Expression>,
    /// `ORDER BY` conditions, applied last before slicing.
    pub order_by: Vec<OrderCondition>,
    /// `LIMIT`.
    pub limit: Option<u64>,
    /// `OFFSET`.
    pub offset: Option<u64>,
}

/// A `SELECT` query.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// `DISTINCT`.
    pub distinct: bool,
    /// `REDUCED`.
    pub reduced: bool,
    /// Projected variables/expressions.
    pub projection: Projection,
    /// `FROM`/`FROM NAMED`.
    pub dataset: Dataset,
    /// The `WHERE` pattern.
    pub pattern: GraphPattern,
    /// Solution modifiers.
    pub modifiers: SolutionModifiers,
}

/// A `CONSTRUCT` query.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructQuery {
    /// The construct template. For the `CONSTRUCT WHERE { ... }` shorthand
    /// this equals the WHERE clause's BGP.
    pub template: Vec<TriplePattern>,
    /// `FROM`/`FROM NAMED`.
    pub dataset: Dataset,
    /// The `WHERE` pattern.
    pub pattern: GraphPattern,
    /// Solution modifiers.
    pub modifiers: SolutionModifiers,
}

/// An `ASK` query.
#[derive(Debug, Clone, PartialEq)]
pub struct AskQuery {
    /// `FROM`/`FROM NAMED`.
    pub dataset: Dataset,
    /// The `WHERE` pattern.
    pub pattern: GraphPattern,
}

/// `DESCRIBE`'s target list.
#[derive(Debug, Clone, PartialEq)]
pub enum DescribeTarget {
    /// `DESCRIBE *`.
    All,
    /// An explicit list of IRIs/variables.
    List(Vec<Term>),
}

/// A `DESCRIBE` query.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeQuery {
    /// What to describe.
    pub targets: DescribeTarget,
    /// `FROM`/`FROM NAMED`.
    pub dataset: Dataset,
    /// The (optional) `WHERE` pattern restricting which resources qualify.
    pub pattern: Option<GraphPattern>,
    /// Solution modifiers.
    pub modifiers: SolutionModifiers,
}

/// `CLEAR`/`DROP`'s target.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphTarget {
    /// A single named graph.
    Graph(Iri),
    /// The default graph.
    Default,
    /// All named graphs (not the default).
    Named,
    /// The default graph plus all named graphs.
    All,
}

/// One SPARQL Update operation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// `INSERT DATA { quads }`.
    InsertData(Vec<Quad>),
    /// `DELETE DATA { quads }`.
    DeleteData(Vec<Quad>),
    /// `DELETE { .. }? INSERT { .. }? USING [NAMED] <iri>* WHERE { pattern }`.
    Modify {
        /// The delete template, empty if the clause was omitted.
        delete: Vec<Quad>,
        /// The insert template, empty if the clause was omitted.
        insert: Vec<Quad>,
        /// `USING <iri>` entries (default-graph dataset).
        using_default: Vec<Iri>,
        /// `USING NAMED <iri>` entries.
        using_named: Vec<Iri>,
        /// The `WHERE` pattern the templates are instantiated against.
        pattern: GraphPattern,
    },
    /// `LOAD [SILENT] <src> [INTO GRAPH <dst>]`.
    Load {
        /// Suppress errors.
        silent: bool,
        /// Source document IRI.
        source: Iri,
        /// Destination named graph, `None` loads into the default graph.
        into: Option<Iri>,
    },
    /// `CLEAR [SILENT] target`.
    Clear {
        /// Suppress errors.
        silent: bool,
        /// The target to clear.
        target: GraphTarget,
    },
    /// `CREATE [SILENT] GRAPH <iri>`.
    Create {
        /// Suppress errors.
        silent: bool,
        /// The graph to create.
        graph: Iri,
    },
    /// `DROP [SILENT] target`.
    Drop {
        /// Suppress errors.
        silent: bool,
        /// The target to drop.
        target: GraphTarget,
    },
}

/// The parsed root of any SPARQL document: one query form, or an ordered
/// sequence of Update operations (a `;`-separated Update request).
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `SELECT`.
    Select(SelectQuery),
    /// `CONSTRUCT`.
    Construct(ConstructQuery),
    /// `ASK`.
    Ask(AskQuery),
    /// `DESCRIBE`.
    Describe(DescribeQuery),
    /// A SPARQL Update request: one or more operations executed in order.
    Update(Vec<UpdateOperation>),
}

/// Comparison operator family for [`Expression::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`.
    Eq,
    /// `!=`.
    Ne,
    /// `<`.
    Lt,
    /// `>`.
    Gt,
    /// `<=`.
    Le,
    /// `>=`.
    Ge,
}

/// Arithmetic operator family for [`Expression::Arith`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`.
    Add,
    /// `-`.
    Sub,
    /// `*`.
    Mul,
    /// `/`.
    Div,
}

/// A recognized built-in function name (the FILTER/BIND/HAVING
/// allow-list). An identifier followed by `(` that is *not* on this list is
/// parsed as [`Expression::FunctionCall`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BuiltinName {
    Str,
    Lang,
    LangMatches,
    Datatype,
    Bound,
    Iri,
    Uri,
    BNode,
    Rand,
    Abs,
    Ceil,
    Floor,
    Round,
    Concat,
    StrLen,
    Ucase,
    Lcase,
    EncodeForUri,
    Contains,
    StrStarts,
    StrEnds,
    StrBefore,
    StrAfter,
    Replace,
    Regex,
    Substr,
    Now,
    Year,
    Month,
    Day,
    Hours,
    Minutes,
    Seconds,
    Timezone,
    Tz,
    Uuid,
    StrUuid,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Coalesce,
    If,
    SameTerm,
    IsIri,
    IsUri,
    IsBlank,
    IsLiteral,
    IsNumeric,
    StrDt,
    StrLang,
    StrLangDir,
    HasLang,
    HasLangDir,
}

/// A built-in function call.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinCall {
    /// Which built-in.
    pub name: BuiltinName,
    /// Argument expressions, in source order.
    pub args: Vec<Expression>,
}

/// An aggregate expression (only legal in a `SELECT` projection, `HAVING`,
/// or `ORDER BY` of a query with `GROUP BY`).
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    /// `COUNT(expr)` or, when `expr` is `None`, `COUNT(*)` — the only
    /// aggregate that permits an unbounded `*` argument.
    Count { distinct: bool, expr: Option<Box<Expression>> },
    /// `SUM(expr)`.
    Sum { distinct: bool, expr: Box<Expression> },
    /// `AVG(expr)`.
    Avg { distinct: bool, expr: Box<Expression> },
    /// `MIN(expr)`.
    Min { distinct: bool, expr: Box<Expression> },
    /// `MAX(expr)`.
    Max { distinct: bool, expr: Box<Expression> },
    /// `SAMPLE(expr)`.
    Sample { distinct: bool, expr: Box<Expression> },
    /// `GROUP_CONCAT(expr [; SEPARATOR = "s"])`.
    GroupConcat { distinct: bool, expr: Box<Expression>, separator: Option<String> },
}

/// A scalar expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A variable or constant term.
    Term(Term),
    /// `a || b`.
    Or(Box<Expression>, Box<Expression>),
    /// `a && b`.
    And(Box<Expression>, Box<Expression>),
    /// `!a`.
    Not(Box<Expression>),
    /// A comparison.
    Compare(CompareOp, Box<Expression>, Box<Expression>),
    /// `a IN (items)` (or, when negated, `a NOT IN (items)`).
    In { expr: Box<Expression>, items: Vec<Expression>, negated: bool },
    /// An arithmetic operation.
    Arith(ArithOp, Box<Expression>, Box<Expression>),
    /// Unary `-a`.
    UnaryMinus(Box<Expression>),
    /// Unary `+a`.
    UnaryPlus(Box<Expression>),
    /// `BOUND(?v)`.
    Bound(Variable),
    /// A call to an IRI-named function not on the built-in allow-list.
    FunctionCall(Iri, Vec<Expression>),
    /// A recognized built-in function call.
    Builtin(Box<BuiltinCall>),
    /// An aggregate.
    Aggregate(Box<Aggregate>),
    /// `EXISTS { pattern }`.
    Exists(Box<GraphPattern>),
    /// `NOT EXISTS { pattern }`.
    NotExists(Box<GraphPattern>),
    /// RDF-star `isTRIPLE(expr)`.
    IsTriple(Box<Expression>),
    /// RDF-star `SUBJECT(expr)`.
    TripleSubject(Box<Expression>),
    /// RDF-star `PREDICATE(expr)`.
    TriplePredicate(Box<Expression>),
    /// RDF-star `OBJECT(expr)`.
    TripleObject(Box<Expression>),
    /// RDF-star `TRIPLE(s, p, o)` constructor.
    TripleConstructor(Box<Expression>, Box<Expression>, Box<Expression>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Iri;

    #[test]
    fn empty_basic_is_detected() {
        assert!(GraphPattern::empty().is_empty_basic());
        assert!(!GraphPattern::Basic(vec![TriplePattern::new(
            Term::Variable(Variable("s".into())),
            Term::Iri(Iri::from("p")),
            Term::Variable(Variable("o".into())),
        )])
        .is_empty_basic());
    }
}
