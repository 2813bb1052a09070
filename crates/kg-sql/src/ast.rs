//! SQL statement and expression AST. A pure value tree, built
//! the same way [`kg_query::algebra`] builds SPARQL's: boxed recursive
//! variants, no shared ownership.

use kg_query::{ArithOp, CompareOp};

use crate::graph_table::GraphTable;

/// A literal scalar appearing in SQL source (`primary` expression leaf).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal.
    Integer(i64),
    /// Decimal/double literal, lexical form preserved for exactness.
    Decimal(String),
    /// Single-quoted string literal, escapes resolved.
    String(String),
    /// `NULL`.
    Null,
    /// `TRUE`/`FALSE`.
    Boolean(bool),
}

/// A column reference, optionally qualified by a table/alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// `table.column`'s `table` part, if qualified.
    pub qualifier: Option<String>,
    /// The column name, or `*` for an unqualified star (only legal as a
    /// bare [`SelectItem::Star`], never nested inside [`Expression`]).
    pub name: String,
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// `NULLS FIRST`/`NULLS LAST` placement for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expression,
    pub direction: SortDirection,
    pub nulls: Option<NullsOrder>,
}

/// `CASE WHEN cond THEN result ... [ELSE else_result] END`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    /// Optional `CASE operand WHEN value THEN ...` simple form; when
    /// `None`, each arm's condition is a full boolean expression (searched
    /// `CASE WHEN cond THEN ...` form).
    pub operand: Option<Box<Expression>>,
    pub arms: Vec<(Expression, Expression)>,
    pub else_result: Option<Box<Expression>>,
}

/// An aggregate function call (`COUNT`, `SUM`, `AVG`, `MIN`, `MAX`).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    pub name: String,
    pub distinct: bool,
    /// `None` only for `COUNT(*)`.
    pub arg: Option<Box<Expression>>,
}

/// A scalar expression tree (precedence: `OR > AND > NOT >
/// comparison > additive > multiplicative > unary > primary`).
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Column(ColumnRef),
    /// A bind parameter (`:name`).
    Param(String),
    Or(Box<Expression>, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Compare(CompareOp, Box<Expression>, Box<Expression>),
    Arith(ArithOp, Box<Expression>, Box<Expression>),
    UnaryMinus(Box<Expression>),
    /// `expr IS [NOT] NULL`.
    IsNull { expr: Box<Expression>, negated: bool },
    /// `expr [NOT] BETWEEN low AND high`.
    Between { expr: Box<Expression>, low: Box<Expression>, high: Box<Expression>, negated: bool },
    /// `expr [NOT] LIKE pattern`.
    Like { expr: Box<Expression>, pattern: Box<Expression>, negated: bool },
    /// `expr [NOT] IN (list...)`.
    InList { expr: Box<Expression>, list: Vec<Expression>, negated: bool },
    /// `expr [NOT] IN (subquery)`.
    InSubquery { expr: Box<Expression>, subquery: Box<SelectStatement>, negated: bool },
    /// A scalar subquery used as an expression (e.g. `(SELECT max(x) ...)`).
    ScalarSubquery(Box<SelectStatement>),
    Case(Box<CaseExpr>),
    Aggregate(Box<AggregateCall>),
    /// A call to a function name not recognized as an aggregate.
    FunctionCall { name: String, args: Vec<Expression> },
}

/// One projected column of a `SELECT` list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*` or `table.*`.
    Star { qualifier: Option<String> },
    /// `expr [AS alias]`.
    Expr { expr: Expression, alias: Option<String> },
}

/// Join kind for [`JoinClause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// A join's matching condition.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    On(Expression),
    Using(Vec<String>),
    /// No condition: only legal with [`JoinKind::Cross`] or an implicit
    /// comma-join (a `FROM` list).
    None,
}

/// One entry of a `FROM` clause's join tree, built left-associatively by
/// the parser: `base` joined against each of `joins` in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub base: TableRef,
    pub joins: Vec<JoinClause>,
}

/// A single `JOIN` applied to the accumulated `FROM` tree so far.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: TableRef,
    pub condition: JoinCondition,
}

/// A table reference: a named table, a parenthesized sub-`SELECT`
/// (alias required), or a `GRAPH_TABLE(...)` construct.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    Named { name: String, alias: Option<String> },
    Subquery { query: Box<SelectStatement>, alias: String },
    GraphTable { table: Box<GraphTable>, alias: Option<String> },
}

/// One `WITH` clause binding: `name [(col, ...)] AS [MATERIALIZED] (query)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CteDef {
    pub name: String,
    pub columns: Vec<String>,
    pub query: Box<SelectStatement>,
    pub materialized: Option<bool>,
}

/// A full `SELECT` statement, including an optional leading `WITH`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub ctes: Vec<CteDef>,
    pub recursive: bool,
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Option<FromClause>,
    pub selection: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectStatement {
    /// A bare `SELECT <items>` with every optional clause empty — the
    /// parser's starting point before clauses are folded in.
    pub fn new(projection: Vec<SelectItem>) -> Self {
        SelectStatement {
            ctes: Vec::new(),
            recursive: false,
            distinct: false,
            projection,
            from: None,
            selection: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

/// The top-level parse result: this frontend only recognizes the
/// `SELECT` family (no `INSERT`/`UPDATE`/`DDL` — physical execution is
/// out of scope).
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
}
