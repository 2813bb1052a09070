//! SQL tokenizer, recursive-descent parser, and SQL/PGQ `GRAPH_TABLE`
//! pattern AST.
//!
//! [`ast`] defines the SQL statement/expression tree (`SelectStatement`,
//! `Expression`, joins, CTEs); [`graph_table`] defines the `GRAPH_TABLE(...
//! MATCH ... COLUMNS ...)` path-pattern shapes layered on top of it;
//! [`lexer`] and [`parser`] turn SQL source text into a [`Statement`].
//! Shares [`kg_query::CompareOp`]/[`kg_query::ArithOp`] with the SPARQL
//! frontend rather than redefining equivalent operator enums.
//!
//! Parsing is pure and single-shot, mirroring `kg_query`'s contract: no
//! I/O, and a failed parse discards partial state.

#![warn(missing_docs, rust_2018_idioms)]

mod ast;
mod error;
mod graph_table;
mod lexer;
mod parser;

pub use ast::{
    AggregateCall, CaseExpr, ColumnRef, CteDef, Expression, FromClause, JoinClause, JoinCondition,
    JoinKind, Literal, NullsOrder, OrderByItem, SelectItem, SelectStatement, SortDirection,
    Statement, TableRef,
};
pub use error::{ParseError, ParseResult};
pub use graph_table::{
    EdgeDetail, EdgeDirection, EdgePattern, GraphTable, GraphTableColumn, NodePattern, PathMode,
    PathPattern, PropertyMap,
};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, parse_select};
