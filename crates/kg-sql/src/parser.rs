//! Recursive-descent parser for SQL SELECT, CTEs, joins, and
//! `GRAPH_TABLE( ... MATCH ... COLUMNS ... )`.

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::graph_table::*;
use crate::lexer::{tokenize, Token, TokenKind};
use kg_query::{ArithOp, CompareOp};

/// Parses a full SQL statement.
pub fn parse(text: &str) -> ParseResult<Statement> {
    let tokens = tokenize(text)?;
    Parser::new(tokens).parse_statement()
}

/// Parses `text` as a `SELECT` statement specifically.
pub fn parse_select(text: &str) -> ParseResult<SelectStatement> {
    match parse(text)? {
        Statement::Select(s) => Ok(s),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].kind
    }

    fn position(&self) -> usize {
        self.tokens[self.pos].position
    }

    fn advance(&mut self) -> TokenKind {
        let tok = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn is_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    fn is_kw_at(&self, offset: usize, kw: &str) -> bool {
        matches!(self.peek_at(offset), TokenKind::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.is_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, kw: &str) -> ParseResult<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.unexpected(format!("keyword `{kw}`")))
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if *self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(format!("{kind:?}")))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: self.peek().describe(),
            position: self.position(),
        }
    }

    fn ident(&mut self) -> ParseResult<String> {
        match self.advance() {
            TokenKind::Ident(s) => Ok(s),
            TokenKind::QuotedIdent(s) => Ok(s),
            other => Err(ParseError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: other.describe(),
                position: self.position(),
            }),
        }
    }

    // ---- top level ----------------------------------------------------

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let stmt = Statement::Select(self.parse_select_statement()?);
        while *self.peek() == TokenKind::Semicolon {
            self.advance();
        }
        if *self.peek() != TokenKind::Eof {
            return Err(self.unexpected("end of input"));
        }
        Ok(stmt)
    }

    fn parse_select_statement(&mut self) -> ParseResult<SelectStatement> {
        let (ctes, recursive) = self.parse_with_clause()?;
        self.expect_kw("SELECT")?;
        let distinct = self.eat_kw("DISTINCT");
        self.eat_kw("ALL");
        let projection = self.parse_select_list()?;
        let from = if self.eat_kw("FROM") { Some(self.parse_from_clause()?) } else { None };
        let selection = if self.eat_kw("WHERE") { Some(self.parse_expr()?) } else { None };
        let group_by = if self.eat_kw("GROUP") {
            self.expect_kw("BY")?;
            self.parse_expr_list()?
        } else {
            Vec::new()
        };
        let having = if self.eat_kw("HAVING") { Some(self.parse_expr()?) } else { None };
        let order_by = if self.eat_kw("ORDER") {
            self.expect_kw("BY")?;
            self.parse_order_by_list()?
        } else {
            Vec::new()
        };
        let limit = if self.eat_kw("LIMIT") { Some(self.parse_u64_literal()?) } else { None };
        let offset = if self.eat_kw("OFFSET") { Some(self.parse_u64_literal()?) } else { None };
        Ok(SelectStatement {
            ctes,
            recursive,
            distinct,
            projection,
            from,
            selection,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_u64_literal(&mut self) -> ParseResult<u64> {
        match self.advance() {
            TokenKind::Integer(s) => s.parse().map_err(|_| ParseError::InvalidSyntax {
                msg: format!("invalid integer literal `{s}`"),
                position: self.position(),
            }),
            other => Err(ParseError::UnexpectedToken {
                expected: "integer literal".to_string(),
                found: other.describe(),
                position: self.position(),
            }),
        }
    }

    fn parse_with_clause(&mut self) -> ParseResult<(Vec<CteDef>, bool)> {
        if !self.eat_kw("WITH") {
            return Ok((Vec::new(), false));
        }
        let recursive = self.eat_kw("RECURSIVE");
        let mut ctes = vec![self.parse_cte_def()?];
        while *self.peek() == TokenKind::Comma {
            self.advance();
            ctes.push(self.parse_cte_def()?);
        }
        Ok((ctes, recursive))
    }

    fn parse_cte_def(&mut self) -> ParseResult<CteDef> {
        let name = self.ident()?;
        let mut columns = Vec::new();
        if *self.peek() == TokenKind::LParen {
            self.advance();
            columns.push(self.ident()?);
            while *self.peek() == TokenKind::Comma {
                self.advance();
                columns.push(self.ident()?);
            }
            self.expect(TokenKind::RParen)?;
        }
        self.expect_kw("AS")?;
        let materialized = if self.eat_kw("MATERIALIZED") {
            Some(true)
        } else if self.is_kw("NOT") && self.is_kw_at(1, "MATERIALIZED") {
            self.advance();
            self.advance();
            Some(false)
        } else {
            None
        };
        self.expect(TokenKind::LParen)?;
        let query = Box::new(self.parse_select_statement()?);
        self.expect(TokenKind::RParen)?;
        Ok(CteDef { name, columns, query, materialized })
    }

    fn parse_select_list(&mut self) -> ParseResult<Vec<SelectItem>> {
        let mut items = vec![self.parse_select_item()?];
        while *self.peek() == TokenKind::Comma {
            self.advance();
            items.push(self.parse_select_item()?);
        }
        Ok(items)
    }

    fn parse_select_item(&mut self) -> ParseResult<SelectItem> {
        if *self.peek() == TokenKind::Star {
            self.advance();
            return Ok(SelectItem::Star { qualifier: None });
        }
        if let TokenKind::Ident(name) = self.peek().clone() {
            if *self.peek_at(1) == TokenKind::Dot && *self.peek_at(2) == TokenKind::Star {
                self.advance();
                self.advance();
                self.advance();
                return Ok(SelectItem::Star { qualifier: Some(name) });
            }
        }
        let expr = self.parse_expr()?;
        let alias = if self.eat_kw("AS") {
            Some(self.ident()?)
        } else if let TokenKind::Ident(name) = self.peek().clone() {
            if !is_clause_keyword(&name) {
                self.advance();
                Some(name)
            } else {
                None
            }
        } else {
            None
        };
        Ok(SelectItem::Expr { expr, alias })
    }

    // ---- FROM / JOIN ----------------------------------------------------

    fn parse_from_clause(&mut self) -> ParseResult<FromClause> {
        let base = self.parse_table_ref()?;
        let mut joins = Vec::new();
        loop {
            if *self.peek() == TokenKind::Comma {
                self.advance();
                joins.push(JoinClause { kind: JoinKind::Cross, table: self.parse_table_ref()?, condition: JoinCondition::None });
                continue;
            }
            let kind = if self.eat_kw("JOIN") || (self.eat_kw("INNER") && self.expect_kw("JOIN").is_ok()) {
                JoinKind::Inner
            } else if self.is_kw("LEFT") {
                self.advance();
                self.eat_kw("OUTER");
                self.expect_kw("JOIN")?;
                JoinKind::Left
            } else if self.is_kw("RIGHT") {
                self.advance();
                self.eat_kw("OUTER");
                self.expect_kw("JOIN")?;
                JoinKind::Right
            } else if self.is_kw("FULL") {
                self.advance();
                self.eat_kw("OUTER");
                self.expect_kw("JOIN")?;
                JoinKind::Full
            } else if self.is_kw("CROSS") {
                self.advance();
                self.expect_kw("JOIN")?;
                JoinKind::Cross
            } else {
                break;
            };
            let table = self.parse_table_ref()?;
            let condition = if self.eat_kw("ON") {
                JoinCondition::On(self.parse_expr()?)
            } else if self.eat_kw("USING") {
                self.expect(TokenKind::LParen)?;
                let mut cols = vec![self.ident()?];
                while *self.peek() == TokenKind::Comma {
                    self.advance();
                    cols.push(self.ident()?);
                }
                self.expect(TokenKind::RParen)?;
                JoinCondition::Using(cols)
            } else {
                JoinCondition::None
            };
            joins.push(JoinClause { kind, table, condition });
        }
        Ok(FromClause { base, joins })
    }

    fn parse_table_ref(&mut self) -> ParseResult<TableRef> {
        if self.is_kw("GRAPH_TABLE") {
            self.advance();
            let table = Box::new(self.parse_graph_table()?);
            let alias = self.parse_optional_alias()?;
            return Ok(TableRef::GraphTable { table, alias });
        }
        if *self.peek() == TokenKind::LParen {
            self.advance();
            let query = Box::new(self.parse_select_statement()?);
            self.expect(TokenKind::RParen)?;
            self.eat_kw("AS");
            let alias = self.ident()?;
            return Ok(TableRef::Subquery { query, alias });
        }
        let name = self.ident()?;
        let alias = self.parse_optional_alias()?;
        Ok(TableRef::Named { name, alias })
    }

    fn parse_optional_alias(&mut self) -> ParseResult<Option<String>> {
        if self.eat_kw("AS") {
            return Ok(Some(self.ident()?));
        }
        if let TokenKind::Ident(name) = self.peek().clone() {
            if !is_clause_keyword(&name) {
                self.advance();
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    // ---- GRAPH_TABLE / MATCH --------------------------------------------

    fn parse_graph_table(&mut self) -> ParseResult<GraphTable> {
        self.expect(TokenKind::LParen)?;
        let graph_name = self.ident()?;
        self.expect(TokenKind::Comma)?;
        self.expect_kw("MATCH")?;
        let mut patterns = vec![self.parse_path_pattern()?];
        while *self.peek() == TokenKind::Comma {
            self.advance();
            patterns.push(self.parse_path_pattern()?);
        }
        let filter = if self.eat_kw("WHERE") { Some(self.parse_expr()?) } else { None };
        let columns = if self.eat_kw("COLUMNS") {
            self.expect(TokenKind::LParen)?;
            let mut cols = vec![self.parse_graph_table_column()?];
            while *self.peek() == TokenKind::Comma {
                self.advance();
                cols.push(self.parse_graph_table_column()?);
            }
            self.expect(TokenKind::RParen)?;
            cols
        } else {
            Vec::new()
        };
        self.expect(TokenKind::RParen)?;
        Ok(GraphTable { graph_name, patterns, filter, columns })
    }

    fn parse_graph_table_column(&mut self) -> ParseResult<GraphTableColumn> {
        let expr = self.parse_expr()?;
        self.expect_kw("AS")?;
        let alias = self.ident()?;
        Ok(GraphTableColumn { expr, alias })
    }

    fn parse_path_pattern(&mut self) -> ParseResult<PathPattern> {
        let path_variable = if let TokenKind::Ident(name) = self.peek().clone() {
            if *self.peek_at(1) == TokenKind::Eq {
                self.advance();
                self.advance();
                Some(name)
            } else {
                None
            }
        } else {
            None
        };
        let mode = self.parse_path_mode()?;
        let mut nodes = vec![self.parse_node_pattern()?];
        let mut edges = Vec::new();
        loop {
            match self.peek() {
                TokenKind::LBracket => return Err(ParseError::MalformedEdgePattern { position: self.position() }),
                TokenKind::Minus | TokenKind::ArrowLeft | TokenKind::ArrowRight => {
                    edges.push(self.parse_edge_pattern()?);
                    nodes.push(self.parse_node_pattern()?);
                }
                _ => break,
            }
        }
        Ok(PathPattern { path_variable, mode, nodes, edges })
    }

    fn parse_path_mode(&mut self) -> ParseResult<Option<PathMode>> {
        if self.eat_kw("WALK") {
            return Ok(Some(PathMode::Walk));
        }
        if self.eat_kw("TRAIL") {
            return Ok(Some(PathMode::Trail));
        }
        if self.eat_kw("ACYCLIC") {
            return Ok(Some(PathMode::Acyclic));
        }
        if self.eat_kw("SIMPLE") {
            return Ok(Some(PathMode::Simple));
        }
        if self.eat_kw("SHORTEST") {
            self.eat_kw("PATH");
            return Ok(Some(PathMode::Shortest));
        }
        if self.is_kw("ALL") && self.is_kw_at(1, "SHORTEST") {
            self.advance();
            self.advance();
            self.eat_kw("PATH");
            return Ok(Some(PathMode::AllShortest));
        }
        Ok(None)
    }

    fn parse_node_pattern(&mut self) -> ParseResult<NodePattern> {
        self.expect(TokenKind::LParen)?;
        let mut pattern = NodePattern::default();
        if let TokenKind::Ident(name) = self.peek().clone() {
            self.advance();
            pattern.variable = Some(name);
        }
        if *self.peek() == TokenKind::Colon {
            self.advance();
            pattern.label = Some(self.ident()?);
        }
        if *self.peek() == TokenKind::LBrace {
            pattern.properties = self.parse_property_map()?;
        }
        self.expect(TokenKind::RParen)?;
        Ok(pattern)
    }

    /// Edge pattern state machine over start/bracket/end tokens. The
    /// lexer emits `->`/`<-` as single atomic tokens, so the
    /// anonymous one-token forms (`->`, `<-`, bare `-`) are consumed
    /// whole before ever looking for a bracket; a bracket seen right after
    /// a consumed `->` is the table's explicit error case (brackets must
    /// precede the arrow head, never follow a closed one).
    fn parse_edge_pattern(&mut self) -> ParseResult<EdgePattern> {
        if *self.peek() == TokenKind::ArrowRight {
            self.advance();
            if *self.peek() == TokenKind::LBracket {
                return Err(ParseError::MalformedEdgePattern { position: self.position() });
            }
            return Ok(EdgePattern { direction: EdgeDirection::Outgoing, detail: None });
        }
        if *self.peek() == TokenKind::ArrowLeft {
            self.advance();
            if *self.peek() != TokenKind::LBracket {
                // Bare `<-`: anonymous incoming, or `<-` immediately
                // followed by a closing `-` (row: start=<-, end=-).
                if *self.peek() == TokenKind::Minus {
                    self.advance();
                }
                return Ok(EdgePattern { direction: EdgeDirection::Incoming, detail: None });
            }
            let detail = Some(self.parse_edge_detail()?);
            let end_right = self.eat_arrow_right_head();
            if !end_right {
                self.expect(TokenKind::Minus)?;
            }
            let direction = if end_right { EdgeDirection::AnyDirection } else { EdgeDirection::Incoming };
            return Ok(EdgePattern { direction, detail });
        }
        self.expect(TokenKind::Minus)?;
        if *self.peek() != TokenKind::LBracket {
            // Bare `-`: anonymous undirected, or `-` immediately followed
            // by a closing `->` (row: start=-, end=->).
            if self.eat_arrow_right_head() {
                return Ok(EdgePattern { direction: EdgeDirection::Outgoing, detail: None });
            }
            return Ok(EdgePattern { direction: EdgeDirection::Undirected, detail: None });
        }
        let detail = Some(self.parse_edge_detail()?);
        let end_right = self.eat_arrow_right_head();
        if !end_right {
            self.expect(TokenKind::Minus)?;
        }
        let direction = if end_right { EdgeDirection::Outgoing } else { EdgeDirection::Undirected };
        Ok(EdgePattern { direction, detail })
    }

    /// Consumes a trailing `->` arrow head (lexed as a single
    /// [`TokenKind::ArrowRight`]).
    fn eat_arrow_right_head(&mut self) -> bool {
        if *self.peek() == TokenKind::ArrowRight {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_edge_detail(&mut self) -> ParseResult<EdgeDetail> {
        self.expect(TokenKind::LBracket)?;
        let mut detail = EdgeDetail::default();
        if let TokenKind::Ident(name) = self.peek().clone() {
            self.advance();
            detail.variable = Some(name);
        }
        if *self.peek() == TokenKind::Colon {
            self.advance();
            detail.label = Some(self.ident()?);
        }
        if *self.peek() == TokenKind::LBrace {
            detail.properties = self.parse_property_map()?;
        }
        self.expect(TokenKind::RBracket)?;
        Ok(detail)
    }

    fn parse_property_map(&mut self) -> ParseResult<PropertyMap> {
        self.expect(TokenKind::LBrace)?;
        let mut props = Vec::new();
        if *self.peek() != TokenKind::RBrace {
            loop {
                let key = self.ident()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expr()?;
                props.push((key, value));
                if *self.peek() == TokenKind::Comma {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(props)
    }

    // ---- ORDER BY -------------------------------------------------------

    fn parse_order_by_list(&mut self) -> ParseResult<Vec<OrderByItem>> {
        let mut items = vec![self.parse_order_by_item()?];
        while *self.peek() == TokenKind::Comma {
            self.advance();
            items.push(self.parse_order_by_item()?);
        }
        Ok(items)
    }

    fn parse_order_by_item(&mut self) -> ParseResult<OrderByItem> {
        let expr = self.parse_expr()?;
        let direction = if self.eat_kw("DESC") {
            SortDirection::Desc
        } else {
            self.eat_kw("ASC");
            SortDirection::Asc
        };
        let nulls = if self.eat_kw("NULLS") {
            if self.eat_kw("FIRST") {
                Some(NullsOrder::First)
            } else {
                self.expect_kw("LAST")?;
                Some(NullsOrder::Last)
            }
        } else {
            None
        };
        Ok(OrderByItem { expr, direction, nulls })
    }

    // ---- expressions: OR > AND > NOT > comparison > additive > multiplicative > unary > primary

    fn parse_expr_list(&mut self) -> ParseResult<Vec<Expression>> {
        let mut exprs = vec![self.parse_expr()?];
        while *self.peek() == TokenKind::Comma {
            self.advance();
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_expr(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_and()?;
        while self.eat_kw("OR") {
            let rhs = self.parse_and()?;
            lhs = Expression::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_not()?;
        while self.eat_kw("AND") {
            let rhs = self.parse_not()?;
            lhs = Expression::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> ParseResult<Expression> {
        if self.eat_kw("NOT") {
            return Ok(Expression::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let lhs = self.parse_additive()?;
        let not_prefix = self.is_kw("NOT")
            && (self.is_kw_at(1, "IN") || self.is_kw_at(1, "BETWEEN") || self.is_kw_at(1, "LIKE"));
        if not_prefix {
            self.advance();
        }
        if self.eat_kw("IN") {
            return self.parse_in_tail(lhs, not_prefix);
        }
        if self.eat_kw("BETWEEN") {
            let low = self.parse_additive()?;
            self.expect_kw("AND")?;
            let high = self.parse_additive()?;
            return Ok(Expression::Between { expr: Box::new(lhs), low: Box::new(low), high: Box::new(high), negated: not_prefix });
        }
        if self.eat_kw("LIKE") {
            let pattern = self.parse_additive()?;
            return Ok(Expression::Like { expr: Box::new(lhs), pattern: Box::new(pattern), negated: not_prefix });
        }
        if not_prefix {
            return Err(self.unexpected("IN, BETWEEN, or LIKE after NOT"));
        }
        if self.is_kw("IS") {
            self.advance();
            let is_not = self.eat_kw("NOT");
            self.expect_kw("NULL")?;
            return Ok(Expression::IsNull { expr: Box::new(lhs), negated: is_not });
        }
        let op = match self.peek() {
            TokenKind::Eq => Some(CompareOp::Eq),
            TokenKind::Ne => Some(CompareOp::Ne),
            TokenKind::Lt => Some(CompareOp::Lt),
            TokenKind::Gt => Some(CompareOp::Gt),
            TokenKind::Le => Some(CompareOp::Le),
            TokenKind::Ge => Some(CompareOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_additive()?;
            return Ok(Expression::Compare(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_in_tail(&mut self, lhs: Expression, negated: bool) -> ParseResult<Expression> {
        self.expect(TokenKind::LParen)?;
        if self.is_kw("SELECT") {
            let subquery = Box::new(self.parse_select_statement()?);
            self.expect(TokenKind::RParen)?;
            return Ok(Expression::InSubquery { expr: Box::new(lhs), subquery, negated });
        }
        let list = self.parse_expr_list()?;
        self.expect(TokenKind::RParen)?;
        Ok(Expression::InList { expr: Box::new(lhs), list, negated })
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expression::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => ArithOp::Mul,
                TokenKind::Slash => ArithOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expression::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if *self.peek() == TokenKind::Minus {
            self.advance();
            return Ok(Expression::UnaryMinus(Box::new(self.parse_unary()?)));
        }
        if *self.peek() == TokenKind::Plus {
            self.advance();
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.peek().clone() {
            TokenKind::Integer(s) => {
                self.advance();
                let n = s.parse::<i64>().map_err(|_| ParseError::InvalidSyntax {
                    msg: format!("invalid integer literal `{s}`"),
                    position: self.position(),
                })?;
                Ok(Expression::Literal(Literal::Integer(n)))
            }
            TokenKind::Decimal(s) => {
                self.advance();
                Ok(Expression::Literal(Literal::Decimal(s)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expression::Literal(Literal::String(s)))
            }
            TokenKind::Param(name) => {
                self.advance();
                Ok(Expression::Param(name))
            }
            TokenKind::LParen => {
                self.advance();
                if self.is_kw("SELECT") {
                    let query = Box::new(self.parse_select_statement()?);
                    self.expect(TokenKind::RParen)?;
                    return Ok(Expression::ScalarSubquery(query));
                }
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Ident(name) => self.parse_ident_led_primary(name),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_ident_led_primary(&mut self, name: String) -> ParseResult<Expression> {
        if name.eq_ignore_ascii_case("NULL") {
            self.advance();
            return Ok(Expression::Literal(Literal::Null));
        }
        if name.eq_ignore_ascii_case("TRUE") {
            self.advance();
            return Ok(Expression::Literal(Literal::Boolean(true)));
        }
        if name.eq_ignore_ascii_case("FALSE") {
            self.advance();
            return Ok(Expression::Literal(Literal::Boolean(false)));
        }
        if name.eq_ignore_ascii_case("CASE") {
            self.advance();
            return self.parse_case();
        }
        if is_aggregate_name(&name) && *self.peek_at(1) == TokenKind::LParen {
            self.advance();
            return self.parse_aggregate(name);
        }
        self.advance();
        if *self.peek() == TokenKind::LParen {
            self.advance();
            let mut args = Vec::new();
            if *self.peek() != TokenKind::RParen {
                args = self.parse_expr_list()?;
            }
            self.expect(TokenKind::RParen)?;
            return Ok(Expression::FunctionCall { name, args });
        }
        if *self.peek() == TokenKind::Dot {
            self.advance();
            let col = self.ident()?;
            return Ok(Expression::Column(ColumnRef { qualifier: Some(name), name: col }));
        }
        Ok(Expression::Column(ColumnRef { qualifier: None, name }))
    }

    fn parse_aggregate(&mut self, name: String) -> ParseResult<Expression> {
        self.expect(TokenKind::LParen)?;
        let distinct = self.eat_kw("DISTINCT");
        let arg = if name.eq_ignore_ascii_case("COUNT") && *self.peek() == TokenKind::Star {
            self.advance();
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(TokenKind::RParen)?;
        Ok(Expression::Aggregate(Box::new(AggregateCall { name: name.to_uppercase(), distinct, arg })))
    }

    fn parse_case(&mut self) -> ParseResult<Expression> {
        let operand = if !self.is_kw("WHEN") { Some(Box::new(self.parse_expr()?)) } else { None };
        let mut arms = Vec::new();
        while self.eat_kw("WHEN") {
            let cond = self.parse_expr()?;
            self.expect_kw("THEN")?;
            let result = self.parse_expr()?;
            arms.push((cond, result));
        }
        if arms.is_empty() {
            return Err(self.unexpected("at least one WHEN arm"));
        }
        let else_result = if self.eat_kw("ELSE") { Some(Box::new(self.parse_expr()?)) } else { None };
        self.expect_kw("END")?;
        Ok(Expression::Case(Box::new(CaseExpr { operand, arms, else_result })))
    }
}

fn is_aggregate_name(name: &str) -> bool {
    matches!(name.to_ascii_uppercase().as_str(), "COUNT" | "SUM" | "AVG" | "MIN" | "MAX")
}

/// Keywords that can start a clause after a `SELECT` item or table
/// reference — used to tell an implicit alias apart from the next clause.
fn is_clause_keyword(word: &str) -> bool {
    matches!(
        word.to_ascii_uppercase().as_str(),
        "FROM" | "WHERE" | "GROUP" | "HAVING" | "ORDER" | "LIMIT" | "OFFSET" | "JOIN" | "INNER" | "LEFT"
            | "RIGHT" | "FULL" | "CROSS" | "ON" | "USING" | "UNION" | "INTERSECT" | "EXCEPT"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_select() {
        let stmt = parse_select("SELECT a, b FROM t WHERE a = 1").unwrap();
        assert_eq!(stmt.projection.len(), 2);
        assert!(stmt.from.is_some());
        assert!(matches!(stmt.selection, Some(Expression::Compare(CompareOp::Eq, _, _))));
    }

    #[test]
    fn parses_join_with_on() {
        let stmt = parse_select("SELECT * FROM a JOIN b ON a.id = b.id").unwrap();
        let from = stmt.from.unwrap();
        assert_eq!(from.joins.len(), 1);
        assert_eq!(from.joins[0].kind, JoinKind::Inner);
        assert!(matches!(from.joins[0].condition, JoinCondition::On(_)));
    }

    #[test]
    fn parses_cte() {
        let stmt = parse_select("WITH x AS (SELECT 1 AS a) SELECT a FROM x").unwrap();
        assert_eq!(stmt.ctes.len(), 1);
        assert_eq!(stmt.ctes[0].name, "x");
    }

    #[test]
    fn parses_case_when() {
        let stmt = parse_select("SELECT CASE WHEN a = 1 THEN 'x' ELSE 'y' END FROM t").unwrap();
        assert!(matches!(stmt.projection[0], SelectItem::Expr { expr: Expression::Case(_), .. }));
    }

    #[test]
    fn parses_in_list_and_between() {
        let stmt = parse_select("SELECT * FROM t WHERE a IN (1, 2, 3) AND b BETWEEN 1 AND 10").unwrap();
        assert!(stmt.selection.is_some());
    }

    #[test]
    fn parses_graph_table_shortest_path() {
        let sql = "SELECT * FROM GRAPH_TABLE(g, MATCH p = ALL SHORTEST (a)-[e:knows]->(b) COLUMNS (a.id AS src)) AS gt";
        let stmt = parse_select(sql).unwrap();
        let from = stmt.from.unwrap();
        match from.base {
            TableRef::GraphTable { table, alias } => {
                assert_eq!(alias, Some("gt".to_string()));
                assert_eq!(table.graph_name, "g");
                let path = &table.patterns[0];
                assert_eq!(path.path_variable.as_deref(), Some("p"));
                assert_eq!(path.mode, Some(PathMode::AllShortest));
                assert_eq!(path.edges[0].direction, EdgeDirection::Outgoing);
                assert_eq!(table.columns.len(), 1);
            }
            _ => panic!("expected GraphTable"),
        }
    }

    #[test]
    fn parses_undirected_and_any_direction_edges() {
        let sql = "SELECT * FROM GRAPH_TABLE(g, MATCH (a)-[e]-(b))";
        let stmt = parse_select(sql).unwrap();
        let from = stmt.from.unwrap();
        if let TableRef::GraphTable { table, .. } = from.base {
            assert_eq!(table.patterns[0].edges[0].direction, EdgeDirection::Undirected);
        } else {
            panic!("expected GraphTable");
        }

        let sql2 = "SELECT * FROM GRAPH_TABLE(g, MATCH (a)<-[e]->(b))";
        let stmt2 = parse_select(sql2).unwrap();
        if let TableRef::GraphTable { table, .. } = stmt2.from.unwrap().base {
            assert_eq!(table.patterns[0].edges[0].direction, EdgeDirection::AnyDirection);
        } else {
            panic!("expected GraphTable");
        }
    }

    #[test]
    fn rejects_bracket_after_arrow_head() {
        let sql = "SELECT * FROM GRAPH_TABLE(g, MATCH (a)->[e](b))";
        assert!(matches!(parse_select(sql), Err(ParseError::MalformedEdgePattern { .. })));
    }

    #[test]
    fn anonymous_edge_with_no_brackets() {
        let sql = "SELECT * FROM GRAPH_TABLE(g, MATCH (a)->(b))";
        let stmt = parse_select(sql).unwrap();
        if let TableRef::GraphTable { table, .. } = stmt.from.unwrap().base {
            assert_eq!(table.patterns[0].edges[0].direction, EdgeDirection::Outgoing);
            assert!(table.patterns[0].edges[0].detail.is_none());
        } else {
            panic!("expected GraphTable");
        }
    }
}
