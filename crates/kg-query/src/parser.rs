//! Recursive-descent, LL(1) parser for SPARQL 1.1/1.2 queries and Update.
//! Single-shot: on the first error, no [`Statement`] is
//! produced and any partial parser state is discarded.

use std::collections::HashMap;

use kg_model::vocab;

use crate::algebra::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::resolve::resolve_iri;
use crate::term::{BaseDirection, BlankNode, Iri, Literal, Quad, Term, TriplePattern, Variable};

/// Parses a full SPARQL document (any query form, or an Update request).
pub fn parse(text: &str) -> ParseResult<Statement> {
    let tokens = tokenize(text)?;
    Parser::new(tokens).parse_document()
}

/// Parses `text` as a `SELECT` query specifically, failing if it is any
/// other query form or an Update request.
pub fn parse_select(text: &str) -> ParseResult<SelectQuery> {
    match parse(text)? {
        Statement::Select(q) => Ok(q),
        other => Err(ParseError::InvalidSyntax {
            msg: format!("expected a SELECT query, found {other:?}"),
            position: 0,
        }),
    }
}

/// One element of a `WHERE`-clause triples block: either a plain triple or a
/// property-path triple. A run of [`Elt::Triple`] collapses into a single
/// [`GraphPattern::Basic`]; each [`Elt::Path`] becomes its own
/// [`GraphPattern::PropertyPath`] node, joined in source order.
enum Elt {
    Triple(TriplePattern),
    Path { subject: Term, path: PropertyPath, object: Term },
}

fn fold_elts(elts: Vec<Elt>) -> GraphPattern {
    let mut result: Option<GraphPattern> = None;
    let mut batch = Vec::new();
    fn push(result: &mut Option<GraphPattern>, next: GraphPattern) {
        *result = Some(match result.take() {
            Some(acc) => GraphPattern::Join(Box::new(acc), Box::new(next)),
            None => next,
        });
    }
    for elt in elts {
        match elt {
            Elt::Triple(t) => batch.push(t),
            Elt::Path { subject, path, object } => {
                if !batch.is_empty() {
                    push(&mut result, GraphPattern::Basic(std::mem::take(&mut batch)));
                }
                push(&mut result, GraphPattern::PropertyPath { subject, path, object });
            }
        }
    }
    if !batch.is_empty() {
        push(&mut result, GraphPattern::Basic(batch));
    }
    result.unwrap_or_else(GraphPattern::empty)
}

/// A parsed verb before it's known whether it starts a property path.
enum VerbTerm {
    Term(Term),
    PathStart,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    base: Option<String>,
    prefixes: HashMap<String, String>,
    blank_node_counter: u64,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, base: None, prefixes: HashMap::new(), blank_node_counter: 0 }
    }

    // ---- token-stream primitives -----------------------------------

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens.get(self.pos + offset).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn position(&self) -> usize {
        self.tokens[self.pos].position
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn is_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    /// The `a` keyword is case-sensitive (lowercase only); unlike every
    /// other SPARQL keyword, `A` does not mean `rdf:type`.
    fn is_a_keyword(&self) -> bool {
        matches!(self.peek(), TokenKind::Ident(s) if s == "a")
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
            Err(self.unexpected(format!("keyword {kw}")))
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.unexpected(format!("{kind:?}")))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        if matches!(self.peek(), TokenKind::Eof) {
            return ParseError::UnexpectedEndOfInput;
        }
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: self.peek().describe(),
            position: self.position(),
        }
    }

    fn fresh_blank_node(&mut self) -> BlankNode {
        self.blank_node_counter += 1;
        BlankNode(format!("kg{}", self.blank_node_counter))
    }

    // ---- prologue ----------------------------------------------------

    fn parse_prologue(&mut self) -> ParseResult<()> {
        loop {
            if self.eat_kw("BASE") {
                let iri = self.expect_iriref()?;
                self.base = Some(resolve_iri(self.base.as_deref(), &iri));
            } else if self.eat_kw("PREFIX") {
                let prefix = self.expect_pname_ns()?;
                let iri = self.expect_iriref()?;
                let resolved = resolve_iri(self.base.as_deref(), &iri);
                self.prefixes.insert(prefix, resolved);
            } else if self.eat_kw("VERSION") {
                self.expect_string()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn expect_iriref(&mut self) -> ParseResult<String> {
        match self.advance() {
            TokenKind::Iri(s) => Ok(s),
            _ => Err(self.unexpected("an IRI reference")),
        }
    }

    fn expect_pname_ns(&mut self) -> ParseResult<String> {
        match self.advance() {
            TokenKind::PNameNs(p) => Ok(p),
            TokenKind::PNameLn(p, l) => Ok(format!("{p}:{l}")),
            _ => Err(self.unexpected("a prefix (`p:`)")),
        }
    }

    fn expect_string(&mut self) -> ParseResult<String> {
        match self.advance() {
            TokenKind::String(s) => Ok(s),
            _ => Err(self.unexpected("a string literal")),
        }
    }

    /// Resolves an already-lexed IRI (absolute or relative) to an [`Iri`].
    fn resolve_term_iri(&self, iri: &str) -> Iri {
        Iri(resolve_iri(self.base.as_deref(), iri))
    }

    fn resolve_pname(&self, prefix: &str, local: &str) -> ParseResult<Iri> {
        let ns = self.prefixes.get(prefix).ok_or_else(|| ParseError::InvalidIri {
            msg: format!("undefined prefix `{prefix}`"),
            position: self.position(),
        })?;
        Ok(Iri(format!("{ns}{local}")))
    }

    // ---- top-level dispatch ------------------------------------------

    fn parse_document(&mut self) -> ParseResult<Statement> {
        self.parse_prologue()?;
        if self.is_kw("SELECT") {
            Ok(Statement::Select(self.parse_select_query()?))
        } else if self.is_kw("CONSTRUCT") {
            Ok(Statement::Construct(self.parse_construct_query()?))
        } else if self.is_kw("ASK") {
            Ok(Statement::Ask(self.parse_ask_query()?))
        } else if self.is_kw("DESCRIBE") {
            Ok(Statement::Describe(self.parse_describe_query()?))
        } else {
            Ok(Statement::Update(self.parse_update()?))
        }
    }

    // ---- SELECT --------------------------------------------------------

    fn parse_select_query(&mut self) -> ParseResult<SelectQuery> {
        self.expect_kw("SELECT")?;
        let distinct = self.eat_kw("DISTINCT");
        let reduced = !distinct && self.eat_kw("REDUCED");
        let projection = self.parse_projection()?;
        let dataset = self.parse_dataset_clauses()?;
        self.expect_kw("WHERE")?;
        let pattern = self.parse_group_graph_pattern()?;
        let modifiers = self.parse_solution_modifiers()?;
        Ok(SelectQuery { distinct, reduced, projection, dataset, pattern, modifiers })
    }

    fn parse_projection(&mut self) -> ParseResult<Projection> {
        if self.eat(&TokenKind::Star) {
            return Ok(Projection::All);
        }
        let mut items = Vec::new();
        loop {
            if let TokenKind::Variable(name) = self.peek().clone() {
                self.advance();
                items.push(ProjectionItem::Var(Variable(name)));
            } else if self.eat(&TokenKind::LParen) {
                let expr = self.parse_expression()?;
                self.expect_kw("AS")?;
                let var = self.expect_variable()?;
                self.expect(TokenKind::RParen)?;
                items.push(ProjectionItem::Expr(expr, var));
            } else {
                break;
            }
        }
        if items.is_empty() {
            return Err(self.unexpected("a projected variable, `(expr AS ?v)`, or `*`"));
        }
        Ok(Projection::Items(items))
    }

    fn expect_variable(&mut self) -> ParseResult<Variable> {
        match self.advance() {
            TokenKind::Variable(name) => Ok(Variable(name)),
            _ => Err(self.unexpected("a variable")),
        }
    }

    fn parse_dataset_clauses(&mut self) -> ParseResult<Dataset> {
        let mut dataset = Dataset::default();
        while self.is_kw("FROM") {
            self.advance();
            if self.eat_kw("NAMED") {
                dataset.named.push(self.parse_iri_ref_term()?);
            } else {
                dataset.default.push(self.parse_iri_ref_term()?);
            }
        }
        Ok(dataset)
    }

    fn parse_iri_ref_term(&mut self) -> ParseResult<Iri> {
        match self.advance() {
            TokenKind::Iri(s) => Ok(self.resolve_term_iri(&s)),
            TokenKind::PNameLn(p, l) => self.resolve_pname(&p, &l),
            TokenKind::PNameNs(p) => self.resolve_pname(&p, ""),
            _ => Err(self.unexpected("an IRI")),
        }
    }

    fn parse_solution_modifiers(&mut self) -> ParseResult<SolutionModifiers> {
        let mut modifiers = SolutionModifiers::default();
        if self.eat_kw("GROUP") {
            self.expect_kw("BY")?;
            loop {
                modifiers.group_by.push(self.parse_group_condition()?);
                if !self.starts_group_condition() {
                    break;
                }
            }
        }
        if self.eat_kw("HAVING") {
            loop {
                modifiers.having.push(self.parse_expression()?);
                if !self.starts_expression() {
                    break;
                }
            }
        }
        if self.eat_kw("ORDER") {
            self.expect_kw("BY")?;
            loop {
                modifiers.order_by.push(self.parse_order_condition()?);
                if !self.starts_order_condition() {
                    break;
                }
            }
        }
        if self.eat_kw("LIMIT") {
            modifiers.limit = Some(self.expect_unsigned_integer()?);
        }
        if self.eat_kw("OFFSET") {
            modifiers.offset = Some(self.expect_unsigned_integer()?);
        }
        // LIMIT/OFFSET may appear in either order.
        if modifiers.offset.is_none() && self.eat_kw("OFFSET") {
            modifiers.offset = Some(self.expect_unsigned_integer()?);
        }
        if modifiers.limit.is_none() && self.eat_kw("LIMIT") {
            modifiers.limit = Some(self.expect_unsigned_integer()?);
        }
        Ok(modifiers)
    }

    fn starts_group_condition(&self) -> bool {
        matches!(self.peek(), TokenKind::Variable(_) | TokenKind::LParen)
    }

    fn parse_group_condition(&mut self) -> ParseResult<ProjectionItem> {
        if let TokenKind::Variable(name) = self.peek().clone() {
            self.advance();
            return Ok(ProjectionItem::Var(Variable(name)));
        }
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expression()?;
        if self.eat_kw("AS") {
            let var = self.expect_variable()?;
            self.expect(TokenKind::RParen)?;
            Ok(ProjectionItem::Expr(expr, var))
        } else {
            self.expect(TokenKind::RParen)?;
            let bnode = self.fresh_blank_node();
            Ok(ProjectionItem::Expr(expr, Variable(format!(".{}", bnode.0))))
        }
    }

    fn expect_unsigned_integer(&mut self) -> ParseResult<u64> {
        match self.advance() {
            TokenKind::Integer(s) => s.parse().map_err(|_| ParseError::InvalidSyntax {
                msg: format!("integer literal `{s}` out of range"),
                position: self.position(),
            }),
            _ => Err(self.unexpected("an integer")),
        }
    }

    fn starts_order_condition(&self) -> bool {
        self.is_kw("ASC") || self.is_kw("DESC") || self.starts_expression()
    }

    fn parse_order_condition(&mut self) -> ParseResult<OrderCondition> {
        if self.eat_kw("ASC") {
            self.expect(TokenKind::LParen)?;
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(OrderCondition { expr, descending: false });
        }
        if self.eat_kw("DESC") {
            self.expect(TokenKind::LParen)?;
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(OrderCondition { expr, descending: true });
        }
        Ok(OrderCondition { expr: self.parse_expression()?, descending: false })
    }

    fn starts_expression(&self) -> bool {
        if matches!(self.peek(), TokenKind::Eof | TokenKind::RBrace | TokenKind::RParen) {
            return false;
        }
        // Solution-modifier keywords that can follow a HAVING/ORDER BY
        // condition list are not the start of another expression.
        const FOLLOW_KEYWORDS: &[&str] = &["ORDER", "GROUP", "HAVING", "LIMIT", "OFFSET", "VALUES"];
        !FOLLOW_KEYWORDS.iter().any(|kw| self.is_kw(kw))
    }

    // ---- CONSTRUCT / ASK / DESCRIBE ------------------------------------

    fn parse_construct_query(&mut self) -> ParseResult<ConstructQuery> {
        self.expect_kw("CONSTRUCT")?;
        if self.eat(&TokenKind::LBrace) {
            let template = self.parse_construct_template_body()?;
            let dataset = self.parse_dataset_clauses()?;
            self.expect_kw("WHERE")?;
            let pattern = self.parse_group_graph_pattern()?;
            let modifiers = self.parse_solution_modifiers()?;
            Ok(ConstructQuery { template, dataset, pattern, modifiers })
        } else {
            // `CONSTRUCT WHERE { ... }` shorthand: template == WHERE's BGP.
            let dataset = self.parse_dataset_clauses()?;
            self.expect_kw("WHERE")?;
            let pattern = self.parse_group_graph_pattern()?;
            let template = extract_bgp_triples(&pattern);
            let modifiers = self.parse_solution_modifiers()?;
            Ok(ConstructQuery { template, dataset, pattern, modifiers })
        }
    }

    fn parse_construct_template_body(&mut self) -> ParseResult<Vec<TriplePattern>> {
        if self.eat(&TokenKind::RBrace) {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        self.parse_triples_block_plain(&mut out)?;
        self.expect(TokenKind::RBrace)?;
        Ok(out)
    }

    fn parse_ask_query(&mut self) -> ParseResult<AskQuery> {
        self.expect_kw("ASK")?;
        let dataset = self.parse_dataset_clauses()?;
        self.expect_kw("WHERE")?;
        let pattern = self.parse_group_graph_pattern()?;
        Ok(AskQuery { dataset, pattern })
    }

    fn parse_describe_query(&mut self) -> ParseResult<DescribeQuery> {
        self.expect_kw("DESCRIBE")?;
        let targets = if self.eat(&TokenKind::Star) {
            DescribeTarget::All
        } else {
            let mut list = Vec::new();
            loop {
                list.push(self.parse_var_or_term()?);
                if !matches!(
                    self.peek(),
                    TokenKind::Variable(_) | TokenKind::Iri(_) | TokenKind::PNameLn(..) | TokenKind::PNameNs(_)
                ) {
                    break;
                }
            }
            DescribeTarget::List(list)
        };
        let dataset = self.parse_dataset_clauses()?;
        let pattern = if self.eat_kw("WHERE") { Some(self.parse_group_graph_pattern()?) } else { None };
        let modifiers = self.parse_solution_modifiers()?;
        Ok(DescribeQuery { targets, dataset, pattern, modifiers })
    }

    // ---- GroupGraphPatternSub canonical translation --------------------

    fn parse_group_graph_pattern(&mut self) -> ParseResult<GraphPattern> {
        self.expect(TokenKind::LBrace)?;
        if self.is_kw("SELECT") {
            let sub = self.parse_select_query()?;
            self.expect(TokenKind::RBrace)?;
            return Ok(GraphPattern::Subquery(Box::new(sub)));
        }
        let pattern = self.parse_group_graph_pattern_sub()?;
        self.expect(TokenKind::RBrace)?;
        Ok(pattern)
    }

    fn parse_group_graph_pattern_sub(&mut self) -> ParseResult<GraphPattern> {
        let mut elts = Vec::new();
        self.parse_where_triples_block(&mut elts)?;
        let mut acc = fold_elts(elts);

        loop {
            if matches!(self.peek(), TokenKind::RBrace) {
                break;
            }
            if self.eat_kw("OPTIONAL") {
                let q = self.parse_group_graph_pattern()?;
                acc = GraphPattern::LeftJoin(Box::new(acc), Box::new(q), None);
            } else if self.eat_kw("MINUS") {
                let q = self.parse_group_graph_pattern()?;
                acc = GraphPattern::Minus(Box::new(acc), Box::new(q));
            } else if self.eat_kw("LATERAL") {
                let q = self.parse_group_graph_pattern()?;
                acc = GraphPattern::Lateral(Box::new(acc), Box::new(q));
            } else if self.eat_kw("FILTER") {
                let expr = self.parse_constraint()?;
                acc = GraphPattern::Filter(Box::new(acc), expr);
            } else if self.eat_kw("BIND") {
                self.expect(TokenKind::LParen)?;
                let expr = self.parse_expression()?;
                self.expect_kw("AS")?;
                let var = self.expect_variable()?;
                self.expect(TokenKind::RParen)?;
                acc = GraphPattern::Bind(Box::new(acc), var, expr);
            } else if self.is_kw("VALUES") {
                let values = self.parse_values_clause()?;
                acc = GraphPattern::Join(Box::new(acc), Box::new(values));
            } else if self.eat_kw("GRAPH") {
                let name = self.parse_var_or_term()?;
                let inner = self.parse_group_graph_pattern()?;
                acc = GraphPattern::Join(Box::new(acc), Box::new(GraphPattern::Graph(name, Box::new(inner))));
            } else if self.eat_kw("SERVICE") {
                let silent = self.eat_kw("SILENT");
                let endpoint = self.parse_var_or_term()?;
                let inner = self.parse_group_graph_pattern()?;
                acc = GraphPattern::Join(
                    Box::new(acc),
                    Box::new(GraphPattern::Service(endpoint, Box::new(inner), silent)),
                );
            } else if matches!(self.peek(), TokenKind::LBrace) {
                let group = self.parse_group_or_union_graph_pattern()?;
                acc = GraphPattern::Join(Box::new(acc), Box::new(group));
            } else {
                break;
            }
            // Optional `.` then more triples, which join onto the accumulator.
            self.eat(&TokenKind::Dot);
            let mut more = Vec::new();
            self.parse_where_triples_block(&mut more)?;
            if !more.is_empty() {
                acc = GraphPattern::Join(Box::new(acc), Box::new(fold_elts(more)));
            }
        }
        Ok(acc)
    }

    fn parse_group_or_union_graph_pattern(&mut self) -> ParseResult<GraphPattern> {
        let mut left = self.parse_group_graph_pattern()?;
        while self.eat_kw("UNION") {
            let right = self.parse_group_graph_pattern()?;
            left = GraphPattern::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_constraint(&mut self) -> ParseResult<Expression> {
        if matches!(self.peek(), TokenKind::LParen) {
            self.expect(TokenKind::LParen)?;
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(expr);
        }
        self.parse_expression()
    }

    fn parse_values_clause(&mut self) -> ParseResult<GraphPattern> {
        self.expect_kw("VALUES")?;
        let mut vars = Vec::new();
        if self.eat(&TokenKind::LParen) {
            while let TokenKind::Variable(name) = self.peek().clone() {
                self.advance();
                vars.push(Variable(name));
            }
            self.expect(TokenKind::RParen)?;
        } else {
            vars.push(self.expect_variable()?);
        }
        self.expect(TokenKind::LBrace)?;
        let mut rows = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace) {
            let row = if vars.len() == 1 && !matches!(self.peek(), TokenKind::LParen) {
                vec![self.parse_value_or_undef()?]
            } else {
                self.expect(TokenKind::LParen)?;
                let mut row = Vec::new();
                while !matches!(self.peek(), TokenKind::RParen) {
                    row.push(self.parse_value_or_undef()?);
                }
                self.expect(TokenKind::RParen)?;
                row
            };
            rows.push(row);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(GraphPattern::Values(vars, rows))
    }

    fn parse_value_or_undef(&mut self) -> ParseResult<Option<Term>> {
        if self.eat_kw("UNDEF") {
            Ok(None)
        } else {
            Ok(Some(self.parse_graph_term()?))
        }
    }

    // ---- plain (path-free) triples blocks -------------------------------
    //
    // Used for CONSTRUCT templates, Update quad blocks, blank-node property
    // lists, collections, and RDF-star annotations — contexts the grammar
    // does not admit property paths into.

    fn starts_triples_same_subject(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Variable(_)
                | TokenKind::Iri(_)
                | TokenKind::PNameLn(..)
                | TokenKind::PNameNs(_)
                | TokenKind::BlankNode(_)
                | TokenKind::LBracket
                | TokenKind::LParen
                | TokenKind::LAngleAngle
        )
    }

    fn parse_triples_block_plain(&mut self, out: &mut Vec<TriplePattern>) -> ParseResult<()> {
        loop {
            if !self.starts_triples_same_subject() {
                return Ok(());
            }
            let subject = self.parse_triple_subject(out)?;
            self.parse_predicate_object_list(&subject, out)?;
            if !self.eat(&TokenKind::Dot) {
                return Ok(());
            }
        }
    }

    fn parse_triple_subject(&mut self, out: &mut Vec<TriplePattern>) -> ParseResult<Term> {
        match self.peek().clone() {
            TokenKind::LBracket => self.parse_blank_node_property_list(out),
            TokenKind::LParen => self.parse_collection(out),
            _ => self.parse_var_or_term(),
        }
    }

    fn starts_plain_verb(&self) -> bool {
        matches!(self.peek(), TokenKind::Iri(_) | TokenKind::PNameLn(..) | TokenKind::PNameNs(_) | TokenKind::Variable(_))
            || self.is_a_keyword()
    }

    fn parse_plain_verb(&mut self) -> ParseResult<Term> {
        if self.is_a_keyword() {
            self.advance();
            return Ok(Term::Iri(Iri::new(vocab::RDF_TYPE)));
        }
        if let TokenKind::Variable(name) = self.peek().clone() {
            self.advance();
            return Ok(Term::Variable(Variable(name)));
        }
        Ok(Term::Iri(self.parse_plain_iri()?))
    }

    fn parse_predicate_object_list(&mut self, subject: &Term, out: &mut Vec<TriplePattern>) -> ParseResult<()> {
        loop {
            let verb = self.parse_plain_verb()?;
            self.parse_object_list_plain(subject, &verb, out)?;
            if !self.eat(&TokenKind::Semicolon) {
                break;
            }
            if !self.starts_plain_verb() {
                break;
            }
        }
        Ok(())
    }

    fn parse_object_list_plain(&mut self, subject: &Term, verb: &Term, out: &mut Vec<TriplePattern>) -> ParseResult<()> {
        loop {
            let object = self.parse_graph_node(out)?;
            out.push(TriplePattern::new(subject.clone(), verb.clone(), object.clone()));
            self.parse_annotation_plain(subject, verb, &object, out)?;
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    /// `{| p o ; p' o', o'' |}` — additional triples whose subject is the
    /// quoted triple `(subject verb object)` immediately to the left.
    fn parse_annotation_plain(&mut self, subject: &Term, verb: &Term, object: &Term, out: &mut Vec<TriplePattern>) -> ParseResult<()> {
        if !self.eat(&TokenKind::LBracePipe) {
            return Ok(());
        }
        let quoted = Term::QuotedTriple(Box::new(TriplePattern::new(subject.clone(), verb.clone(), object.clone())));
        self.parse_predicate_object_list(&quoted, out)?;
        self.expect(TokenKind::PipeRBrace)?;
        Ok(())
    }

    /// A `GraphNode`: a var-or-term, a blank-node property list, or a
    /// collection — any of which may themselves queue triples into `out`.
    fn parse_graph_node(&mut self, out: &mut Vec<TriplePattern>) -> ParseResult<Term> {
        match self.peek().clone() {
            TokenKind::LBracket => self.parse_blank_node_property_list(out),
            TokenKind::LParen => self.parse_collection(out),
            _ => self.parse_var_or_term(),
        }
    }

    fn parse_blank_node_property_list(&mut self, out: &mut Vec<TriplePattern>) -> ParseResult<Term> {
        self.expect(TokenKind::LBracket)?;
        let node = Term::BlankNode(self.fresh_blank_node());
        if !self.eat(&TokenKind::RBracket) {
            self.parse_predicate_object_list(&node, out)?;
            self.expect(TokenKind::RBracket)?;
        }
        Ok(node)
    }

    fn parse_collection(&mut self, out: &mut Vec<TriplePattern>) -> ParseResult<Term> {
        self.expect(TokenKind::LParen)?;
        let mut items = Vec::new();
        while !matches!(self.peek(), TokenKind::RParen) {
            items.push(self.parse_graph_node(out)?);
        }
        self.expect(TokenKind::RParen)?;
        if items.is_empty() {
            return Ok(Term::Iri(Iri::new(vocab::RDF_NIL)));
        }
        let nodes: Vec<Term> = (0..items.len()).map(|_| Term::BlankNode(self.fresh_blank_node())).collect();
        for (i, item) in items.into_iter().enumerate() {
            out.push(TriplePattern::new(nodes[i].clone(), Term::Iri(Iri::new(vocab::RDF_FIRST)), item));
            let rest = nodes.get(i + 1).cloned().unwrap_or(Term::Iri(Iri::new(vocab::RDF_NIL)));
            out.push(TriplePattern::new(nodes[i].clone(), Term::Iri(Iri::new(vocab::RDF_REST)), rest));
        }
        Ok(nodes[0].clone())
    }

    // ---- WHERE-clause triples blocks (property-path aware) --------------

    fn parse_where_triples_block(&mut self, elts: &mut Vec<Elt>) -> ParseResult<()> {
        loop {
            if !self.starts_triples_same_subject() {
                return Ok(());
            }
            let mut plain = Vec::new();
            let subject = self.parse_triple_subject(&mut plain)?;
            elts.extend(plain.into_iter().map(Elt::Triple));
            self.parse_predicate_object_list_path(subject, elts)?;
            if !self.eat(&TokenKind::Dot) {
                return Ok(());
            }
        }
    }

    fn starts_verb_or_path(&self) -> bool {
        self.starts_plain_verb() || matches!(self.peek(), TokenKind::Caret | TokenKind::Bang | TokenKind::LParen)
    }

    fn parse_predicate_object_list_path(&mut self, subject: Term, elts: &mut Vec<Elt>) -> ParseResult<()> {
        loop {
            let (verb, is_path) = self.parse_verb()?;
            if is_path {
                let path = self.finish_property_path(verb)?;
                loop {
                    let mut plain = Vec::new();
                    let object = self.parse_graph_node(&mut plain)?;
                    elts.extend(plain.into_iter().map(Elt::Triple));
                    elts.push(Elt::Path { subject: subject.clone(), path: path.clone(), object });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            } else {
                let verb_term = match verb {
                    VerbTerm::Term(t) => t,
                    VerbTerm::PathStart => unreachable!("plain verb cannot be a path start"),
                };
                self.parse_object_list_path(&subject, &verb_term, elts)?;
            }
            if !self.eat(&TokenKind::Semicolon) {
                break;
            }
            if !self.starts_verb_or_path() {
                break;
            }
        }
        Ok(())
    }

    fn parse_object_list_path(&mut self, subject: &Term, verb: &Term, elts: &mut Vec<Elt>) -> ParseResult<()> {
        loop {
            let mut plain = Vec::new();
            let object = self.parse_graph_node(&mut plain)?;
            elts.extend(plain.into_iter().map(Elt::Triple));
            elts.push(Elt::Triple(TriplePattern::new(subject.clone(), verb.clone(), object.clone())));
            self.parse_annotation_path(subject, verb, &object, elts)?;
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    fn parse_annotation_path(&mut self, subject: &Term, verb: &Term, object: &Term, elts: &mut Vec<Elt>) -> ParseResult<()> {
        if !self.eat(&TokenKind::LBracePipe) {
            return Ok(());
        }
        let quoted = Term::QuotedTriple(Box::new(TriplePattern::new(subject.clone(), verb.clone(), object.clone())));
        let mut plain = Vec::new();
        self.parse_predicate_object_list(&quoted, &mut plain)?;
        elts.extend(plain.into_iter().map(Elt::Triple));
        self.expect(TokenKind::PipeRBrace)?;
        Ok(())
    }

    // ---- verbs and property paths ---------------------------------------

    /// Distinguishes a plain verb (an IRI/`a` not followed by a path
    /// operator) from a property path, by lookahead on the next token.
    fn parse_verb(&mut self) -> ParseResult<(VerbTerm, bool)> {
        if self.is_a_keyword() && !self.next_starts_path_operator() {
            self.advance();
            return Ok((VerbTerm::Term(Term::Iri(Iri::new(vocab::RDF_TYPE))), false));
        }
        if let TokenKind::Variable(name) = self.peek().clone() {
            self.advance();
            return Ok((VerbTerm::Term(Term::Variable(Variable(name))), false));
        }
        if matches!(self.peek(), TokenKind::Caret | TokenKind::Bang | TokenKind::LParen) {
            return Ok((VerbTerm::PathStart, true));
        }
        let iri = self.parse_plain_iri()?;
        if self.next_starts_path_operator() {
            return Ok((VerbTerm::Term(Term::Iri(iri)), true));
        }
        Ok((VerbTerm::Term(Term::Iri(iri)), false))
    }

    fn next_starts_path_operator(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Slash | TokenKind::Pipe | TokenKind::Star | TokenKind::Plus | TokenKind::QuestionMark
        )
    }

    fn parse_plain_iri(&mut self) -> ParseResult<Iri> {
        match self.advance() {
            TokenKind::Iri(s) => Ok(self.resolve_term_iri(&s)),
            TokenKind::PNameLn(p, l) => self.resolve_pname(&p, &l),
            TokenKind::PNameNs(p) => self.resolve_pname(&p, ""),
            _ => Err(self.unexpected("an IRI or prefixed name")),
        }
    }

    /// Turns the already-disambiguated verb into a full property path,
    /// applying precedence Alternative > Sequence > Inverse > Elt.
    fn finish_property_path(&mut self, verb: VerbTerm) -> ParseResult<PropertyPath> {
        let first = match verb {
            VerbTerm::Term(Term::Iri(iri)) => self.finish_path_elt(PropertyPath::Iri(iri))?,
            VerbTerm::PathStart => self.parse_path_unary()?,
            _ => return Err(self.unexpected("a property path")),
        };
        let seq = self.parse_path_sequence_rest(first)?;
        self.parse_path_alternative_rest(seq)
    }

    fn parse_path_alternative(&mut self) -> ParseResult<PropertyPath> {
        let first = self.parse_path_sequence()?;
        self.parse_path_alternative_rest(first)
    }

    fn parse_path_alternative_rest(&mut self, first: PropertyPath) -> ParseResult<PropertyPath> {
        let mut left = first;
        while self.eat(&TokenKind::Pipe) {
            let right = self.parse_path_sequence()?;
            left = PropertyPath::Alternative(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_path_sequence(&mut self) -> ParseResult<PropertyPath> {
        let first = self.parse_path_unary()?;
        self.parse_path_sequence_rest(first)
    }

    fn parse_path_sequence_rest(&mut self, first: PropertyPath) -> ParseResult<PropertyPath> {
        let mut left = first;
        while self.eat(&TokenKind::Slash) {
            let right = self.parse_path_unary()?;
            left = PropertyPath::Sequence(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_path_unary(&mut self) -> ParseResult<PropertyPath> {
        if self.eat(&TokenKind::Caret) {
            let inner = self.parse_path_primary()?;
            return self.finish_path_elt(PropertyPath::Inverse(Box::new(inner)));
        }
        if self.eat(&TokenKind::Bang) {
            return self.parse_negated_path_set();
        }
        let primary = self.parse_path_primary()?;
        self.finish_path_elt(primary)
    }

    fn parse_path_primary(&mut self) -> ParseResult<PropertyPath> {
        if self.eat(&TokenKind::LParen) {
            let inner = self.parse_path_alternative()?;
            self.expect(TokenKind::RParen)?;
            return Ok(inner);
        }
        if self.is_a_keyword() {
            self.advance();
            return Ok(PropertyPath::Iri(Iri::new(vocab::RDF_TYPE)));
        }
        let iri = self.parse_plain_iri()?;
        Ok(PropertyPath::Iri(iri))
    }

    fn parse_negated_path_set(&mut self) -> ParseResult<PropertyPath> {
        if self.eat(&TokenKind::LParen) {
            let mut items = vec![self.parse_negated_path_item()?];
            while self.eat(&TokenKind::Pipe) {
                items.push(self.parse_negated_path_item()?);
            }
            self.expect(TokenKind::RParen)?;
            Ok(PropertyPath::Negation(items))
        } else {
            Ok(PropertyPath::Negation(vec![self.parse_negated_path_item()?]))
        }
    }

    fn parse_negated_path_item(&mut self) -> ParseResult<NegatedPathItem> {
        if self.eat(&TokenKind::Caret) {
            Ok(NegatedPathItem::Inverse(self.parse_plain_iri()?))
        } else {
            Ok(NegatedPathItem::Forward(self.parse_plain_iri()?))
        }
    }

    /// Applies a trailing `*`/`+`/`?` modifier, if present.
    fn finish_path_elt(&mut self, base: PropertyPath) -> ParseResult<PropertyPath> {
        if self.eat(&TokenKind::Star) {
            Ok(PropertyPath::ZeroOrMore(Box::new(base)))
        } else if self.eat(&TokenKind::Plus) {
            Ok(PropertyPath::OneOrMore(Box::new(base)))
        } else if self.eat(&TokenKind::QuestionMark) {
            Ok(PropertyPath::ZeroOrOne(Box::new(base)))
        } else {
            Ok(base)
        }
    }

    // ---- terms ------------------------------------------------------

    fn parse_var_or_term(&mut self) -> ParseResult<Term> {
        match self.peek().clone() {
            TokenKind::Variable(name) => {
                self.advance();
                Ok(Term::Variable(Variable(name)))
            }
            TokenKind::LAngleAngle => self.parse_rdf_star_term(),
            _ => self.parse_graph_term(),
        }
    }

    fn parse_graph_term(&mut self) -> ParseResult<Term> {
        match self.peek().clone() {
            TokenKind::Iri(s) => {
                self.advance();
                Ok(Term::Iri(self.resolve_term_iri(&s)))
            }
            TokenKind::PNameLn(p, l) => {
                self.advance();
                Ok(Term::Iri(self.resolve_pname(&p, &l)?))
            }
            TokenKind::PNameNs(p) => {
                self.advance();
                Ok(Term::Iri(self.resolve_pname(&p, "")?))
            }
            TokenKind::BlankNode(id) => {
                self.advance();
                Ok(Term::BlankNode(BlankNode(id)))
            }
            TokenKind::LBracket => {
                let mut scratch = Vec::new();
                self.parse_blank_node_property_list(&mut scratch)
            }
            TokenKind::LParen => {
                let mut scratch = Vec::new();
                self.parse_collection(&mut scratch)
            }
            TokenKind::String(_) => self.parse_literal(),
            TokenKind::Integer(s) => {
                self.advance();
                Ok(Term::Literal(Literal::with_datatype(s, Iri::new("http://www.w3.org/2001/XMLSchema#integer"))))
            }
            TokenKind::Decimal(s) => {
                self.advance();
                Ok(Term::Literal(Literal::with_datatype(s, Iri::new("http://www.w3.org/2001/XMLSchema#decimal"))))
            }
            TokenKind::Double(s) => {
                self.advance();
                Ok(Term::Literal(Literal::with_datatype(s, Iri::new("http://www.w3.org/2001/XMLSchema#double"))))
            }
            TokenKind::LAngleAngle => self.parse_rdf_star_term(),
            _ => Err(self.unexpected("a term")),
        }
    }

    fn parse_literal(&mut self) -> ParseResult<Term> {
        let lexical = self.expect_string()?;
        if let TokenKind::LangTag { .. } = self.peek() {
            let TokenKind::LangTag { lang, direction } = self.advance() else { unreachable!() };
            let dir = match direction.as_deref() {
                Some("ltr") => Some(BaseDirection::Ltr),
                Some("rtl") => Some(BaseDirection::Rtl),
                Some(other) => {
                    return Err(ParseError::InvalidSyntax {
                        msg: format!("unknown base direction `{other}`"),
                        position: self.position(),
                    })
                }
                None => None,
            };
            return Ok(Term::Literal(Literal::with_language(lexical, lang, dir)));
        }
        if self.eat(&TokenKind::CaretCaret) {
            let dt = self.parse_plain_iri()?;
            return Ok(Term::Literal(Literal::with_datatype(lexical, dt)));
        }
        Ok(Term::Literal(Literal::plain(lexical)))
    }

    /// `<<s p o>>`, `<<s p o ~r>>`, or the SPARQL 1.2 `<<( s p o )>>` form.
    fn parse_rdf_star_term(&mut self) -> ParseResult<Term> {
        self.expect(TokenKind::LAngleAngle)?;
        let parenthesized = self.eat(&TokenKind::LParen);
        let subject = self.parse_var_or_term()?;
        let predicate = self.parse_var_or_term()?;
        let object = self.parse_var_or_term()?;
        if parenthesized {
            self.expect(TokenKind::RParen)?;
        }
        let triple = Box::new(TriplePattern::new(subject, predicate, object));
        if self.eat(&TokenKind::Tilde) {
            let reifier = Box::new(self.parse_var_or_term()?);
            self.expect(TokenKind::RAngleAngle)?;
            return Ok(Term::ReifiedTriple { triple, reifier });
        }
        self.expect(TokenKind::RAngleAngle)?;
        Ok(Term::QuotedTriple(triple))
    }

    // ---- expressions ----------------------------------------------------

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_conditional_or()
    }

    fn parse_conditional_or(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_conditional_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let right = self.parse_conditional_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_conditional_and(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_value_logical()?;
        while self.eat(&TokenKind::AmpAmp) {
            let right = self.parse_value_logical()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_value_logical(&mut self) -> ParseResult<Expression> {
        let left = self.parse_numeric_expression()?;
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
            let right = self.parse_numeric_expression()?;
            return Ok(Expression::Compare(op, Box::new(left), Box::new(right)));
        }
        if self.eat_kw("IN") {
            let items = self.parse_expression_list()?;
            return Ok(Expression::In { expr: Box::new(left), items, negated: false });
        }
        if self.is_kw("NOT") && matches!(self.peek_at(1), TokenKind::Ident(s) if s.eq_ignore_ascii_case("IN")) {
            self.advance();
            self.advance();
            let items = self.parse_expression_list()?;
            return Ok(Expression::In { expr: Box::new(left), items, negated: true });
        }
        Ok(left)
    }

    fn parse_expression_list(&mut self) -> ParseResult<Vec<Expression>> {
        self.expect(TokenKind::LParen)?;
        let mut items = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                items.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(items)
    }

    fn parse_numeric_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative_expression()?;
        loop {
            if self.eat(&TokenKind::Plus) {
                let right = self.parse_multiplicative_expression()?;
                left = Expression::Arith(ArithOp::Add, Box::new(left), Box::new(right));
            } else if self.eat(&TokenKind::Minus) {
                let right = self.parse_multiplicative_expression()?;
                left = Expression::Arith(ArithOp::Sub, Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expression()?;
        loop {
            if self.eat(&TokenKind::Star) {
                let right = self.parse_unary_expression()?;
                left = Expression::Arith(ArithOp::Mul, Box::new(left), Box::new(right));
            } else if self.eat(&TokenKind::Slash) {
                let right = self.parse_unary_expression()?;
                left = Expression::Arith(ArithOp::Div, Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        if self.eat(&TokenKind::Bang) {
            return Ok(Expression::Not(Box::new(self.parse_unary_expression()?)));
        }
        if self.eat(&TokenKind::Plus) {
            return Ok(Expression::UnaryPlus(Box::new(self.parse_unary_expression()?)));
        }
        if self.eat(&TokenKind::Minus) {
            return Ok(Expression::UnaryMinus(Box::new(self.parse_unary_expression()?)));
        }
        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expression> {
        if self.eat(&TokenKind::LParen) {
            let inner = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(inner);
        }
        if self.eat_kw("EXISTS") {
            let pattern = self.parse_group_graph_pattern()?;
            return Ok(Expression::Exists(Box::new(pattern)));
        }
        if self.is_kw("NOT") && matches!(self.peek_at(1), TokenKind::Ident(s) if s.eq_ignore_ascii_case("EXISTS")) {
            self.advance();
            self.advance();
            let pattern = self.parse_group_graph_pattern()?;
            return Ok(Expression::NotExists(Box::new(pattern)));
        }
        if self.eat_kw("ISTRIPLE") {
            self.expect(TokenKind::LParen)?;
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(Expression::IsTriple(Box::new(expr)));
        }
        if self.eat_kw("SUBJECT") {
            self.expect(TokenKind::LParen)?;
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(Expression::TripleSubject(Box::new(expr)));
        }
        if self.eat_kw("PREDICATE") {
            self.expect(TokenKind::LParen)?;
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(Expression::TriplePredicate(Box::new(expr)));
        }
        if self.eat_kw("OBJECT") {
            self.expect(TokenKind::LParen)?;
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(Expression::TripleObject(Box::new(expr)));
        }
        if self.eat_kw("TRIPLE") {
            self.expect(TokenKind::LParen)?;
            let s = self.parse_expression()?;
            self.expect(TokenKind::Comma)?;
            let p = self.parse_expression()?;
            self.expect(TokenKind::Comma)?;
            let o = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(Expression::TripleConstructor(Box::new(s), Box::new(p), Box::new(o)));
        }
        if let TokenKind::Variable(name) = self.peek().clone() {
            self.advance();
            return Ok(Expression::Term(Term::Variable(Variable(name))));
        }
        if let TokenKind::Ident(name) = self.peek().clone() {
            if matches!(self.peek_at(1), TokenKind::LParen) {
                if let Some(agg) = self.try_parse_aggregate(&name)? {
                    return Ok(Expression::Aggregate(Box::new(agg)));
                }
                if let Some(builtin) = builtin_by_name(&name) {
                    self.advance();
                    return self.parse_builtin_args(builtin);
                }
                self.advance();
                let iri = self.resolve_term_iri(&name);
                self.expect(TokenKind::LParen)?;
                let args = self.parse_arg_list()?;
                self.expect(TokenKind::RParen)?;
                return Ok(Expression::FunctionCall(iri, args));
            }
        }
        Ok(Expression::Term(self.parse_graph_term_for_expression()?))
    }

    fn parse_graph_term_for_expression(&mut self) -> ParseResult<Term> {
        if matches!(self.peek(), TokenKind::LAngleAngle) {
            return self.parse_rdf_star_term();
        }
        self.parse_graph_term()
    }

    fn parse_arg_list(&mut self) -> ParseResult<Vec<Expression>> {
        let mut args = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(args)
    }

    fn try_parse_aggregate(&mut self, name: &str) -> ParseResult<Option<Aggregate>> {
        let upper = name.to_ascii_uppercase();
        let kind = match upper.as_str() {
            "COUNT" => 0,
            "SUM" => 1,
            "AVG" => 2,
            "MIN" => 3,
            "MAX" => 4,
            "SAMPLE" => 5,
            "GROUP_CONCAT" => 6,
            _ => return Ok(None),
        };
        self.advance(); // name
        self.expect(TokenKind::LParen)?;
        let distinct = self.eat_kw("DISTINCT");
        if kind == 0 && self.eat(&TokenKind::Star) {
            self.expect(TokenKind::RParen)?;
            return Ok(Some(Aggregate::Count { distinct, expr: None }));
        }
        let expr = Box::new(self.parse_expression()?);
        let separator = if kind == 6 && self.eat(&TokenKind::Semicolon) {
            self.expect_kw("SEPARATOR")?;
            self.expect(TokenKind::Eq)?;
            Some(self.expect_string()?)
        } else {
            None
        };
        self.expect(TokenKind::RParen)?;
        Ok(Some(match kind {
            0 => Aggregate::Count { distinct, expr: Some(expr) },
            1 => Aggregate::Sum { distinct, expr },
            2 => Aggregate::Avg { distinct, expr },
            3 => Aggregate::Min { distinct, expr },
            4 => Aggregate::Max { distinct, expr },
            5 => Aggregate::Sample { distinct, expr },
            _ => Aggregate::GroupConcat { distinct, expr, separator },
        }))
    }

    fn parse_builtin_args(&mut self, name: BuiltinName) -> ParseResult<Expression> {
        match name {
            BuiltinName::Rand | BuiltinName::Now | BuiltinName::Uuid | BuiltinName::StrUuid => {
                self.expect(TokenKind::LParen)?;
                self.expect(TokenKind::RParen)?;
                Ok(Expression::Builtin(Box::new(BuiltinCall { name, args: Vec::new() })))
            }
            BuiltinName::Bound => {
                self.expect(TokenKind::LParen)?;
                let var = self.expect_variable()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expression::Bound(var))
            }
            _ => {
                self.expect(TokenKind::LParen)?;
                let args = self.parse_arg_list()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expression::Builtin(Box::new(BuiltinCall { name, args })))
            }
        }
    }

    // ---- Update -----------------------------------------------------

    fn parse_update(&mut self) -> ParseResult<Vec<UpdateOperation>> {
        let mut ops = Vec::new();
        loop {
            if matches!(self.peek(), TokenKind::Eof) {
                break;
            }
            ops.push(self.parse_update_operation()?);
            if !self.eat(&TokenKind::Semicolon) {
                break;
            }
            self.parse_prologue()?;
            if matches!(self.peek(), TokenKind::Eof) {
                break;
            }
        }
        Ok(ops)
    }

    fn parse_update_operation(&mut self) -> ParseResult<UpdateOperation> {
        if self.eat_kw("INSERT") {
            self.expect_kw("DATA")?;
            let quads = self.parse_quad_data()?;
            return Ok(UpdateOperation::InsertData(quads));
        }
        if self.eat_kw("DELETE") {
            if self.eat_kw("DATA") {
                let quads = self.parse_quad_data()?;
                return Ok(UpdateOperation::DeleteData(quads));
            }
            let delete = self.parse_quad_pattern_block()?;
            let mut insert = Vec::new();
            if self.eat_kw("INSERT") {
                insert = self.parse_quad_pattern_block()?;
            }
            let (using_default, using_named) = self.parse_using_clauses()?;
            self.expect_kw("WHERE")?;
            let pattern = self.parse_group_graph_pattern()?;
            return Ok(UpdateOperation::Modify { delete, insert, using_default, using_named, pattern });
        }
        if self.eat_kw("WITH") {
            // `WITH <graph> DELETE ... INSERT ... WHERE ...` — the named
            // graph becomes implicit USING context for the templates.
            let graph = self.parse_iri_ref_term()?;
            let op = self.parse_update_operation()?;
            return Ok(match op {
                UpdateOperation::Modify { delete, insert, mut using_default, using_named, pattern } => {
                    using_default.push(graph);
                    UpdateOperation::Modify { delete, insert, using_default, using_named, pattern }
                }
                other => other,
            });
        }
        if self.eat_kw("LOAD") {
            let silent = self.eat_kw("SILENT");
            let source = self.parse_iri_ref_term()?;
            let into = if self.eat_kw("INTO") {
                self.expect_kw("GRAPH")?;
                Some(self.parse_iri_ref_term()?)
            } else {
                None
            };
            return Ok(UpdateOperation::Load { silent, source, into });
        }
        if self.eat_kw("CLEAR") {
            let silent = self.eat_kw("SILENT");
            let target = self.parse_graph_target()?;
            return Ok(UpdateOperation::Clear { silent, target });
        }
        if self.eat_kw("CREATE") {
            let silent = self.eat_kw("SILENT");
            self.expect_kw("GRAPH")?;
            let graph = self.parse_iri_ref_term()?;
            return Ok(UpdateOperation::Create { silent, graph });
        }
        if self.eat_kw("DROP") {
            let silent = self.eat_kw("SILENT");
            let target = self.parse_graph_target()?;
            return Ok(UpdateOperation::Drop { silent, target });
        }
        Err(self.unexpected("an Update operation (INSERT/DELETE/LOAD/CLEAR/CREATE/DROP)"))
    }

    fn parse_graph_target(&mut self) -> ParseResult<GraphTarget> {
        if self.eat_kw("GRAPH") {
            return Ok(GraphTarget::Graph(self.parse_iri_ref_term()?));
        }
        if self.eat_kw("DEFAULT") {
            return Ok(GraphTarget::Default);
        }
        if self.eat_kw("NAMED") {
            return Ok(GraphTarget::Named);
        }
        if self.eat_kw("ALL") {
            return Ok(GraphTarget::All);
        }
        Err(self.unexpected("GRAPH <iri> | DEFAULT | NAMED | ALL"))
    }

    fn parse_using_clauses(&mut self) -> ParseResult<(Vec<Iri>, Vec<Iri>)> {
        let mut default = Vec::new();
        let mut named = Vec::new();
        while self.eat_kw("USING") {
            if self.eat_kw("NAMED") {
                named.push(self.parse_iri_ref_term()?);
            } else {
                default.push(self.parse_iri_ref_term()?);
            }
        }
        Ok((default, named))
    }

    fn parse_quad_data(&mut self) -> ParseResult<Vec<Quad>> {
        self.expect(TokenKind::LBrace)?;
        let quads = self.parse_quads_body()?;
        self.expect(TokenKind::RBrace)?;
        Ok(quads)
    }

    fn parse_quad_pattern_block(&mut self) -> ParseResult<Vec<Quad>> {
        self.expect(TokenKind::LBrace)?;
        let quads = self.parse_quads_body()?;
        self.expect(TokenKind::RBrace)?;
        Ok(quads)
    }

    fn parse_quads_body(&mut self) -> ParseResult<Vec<Quad>> {
        let mut quads = Vec::new();
        loop {
            if self.eat_kw("GRAPH") {
                let graph = self.parse_iri_ref_term()?;
                self.expect(TokenKind::LBrace)?;
                let mut triples = Vec::new();
                self.parse_triples_block_plain(&mut triples)?;
                self.expect(TokenKind::RBrace)?;
                for t in triples {
                    quads.push(Quad { subject: t.subject, predicate: t.predicate, object: t.object, graph: Some(graph.clone()) });
                }
            } else if self.starts_triples_same_subject() {
                let mut triples = Vec::new();
                self.parse_triples_block_plain(&mut triples)?;
                for t in triples {
                    quads.push(Quad { subject: t.subject, predicate: t.predicate, object: t.object, graph: None });
                }
            } else {
                break;
            }
            self.eat(&TokenKind::Dot);
        }
        Ok(quads)
    }
}

fn extract_bgp_triples(pattern: &GraphPattern) -> Vec<TriplePattern> {
    match pattern {
        GraphPattern::Basic(triples) => triples.clone(),
        GraphPattern::Join(l, r) => {
            let mut v = extract_bgp_triples(l);
            v.extend(extract_bgp_triples(r));
            v
        }
        _ => Vec::new(),
    }
}

fn builtin_by_name(name: &str) -> Option<BuiltinName> {
    let upper = name.to_ascii_uppercase();
    Some(match upper.as_str() {
        "STR" => BuiltinName::Str,
        "LANG" => BuiltinName::Lang,
        "LANGMATCHES" => BuiltinName::LangMatches,
        "DATATYPE" => BuiltinName::Datatype,
        "BOUND" => BuiltinName::Bound,
        "IRI" => BuiltinName::Iri,
        "URI" => BuiltinName::Uri,
        "BNODE" => BuiltinName::BNode,
        "RAND" => BuiltinName::Rand,
        "ABS" => BuiltinName::Abs,
        "CEIL" => BuiltinName::Ceil,
        "FLOOR" => BuiltinName::Floor,
        "ROUND" => BuiltinName::Round,
        "CONCAT" => BuiltinName::Concat,
        "STRLEN" => BuiltinName::StrLen,
        "UCASE" => BuiltinName::Ucase,
        "LCASE" => BuiltinName::Lcase,
        "ENCODE_FOR_URI" => BuiltinName::EncodeForUri,
        "CONTAINS" => BuiltinName::Contains,
        "STRSTARTS" => BuiltinName::StrStarts,
        "STRENDS" => BuiltinName::StrEnds,
        "STRBEFORE" => BuiltinName::StrBefore,
        "STRAFTER" => BuiltinName::StrAfter,
        "REPLACE" => BuiltinName::Replace,
        "REGEX" => BuiltinName::Regex,
        "SUBSTR" => BuiltinName::Substr,
        "NOW" => BuiltinName::Now,
        "YEAR" => BuiltinName::Year,
        "MONTH" => BuiltinName::Month,
        "DAY" => BuiltinName::Day,
        "HOURS" => BuiltinName::Hours,
        "MINUTES" => BuiltinName::Minutes,
        "SECONDS" => BuiltinName::Seconds,
        "TIMEZONE" => BuiltinName::Timezone,
        "TZ" => BuiltinName::Tz,
        "UUID" => BuiltinName::Uuid,
        "STRUUID" => BuiltinName::StrUuid,
        "MD5" => BuiltinName::Md5,
        "SHA1" => BuiltinName::Sha1,
        "SHA256" => BuiltinName::Sha256,
        "SHA384" => BuiltinName::Sha384,
        "SHA512" => BuiltinName::Sha512,
        "COALESCE" => BuiltinName::Coalesce,
        "IF" => BuiltinName::If,
        "SAMETERM" => BuiltinName::SameTerm,
        "ISIRI" => BuiltinName::IsIri,
        "ISURI" => BuiltinName::IsUri,
        "ISBLANK" => BuiltinName::IsBlank,
        "ISLITERAL" => BuiltinName::IsLiteral,
        "ISNUMERIC" => BuiltinName::IsNumeric,
        "STRDT" => BuiltinName::StrDt,
        "STRLANG" => BuiltinName::StrLang,
        "STRLANGDIR" => BuiltinName::StrLangDir,
        "HASLANG" => BuiltinName::HasLang,
        "HASLANGDIR" => BuiltinName::HasLangDir,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_select() {
        let q = parse_select("SELECT ?x WHERE { ?x <http://p> ?y }").unwrap();
        assert!(!q.distinct);
        assert_eq!(q.projection, Projection::Items(vec![ProjectionItem::Var(Variable("x".into()))]));
        match &q.pattern {
            GraphPattern::Basic(triples) => assert_eq!(triples.len(), 1),
            other => panic!("expected BGP, got {other:?}"),
        }
    }

    #[test]
    fn resolves_prefixed_names() {
        let q = parse_select("PREFIX ex: <http://ex.org/> SELECT ?x WHERE { ?x ex:p ?y }").unwrap();
        match &q.pattern {
            GraphPattern::Basic(triples) => {
                assert_eq!(triples[0].predicate, Term::Iri(Iri::new("http://ex.org/p")));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_limit_offset_order_by() {
        let q = parse_select("SELECT ?x WHERE { ?x <http://p> ?y } ORDER BY DESC(?x) LIMIT 10 OFFSET 5").unwrap();
        assert_eq!(q.modifiers.limit, Some(10));
        assert_eq!(q.modifiers.offset, Some(5));
        assert!(q.modifiers.order_by[0].descending);
    }

    #[test]
    fn parses_optional_and_filter() {
        let q = parse_select("SELECT ?x WHERE { ?x <http://p> ?y OPTIONAL { ?y <http://q> ?z } FILTER(?x != ?y) }").unwrap();
        assert!(matches!(q.pattern, GraphPattern::Filter(_, _)));
    }

    #[test]
    fn parses_ask_and_construct() {
        let s = parse("ASK WHERE { ?x <http://p> ?y }").unwrap();
        assert!(matches!(s, Statement::Ask(_)));
        let s = parse("CONSTRUCT { ?x <http://p> ?y } WHERE { ?x <http://p> ?y }").unwrap();
        assert!(matches!(s, Statement::Construct(_)));
    }

    #[test]
    fn parses_insert_data_update() {
        let s = parse("PREFIX ex: <http://ex.org/> INSERT DATA { ex:a ex:p ex:b }").unwrap();
        match s {
            Statement::Update(ops) => {
                assert_eq!(ops.len(), 1);
                assert!(matches!(&ops[0], UpdateOperation::InsertData(q) if q.len() == 1));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn parses_one_or_more_property_path() {
        let q = parse_select("PREFIX : <http://ex.org/> SELECT ?x WHERE { :a :p+ ?x }").unwrap();
        match &q.pattern {
            GraphPattern::PropertyPath { subject, path, object } => {
                assert_eq!(*subject, Term::Iri(Iri::new("http://ex.org/a")));
                assert_eq!(*path, PropertyPath::OneOrMore(Box::new(PropertyPath::Iri(Iri::new("http://ex.org/p")))));
                assert_eq!(*object, Term::Variable(Variable("x".into())));
            }
            other => panic!("expected a property path pattern, got {other:?}"),
        }
    }

    #[test]
    fn parses_negated_property_set() {
        let q = parse_select("PREFIX : <http://ex.org/> SELECT ?x WHERE { ?s !(:p|:q) ?o }").unwrap();
        match &q.pattern {
            GraphPattern::PropertyPath { path, .. } => {
                assert_eq!(
                    *path,
                    PropertyPath::Negation(vec![
                        NegatedPathItem::Forward(Iri::new("http://ex.org/p")),
                        NegatedPathItem::Forward(Iri::new("http://ex.org/q")),
                    ])
                );
            }
            other => panic!("expected a property path pattern, got {other:?}"),
        }
    }

    #[test]
    fn parses_rdf_star_quoted_triple() {
        let q = parse_select("PREFIX : <http://ex.org/> SELECT ?x WHERE { <<:a :p :b>> :q ?x }").unwrap();
        match &q.pattern {
            GraphPattern::Basic(triples) => {
                assert!(matches!(triples[0].subject, Term::QuotedTriple(_)));
            }
            other => panic!("expected a BGP, got {other:?}"),
        }
    }

    #[test]
    fn parses_collection_shorthand() {
        let q = parse_select("PREFIX : <http://ex.org/> SELECT ?x WHERE { :a :p (1 2) }").unwrap();
        match &q.pattern {
            GraphPattern::Basic(triples) => {
                // first/rest/nil desugaring yields 4 list-structure triples
                // plus the `:a :p _:head` link.
                assert_eq!(triples.len(), 5);
            }
            other => panic!("expected a BGP, got {other:?}"),
        }
    }

    #[test]
    fn parses_rdf_star_reified_triple() {
        let q = parse_select("PREFIX : <http://ex.org/> SELECT ?x WHERE { <<:a :p :b ~:r>> :q ?x }").unwrap();
        match &q.pattern {
            GraphPattern::Basic(triples) => {
                assert!(matches!(triples[0].subject, Term::ReifiedTriple { .. }));
            }
            other => panic!("expected a BGP, got {other:?}"),
        }
    }
}
