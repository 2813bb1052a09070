//! The RDF-flavored term algebra the query frontend parses into.
//!
//! Unlike `kg_model::TupleElement` — the plain scalar family the index core
//! stores — [`Term`] is a pure value tree owned end to end: parsers hand back
//! an owned root and callers may walk or clone it freely (no borrowed
//! lifetimes, no shared ownership for the recursive variants).

use std::fmt;

/// An absolute IRI. Prefixed names are resolved against the prologue at
/// parse time; by the time a [`Term`] exists, every IRI is
/// already absolute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri(pub String);

impl Iri {
    /// Wrap an already-absolute IRI string.
    pub fn new(iri: impl Into<String>) -> Self {
        Iri(iri.into())
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Iri(s.to_string())
    }
}

/// A blank node identifier, either given in source (`_:b0`) or minted by the
/// parser for `[]`/`[ ... ]` shorthand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlankNode(pub String);

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.0)
    }
}

/// A query variable, written `?name` or `$name` in source (the sigil is not
/// retained — both bind the same variable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(pub String);

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// Base direction tag on a SPARQL 1.2 directional literal (`"x"@en--ltr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDirection {
    /// Left-to-right.
    Ltr,
    /// Right-to-left.
    Rtl,
}

impl fmt::Display for BaseDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BaseDirection::Ltr => "ltr",
            BaseDirection::Rtl => "rtl",
        })
    }
}

/// An RDF literal: a lexical form plus at most one of a language tag
/// (optionally direction-tagged, SPARQL 1.2) or a datatype IRI.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    /// The literal's lexical form (unescaped).
    pub lexical_form: String,
    /// BCP-47 language tag, present only for language-tagged strings.
    pub language: Option<String>,
    /// Base direction, present only alongside `language` under SPARQL 1.2.
    pub direction: Option<BaseDirection>,
    /// Datatype IRI. `None` for simple/language-tagged strings (implicitly
    /// `xsd:string`/`rdf:langString`).
    pub datatype: Option<Iri>,
}

impl Literal {
    /// A plain string literal with no language or datatype.
    pub fn plain(value: impl Into<String>) -> Self {
        Literal {
            lexical_form: value.into(),
            language: None,
            direction: None,
            datatype: None,
        }
    }

    /// A language-tagged literal, optionally direction-tagged.
    pub fn with_language(
        value: impl Into<String>,
        language: impl Into<String>,
        direction: Option<BaseDirection>,
    ) -> Self {
        Literal {
            lexical_form: value.into(),
            language: Some(language.into()),
            direction,
            datatype: None,
        }
    }

    /// A datatyped literal.
    pub fn with_datatype(value: impl Into<String>, datatype: Iri) -> Self {
        Literal {
            lexical_form: value.into(),
            language: None,
            direction: None,
            datatype: Some(datatype),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.lexical_form)?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")?;
            if let Some(dir) = self.direction {
                write!(f, "--{dir}")?;
            }
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^{dt}")?;
        }
        Ok(())
    }
}

/// A `(subject, predicate, object)` pattern. Used both as a plain triple
/// pattern in a BGP and as the payload of a quoted/reified triple term, so
/// every position is a full [`Term`] (patterns may nest quoted triples and
/// bind variables inside them).
#[derive(Debug, Clone, PartialEq)]
pub struct TriplePattern {
    /// Subject position.
    pub subject: Term,
    /// Predicate position.
    pub predicate: Term,
    /// Object position.
    pub object: Term,
}

impl TriplePattern {
    /// Build a triple pattern from its three positions.
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        TriplePattern { subject, predicate, object }
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// A single term position: variable, constant, or an RDF-star nested triple
/// (`prefixedName` is resolved to [`Term::Iri`]
/// before this tree is built, so it has no dedicated variant here).
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A query variable.
    Variable(Variable),
    /// An absolute IRI.
    Iri(Iri),
    /// A blank node.
    BlankNode(BlankNode),
    /// A literal value.
    Literal(Literal),
    /// RDF-star quoted triple term: `<<s p o>>`.
    QuotedTriple(Box<TriplePattern>),
    /// RDF-star reified triple term: `<<s p o ~r>>`, where `r` is the
    /// reifier (an IRI, blank node, or variable).
    ReifiedTriple {
        /// The reified triple.
        triple: Box<TriplePattern>,
        /// The reifier term.
        reifier: Box<Term>,
    },
}

impl Term {
    /// True if this term is a bound variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "{v}"),
            Term::Iri(i) => write!(f, "{i}"),
            Term::BlankNode(b) => write!(f, "{b}"),
            Term::Literal(l) => write!(f, "{l}"),
            Term::QuotedTriple(t) => write!(f, "<<{t}>>"),
            Term::ReifiedTriple { triple, reifier } => write!(f, "<<{triple} ~{reifier}>>"),
        }
    }
}

/// A fully-bound quad, used by SPARQL Update's `INSERT DATA`/`DELETE DATA`
/// (ground data, no variables permitted by the grammar — the parser still
/// represents positions as [`Term`] since RDF-star ground data may still
/// nest quoted triples).
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    /// Subject position.
    pub subject: Term,
    /// Predicate position.
    pub predicate: Term,
    /// Object position.
    pub object: Term,
    /// Named graph, `None` for the default graph.
    pub graph: Option<Iri>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_display_formats_language_and_direction() {
        let l = Literal::with_language("hello", "en", Some(BaseDirection::Ltr));
        assert_eq!(format!("{l}"), "\"hello\"@en--ltr");
    }

    #[test]
    fn literal_display_formats_datatype() {
        let l = Literal::with_datatype("42", Iri::from("http://www.w3.org/2001/XMLSchema#integer"));
        assert_eq!(format!("{l}"), "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>");
    }

    #[test]
    fn quoted_triple_displays_nested() {
        let t = Term::QuotedTriple(Box::new(TriplePattern::new(
            Term::Iri(Iri::from("a")),
            Term::Iri(Iri::from("p")),
            Term::Iri(Iri::from("b")),
        )));
        assert_eq!(format!("{t}"), "<<<a> <p> <b>>>");
    }
}
