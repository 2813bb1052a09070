//! The builder must produce algebra identical to the parser's output for
//! equivalent queries, and the index-strategy selector it
//! re-exports must match the documented bound-shape table.

use kg_builder::{IndexStrategy, PatternBuilder, SelectBuilder};
use kg_query::{Iri, Term, TriplePattern, Variable};

#[test]
fn select_builder_matches_parser_for_a_simple_query() {
    let pattern = PatternBuilder::new()
        .triple(TriplePattern::new(
            Term::Variable(Variable("s".into())),
            Term::Iri(Iri::from("knows")),
            Term::Variable(Variable("o".into())),
        ))
        .build();
    let built = SelectBuilder::new().select_var(Variable("s".into())).where_pattern(pattern).distinct().build();
    let parsed = kg_query::parse_select("SELECT DISTINCT ?s WHERE { ?s <knows> ?o }").unwrap();
    assert_eq!(built, parsed);
}

#[test]
fn index_selector_reexport_matches_spec_table_for_hexastore() {
    assert_eq!(IndexStrategy::Hexastore.select_ordering(true, true, true), kg_builder::Ordering::Spo);
    assert_eq!(IndexStrategy::Hexastore.select_ordering(false, false, false), kg_builder::Ordering::Spo);
}
