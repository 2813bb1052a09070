//! End-to-end SQL/PGQ scenarios.

use kg_sql::{EdgeDirection, PathMode, SelectItem, Statement, TableRef};

#[test]
fn parses_recursive_cte_with_union_free_join_tree() {
    let sql = "
        WITH RECURSIVE reach(node) AS (
            SELECT a FROM edges
        )
        SELECT r.node
        FROM reach r
        LEFT JOIN edges e ON r.node = e.src
        WHERE e.dst IS NOT NULL
        ORDER BY r.node ASC NULLS LAST
        LIMIT 10 OFFSET 5
    ";
    let stmt = kg_sql::parse_select(sql).expect("valid SQL");
    assert!(stmt.recursive);
    assert_eq!(stmt.ctes[0].name, "reach");
    assert_eq!(stmt.limit, Some(10));
    assert_eq!(stmt.offset, Some(5));
    assert_eq!(stmt.order_by.len(), 1);
}

#[test]
fn parses_graph_table_with_multiple_paths_and_where() {
    let sql = "
        SELECT gt.src, gt.dst
        FROM GRAPH_TABLE(
            social,
            MATCH (a:Person)-[:knows]->(b:Person),
                  (b)-[:knows]->(c:Person)
            WHERE a.age > 21
            COLUMNS (a.id AS src, c.id AS dst)
        ) AS gt
    ";
    let stmt = kg_sql::parse_select(sql).expect("valid SQL");
    let from = stmt.from.expect("from clause");
    match from.base {
        TableRef::GraphTable { table, alias } => {
            assert_eq!(alias.as_deref(), Some("gt"));
            assert_eq!(table.patterns.len(), 2);
            assert!(table.filter.is_some());
            assert_eq!(table.columns.len(), 2);
        }
        _ => panic!("expected a GRAPH_TABLE reference"),
    }
    assert_eq!(stmt.projection.len(), 2);
    assert!(matches!(stmt.projection[0], SelectItem::Expr { .. }));
}

#[test]
fn parses_shortest_path_mode_and_undirected_edges() {
    let sql = "SELECT * FROM GRAPH_TABLE(g, MATCH SHORTEST PATH (a)-[e:link]-(b))";
    let stmt = kg_sql::parse_select(sql).unwrap();
    if let TableRef::GraphTable { table, .. } = stmt.from.unwrap().base {
        let path = &table.patterns[0];
        assert_eq!(path.mode, Some(PathMode::Shortest));
        assert_eq!(path.edges[0].direction, EdgeDirection::Undirected);
    } else {
        panic!("expected GRAPH_TABLE");
    }
}

#[test]
fn rejects_trailing_garbage_as_single_shot_parse_failure() {
    let err = kg_sql::parse("SELECT 1 FROM t; garbage").unwrap_err();
    match err {
        kg_sql::ParseError::UnexpectedToken { .. } => {}
        other => panic!("expected UnexpectedToken, got {other:?}"),
    }
}

#[test]
fn select_top_level_statement_round_trips_through_enum() {
    let Statement::Select(stmt) = kg_sql::parse("SELECT 1").unwrap();
    assert_eq!(stmt.projection.len(), 1);
}
