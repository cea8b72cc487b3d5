//! Query assembly tests.

use crate::ast::*;
use crate::config::CompileOptions;
use crate::error::KsqlError;
use crate::transpiler::{compile, ToKsql};
use pretty_assertions::assert_eq;

fn locations() -> Query {
    Query::from_source(Source::named("Location"))
}

fn l(member: &str) -> Expr {
    param("l").member(member)
}

#[test]
fn test_projection_with_alias() {
    let query = locations().select(lambda(
        ["l"],
        new_anon([("Longitude", l("Longitude")), ("La", l("Latitude"))]),
    ));
    assert_eq!(
        query.to_ksql(&CompileOptions::default()).unwrap(),
        "SELECT Longitude, Latitude AS La FROM Locations EMIT CHANGES;"
    );
}

#[test]
fn test_where_clause() {
    let query = locations().filter(lambda(["l"], l("Latitude").equals(lit("1"))));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT * FROM Locations\nWHERE Latitude = '1' EMIT CHANGES;"
    );
}

#[test]
fn test_where_nodes_are_and_combined() {
    let query = locations()
        .filter(lambda(["l"], l("Latitude").equals(lit("1"))))
        .filter(lambda(["l"], l("Longitude").gt(lit(0.1))));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT * FROM Locations\nWHERE Latitude = '1' AND Longitude > 0.1 EMIT CHANGES;"
    );
}

#[test]
fn test_or_group_keeps_parentheses() {
    let query = locations()
        .filter(lambda(
            ["l"],
            l("A").equals(lit(1)).or(l("B").equals(lit(2))),
        ))
        .filter(lambda(["l"], l("C").equals(lit(3))));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT * FROM Locations\nWHERE (A = 1 OR B = 2) AND C = 3 EMIT CHANGES;"
    );
}

#[test]
fn test_projection_token_count_matches_members() {
    let members = ["Id", "Latitude", "Longitude", "Name"];
    let query = locations().select(lambda(
        ["l"],
        new_anon(members.iter().map(|m| (*m, l(m)))),
    ));
    let sql = compile(&query, &CompileOptions::default()).unwrap();
    let columns = sql
        .strip_prefix("SELECT ")
        .and_then(|rest| rest.split(" FROM ").next())
        .unwrap();
    assert_eq!(columns.split(", ").collect::<Vec<_>>(), members);
}

#[test]
fn test_pluralization_toggle() {
    let query = Query::from_source(Source::named("Tweet").with_name("TestName"));
    assert_eq!(
        compile(&query, &CompileOptions::default().without_pluralization()).unwrap(),
        "SELECT * FROM TestName EMIT CHANGES;"
    );
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT * FROM TestNames EMIT CHANGES;"
    );
}

#[test]
fn test_whole_row_projection_is_star() {
    let query = locations().select(lambda(["l"], param("l")));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT * FROM Locations EMIT CHANGES;"
    );
}

#[test]
fn test_limit_and_pull() {
    let push = locations().take(5).take(2);
    assert_eq!(
        compile(&push, &CompileOptions::default()).unwrap(),
        "SELECT * FROM Locations EMIT CHANGES LIMIT 2;"
    );

    let pull = locations()
        .filter(lambda(["l"], l("Id").equals(lit(1))))
        .pull();
    assert_eq!(
        compile(&pull, &CompileOptions::default()).unwrap(),
        "SELECT * FROM Locations\nWHERE Id = 1;"
    );
}

#[test]
fn test_partition_by() {
    let query = locations().partition_by(lambda(["l"], l("Latitude")));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT * FROM Locations PARTITION BY Latitude EMIT CHANGES;"
    );
}

#[test]
fn test_compile_is_pure() {
    let query = locations()
        .select(lambda(["l"], new_anon([("La", l("Latitude"))])))
        .filter(lambda(["l"], l("Name").not_equals(null())));
    let options = CompileOptions::default();
    assert_eq!(
        compile(&query, &options).unwrap(),
        compile(&query, &options).unwrap()
    );
}

#[test]
fn test_query_without_source_is_invalid() {
    let query = Query {
        nodes: vec![QueryNode::Take(1)],
        pull: false,
    };
    let err = compile(&query, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, KsqlError::InvalidQuery(_)));
}

#[test]
fn test_second_select_is_unsupported() {
    let query = locations()
        .select(lambda(["l"], l("Id")))
        .select(lambda(["l"], l("Name")));
    let err = compile(&query, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, KsqlError::Unsupported(_)));
}

#[test]
fn test_value_to_ksql() {
    let options = CompileOptions::default().decimal_separator(',');
    assert_eq!(Value::Float(2.5).to_ksql(&options).unwrap(), "2,5");
    assert_eq!(Value::from(vec![1, 2, 3]).to_ksql(&options).unwrap(), "ARRAY[1, 2, 3]");
}
