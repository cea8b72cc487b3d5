//! GROUP BY, windows and aggregations.

use crate::ast::*;
use crate::config::CompileOptions;
use crate::error::KsqlError;
use crate::transpiler::compile;
use pretty_assertions::assert_eq;

fn t(member: &str) -> Expr {
    param("t").member(member)
}

fn g() -> Expr {
    param("g")
}

fn transactions() -> Query {
    Query::from_source(Source::named("Transaction"))
}

#[test]
fn test_windowed_count() {
    let query = transactions()
        .windowed_by(Window::tumbling(Duration::minutes(2)))
        .group_by(lambda(["t"], t("CardNumber")))
        .select(lambda(
            ["g"],
            new_anon([
                ("CardNumber", g().member("Key")),
                ("Count", g().aggregate(AggregateFn::Count, vec![])),
            ]),
        ));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT CardNumber, COUNT(*) Count FROM Transactions \
         WINDOW TUMBLING (SIZE 2 MINUTES) GROUP BY CardNumber EMIT CHANGES;"
    );
}

#[test]
fn test_having() {
    let query = transactions()
        .group_by(lambda(["t"], t("CardNumber")))
        .having(lambda(
            ["g"],
            g().aggregate(AggregateFn::Count, vec![]).gt(lit(2)),
        ))
        .select(lambda(
            ["g"],
            new_anon([
                ("Card", g().member("Key")),
                (
                    "Total",
                    g().aggregate(AggregateFn::Sum, vec![lambda(["x"], param("x").member("Amount"))]),
                ),
            ]),
        ));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT CardNumber AS Card, SUM(Amount) Total FROM Transactions \
         GROUP BY CardNumber HAVING COUNT(*) > 2 EMIT CHANGES;"
    );
}

#[test]
fn test_composite_key() {
    let query = Query::from_source(Source::named("Order"))
        .group_by(lambda(
            ["o"],
            new_anon([
                ("Region", param("o").member("Region")),
                ("Store", param("o").member("StoreId")),
            ]),
        ))
        .select(lambda(
            ["g"],
            new_anon([
                ("Region", g().member("Key").member("Region")),
                ("Store", g().member("Key").member("Store")),
                ("Orders", g().aggregate(AggregateFn::Count, vec![])),
            ]),
        ));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT Region, StoreId Store, COUNT(*) Orders FROM Orders \
         GROUP BY Region, StoreId EMIT CHANGES;"
    );
}

#[test]
fn test_by_offset_flags_and_window_bounds() {
    let query = transactions()
        .windowed_by(
            Window::hopping(Duration::minutes(10), Duration::minutes(5))
                .retention(Duration::days(7))
                .grace_period(Duration::seconds(30)),
        )
        .group_by(lambda(["t"], t("CardNumber")))
        .select(lambda(
            ["g"],
            new_anon([
                ("Start", g().member("WindowStart")),
                ("End", g().member("WindowEnd")),
                (
                    "Latest",
                    g().aggregate(
                        AggregateFn::LatestByOffset,
                        vec![lambda(["x"], param("x").member("Amount"))],
                    ),
                ),
                (
                    "Earliest",
                    g().aggregate(
                        AggregateFn::EarliestByOffsetAllowNulls,
                        vec![lambda(["x"], param("x").member("Amount")), lit(2)],
                    ),
                ),
            ]),
        ));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT WINDOWSTART AS Start, WINDOWEND AS End, LATEST_BY_OFFSET(Amount, True) Latest, \
         EARLIEST_BY_OFFSET(Amount, 2, False) Earliest FROM Transactions \
         WINDOW HOPPING (SIZE 10 MINUTES, ADVANCE BY 5 MINUTES, RETENTION 7 DAYS, GRACE PERIOD 30 SECONDS) \
         GROUP BY CardNumber EMIT CHANGES;"
    );
}

#[test]
fn test_topk_and_collect() {
    let query = transactions()
        .windowed_by(Window::session(Duration::minutes(5)))
        .group_by(lambda(["t"], t("CardNumber")))
        .select(lambda(
            ["g"],
            new_anon([
                (
                    "Top",
                    g().aggregate(
                        AggregateFn::TopK,
                        vec![lambda(["x"], param("x").member("Amount")), lit(3)],
                    ),
                ),
                (
                    "Shops",
                    g().aggregate(
                        AggregateFn::CollectSet,
                        vec![lambda(["x"], param("x").member("Shop"))],
                    ),
                ),
            ]),
        ));
    assert_eq!(
        compile(&query, &CompileOptions::default()).unwrap(),
        "SELECT TOPK(Amount, 3) Top, COLLECT_SET(Shop) Shops FROM Transactions \
         WINDOW SESSION (5 MINUTES) GROUP BY CardNumber EMIT CHANGES;"
    );
}

#[test]
fn test_aggregate_needs_grouping_receiver() {
    let query = transactions().select(lambda(
        ["t"],
        param("t").aggregate(AggregateFn::Count, vec![]),
    ));
    let err = compile(&query, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, KsqlError::Unsupported(_)));
}

#[test]
fn test_sum_without_selector_is_unsupported() {
    let query = transactions()
        .group_by(lambda(["t"], t("CardNumber")))
        .select(lambda(["g"], g().aggregate(AggregateFn::Sum, vec![])));
    let err = compile(&query, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, KsqlError::Unsupported(_)));
}
