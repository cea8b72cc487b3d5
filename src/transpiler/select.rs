//! Push/pull query assembly.

use crate::ast::{BinaryOp, Expr, Join, JoinBounds, Query, QueryNode, Window};
use crate::error::{KsqlError, KsqlResult};
use crate::transpiler::context::{Binding, CompileContext, GroupKey};
use crate::transpiler::expr::{compile_bound, compile_expr};
use crate::transpiler::fold::fold;

/// The chain split into its clauses.
#[derive(Default)]
struct Clauses<'a> {
    select: Option<&'a Expr>,
    filters: Vec<&'a Expr>,
    joins: Vec<&'a Join>,
    group_by: Option<&'a Expr>,
    having: Vec<&'a Expr>,
    window: Option<&'a Window>,
    partition_by: Option<&'a Expr>,
    limit: Option<u64>,
}

impl<'a> Clauses<'a> {
    fn collect(nodes: &'a [QueryNode]) -> KsqlResult<Self> {
        let mut clauses = Self::default();
        for node in nodes {
            match node {
                QueryNode::Source(_) => {
                    return Err(KsqlError::invalid("source must be the first node"));
                }
                QueryNode::Select(e) => set_once(&mut clauses.select, e, "Select")?,
                QueryNode::Where(e) => clauses.filters.push(e),
                QueryNode::Join(join) => clauses.joins.push(join),
                QueryNode::GroupBy(e) => set_once(&mut clauses.group_by, e, "GroupBy")?,
                QueryNode::Having(e) => clauses.having.push(e),
                QueryNode::WindowedBy(w) => set_once(&mut clauses.window, w, "WindowedBy")?,
                QueryNode::PartitionBy(e) => {
                    set_once(&mut clauses.partition_by, e, "PartitionBy")?
                }
                QueryNode::Take(n) => {
                    clauses.limit = Some(clauses.limit.map_or(*n, |limit| limit.min(*n)));
                }
            }
        }
        Ok(clauses)
    }
}

fn set_once<'a, T>(slot: &mut Option<&'a T>, value: &'a T, clause: &str) -> KsqlResult<()> {
    if slot.is_some() {
        return Err(KsqlError::unsupported(format!("more than one {} in a query", clause)));
    }
    *slot = Some(value);
    Ok(())
}

/// Compile a query chain into `SELECT ... ;` text.
pub fn compile_query(query: &Query, ctx: &mut CompileContext) -> KsqlResult<String> {
    let mut sql = select_body(query, ctx)?;
    sql.push(';');
    Ok(sql)
}

/// Everything but the trailing `;`.
pub(crate) fn select_body(query: &Query, ctx: &mut CompileContext) -> KsqlResult<String> {
    let (source, rest) = match query.nodes.split_first() {
        Some((QueryNode::Source(source), rest)) => (source, rest),
        _ => return Err(KsqlError::invalid("query does not start with a source")),
    };
    let clauses = Clauses::collect(rest)?;

    ctx.add_source(source);
    for join in &clauses.joins {
        ctx.add_source(&join.other);
    }
    if !clauses.joins.is_empty() {
        ctx.qualify = true;
        ctx.assign_aliases();
    }

    let all_sources: Vec<Binding> = (0..ctx.sources.len()).map(Binding::Source).collect();
    let grouped = match clauses.group_by {
        Some(key) => Some(group_key(key, &all_sources, ctx)?),
        None => None,
    };
    let row_bindings: Vec<Binding> = if grouped.is_some() {
        vec![Binding::Grouping(0)]
    } else {
        all_sources.clone()
    };

    let projection = match (clauses.select, clauses.joins.last()) {
        (Some(select), _) => projection(&fold(select), &row_bindings, ctx)?,
        (None, Some(join)) => projection(&fold(&join.result), &all_sources, ctx)?,
        (None, None) => String::new(),
    };

    let mut sql = String::from("SELECT ");
    sql.push_str(if projection.is_empty() { "*" } else { &projection });

    sql.push_str(" FROM ");
    sql.push_str(&source_clause(0, ctx));

    for (i, join) in clauses.joins.iter().enumerate() {
        sql.push_str(&join_clause(join, i + 1, &all_sources, ctx)?);
    }

    if !clauses.filters.is_empty() {
        let predicates = clauses
            .filters
            .iter()
            .map(|p| predicate(p, &all_sources, ctx))
            .collect::<KsqlResult<Vec<_>>>()?;
        sql.push_str("\nWHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    if let Some(window) = clauses.window {
        sql.push_str(&format!(" WINDOW {}", window));
    }

    if let Some(key) = grouped {
        sql.push_str(" GROUP BY ");
        sql.push_str(&key);
    }

    if let Some(key) = clauses.partition_by {
        let key = compile_bound(&fold(key), &all_sources, ctx)?;
        sql.push_str(" PARTITION BY ");
        sql.push_str(&key);
    }

    if !clauses.having.is_empty() {
        let predicates = clauses
            .having
            .iter()
            .map(|p| predicate(p, &row_bindings, ctx))
            .collect::<KsqlResult<Vec<_>>>()?;
        sql.push_str(" HAVING ");
        sql.push_str(&predicates.join(" AND "));
    }

    if !query.pull {
        sql.push_str(" EMIT CHANGES");
    }

    if let Some(n) = clauses.limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }

    Ok(sql)
}

fn source_clause(index: usize, ctx: &CompileContext) -> String {
    match ctx.source(index) {
        Some(source) => match &source.alias {
            Some(alias) => format!("{} {}", source.name, alias),
            None => source.name.clone(),
        },
        None => String::new(),
    }
}

fn join_clause(
    join: &Join,
    index: usize,
    all_sources: &[Binding],
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    let mut sql = format!("\n{} JOIN {}", join.kind, source_clause(index, ctx));

    if let Some(window) = &join.within {
        match window.bounds {
            JoinBounds::Symmetric(span) => sql.push_str(&format!(" WITHIN {}", span)),
            JoinBounds::Asymmetric { before, after } => {
                sql.push_str(&format!(" WITHIN ({}, {})", before, after))
            }
        }
        if let Some(grace) = window.grace_period {
            sql.push_str(&format!(" GRACE PERIOD {}", grace));
        }
    }

    let outer = compile_bound(&fold(&join.outer_key), &all_sources[..index], ctx)?;
    let inner = compile_bound(&fold(&join.inner_key), &[Binding::Source(index)], ctx)?;
    sql.push_str(&format!("\nON {} = {}", outer, inner));
    Ok(sql)
}

fn predicate(expr: &Expr, bindings: &[Binding], ctx: &mut CompileContext) -> KsqlResult<String> {
    let expr = fold(expr);
    let text = compile_bound(&expr, bindings, ctx)?;
    let body = match &expr {
        Expr::Lambda { body, .. } => body.as_ref(),
        other => other,
    };
    // OR groups keep their meaning when AND-combined
    if matches!(body, Expr::Binary { op: BinaryOp::Or, .. }) {
        Ok(format!("({})", text))
    } else {
        Ok(text)
    }
}

/// Compile the GROUP BY key and remember it for `g.Key`.
fn group_key(key: &Expr, bindings: &[Binding], ctx: &mut CompileContext) -> KsqlResult<String> {
    let key = fold(key);
    let (params, body) = match &key {
        Expr::Lambda { params, body } => (params.clone(), body.as_ref().clone()),
        other => (Vec::new(), other.clone()),
    };
    let scope: Vec<(String, Binding)> = params.into_iter().zip(bindings.iter().copied()).collect();

    let text = ctx.with_scope(scope.clone(), |ctx| match &body {
        Expr::New { members, .. } => members
            .iter()
            .map(|(_, e)| compile_expr(e, ctx))
            .collect::<KsqlResult<Vec<_>>>()
            .map(|parts| parts.join(", ")),
        other => compile_expr(other, ctx),
    })?;

    ctx.group_key = Some(GroupKey {
        bindings: scope,
        body,
    });
    Ok(text)
}

/// The column list. An empty result means `*`.
fn projection(expr: &Expr, bindings: &[Binding], ctx: &mut CompileContext) -> KsqlResult<String> {
    let Expr::Lambda { params, body } = expr else {
        return compile_expr(expr, ctx);
    };
    let scope = params.iter().cloned().zip(bindings.iter().copied()).collect();
    ctx.with_scope(scope, |ctx| match body.as_ref() {
        Expr::New { members, .. } => {
            let mut columns = Vec::new();
            for (name, value) in members {
                let text = ctx.with_named_projection(|ctx| compile_expr(value, ctx))?;
                if text.is_empty() {
                    continue;
                }
                columns.push(projected_column(name, value, text));
            }
            Ok(columns.join(", "))
        }
        other => compile_expr(other, ctx),
    })
}

fn projected_column(name: &str, value: &Expr, text: String) -> String {
    match value {
        _ if text == name => text,
        Expr::Member { member, .. } if member == name => format!("{} {}", text, name),
        Expr::Member { .. } => format!("{} AS {}", text, name),
        _ => format!("{} {}", text, name),
    }
}
