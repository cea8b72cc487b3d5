//! Method-call dispatch.

use crate::ast::{AggregateFn, CastType, Expr, HigherOrderFn, Method, Value};
use crate::error::{KsqlError, KsqlResult};
use crate::schema::TypeKind;
use crate::transpiler::context::{Binding, CompileContext};
use crate::transpiler::expr::{compile_bound, compile_expr, compile_lambda, kind_of};

pub(crate) fn compile_call(
    target: Option<&Expr>,
    method: &Method,
    args: &[Expr],
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    match method {
        Method::Scalar(function) => {
            let args = receiver_first(target, args);
            if !function.accepts(args.len()) {
                return Err(KsqlError::unsupported(format!(
                    "{} with {} arguments",
                    function.ksql_name(),
                    args.len()
                )));
            }
            positional(function.ksql_name(), &args, ctx)
        }
        Method::Udf {
            name,
            external_name,
        } => {
            let args = receiver_first(target, args);
            positional(external_name.as_deref().unwrap_or(name), &args, ctx)
        }
        Method::Aggregate(function) => compile_aggregate(*function, target, args, ctx),
        Method::Contains => {
            let (receiver, rest) = split_receiver(target, args, "Contains")?;
            let [item] = rest else {
                return Err(KsqlError::unsupported("Contains takes one argument"));
            };
            compile_contains(receiver, item, ctx)
        }
        Method::StartsWith => like(target, args, "StartsWith", |s| format!("{}%", s), ctx),
        Method::EndsWith => like(target, args, "EndsWith", |s| format!("%{}", s), ctx),
        Method::Between | Method::NotBetween => {
            let (receiver, rest) = split_receiver(target, args, "Between")?;
            let [low, high] = rest else {
                return Err(KsqlError::unsupported("Between takes two bounds"));
            };
            let keyword = if matches!(method, Method::NotBetween) {
                "NOT BETWEEN"
            } else {
                "BETWEEN"
            };
            Ok(format!(
                "{} {} {} AND {}",
                compile_expr(receiver, ctx)?,
                keyword,
                compile_expr(low, ctx)?,
                compile_expr(high, ctx)?
            ))
        }
        Method::HigherOrder(function) => compile_higher_order(*function, target, args, ctx),
        Method::Cast(cast) => compile_cast(*cast, target, args, ctx),
        Method::Other(name) => Err(KsqlError::unsupported(format!("method '{}'", name))),
    }
}

fn receiver_first<'a>(target: Option<&'a Expr>, args: &'a [Expr]) -> Vec<&'a Expr> {
    target.into_iter().chain(args.iter()).collect()
}

/// Instance form `x.F(a)` or static form `F(x, a)`.
fn split_receiver<'a>(
    target: Option<&'a Expr>,
    args: &'a [Expr],
    name: &str,
) -> KsqlResult<(&'a Expr, &'a [Expr])> {
    match (target, args) {
        (Some(receiver), rest) => Ok((receiver, rest)),
        (None, [receiver, rest @ ..]) => Ok((receiver, rest)),
        (None, []) => Err(KsqlError::unsupported(format!("{} without a receiver", name))),
    }
}

fn positional(name: &str, args: &[&Expr], ctx: &mut CompileContext) -> KsqlResult<String> {
    let args = args
        .iter()
        .map(|arg| compile_expr(arg, ctx))
        .collect::<KsqlResult<Vec<_>>>()?;
    Ok(format!("{}({})", name, args.join(", ")))
}

fn compile_aggregate(
    function: AggregateFn,
    target: Option<&Expr>,
    args: &[Expr],
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    let element = match target {
        Some(Expr::Parameter(name)) => match ctx.lookup(name) {
            Some(Binding::Grouping(index)) => Binding::Source(index),
            _ => {
                return Err(KsqlError::unsupported(format!(
                    "{} on '{}', which is not a grouping",
                    function.ksql_name(),
                    name
                )));
            }
        },
        _ => {
            return Err(KsqlError::unsupported(format!(
                "{} without a grouping receiver",
                function.ksql_name()
            )));
        }
    };

    let mut parts = args
        .iter()
        .map(|arg| compile_bound(arg, &[element], ctx))
        .collect::<KsqlResult<Vec<_>>>()?;

    if parts.is_empty() {
        return match function {
            AggregateFn::Count => Ok("COUNT(*)".to_string()),
            _ => Err(KsqlError::unsupported(format!(
                "{} without a selector",
                function.ksql_name()
            ))),
        };
    }

    if let Some(ignore_nulls) = function.ignore_nulls_flag() {
        parts.push(if ignore_nulls { "True" } else { "False" }.to_string());
    }
    Ok(format!("{}({})", function.ksql_name(), parts.join(", ")))
}

fn compile_contains(receiver: &Expr, item: &Expr, ctx: &mut CompileContext) -> KsqlResult<String> {
    let list_len = match receiver {
        Expr::NewArray(items) => Some(items.len()),
        Expr::Constant(Value::Array(items))
        | Expr::Captured {
            value: Value::Array(items),
            ..
        } => Some(items.len()),
        _ => None,
    };
    if let Some(len) = list_len {
        if len == 0 {
            return Err(KsqlError::unsupported("membership test against an empty list"));
        }
        let item = compile_expr(item, ctx)?;
        let list = ctx.with_membership(|ctx| compile_expr(receiver, ctx))?;
        return Ok(format!("{} IN ({})", item, list));
    }

    let substring = match kind_of(receiver, ctx) {
        Some(TypeKind::String) => true,
        Some(_) => false,
        None => matches!(item, Expr::Constant(Value::String(_))),
    };
    if substring {
        return like_pattern(receiver, item, |s| format!("%{}%", s), ctx);
    }

    Ok(format!(
        "ARRAY_CONTAINS({}, {})",
        compile_expr(receiver, ctx)?,
        compile_expr(item, ctx)?
    ))
}

fn like(
    target: Option<&Expr>,
    args: &[Expr],
    name: &str,
    pattern: impl Fn(&str) -> String,
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    let (receiver, rest) = split_receiver(target, args, name)?;
    let [needle] = rest else {
        return Err(KsqlError::unsupported(format!("{} takes one argument", name)));
    };
    like_pattern(receiver, needle, pattern, ctx)
}

fn like_pattern(
    receiver: &Expr,
    needle: &Expr,
    pattern: impl Fn(&str) -> String,
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    let Expr::Constant(Value::String(needle)) = needle else {
        return Err(KsqlError::unsupported(
            "LIKE pattern from a non-constant expression",
        ));
    };
    Ok(format!(
        "{} LIKE '{}'",
        compile_expr(receiver, ctx)?,
        pattern(needle)
    ))
}

/// `TRANSFORM(coll, (x) => ..)`, `FILTER(coll, (x) => ..)`,
/// `REDUCE(coll, init, (s, x) => ..)`.
fn compile_higher_order(
    function: HigherOrderFn,
    target: Option<&Expr>,
    args: &[Expr],
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    let (collection, rest) = split_receiver(target, args, function.ksql_name())?;
    if !rest.iter().any(|arg| matches!(arg, Expr::Lambda { .. })) {
        return Err(KsqlError::unsupported(format!(
            "{} without a lambda",
            function.ksql_name()
        )));
    }

    let element = kind_of(collection, ctx).and_then(|kind| kind.element_kind().cloned());
    let mut parts = vec![compile_expr(collection, ctx)?];
    for arg in rest {
        parts.push(match arg {
            Expr::Lambda { params, body } => {
                compile_lambda(params, body, element.clone(), ctx)?
            }
            other => compile_expr(other, ctx)?,
        });
    }
    Ok(format!("{}({})", function.ksql_name(), parts.join(", ")))
}

fn compile_cast(
    cast: CastType,
    target: Option<&Expr>,
    args: &[Expr],
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    let (value, rest) = split_receiver(target, args, "CAST")?;
    let value = compile_expr(value, ctx)?;

    let type_text = match cast {
        CastType::Decimal => match rest {
            [
                Expr::Constant(Value::Int(precision)),
                Expr::Constant(Value::Int(scale)),
            ] => format!("DECIMAL({}, {})", precision, scale),
            _ => {
                return Err(KsqlError::unsupported(
                    "DECIMAL cast without constant precision and scale",
                ));
            }
        },
        other => other.ksql_type().to_string(),
    };
    Ok(format!("CAST({} AS {})", value, type_text))
}
