//! Expression compiler: one expression tree to KSQL text.

use crate::ast::{BinaryOp, Expr, UnaryOp, Value};
use crate::error::{KsqlError, KsqlResult};
use crate::schema::TypeKind;
use crate::transpiler::context::{Binding, CompileContext};
use crate::transpiler::functions::compile_call;
use crate::transpiler::literal::{self, empty_array};

pub(crate) fn compile_expr(expr: &Expr, ctx: &mut CompileContext) -> KsqlResult<String> {
    match expr {
        Expr::Constant(value) => Ok(literal::print(value, &ctx.literal_style())),
        Expr::Captured { value, .. } => Ok(literal::print(value, &ctx.literal_style())),
        Expr::Parameter(name) => compile_parameter(name, ctx),
        Expr::Member {
            target,
            member,
            rename,
        } => compile_member(target, member, rename.as_deref(), ctx),
        Expr::Binary { op, left, right } => compile_binary(*op, left, right, ctx),
        Expr::Unary { op, operand } => {
            let inner = compile_expr(operand, ctx)?;
            // `--` opens a line comment
            let wrap = match &**operand {
                Expr::Binary { op, .. } => *op != BinaryOp::Index,
                Expr::Unary { .. } => *op == UnaryOp::Negate,
                _ => *op == UnaryOp::Negate && inner.starts_with('-'),
            };
            let inner = if wrap { format!("({})", inner) } else { inner };
            Ok(match op {
                UnaryOp::Not => format!("NOT {}", inner),
                UnaryOp::Negate => format!("-{}", inner),
            })
        }
        Expr::Call {
            target,
            method,
            args,
        } => compile_call(target.as_deref(), method, args, ctx),
        Expr::New { members, .. } => {
            let fields = members
                .iter()
                .map(|(name, value)| Ok(format!("{} := {}", name, compile_expr(value, ctx)?)))
                .collect::<KsqlResult<Vec<_>>>()?;
            Ok(format!("STRUCT({})", fields.join(", ")))
        }
        Expr::NewArray(items) => {
            let membership = ctx.in_membership;
            ctx.in_membership = false;
            let items = items
                .iter()
                .map(|item| compile_expr(item, ctx))
                .collect::<KsqlResult<Vec<_>>>();
            ctx.in_membership = membership;
            let items = items?;
            Ok(if membership {
                items.join(", ")
            } else if items.is_empty() {
                empty_array(None)
            } else {
                format!("ARRAY[{}]", items.join(", "))
            })
        }
        Expr::NewMap(entries) => {
            let entries = entries
                .iter()
                .map(|(k, v)| Ok(format!("{} := {}", compile_expr(k, ctx)?, compile_expr(v, ctx)?)))
                .collect::<KsqlResult<Vec<_>>>()?;
            Ok(format!("MAP({})", entries.join(", ")))
        }
        Expr::Lambda { .. } => Err(KsqlError::unsupported(
            "lambda outside of a higher-order function",
        )),
    }
}

/// `(p1, p2) => body`, with the parameters bound as locals. The last
/// parameter takes the collection's element shape when one is known.
pub(crate) fn compile_lambda(
    params: &[String],
    body: &Expr,
    element: Option<TypeKind>,
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    let bindings = params.iter().map(|p| (p.clone(), Binding::Local)).collect();
    let body = match params.last() {
        Some(last) => ctx.with_local_kind(last, element, |ctx| {
            ctx.with_scope(bindings, |ctx| compile_expr(body, ctx))
        })?,
        None => ctx.with_scope(bindings, |ctx| compile_expr(body, ctx))?,
    };
    Ok(format!("({}) => {}", params.join(", "), body))
}

/// Compile a lambda whose parameters stand for the given bindings, in
/// order. A non-lambda expression is compiled as is.
pub(crate) fn compile_bound(
    expr: &Expr,
    bindings: &[Binding],
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    match expr {
        Expr::Lambda { params, body } => {
            if params.len() > bindings.len() {
                return Err(KsqlError::invalid(format!(
                    "lambda takes {} parameters but only {} sources are in scope",
                    params.len(),
                    bindings.len()
                )));
            }
            let scope = params.iter().cloned().zip(bindings.iter().copied()).collect();
            ctx.with_scope(scope, |ctx| compile_expr(body, ctx))
        }
        other => compile_expr(other, ctx),
    }
}

fn compile_parameter(name: &str, ctx: &CompileContext) -> KsqlResult<String> {
    match ctx.lookup(name) {
        // The whole row: the assembler turns an empty projection into `*`.
        Some(Binding::Source(_)) => Ok(String::new()),
        Some(Binding::Local) => Ok(name.to_string()),
        Some(Binding::Grouping(_)) => Err(KsqlError::unsupported(format!(
            "grouping parameter '{}' used without a member or aggregate",
            name
        ))),
        None => Err(KsqlError::unsupported(format!("unbound parameter '{}'", name))),
    }
}

fn compile_member(
    target: &Expr,
    member: &str,
    rename: Option<&str>,
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    if let Expr::Parameter(name) = target {
        match ctx.lookup(name) {
            Some(Binding::Source(index)) => return Ok(column_name(index, member, rename, ctx)),
            Some(Binding::Grouping(_)) => return compile_grouping_member(member, ctx),
            Some(Binding::Local) if member != "Length" => {
                return Ok(format!("{}->{}", name, rename.unwrap_or(member)));
            }
            Some(Binding::Local) | None => {}
        }
    }

    // `g.Key.Part` on a composite key
    if let Expr::Member {
        target: inner,
        member: key,
        ..
    } = target
        && key == "Key"
        && is_grouping(inner, ctx)
    {
        return compile_key_part(member, ctx);
    }

    let prefix = compile_expr(target, ctx)?;
    let shape = kind_of(target, ctx);

    if member == "Length" {
        return Ok(match shape {
            Some(TypeKind::String) => format!("LEN({})", prefix),
            _ => format!("ARRAY_LENGTH({})", prefix),
        });
    }

    let field = match (rename, shape.as_ref().and_then(TypeKind::struct_fields)) {
        (Some(rename), _) => rename.to_string(),
        (None, Some(fields)) => fields
            .iter()
            .find(|f| f.name == member)
            .map(|f| f.wire_name().to_string())
            .unwrap_or_else(|| member.to_string()),
        (None, None) => member.to_string(),
    };

    if prefix.is_empty() {
        Ok(field)
    } else {
        Ok(format!("{}->{}", prefix, field))
    }
}

/// Column reference on a source row: wire name, alias-qualified when the
/// query joins.
fn column_name(index: usize, member: &str, rename: Option<&str>, ctx: &CompileContext) -> String {
    let source = ctx.source(index);
    let name = match rename {
        Some(rename) => rename.to_string(),
        None => source
            .and_then(|s| s.schema.as_ref())
            .and_then(|schema| schema.find(member))
            .map(|column| column.wire_name().to_string())
            .unwrap_or_else(|| member.to_string()),
    };

    match source.and_then(|s| s.alias.as_deref()) {
        Some(alias) if ctx.qualify => format!("{}.{}", alias, name),
        _ => name,
    }
}

fn compile_grouping_member(member: &str, ctx: &mut CompileContext) -> KsqlResult<String> {
    match member {
        "WindowStart" => Ok("WINDOWSTART".to_string()),
        "WindowEnd" => Ok("WINDOWEND".to_string()),
        "Key" => {
            let key = ctx
                .group_key
                .clone()
                .ok_or_else(|| KsqlError::invalid("grouping key used before GROUP BY"))?;
            let parts = ctx.with_scope(key.bindings, |ctx| match &key.body {
                Expr::New { members, .. } => members
                    .iter()
                    .map(|(_, e)| compile_expr(e, ctx))
                    .collect::<KsqlResult<Vec<_>>>()
                    .map(|parts| parts.join(", ")),
                body => compile_expr(body, ctx),
            })?;
            Ok(parts)
        }
        other => Err(KsqlError::unsupported(format!("grouping member '{}'", other))),
    }
}

fn compile_key_part(part: &str, ctx: &mut CompileContext) -> KsqlResult<String> {
    let key = ctx
        .group_key
        .clone()
        .ok_or_else(|| KsqlError::invalid("grouping key used before GROUP BY"))?;
    let Expr::New { members, .. } = &key.body else {
        return Err(KsqlError::unsupported(format!(
            "member '{}' of a non-composite grouping key",
            part
        )));
    };
    let expr = members
        .iter()
        .find(|(name, _)| name == part)
        .map(|(_, e)| e)
        .ok_or_else(|| KsqlError::invalid(format!("grouping key has no member '{}'", part)))?;
    ctx.with_scope(key.bindings, |ctx| compile_expr(expr, ctx))
}

fn is_grouping(expr: &Expr, ctx: &CompileContext) -> bool {
    matches!(expr, Expr::Parameter(name) if matches!(ctx.lookup(name), Some(Binding::Grouping(_))))
}

/// Best-effort static shape of an expression, from literals and source
/// schemas.
pub(crate) fn kind_of(expr: &Expr, ctx: &CompileContext) -> Option<TypeKind> {
    match expr {
        Expr::Constant(value) | Expr::Captured { value, .. } => value_kind(value),
        Expr::Parameter(name) => match ctx.lookup(name) {
            Some(Binding::Local) => ctx.local_kind(name).cloned(),
            _ => None,
        },
        Expr::NewArray(items) => Some(TypeKind::array(
            items
                .first()
                .and_then(|item| kind_of(item, ctx))
                .unwrap_or(TypeKind::String),
        )),
        Expr::Member { target, member, .. } => match &**target {
            Expr::Parameter(name) => match ctx.lookup(name) {
                Some(Binding::Source(index)) => ctx
                    .source(index)
                    .and_then(|s| s.schema.as_ref())
                    .and_then(|schema| schema.find(member))
                    .map(|column| column.kind.clone()),
                _ => None,
            },
            other => kind_of(other, ctx)?
                .struct_fields()?
                .iter()
                .find(|f| f.name == *member)
                .map(|f| f.kind.clone()),
        },
        _ => None,
    }
}

fn value_kind(value: &Value) -> Option<TypeKind> {
    match value {
        Value::Bool(_) => Some(TypeKind::Boolean),
        Value::Int(_) => Some(TypeKind::BigInt),
        Value::Float(_) => Some(TypeKind::Double),
        Value::String(_) | Value::Enum(_) => Some(TypeKind::String),
        Value::Bytes(_) => Some(TypeKind::Bytes),
        Value::Array(items) => Some(TypeKind::array(
            items.first().and_then(value_kind).unwrap_or(TypeKind::String),
        )),
        _ => None,
    }
}

fn compile_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
        let other = match (left, right) {
            (_, Expr::Constant(Value::Null)) => Some(left),
            (Expr::Constant(Value::Null), _) => Some(right),
            _ => None,
        };
        if let Some(other) = other {
            let text = operand(other, op, false, ctx)?;
            return Ok(if op == BinaryOp::Eq {
                format!("{} IS NULL", text)
            } else {
                format!("{} IS NOT NULL", text)
            });
        }
    }

    if op == BinaryOp::Index {
        let base = operand(left, op, false, ctx)?;
        let index = compile_expr(right, ctx)?;
        return Ok(format!("{}[{}]", base, index));
    }

    let left = operand(left, op, false, ctx)?;
    let right = operand(right, op, true, ctx)?;
    Ok(format!("{} {} {}", left, op, right))
}

/// Compile a child of a binary node, parenthesized when it binds looser
/// than its parent.
fn operand(
    child: &Expr,
    parent: BinaryOp,
    right_side: bool,
    ctx: &mut CompileContext,
) -> KsqlResult<String> {
    let text = compile_expr(child, ctx)?;
    let Expr::Binary { op, .. } = child else {
        return Ok(text);
    };
    let needs_parens = op.precedence() < parent.precedence()
        || (right_side
            && op.precedence() == parent.precedence()
            && matches!(parent, BinaryOp::Sub | BinaryOp::Div | BinaryOp::Rem));
    Ok(if needs_parens {
        format!("({})", text)
    } else {
        text
    })
}
