//! Constant folding run before compilation.
//!
//! Only subtrees that touch no lambda parameter are folded: captured
//! variables become constants, and member access or indexing applied to a
//! constant is evaluated up front.

use crate::ast::{BinaryOp, Expr, Value};

pub fn fold(expr: &Expr) -> Expr {
    if expr.is_source_independent()
        && let Some(value) = evaluate(expr)
    {
        return Expr::Constant(value);
    }

    match expr {
        Expr::Member {
            target,
            member,
            rename,
        } => Expr::Member {
            target: Box::new(fold(target)),
            member: member.clone(),
            rename: rename.clone(),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(fold(left)),
            right: Box::new(fold(right)),
        },
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(fold(operand)),
        },
        Expr::Call {
            target,
            method,
            args,
        } => Expr::Call {
            target: target.as_ref().map(|t| Box::new(fold(t))),
            method: method.clone(),
            args: args.iter().map(fold).collect(),
        },
        Expr::New { type_name, members } => Expr::New {
            type_name: type_name.clone(),
            members: members.iter().map(|(n, e)| (n.clone(), fold(e))).collect(),
        },
        Expr::NewArray(items) => Expr::NewArray(items.iter().map(fold).collect()),
        Expr::NewMap(entries) => {
            Expr::NewMap(entries.iter().map(|(k, v)| (fold(k), fold(v))).collect())
        }
        Expr::Lambda { params, body } => Expr::Lambda {
            params: params.clone(),
            body: Box::new(fold(body)),
        },
        Expr::Constant(_) | Expr::Captured { .. } | Expr::Parameter(_) => expr.clone(),
    }
}

/// Value of a source-independent constant, captured variable, member
/// access or index chain. Anything else stays an expression.
fn evaluate(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Constant(value) | Expr::Captured { value, .. } => Some(value.clone()),
        Expr::Member { target, member, .. } => evaluate(target)?.field(member).cloned(),
        Expr::Binary {
            op: BinaryOp::Index,
            left,
            right,
        } => index_constant(&evaluate(left)?, &evaluate(right)?),
        _ => None,
    }
}

fn index_constant(base: &Value, index: &Value) -> Option<Value> {
    match (base, index) {
        (Value::Array(items), Value::Int(i)) => {
            usize::try_from(*i).ok().and_then(|i| items.get(i)).cloned()
        }
        (Value::Map(entries), key) => entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    #[test]
    fn test_captured_becomes_constant() {
        let expr = param("l").member("Latitude").equals(captured("lat", "1"));
        let folded = fold(&expr);
        assert_eq!(folded, param("l").member("Latitude").equals(lit("1")));
    }

    #[test]
    fn test_member_of_captured_struct() {
        let filter = captured("filter", Value::structure([("Year", 1986)]));
        let folded = fold(&filter.member("Year"));
        assert_eq!(folded, lit(1986));
    }

    #[test]
    fn test_constant_index() {
        let expr = captured("ids", vec![10, 20, 30]).index(lit(1));
        assert_eq!(fold(&expr), lit(20));

        let out_of_range = captured("ids", vec![10]).index(lit(5));
        assert!(matches!(
            fold(&out_of_range),
            Expr::Binary { op: BinaryOp::Index, .. }
        ));
    }

    #[test]
    fn test_nested_captured_chain() {
        let filter = captured("filter", Value::structure([("Ids", vec![7, 8])]));
        assert_eq!(fold(&filter.member("Ids").index(lit(1))), lit(8));
    }

    #[test]
    fn test_parameter_dependent_index_untouched() {
        let expr = captured("ids", vec![10, 20]).index(param("m").member("Slot"));
        assert_eq!(
            fold(&expr),
            lit(vec![10, 20]).index(param("m").member("Slot"))
        );
    }

    #[test]
    fn test_row_members_untouched() {
        let expr = param("m").member("Title");
        assert_eq!(fold(&expr), expr);
    }
}
