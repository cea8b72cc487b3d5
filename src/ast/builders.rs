//! Constructors for query chains and expression trees.
//!
//! ```
//! use ksql::ast::*;
//!
//! let query = Query::from_source(Source::named("Location"))
//!     .filter(lambda(["l"], param("l").member("Latitude").equals(lit("1"))));
//! assert_eq!(query.nodes.len(), 2);
//! ```

use crate::ast::{
    AggregateFn, BinaryOp, Expr, Join, JoinKind, JoinWindow, Method, Query, QueryNode, ScalarFn,
    Source, UnaryOp, Value, Window,
};

impl Query {
    pub fn select(mut self, projection: Expr) -> Self {
        self.nodes.push(QueryNode::Select(projection));
        self
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.nodes.push(QueryNode::Where(predicate));
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.nodes.push(QueryNode::Join(Box::new(join)));
        self
    }

    pub fn inner_join(self, other: Source, outer_key: Expr, inner_key: Expr, result: Expr) -> Self {
        self.join(Join {
            kind: JoinKind::Inner,
            other,
            outer_key,
            inner_key,
            result,
            within: None,
        })
    }

    pub fn left_join(self, other: Source, outer_key: Expr, inner_key: Expr, result: Expr) -> Self {
        self.join(Join {
            kind: JoinKind::Left,
            other,
            outer_key,
            inner_key,
            result,
            within: None,
        })
    }

    /// Attach a time bound to the most recent join.
    pub fn within(mut self, window: JoinWindow) -> Self {
        if let Some(QueryNode::Join(join)) = self
            .nodes
            .iter_mut()
            .rev()
            .find(|n| matches!(n, QueryNode::Join(_)))
        {
            join.within = Some(window);
        }
        self
    }

    pub fn group_by(mut self, key: Expr) -> Self {
        self.nodes.push(QueryNode::GroupBy(key));
        self
    }

    pub fn having(mut self, predicate: Expr) -> Self {
        self.nodes.push(QueryNode::Having(predicate));
        self
    }

    pub fn windowed_by(mut self, window: Window) -> Self {
        self.nodes.push(QueryNode::WindowedBy(window));
        self
    }

    pub fn partition_by(mut self, key: Expr) -> Self {
        self.nodes.push(QueryNode::PartitionBy(key));
        self
    }

    pub fn take(mut self, n: u64) -> Self {
        self.nodes.push(QueryNode::Take(n));
        self
    }

    /// Turn this into a pull query (no `EMIT CHANGES`).
    pub fn pull(mut self) -> Self {
        self.pull = true;
        self
    }
}

pub fn param(name: impl Into<String>) -> Expr {
    Expr::Parameter(name.into())
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Constant(value.into())
}

pub fn null() -> Expr {
    Expr::Constant(Value::Null)
}

pub fn captured(name: impl Into<String>, value: impl Into<Value>) -> Expr {
    Expr::Captured {
        name: name.into(),
        value: value.into(),
    }
}

pub fn lambda<I, S>(params: I, body: Expr) -> Expr
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Expr::Lambda {
        params: params.into_iter().map(Into::into).collect(),
        body: Box::new(body),
    }
}

/// Call a built-in scalar function.
pub fn func(function: ScalarFn, args: Vec<Expr>) -> Expr {
    Expr::Call {
        target: None,
        method: Method::Scalar(function),
        args,
    }
}

/// Call a user-declared function.
pub fn udf(name: impl Into<String>, external_name: Option<&str>, args: Vec<Expr>) -> Expr {
    Expr::Call {
        target: None,
        method: Method::Udf {
            name: name.into(),
            external_name: external_name.map(str::to_string),
        },
        args,
    }
}

/// Anonymous object construction: `new { A = .., B = .. }`.
pub fn new_anon<I, S>(members: I) -> Expr
where
    I: IntoIterator<Item = (S, Expr)>,
    S: Into<String>,
{
    Expr::New {
        type_name: None,
        members: members.into_iter().map(|(n, e)| (n.into(), e)).collect(),
    }
}

/// Construction of a named type.
pub fn new_named<I, S>(type_name: impl Into<String>, members: I) -> Expr
where
    I: IntoIterator<Item = (S, Expr)>,
    S: Into<String>,
{
    Expr::New {
        type_name: Some(type_name.into()),
        members: members.into_iter().map(|(n, e)| (n.into(), e)).collect(),
    }
}

pub fn array(items: Vec<Expr>) -> Expr {
    Expr::NewArray(items)
}

impl Expr {
    pub fn member(self, name: impl Into<String>) -> Expr {
        Expr::Member {
            target: Box::new(self),
            member: name.into(),
            rename: None,
        }
    }

    /// Set the wire name of a member access.
    pub fn renamed(self, wire_name: impl Into<String>) -> Expr {
        match self {
            Expr::Member { target, member, .. } => Expr::Member {
                target,
                member,
                rename: Some(wire_name.into()),
            },
            other => other,
        }
    }

    pub fn binary(self, op: BinaryOp, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right),
        }
    }

    pub fn equals(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Eq, right)
    }

    pub fn not_equals(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Ne, right)
    }

    pub fn lt(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Lt, right)
    }

    pub fn le(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Le, right)
    }

    pub fn gt(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Gt, right)
    }

    pub fn ge(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Ge, right)
    }

    pub fn and(self, right: Expr) -> Expr {
        self.binary(BinaryOp::And, right)
    }

    pub fn or(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Or, right)
    }

    pub fn index(self, index: Expr) -> Expr {
        self.binary(BinaryOp::Index, index)
    }

    /// Method call with this expression as the receiver.
    pub fn call(self, method: Method, args: Vec<Expr>) -> Expr {
        Expr::Call {
            target: Some(Box::new(self)),
            method,
            args,
        }
    }

    /// Aggregation on a grouping parameter: `g.Sum(x => x.Amount)`.
    pub fn aggregate(self, function: AggregateFn, args: Vec<Expr>) -> Expr {
        self.call(Method::Aggregate(function), args)
    }

    pub fn contains(self, item: Expr) -> Expr {
        self.call(Method::Contains, vec![item])
    }
}

macro_rules! impl_binary_ops {
    ($($trait:ident, $method:ident => $op:ident;)*) => {
        $(
            impl std::ops::$trait for Expr {
                type Output = Expr;

                fn $method(self, rhs: Expr) -> Expr {
                    self.binary(BinaryOp::$op, rhs)
                }
            }
        )*
    };
}

impl_binary_ops! {
    Add, add => Add;
    Sub, sub => Sub;
    Mul, mul => Mul;
    Div, div => Div;
    Rem, rem => Rem;
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(self),
        }
    }
}
