use crate::ast::{AggregateFn, CastType, HigherOrderFn, ScalarFn, Value};
use serde::{Deserialize, Serialize};

/// Binary operators for expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    /// Modulo (%)
    Rem,
    /// Array or map subscript: `base[index]`
    Index,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 5,
            BinaryOp::Index => 6,
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::And => write!(f, "AND"),
            BinaryOp::Or => write!(f, "OR"),
            BinaryOp::Eq => write!(f, "="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Rem => write!(f, "%"),
            BinaryOp::Index => write!(f, "[]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// Identity of a called method, grouped by how it is printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    /// Fixed-name built-in.
    Scalar(ScalarFn),
    /// User-declared function; `external_name` overrides the declared name.
    Udf {
        name: String,
        external_name: Option<String>,
    },
    /// Aggregation on a grouping receiver.
    Aggregate(AggregateFn),
    /// Membership test (`IN`), substring test (`LIKE '%x%'`) or
    /// `ARRAY_CONTAINS`, depending on the receiver.
    Contains,
    StartsWith,
    EndsWith,
    Between,
    NotBetween,
    HigherOrder(HigherOrderFn),
    Cast(CastType),
    /// A host-language method with no KSQL counterpart.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Constant(Value),
    /// A lambda parameter: the query row, a grouping, or a local
    /// parameter of a higher-order lambda.
    Parameter(String),
    /// A free variable captured from the calling scope. Folded into a
    /// constant before compilation.
    Captured { name: String, value: Value },
    /// Member access (`target.member`); `rename` is the wire name.
    Member {
        target: Box<Expr>,
        member: String,
        rename: Option<String>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Call {
        target: Option<Box<Expr>>,
        method: Method,
        args: Vec<Expr>,
    },
    /// Object construction. `type_name` is `None` for anonymous shapes.
    New {
        type_name: Option<String>,
        members: Vec<(String, Expr)>,
    },
    /// Array construction from expressions: `ARRAY[a, b]`
    NewArray(Vec<Expr>),
    /// Map construction from expressions: `MAP(k := v)`
    NewMap(Vec<(Expr, Expr)>),
    Lambda { params: Vec<String>, body: Box<Expr> },
}

impl Expr {
    /// True when the expression touches no lambda parameter, so it can be
    /// evaluated up front.
    pub fn is_source_independent(&self) -> bool {
        match self {
            Expr::Constant(_) | Expr::Captured { .. } => true,
            Expr::Parameter(_) | Expr::Lambda { .. } => false,
            Expr::Member { target, .. } => target.is_source_independent(),
            Expr::Binary { left, right, .. } => {
                left.is_source_independent() && right.is_source_independent()
            }
            Expr::Unary { operand, .. } => operand.is_source_independent(),
            Expr::Call { .. } => false,
            Expr::New { members, .. } => members.iter().all(|(_, e)| e.is_source_independent()),
            Expr::NewArray(items) => items.iter().all(Expr::is_source_independent),
            Expr::NewMap(entries) => entries
                .iter()
                .all(|(k, v)| k.is_source_independent() && v.is_source_independent()),
        }
    }
}
