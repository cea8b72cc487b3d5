use crate::ast::Expr;
use crate::schema::{KsqlSchema, SchemaDescriptor};
use serde::{Deserialize, Serialize};

/// A named stream or table a query reads from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Simple type name, pluralized unless disabled.
    pub name: String,
    /// Explicit name; still subject to pluralization.
    #[serde(default)]
    pub override_name: Option<String>,
    /// Row shape, used to resolve wire renames and member kinds.
    #[serde(default)]
    pub schema: Option<SchemaDescriptor>,
}

impl Source {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            override_name: None,
            schema: None,
        }
    }

    /// Source described by a row type's schema.
    pub fn of<T: KsqlSchema>() -> Self {
        let schema = T::schema();
        Self {
            name: schema.name.clone(),
            override_name: None,
            schema: Some(schema),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.override_name = Some(name.into());
        self
    }

    /// The name before pluralization.
    pub fn base_name(&self) -> &str {
        self.override_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeUnit::Milliseconds => write!(f, "MILLISECONDS"),
            TimeUnit::Seconds => write!(f, "SECONDS"),
            TimeUnit::Minutes => write!(f, "MINUTES"),
            TimeUnit::Hours => write!(f, "HOURS"),
            TimeUnit::Days => write!(f, "DAYS"),
        }
    }
}

/// A window or join time span, e.g. `10 SECONDS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    pub value: u64,
    pub unit: TimeUnit,
}

impl Duration {
    pub fn milliseconds(value: u64) -> Self {
        Self { value, unit: TimeUnit::Milliseconds }
    }

    pub fn seconds(value: u64) -> Self {
        Self { value, unit: TimeUnit::Seconds }
    }

    pub fn minutes(value: u64) -> Self {
        Self { value, unit: TimeUnit::Minutes }
    }

    pub fn hours(value: u64) -> Self {
        Self { value, unit: TimeUnit::Hours }
    }

    pub fn days(value: u64) -> Self {
        Self { value, unit: TimeUnit::Days }
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    FullOuter,
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER"),
            JoinKind::Left => write!(f, "LEFT"),
            JoinKind::Right => write!(f, "RIGHT"),
            JoinKind::FullOuter => write!(f, "FULL OUTER"),
        }
    }
}

/// Time bound of a stream-stream join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinBounds {
    /// `WITHIN n UNIT`
    Symmetric(Duration),
    /// `WITHIN (before, after)`
    Asymmetric { before: Duration, after: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinWindow {
    pub bounds: JoinBounds,
    #[serde(default)]
    pub grace_period: Option<Duration>,
}

impl JoinWindow {
    pub fn within(span: Duration) -> Self {
        Self {
            bounds: JoinBounds::Symmetric(span),
            grace_period: None,
        }
    }

    pub fn between(before: Duration, after: Duration) -> Self {
        Self {
            bounds: JoinBounds::Asymmetric { before, after },
            grace_period: None,
        }
    }

    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = Some(grace);
        self
    }
}

/// One join step.
///
/// Key lambdas and the result selector bind their parameters positionally
/// to the participating sources: the query source first, then each joined
/// source in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub kind: JoinKind,
    pub other: Source,
    pub outer_key: Expr,
    pub inner_key: Expr,
    pub result: Expr,
    #[serde(default)]
    pub within: Option<JoinWindow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowKind {
    Tumbling { size: Duration },
    Hopping { size: Duration, advance_by: Duration },
    Session { gap: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub kind: WindowKind,
    #[serde(default)]
    pub retention: Option<Duration>,
    #[serde(default)]
    pub grace_period: Option<Duration>,
}

impl Window {
    pub fn tumbling(size: Duration) -> Self {
        Self::new(WindowKind::Tumbling { size })
    }

    pub fn hopping(size: Duration, advance_by: Duration) -> Self {
        Self::new(WindowKind::Hopping { size, advance_by })
    }

    pub fn session(gap: Duration) -> Self {
        Self::new(WindowKind::Session { gap })
    }

    fn new(kind: WindowKind) -> Self {
        Self {
            kind,
            retention: None,
            grace_period: None,
        }
    }

    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = Some(grace);
        self
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            WindowKind::Tumbling { size } => write!(f, "TUMBLING (SIZE {}", size)?,
            WindowKind::Hopping { size, advance_by } => {
                write!(f, "HOPPING (SIZE {}, ADVANCE BY {}", size, advance_by)?
            }
            WindowKind::Session { gap } => write!(f, "SESSION ({}", gap)?,
        }
        if let Some(retention) = &self.retention {
            write!(f, ", RETENTION {}", retention)?;
        }
        if let Some(grace) = &self.grace_period {
            write!(f, ", GRACE PERIOD {}", grace)?;
        }
        write!(f, ")")
    }
}

/// One link of the query chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    Source(Source),
    Select(Expr),
    Where(Expr),
    Join(Box<Join>),
    GroupBy(Expr),
    Having(Expr),
    WindowedBy(Window),
    PartitionBy(Expr),
    Take(u64),
}

/// An append-only chain of query nodes, rooted at a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub nodes: Vec<QueryNode>,
    /// Pull queries omit `EMIT CHANGES`.
    #[serde(default)]
    pub pull: bool,
}

impl Query {
    pub fn from_source(source: Source) -> Self {
        Self {
            nodes: vec![QueryNode::Source(source)],
            pull: false,
        }
    }

    /// Query over a row type's schema.
    pub fn of<T: KsqlSchema>() -> Self {
        Self::from_source(Source::of::<T>())
    }

    pub fn source(&self) -> Option<&Source> {
        match self.nodes.first() {
            Some(QueryNode::Source(source)) => Some(source),
            _ => None,
        }
    }
}
