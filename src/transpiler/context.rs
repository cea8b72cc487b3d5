//! Per-compile state. A context is created fresh for each top-level
//! compile call and never shared between queries.

use crate::ast::{Expr, Source};
use crate::config::CompileOptions;
use crate::schema::{pluralize, SchemaDescriptor, TypeKind};
use crate::transpiler::alias::AliasRegistry;
use crate::transpiler::literal::{BoolCase, LiteralStyle};

/// What a lambda parameter stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    /// A row of the source at this index.
    Source(usize),
    /// A grouping over the source at this index.
    Grouping(usize),
    /// A parameter of a higher-order lambda; printed as a bare name.
    Local,
}

#[derive(Debug, Clone)]
pub(crate) struct SourceScope {
    pub name: String,
    pub alias: Option<String>,
    pub schema: Option<SchemaDescriptor>,
}

/// The grouping key, kept so `g.Key` can be printed where it is used.
#[derive(Debug, Clone)]
pub(crate) struct GroupKey {
    pub bindings: Vec<(String, Binding)>,
    pub body: Expr,
}

#[derive(Debug)]
pub struct CompileContext {
    pub options: CompileOptions,
    pub aliases: AliasRegistry,
    /// Column references must be qualified with their source alias.
    pub qualify: bool,
    /// Inside the list of an `IN (...)`: arrays print as bare lists.
    pub in_membership: bool,
    /// Printing the value of a named projection entry.
    pub in_named_projection: bool,
    pub(crate) sources: Vec<SourceScope>,
    pub(crate) group_key: Option<GroupKey>,
    scopes: Vec<Vec<(String, Binding)>>,
    /// Element shapes of higher-order lambda parameters, when known.
    local_kinds: Vec<(String, TypeKind)>,
}

impl CompileContext {
    pub fn new(options: &CompileOptions) -> Self {
        Self {
            options: options.clone(),
            aliases: AliasRegistry::new(),
            qualify: false,
            in_membership: false,
            in_named_projection: false,
            sources: Vec::new(),
            group_key: None,
            scopes: Vec::new(),
            local_kinds: Vec::new(),
        }
    }

    /// Display name of a source: its override or type name, pluralized
    /// when enabled.
    pub fn source_name(&self, source: &Source) -> String {
        let base = source.base_name();
        if self.options.pluralize {
            pluralize(base)
        } else {
            base.to_string()
        }
    }

    pub(crate) fn add_source(&mut self, source: &Source) -> usize {
        let name = self.source_name(source);
        self.sources.push(SourceScope {
            name,
            alias: None,
            schema: source.schema.clone(),
        });
        self.sources.len() - 1
    }

    /// Assign aliases to every registered source.
    pub(crate) fn assign_aliases(&mut self) {
        for source in &mut self.sources {
            source.alias = Some(self.aliases.alias_for(&source.name));
        }
    }

    pub(crate) fn source(&self, index: usize) -> Option<&SourceScope> {
        self.sources.get(index)
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, b)| *b)
    }

    pub(crate) fn with_scope<R>(
        &mut self,
        bindings: Vec<(String, Binding)>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.scopes.push(bindings);
        let result = f(self);
        self.scopes.pop();
        result
    }

    pub(crate) fn local_kind(&self, name: &str) -> Option<&TypeKind> {
        self.local_kinds
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, kind)| kind)
    }

    /// Run `f` with `name` known to hold values of `kind`.
    pub(crate) fn with_local_kind<R>(
        &mut self,
        name: &str,
        kind: Option<TypeKind>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let Some(kind) = kind else {
            return f(self);
        };
        self.local_kinds.push((name.to_string(), kind));
        let result = f(self);
        self.local_kinds.pop();
        result
    }

    pub(crate) fn with_membership<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.in_membership, true);
        let result = f(self);
        self.in_membership = saved;
        result
    }

    pub(crate) fn with_named_projection<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.in_named_projection, true);
        let result = f(self);
        self.in_named_projection = saved;
        result
    }

    /// Literal style for constants printed at the current position.
    pub fn literal_style(&self) -> LiteralStyle {
        LiteralStyle {
            bool_case: if self.in_named_projection {
                BoolCase::Lower
            } else {
                BoolCase::Capitalized
            },
            membership: self.in_membership,
            decimal_separator: self.options.decimal_separator,
        }
    }
}
