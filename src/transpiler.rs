//! KSQL transpiler.
//!
//! Turns query chains into push/pull query text and schemas into CREATE
//! and INSERT statements. Every compile call builds its own
//! [`context::CompileContext`] from the options it is given, so calls
//! share nothing and may run concurrently.

pub mod alias;
mod context;
pub mod ddl;
mod expr;
mod fold;
mod functions;
pub mod insert;
pub mod literal;
mod select;

#[cfg(test)]
mod tests;

use crate::ast::{Query, Value};
use crate::config::CompileOptions;
use crate::error::KsqlResult;

pub use ddl::{
    create_as_select, create_statement, EntityCreationMetadata, SerializationFormat,
    StatementKind, WindowType,
};
pub use insert::{insert_statement, InsertProperties};

use context::CompileContext;

/// Trait for converting AST nodes to KSQL.
pub trait ToKsql {
    fn to_ksql(&self, options: &CompileOptions) -> KsqlResult<String>;
}

impl ToKsql for Query {
    fn to_ksql(&self, options: &CompileOptions) -> KsqlResult<String> {
        compile(self, options)
    }
}

impl ToKsql for Value {
    fn to_ksql(&self, options: &CompileOptions) -> KsqlResult<String> {
        let ctx = CompileContext::new(options);
        Ok(literal::print(self, &ctx.literal_style()))
    }
}

/// Compile a query chain into `SELECT ... ;` text.
pub fn compile(query: &Query, options: &CompileOptions) -> KsqlResult<String> {
    let mut ctx = CompileContext::new(options);
    let sql = select::compile_query(query, &mut ctx)?;
    tracing::debug!(query = %sql, "compiled push query");
    Ok(sql)
}
