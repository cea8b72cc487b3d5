//! # ksql: typed push queries for ksqlDB
//!
//! Build a query as an AST, compile it to KSQL text, send it with any HTTP
//! client, and decode the line-delimited response back into typed rows.
//!
//! ## Quick Example
//!
//! ```rust
//! use ksql::prelude::*;
//!
//! let query = Query::from_source(Source::named("Movie"))
//!     .filter(lambda(["m"], param("m").member("Title").not_equals(lit("E.T."))))
//!     .select(lambda(
//!         ["m"],
//!         new_anon([("Title", param("m").member("Title")), ("Id", param("m").member("Id"))]),
//!     ))
//!     .take(2);
//!
//! let sql = query.to_ksql(&CompileOptions::default()).unwrap();
//! assert_eq!(
//!     sql,
//!     "SELECT Title, Id FROM Movies\nWHERE Title != 'E.T.' EMIT CHANGES LIMIT 2;"
//! );
//! ```
//!
//! ## Statements
//!
//! | Function             | Output                                   |
//! |----------------------|------------------------------------------|
//! | `compile`            | `SELECT ... EMIT CHANGES;`               |
//! | `create_statement`   | `CREATE STREAM/TABLE ... WITH (...);`    |
//! | `create_as_select`   | `CREATE STREAM/TABLE ... AS SELECT ...;` |
//! | `insert_statement`   | `INSERT INTO ... VALUES (...);`          |

extern crate self as ksql;

pub mod ast;
pub mod config;
pub mod decoder;
pub mod error;
pub mod request;
pub mod schema;
pub mod transpiler;

pub use ksql_macros::KsqlSchema;
pub use schema::KsqlSchema;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::{CompileOptions, KsqlConfig};
    pub use crate::decoder::{
        decode, lines_from_reader, subscribe, Observer, QueryStream, ResponseFormat, RowShape,
        Subscription,
    };
    pub use crate::error::*;
    pub use crate::request::{AutoOffsetReset, KsqlRequest, QueryStreamRequest};
    pub use crate::KsqlSchema;
    pub use crate::schema::{ColumnDescriptor, SchemaDescriptor, TypeKind};
    pub use crate::transpiler::{
        compile, create_as_select, create_statement, insert_statement, EntityCreationMetadata,
        InsertProperties, SerializationFormat, StatementKind, ToKsql,
    };
}

/// Compile a query chain with default options.
///
/// # Example
///
/// ```
/// use ksql::ast::{Query, Source};
///
/// let sql = ksql::compile(&Query::from_source(Source::named("Tweet"))).unwrap();
/// assert_eq!(sql, "SELECT * FROM Tweets EMIT CHANGES;");
/// ```
pub fn compile(query: &ast::Query) -> Result<String, error::KsqlError> {
    transpiler::compile(query, &config::CompileOptions::default())
}
