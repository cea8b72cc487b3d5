//! Query and expression AST.

pub mod builders;
pub mod expr;
pub mod functions;
pub mod query;
pub mod values;

pub use builders::*;
pub use expr::*;
pub use functions::*;
pub use query::*;
pub use values::*;
