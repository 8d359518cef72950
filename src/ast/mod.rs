//! Definition model: keyword vocabulary, clause trees, and named statements.

pub mod clause;
pub mod keywords;
pub mod statement;

pub use self::clause::SqlClause;
pub use self::keywords::{LogicalOperator, SqlKeyword};
pub use self::statement::Sql;
