//! Keyed SQL definitions with mock replay and call diagnostics.
//!
//! Statements are defined as clause trees (or raw command text), registered
//! under keys, and rendered to SQL on demand. Execution goes through a
//! provider abstraction, so the same keyed calls can run against a real
//! database, replay canned CSV results through a mock plan, or be wrapped in
//! cancellable before/after diagnostics.

pub mod ast;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod mock;
pub mod provider;
pub mod registry;
pub mod render;
pub mod table;

pub use engine::SqlSession;
pub use render::ToSqlText;

pub mod prelude {
    pub use crate::ast::{LogicalOperator, Sql, SqlClause, SqlKeyword};
    pub use crate::engine::SqlSession;
    pub use crate::error::{RelayError, RelayResult};
    pub use crate::mock::{MockConfig, MockProvider, SqlMock};
    pub use crate::provider::{
        CommandBehavior, CommandType, DbProvider, IsolationLevel, MemoryProvider, SqlParameter,
    };
    pub use crate::registry::{MockRegistry, StatementRegistry};
    pub use crate::render::ToSqlText;
    pub use crate::table::{CellValue, ColumnType, RowReader, Table};
}
