use serde::{Deserialize, Serialize};

use crate::ast::SqlClause;
use crate::error::RelayResult;
use crate::provider::{CommandBehavior, CommandType, DbProvider, SqlParameter};
use crate::render::ToSqlText;
use crate::table::{CellValue, RowReader, Table};

/// A named statement definition: a root clause tree plus a raw-text fallback.
///
/// Rendering from the clause tree takes priority; when that render is empty,
/// `command` is used verbatim. Built once when a definition registry loads
/// and never mutated in place afterwards; snapshots are explicit deep clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sql {
    /// Lookup key, unique within a registry.
    pub key: String,
    /// Raw command text fallback.
    pub command: Option<String>,
    /// How a provider should interpret the rendered text.
    pub command_type: CommandType,
    /// The clause tree this statement renders from.
    pub clause: SqlClause,
}

impl Sql {
    /// Create a statement rendered from a clause tree.
    pub fn from_clause(key: impl Into<String>, clause: SqlClause) -> Self {
        Self {
            key: key.into(),
            clause,
            ..Self::default()
        }
    }

    /// Create a statement from raw command text.
    pub fn from_command(key: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            command: Some(command.into()),
            ..Self::default()
        }
    }

    /// Set the command type.
    pub fn command_type(mut self, command_type: CommandType) -> Self {
        self.command_type = command_type;
        self
    }

    /// The executable command text of this statement.
    pub fn to_text(&self) -> String {
        self.to_sql_text()
    }

    fn stage(&self, provider: &mut dyn DbProvider, parameters: &[SqlParameter]) {
        provider.set_command_text(self.to_text());
        provider.set_parameters(parameters.to_vec());
        provider.set_command_type(self.command_type);
    }

    /// Execute this statement as a non-query, returning rows affected.
    pub fn execute_non_query(
        &self,
        provider: &mut dyn DbProvider,
        parameters: &[SqlParameter],
    ) -> RelayResult<i64> {
        self.stage(provider, parameters);
        provider.execute_non_query()
    }

    /// Execute this statement, returning the first column of the first row.
    pub fn execute_scalar(
        &self,
        provider: &mut dyn DbProvider,
        parameters: &[SqlParameter],
    ) -> RelayResult<Option<CellValue>> {
        self.stage(provider, parameters);
        provider.execute_scalar()
    }

    /// Execute this statement and collect its result set into a new table.
    pub fn fill(
        &self,
        provider: &mut dyn DbProvider,
        parameters: &[SqlParameter],
    ) -> RelayResult<Table> {
        self.stage(provider, parameters);
        let mut table = Table::new();
        provider.fill(&mut table)?;
        Ok(table)
    }

    /// Write `table` back to the data source through this statement.
    pub fn update(
        &self,
        provider: &mut dyn DbProvider,
        table: &Table,
        parameters: &[SqlParameter],
    ) -> RelayResult<i64> {
        self.stage(provider, parameters);
        provider.update(table)
    }

    /// Execute this statement, returning a forward-only row reader.
    pub fn query(
        &self,
        provider: &mut dyn DbProvider,
        parameters: &[SqlParameter],
    ) -> RelayResult<RowReader> {
        self.query_with(provider, parameters, CommandBehavior::Default)
    }

    /// Execute this statement with a reader behavior hint.
    pub fn query_with(
        &self,
        provider: &mut dyn DbProvider,
        parameters: &[SqlParameter],
        behavior: CommandBehavior,
    ) -> RelayResult<RowReader> {
        self.stage(provider, parameters);
        provider.execute_reader_with(behavior)
    }
}

impl std::fmt::Display for Sql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}
