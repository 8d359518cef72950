//! The provider capability boundary.
//!
//! `DbProvider` is the minimal surface the core needs from any concrete
//! database client adapter. Concrete bindings live outside this crate; the
//! in-memory provider here exists for tests and for mock connection
//! redirects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RelayResult;
use crate::table::{CellValue, RowReader, Table};

/// How the provider should interpret its command text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    /// Plain SQL text.
    #[default]
    Text,
    /// Name of a stored procedure.
    StoredProcedure,
    /// Name of a table to read directly.
    TableDirect,
}

/// Reader behavior hints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandBehavior {
    #[default]
    Default,
    SingleRow,
    SchemaOnly,
    CloseConnection,
}

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// A single named command parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: CellValue,
}

impl SqlParameter {
    /// Create a named parameter.
    pub fn new(name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a positional parameter named `@p{index}`.
    pub fn positional(index: usize, value: impl Into<CellValue>) -> Self {
        Self::new(format!("@p{index}"), value)
    }
}

/// Build a positional parameter array from plain values.
pub fn parameter_array<V: Into<CellValue>>(
    values: impl IntoIterator<Item = V>,
) -> Vec<SqlParameter> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| SqlParameter::positional(i, v))
        .collect()
}

/// The capability interface the core requires from a database client.
///
/// All operations are synchronous. A provider instance is reusable across
/// connection strings through [`DbProvider::initialize`].
pub trait DbProvider {
    fn command_text(&self) -> &str;
    fn set_command_text(&mut self, text: String);

    fn command_type(&self) -> CommandType;
    fn set_command_type(&mut self, command_type: CommandType);

    fn connection_string(&self) -> &str;

    fn parameters(&self) -> &[SqlParameter];
    fn set_parameters(&mut self, parameters: Vec<SqlParameter>);

    /// Point this provider at a (new) connection string, resetting any
    /// connection-scoped state.
    fn initialize(&mut self, connection_string: &str) -> RelayResult<()>;

    /// Execute the command text, returning the number of rows affected.
    fn execute_non_query(&mut self) -> RelayResult<i64>;

    /// Execute the command text, returning the first column of the first row.
    fn execute_scalar(&mut self) -> RelayResult<Option<CellValue>>;

    /// Execute the command text, returning a forward-only row reader.
    fn execute_reader(&mut self) -> RelayResult<RowReader> {
        self.execute_reader_with(CommandBehavior::Default)
    }

    /// Execute the command text with a reader behavior hint.
    fn execute_reader_with(&mut self, behavior: CommandBehavior) -> RelayResult<RowReader>;

    /// Execute the command text and load its result set into `table`,
    /// returning the number of rows added.
    fn fill(&mut self, table: &mut Table) -> RelayResult<i64>;

    /// Write the rows of `table` back to the data source, returning the
    /// number of rows updated.
    fn update(&mut self, table: &Table) -> RelayResult<i64>;

    fn begin_transaction(&mut self) -> RelayResult<()> {
        self.begin_transaction_with(IsolationLevel::default())
    }

    fn begin_transaction_with(&mut self, level: IsolationLevel) -> RelayResult<()>;

    /// Release connection resources. Safe to call more than once.
    fn close(&mut self);
}

/// An in-memory [`DbProvider`] keyed by command text.
///
/// Results are registered up front per statement text; execution looks them
/// up and records the call. This is the crate's only shipped adapter and the
/// workhorse of the test suite.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    command_text: String,
    command_type: CommandType,
    connection_string: String,
    parameters: Vec<SqlParameter>,
    tables: HashMap<String, Table>,
    affected: HashMap<String, i64>,
    executed: Vec<String>,
    in_transaction: bool,
    closed: bool,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tabular result for a statement text.
    pub fn with_result(mut self, text: impl Into<String>, table: Table) -> Self {
        self.tables.insert(normalize(&text.into()), table);
        self
    }

    /// Register a rows-affected count for a statement text.
    pub fn with_affected(mut self, text: impl Into<String>, rows: i64) -> Self {
        self.affected.insert(normalize(&text.into()), rows);
        self
    }

    /// Statement texts executed so far, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn record(&mut self) {
        self.executed.push(self.command_text.clone());
    }

    fn lookup_table(&self) -> Option<Table> {
        self.tables.get(&normalize(&self.command_text)).cloned()
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_ascii_uppercase()
}

impl DbProvider for MemoryProvider {
    fn command_text(&self) -> &str {
        &self.command_text
    }

    fn set_command_text(&mut self, text: String) {
        self.command_text = text;
    }

    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.command_type = command_type;
    }

    fn connection_string(&self) -> &str {
        &self.connection_string
    }

    fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    fn set_parameters(&mut self, parameters: Vec<SqlParameter>) {
        self.parameters = parameters;
    }

    fn initialize(&mut self, connection_string: &str) -> RelayResult<()> {
        self.connection_string = connection_string.to_string();
        self.in_transaction = false;
        self.closed = false;
        Ok(())
    }

    fn execute_non_query(&mut self) -> RelayResult<i64> {
        self.record();
        Ok(self
            .affected
            .get(&normalize(&self.command_text))
            .copied()
            .unwrap_or(0))
    }

    fn execute_scalar(&mut self) -> RelayResult<Option<CellValue>> {
        self.record();
        Ok(self.lookup_table().and_then(|t| t.scalar()))
    }

    fn execute_reader_with(&mut self, _behavior: CommandBehavior) -> RelayResult<RowReader> {
        self.record();
        Ok(self
            .lookup_table()
            .map(Table::into_reader)
            .unwrap_or_else(RowReader::empty))
    }

    fn fill(&mut self, table: &mut Table) -> RelayResult<i64> {
        self.record();
        match self.lookup_table() {
            Some(found) => {
                let rows = found.row_count() as i64;
                *table = found;
                Ok(rows)
            }
            None => Ok(0),
        }
    }

    fn update(&mut self, table: &Table) -> RelayResult<i64> {
        self.record();
        Ok(self
            .affected
            .get(&normalize(&self.command_text))
            .copied()
            .unwrap_or(table.row_count() as i64))
    }

    fn begin_transaction_with(&mut self, _level: IsolationLevel) -> RelayResult<()> {
        self.in_transaction = true;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
