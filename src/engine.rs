//! The keyed execution surface.
//!
//! A [`SqlSession`] owns the loaded statement and mock registries and routes
//! every keyed operation: when a mock is registered under the key it replays
//! the mock plan, otherwise the statement runs against the caller's provider.
//! Sessions hold no connection state themselves, so one session can serve
//! any number of providers.

use std::path::Path;

use tracing::trace;

use crate::ast::Sql;
use crate::error::{RelayError, RelayResult};
use crate::mock::SqlMock;
use crate::provider::{CommandBehavior, DbProvider, SqlParameter};
use crate::registry::{MockRegistry, StatementRegistry};
use crate::table::{CellValue, RowReader, Table};

/// Keyed access to statements and mocks.
#[derive(Debug, Default)]
pub struct SqlSession {
    statements: StatementRegistry,
    mocks: Option<MockRegistry>,
    tolerate_duplicates: bool,
}

impl SqlSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let later definition entries silently replace earlier ones on key
    /// collisions. Set this before loading.
    pub fn tolerate_duplicate_keys(mut self, tolerate: bool) -> Self {
        self.tolerate_duplicates = tolerate;
        self.statements = std::mem::take(&mut self.statements).tolerate_duplicates(tolerate);
        self.mocks = self.mocks.take().map(|m| m.tolerate_duplicates(tolerate));
        self
    }

    pub fn add_statement(&mut self, sql: Sql) -> RelayResult<()> {
        self.statements.insert(sql)
    }

    pub fn add_mock(&mut self, mock: SqlMock) -> RelayResult<()> {
        self.mocks_mut().insert(mock)
    }

    /// Load a JSON statement definition file.
    pub fn load_statements(&mut self, path: impl AsRef<Path>) -> RelayResult<usize> {
        self.statements.load_path(path)
    }

    /// Load every `*.json` statement definition file in a directory.
    pub fn load_statement_dir(&mut self, dir: impl AsRef<Path>) -> RelayResult<usize> {
        self.statements.load_dir(dir)
    }

    /// Load a JSON mock definition file.
    pub fn load_mocks(&mut self, path: impl AsRef<Path>) -> RelayResult<usize> {
        self.mocks_mut().load_path(path)
    }

    /// Load every `*.json` mock definition file in a directory.
    pub fn load_mock_dir(&mut self, dir: impl AsRef<Path>) -> RelayResult<usize> {
        self.mocks_mut().load_dir(dir)
    }

    pub fn statements(&self) -> &StatementRegistry {
        &self.statements
    }

    pub fn mocks(&self) -> Option<&MockRegistry> {
        self.mocks.as_ref()
    }

    /// Render the statement registered under `key` without executing it.
    pub fn render(&self, key: &str) -> RelayResult<String> {
        self.statements.render(key)
    }

    /// Find the key whose rendered text matches `text`, ignoring case.
    pub fn find_key(&self, text: &str) -> Option<&str> {
        self.statements.find_key(text)
    }

    pub fn execute_non_query(
        &self,
        provider: &mut dyn DbProvider,
        key: &str,
        parameters: &[SqlParameter],
    ) -> RelayResult<i64> {
        if let Some(mock) = self.mock_for(key) {
            return mock.execute_non_query(provider, &self.statements, parameters);
        }
        self.statement(key)?.execute_non_query(provider, parameters)
    }

    pub fn execute_scalar(
        &self,
        provider: &mut dyn DbProvider,
        key: &str,
        parameters: &[SqlParameter],
    ) -> RelayResult<Option<CellValue>> {
        if let Some(mock) = self.mock_for(key) {
            return mock.execute_scalar(provider, &self.statements, parameters);
        }
        self.statement(key)?.execute_scalar(provider, parameters)
    }

    pub fn fill(
        &self,
        provider: &mut dyn DbProvider,
        key: &str,
        parameters: &[SqlParameter],
    ) -> RelayResult<Table> {
        if let Some(mock) = self.mock_for(key) {
            return mock.fill(provider, &self.statements, parameters);
        }
        self.statement(key)?.fill(provider, parameters)
    }

    pub fn update(
        &self,
        provider: &mut dyn DbProvider,
        key: &str,
        table: &Table,
        parameters: &[SqlParameter],
    ) -> RelayResult<i64> {
        if let Some(mock) = self.mock_for(key) {
            return mock.update(provider, &self.statements, table, parameters);
        }
        self.statement(key)?.update(provider, table, parameters)
    }

    pub fn query(
        &self,
        provider: &mut dyn DbProvider,
        key: &str,
        parameters: &[SqlParameter],
    ) -> RelayResult<RowReader> {
        self.query_with(provider, key, parameters, CommandBehavior::Default)
    }

    pub fn query_with(
        &self,
        provider: &mut dyn DbProvider,
        key: &str,
        parameters: &[SqlParameter],
        behavior: CommandBehavior,
    ) -> RelayResult<RowReader> {
        if let Some(mock) = self.mock_for(key) {
            return mock.query_with(provider, &self.statements, parameters, behavior);
        }
        self.statement(key)?
            .query_with(provider, parameters, behavior)
    }

    fn statement(&self, key: &str) -> RelayResult<&Sql> {
        self.statements
            .get(key)
            .ok_or_else(|| RelayError::UnknownKey(key.to_string()))
    }

    fn mock_for(&self, key: &str) -> Option<&SqlMock> {
        let mock = self.mocks.as_ref()?.get(key)?;
        trace!(key, "routing to mock");
        Some(mock)
    }

    fn mocks_mut(&mut self) -> &mut MockRegistry {
        self.mocks
            .get_or_insert_with(|| MockRegistry::new().tolerate_duplicates(self.tolerate_duplicates))
    }
}
