use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};
use crate::mock::MockConfig;
use crate::provider::{CommandBehavior, DbProvider, SqlParameter};
use crate::registry::StatementRegistry;
use crate::table::{CellValue, RowReader, Table};
use tracing::trace;

/// The ordered take playlist for one statement key.
///
/// Takes are sorted ascending by sequence once at load time (absent
/// sequences first, ties keep their relative order). The executed counter is
/// monotonic and never resets; selection and increment happen under one lock
/// so concurrent replay of the same key stays deterministic.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlMock {
    /// The statement key this mock substitutes for.
    pub key: String,
    /// Ordered takes.
    pub takes: Vec<MockConfig>,
    #[serde(skip)]
    executed: Mutex<u64>,
}

impl Default for SqlMock {
    fn default() -> Self {
        Self {
            key: String::new(),
            takes: Vec::new(),
            executed: Mutex::new(0),
        }
    }
}

impl SqlMock {
    /// An empty mock for a statement key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Append a take.
    pub fn take(mut self, config: MockConfig) -> Self {
        self.takes.push(config);
        self
    }

    /// Sort takes by sequence. Called once when a registry adopts the mock.
    pub(crate) fn initialize(&mut self) {
        // Stable sort: equal sequences retain their relative order.
        self.takes.sort_by_key(|take| take.sequence);
    }

    /// How many operations have replayed through this mock so far.
    pub fn executed_count(&self) -> u64 {
        *self.lock_executed()
    }

    fn lock_executed(&self) -> std::sync::MutexGuard<'_, u64> {
        match self.executed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Walk the playlist: the first sticky take (`repeat == 0`) wins
    /// outright; otherwise accumulate repeats until they exceed the
    /// executed counter.
    fn select_index(executed: u64, takes: &[MockConfig]) -> Option<usize> {
        let mut repeat_counter: u64 = 0;
        for (index, take) in takes.iter().enumerate() {
            if take.repeat == 0 {
                return Some(index);
            }
            repeat_counter += u64::from(take.repeat);
            if repeat_counter > executed {
                return Some(index);
            }
        }
        None
    }

    /// Resolve the active take and advance the executed counter by one.
    /// The counter does not move when nothing resolves.
    fn resolve(&self) -> RelayResult<&MockConfig> {
        let mut executed = self.lock_executed();
        let index = Self::select_index(*executed, &self.takes)
            .ok_or_else(|| RelayError::MockNotSupported(self.key.clone()))?;
        *executed += 1;
        trace!(key = %self.key, take = index, executed = *executed, "mock take selected");
        Ok(&self.takes[index])
    }

    /// Point the provider at the take's redirect target. The take's own
    /// connection string wins; otherwise the provider must already be
    /// connected somewhere.
    fn redirect(&self, take: &MockConfig, provider: &mut dyn DbProvider) -> RelayResult<()> {
        if take.has_connection() {
            let connection = take.connection_string.as_deref().unwrap_or_default();
            provider.initialize(connection)
        } else if !provider.connection_string().is_empty() {
            Ok(())
        } else {
            Err(RelayError::MockMisconfigured(self.key.clone()))
        }
    }

    fn statement<'a>(&self, statements: &'a StatementRegistry) -> RelayResult<&'a crate::ast::Sql> {
        statements
            .get(&self.key)
            .ok_or_else(|| RelayError::UnknownKey(self.key.clone()))
    }

    /// Replay a non-query. Requires a connection redirect.
    pub fn execute_non_query(
        &self,
        provider: &mut dyn DbProvider,
        statements: &StatementRegistry,
        parameters: &[SqlParameter],
    ) -> RelayResult<i64> {
        let take = self.resolve()?;
        self.redirect(take, provider)?;
        self.statement(statements)?
            .execute_non_query(provider, parameters)
    }

    /// Replay a scalar query. Requires a connection redirect.
    pub fn execute_scalar(
        &self,
        provider: &mut dyn DbProvider,
        statements: &StatementRegistry,
        parameters: &[SqlParameter],
    ) -> RelayResult<Option<CellValue>> {
        let take = self.resolve()?;
        self.redirect(take, provider)?;
        self.statement(statements)?
            .execute_scalar(provider, parameters)
    }

    /// Replay a fill: CSV takes answer from their cached table, redirect
    /// takes execute the real statement in the configured database.
    pub fn fill(
        &self,
        provider: &mut dyn DbProvider,
        statements: &StatementRegistry,
        parameters: &[SqlParameter],
    ) -> RelayResult<Table> {
        let take = self.resolve()?;
        if take.has_csv() {
            return take.table();
        }
        self.redirect(take, provider)?;
        self.statement(statements)?.fill(provider, parameters)
    }

    /// Replay a table update. Requires a connection redirect.
    pub fn update(
        &self,
        provider: &mut dyn DbProvider,
        statements: &StatementRegistry,
        table: &Table,
        parameters: &[SqlParameter],
    ) -> RelayResult<i64> {
        let take = self.resolve()?;
        self.redirect(take, provider)?;
        self.statement(statements)?
            .update(provider, table, parameters)
    }

    /// Replay a reader query.
    pub fn query(
        &self,
        provider: &mut dyn DbProvider,
        statements: &StatementRegistry,
        parameters: &[SqlParameter],
    ) -> RelayResult<RowReader> {
        self.query_with(provider, statements, parameters, CommandBehavior::Default)
    }

    /// Replay a reader query with a behavior hint. CSV takes answer from
    /// their cached table, redirect takes execute the real statement.
    pub fn query_with(
        &self,
        provider: &mut dyn DbProvider,
        statements: &StatementRegistry,
        parameters: &[SqlParameter],
        behavior: CommandBehavior,
    ) -> RelayResult<RowReader> {
        let take = self.resolve()?;
        if take.has_csv() {
            return Ok(take.table()?.into_reader());
        }
        self.redirect(take, provider)?;
        self.statement(statements)?
            .query_with(provider, parameters, behavior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Sql;
    use crate::provider::MemoryProvider;

    fn registry() -> StatementRegistry {
        StatementRegistry::from_entries(vec![Sql::from_command("Q1", "SELECT 1")], false).unwrap()
    }

    fn csv_take(dir: &std::path::Path, name: &str, content: &str) -> MockConfig {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        MockConfig::from_csv(path.display().to_string())
            .with_header()
            .with_types()
    }

    #[test]
    fn test_selection_repeat_then_sticky() {
        let takes = [
            MockConfig::default().sequence(0).repeat(2),
            MockConfig::default().sequence(1).repeat(0),
        ];
        assert_eq!(SqlMock::select_index(0, &takes), Some(0));
        assert_eq!(SqlMock::select_index(1, &takes), Some(0));
        assert_eq!(SqlMock::select_index(2, &takes), Some(1));
        assert_eq!(SqlMock::select_index(100, &takes), Some(1));
    }

    #[test]
    fn test_selection_sticky_short_circuits() {
        // A sticky take wins outright even when later takes exist.
        let takes = [
            MockConfig::default().sequence(0).repeat(0),
            MockConfig::default().sequence(1).repeat(5),
        ];
        assert_eq!(SqlMock::select_index(0, &takes), Some(0));
        assert_eq!(SqlMock::select_index(10, &takes), Some(0));
    }

    #[test]
    fn test_selection_exhausted_playlist() {
        let takes = [MockConfig::default().sequence(0).repeat(1)];
        assert_eq!(SqlMock::select_index(0, &takes), Some(0));
        assert_eq!(SqlMock::select_index(1, &takes), None);
    }

    #[test]
    fn test_counter_advances_per_operation_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mock = SqlMock::new("Q1").take(csv_take(dir.path(), "d.csv", "N\nint32\n1"));
        let statements = registry();
        let mut provider = MemoryProvider::new();

        mock.fill(&mut provider, &statements, &[]).unwrap();
        mock.query(&mut provider, &statements, &[]).unwrap();
        assert_eq!(mock.executed_count(), 2);
    }

    #[test]
    fn test_switches_take_after_repeats_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let first = csv_take(dir.path(), "first.csv", "N\nint32\n1").sequence(0).repeat(2);
        let second = csv_take(dir.path(), "second.csv", "N\nint32\n2").sequence(1).repeat(0);
        let mut mock = SqlMock::new("Q1").take(second).take(first);
        mock.initialize();
        let statements = registry();
        let mut provider = MemoryProvider::new();

        let one = mock.fill(&mut provider, &statements, &[]).unwrap();
        let two = mock.fill(&mut provider, &statements, &[]).unwrap();
        let three = mock.fill(&mut provider, &statements, &[]).unwrap();
        let four = mock.fill(&mut provider, &statements, &[]).unwrap();

        assert_eq!(one.scalar(), Some(CellValue::Int32(1)));
        assert_eq!(two.scalar(), Some(CellValue::Int32(1)));
        assert_eq!(three.scalar(), Some(CellValue::Int32(2)));
        assert_eq!(four.scalar(), Some(CellValue::Int32(2)));
    }

    #[test]
    fn test_no_take_is_not_supported_and_counter_stays() {
        let mock = SqlMock::new("Q1");
        let statements = registry();
        let mut provider = MemoryProvider::new();

        let err = mock.fill(&mut provider, &statements, &[]).unwrap_err();
        assert!(matches!(err, RelayError::MockNotSupported(_)));
        assert_eq!(mock.executed_count(), 0);
    }

    #[test]
    fn test_take_without_source_is_misconfigured() {
        let mut mock = SqlMock::new("Q1").take(MockConfig::default());
        mock.initialize();
        let statements = registry();
        let mut provider = MemoryProvider::new();

        let err = mock
            .execute_non_query(&mut provider, &statements, &[])
            .unwrap_err();
        assert!(matches!(err, RelayError::MockMisconfigured(_)));
    }

    #[test]
    fn test_redirect_initializes_provider_and_runs_real_statement() {
        let mut mock = SqlMock::new("Q1").take(MockConfig::from_connection("mock-db"));
        mock.initialize();
        let statements = registry();
        let mut provider = MemoryProvider::new();

        mock.execute_non_query(&mut provider, &statements, &[]).unwrap();

        assert_eq!(provider.connection_string(), "mock-db");
        assert_eq!(provider.executed(), ["SELECT 1"]);
    }

    #[test]
    fn test_redirect_falls_back_to_provider_connection() {
        let mut mock = SqlMock::new("Q1").take(MockConfig::default().sequence(0).repeat(0));
        mock.takes[0].connection_string = None;
        mock.initialize();
        let statements = registry();
        let mut provider = MemoryProvider::new();
        provider.initialize("existing").unwrap();

        assert!(mock.execute_non_query(&mut provider, &statements, &[]).is_ok());
        assert_eq!(provider.connection_string(), "existing");
    }
}
