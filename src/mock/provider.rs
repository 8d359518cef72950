use std::sync::Arc;

use crate::error::{RelayError, RelayResult};
use crate::provider::{
    CommandBehavior, CommandType, DbProvider, IsolationLevel, MemoryProvider, SqlParameter,
};
use crate::registry::{MockRegistry, StatementRegistry};
use crate::table::{CellValue, RowReader, Table};

/// A [`DbProvider`] that answers every call from the mock registry.
///
/// Incoming command text is mapped back to its statement key through the
/// statement registry (case-insensitive match of the rendered text), then
/// dispatched to that key's take playlist. Connection-redirect takes run
/// against the inner redirect provider.
pub struct MockProvider {
    statements: Arc<StatementRegistry>,
    mocks: Arc<MockRegistry>,
    redirect: Box<dyn DbProvider>,
    command_text: String,
    command_type: CommandType,
    parameters: Vec<SqlParameter>,
}

impl MockProvider {
    /// A mock provider with an in-memory redirect target.
    pub fn new(statements: Arc<StatementRegistry>, mocks: Arc<MockRegistry>) -> Self {
        Self::with_redirect(statements, mocks, Box::new(MemoryProvider::new()))
    }

    /// A mock provider whose connection-redirect takes run against the given
    /// provider.
    pub fn with_redirect(
        statements: Arc<StatementRegistry>,
        mocks: Arc<MockRegistry>,
        redirect: Box<dyn DbProvider>,
    ) -> Self {
        Self {
            statements,
            mocks,
            redirect,
            command_text: String::new(),
            command_type: CommandType::default(),
            parameters: Vec::new(),
        }
    }

    /// The redirect provider.
    pub fn redirect(&self) -> &dyn DbProvider {
        self.redirect.as_ref()
    }

    fn resolve_key(&self) -> RelayResult<String> {
        self.statements
            .find_key(&self.command_text)
            .map(str::to_string)
            .ok_or_else(|| RelayError::UnknownKey(self.command_text.clone()))
    }
}

impl DbProvider for MockProvider {
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
        self.redirect.connection_string()
    }

    fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    fn set_parameters(&mut self, parameters: Vec<SqlParameter>) {
        self.parameters = parameters;
    }

    fn initialize(&mut self, connection_string: &str) -> RelayResult<()> {
        self.redirect.initialize(connection_string)
    }

    fn execute_non_query(&mut self) -> RelayResult<i64> {
        let key = self.resolve_key()?;
        let mock = self
            .mocks
            .get(&key)
            .ok_or_else(|| RelayError::MockNotSupported(key.clone()))?;
        mock.execute_non_query(self.redirect.as_mut(), &self.statements, &self.parameters)
    }

    fn execute_scalar(&mut self) -> RelayResult<Option<CellValue>> {
        let key = self.resolve_key()?;
        let mock = self
            .mocks
            .get(&key)
            .ok_or_else(|| RelayError::MockNotSupported(key.clone()))?;
        mock.execute_scalar(self.redirect.as_mut(), &self.statements, &self.parameters)
    }

    fn execute_reader_with(&mut self, behavior: CommandBehavior) -> RelayResult<RowReader> {
        let key = self.resolve_key()?;
        let mock = self
            .mocks
            .get(&key)
            .ok_or_else(|| RelayError::MockNotSupported(key.clone()))?;
        mock.query_with(
            self.redirect.as_mut(),
            &self.statements,
            &self.parameters,
            behavior,
        )
    }

    fn fill(&mut self, table: &mut Table) -> RelayResult<i64> {
        let key = self.resolve_key()?;
        let mock = self
            .mocks
            .get(&key)
            .ok_or_else(|| RelayError::MockNotSupported(key.clone()))?;
        let result = mock.fill(self.redirect.as_mut(), &self.statements, &self.parameters)?;
        let rows = result.row_count() as i64;
        *table = result;
        Ok(rows)
    }

    fn update(&mut self, table: &Table) -> RelayResult<i64> {
        let key = self.resolve_key()?;
        let mock = self
            .mocks
            .get(&key)
            .ok_or_else(|| RelayError::MockNotSupported(key.clone()))?;
        mock.update(
            self.redirect.as_mut(),
            &self.statements,
            table,
            &self.parameters,
        )
    }

    fn begin_transaction_with(&mut self, level: IsolationLevel) -> RelayResult<()> {
        self.redirect.begin_transaction_with(level)
    }

    fn close(&mut self) {
        self.redirect.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Sql;
    use crate::mock::{MockConfig, SqlMock};

    fn fixtures(csv: &str) -> (Arc<StatementRegistry>, Arc<MockRegistry>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, csv).unwrap();

        let statements = StatementRegistry::from_entries(
            vec![Sql::from_command("USERS", "SELECT * FROM users")],
            false,
        )
        .unwrap();
        let mocks = MockRegistry::from_entries(
            vec![SqlMock::new("USERS").take(
                MockConfig::from_csv(path.display().to_string())
                    .with_header()
                    .with_types(),
            )],
            false,
        )
        .unwrap();
        (Arc::new(statements), Arc::new(mocks), dir)
    }

    #[test]
    fn test_command_text_maps_back_to_key() {
        let (statements, mocks, _dir) = fixtures("ID\nint32\n7");
        let mut provider = MockProvider::new(statements, mocks);

        provider.set_command_text("select * from users".to_string());
        let mut table = Table::new();
        assert_eq!(provider.fill(&mut table).unwrap(), 1);
        assert_eq!(table.scalar(), Some(CellValue::Int32(7)));
    }

    #[test]
    fn test_unregistered_text_is_unknown_key() {
        let (statements, mocks, _dir) = fixtures("ID\nint32\n7");
        let mut provider = MockProvider::new(statements, mocks);

        provider.set_command_text("SELECT something else".to_string());
        assert!(matches!(
            provider.execute_reader().unwrap_err(),
            RelayError::UnknownKey(_)
        ));
    }

    #[test]
    fn test_known_key_without_mock_is_not_supported() {
        let statements = Arc::new(
            StatementRegistry::from_entries(vec![Sql::from_command("Q", "SELECT 1")], false)
                .unwrap(),
        );
        let mocks = Arc::new(MockRegistry::new());
        let mut provider = MockProvider::new(statements, mocks);

        provider.set_command_text("SELECT 1".to_string());
        assert!(matches!(
            provider.execute_non_query().unwrap_err(),
            RelayError::MockNotSupported(_)
        ));
    }
}
