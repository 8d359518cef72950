//! Keyed registries for statement and mock definitions.
//!
//! Registries are populated once at startup from definition files (JSON
//! arrays of entries) or in-memory entries, then read for the life of the
//! process. Duplicate keys either fail the load or let the later entry win,
//! depending on the tolerance flag.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::ast::Sql;
use crate::error::{RelayError, RelayResult};
use crate::mock::SqlMock;
use crate::render::ToSqlText;

/// The process-wide map of statement definitions, keyed by `Sql::key`.
#[derive(Debug, Default)]
pub struct StatementRegistry {
    statements: HashMap<String, Sql>,
    tolerate_duplicates: bool,
}

impl StatementRegistry {
    /// An empty registry that rejects duplicate keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Let later entries silently replace earlier ones on key collisions.
    pub fn tolerate_duplicates(mut self, tolerate: bool) -> Self {
        self.tolerate_duplicates = tolerate;
        self
    }

    /// Build a registry from in-memory entries.
    pub fn from_entries(
        entries: impl IntoIterator<Item = Sql>,
        tolerate_duplicates: bool,
    ) -> RelayResult<Self> {
        let mut registry = Self::new().tolerate_duplicates(tolerate_duplicates);
        for sql in entries {
            registry.insert(sql)?;
        }
        Ok(registry)
    }

    /// Insert one statement, honoring the duplicate policy.
    pub fn insert(&mut self, sql: Sql) -> RelayResult<()> {
        if self.statements.contains_key(&sql.key) {
            if !self.tolerate_duplicates {
                return Err(RelayError::DuplicateKey(sql.key));
            }
            warn!(key = %sql.key, "duplicate statement key, later entry wins");
        }
        self.statements.insert(sql.key.clone(), sql);
        Ok(())
    }

    /// Load a JSON definition file holding an array of statement entries.
    /// Returns the number of entries loaded.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> RelayResult<usize> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let entries: Vec<Sql> = serde_json::from_str(&content)?;
        let count = entries.len();
        for sql in entries {
            self.insert(sql)?;
        }
        debug!(path = %path.display(), count, "loaded statement definitions");
        Ok(count)
    }

    /// Load every `*.json` definition file in a directory, in name order.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> RelayResult<usize> {
        let mut total = 0;
        for path in json_files(dir.as_ref())? {
            total += self.load_path(path)?;
        }
        Ok(total)
    }

    pub fn get(&self, key: &str) -> Option<&Sql> {
        self.statements.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.statements.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.statements.keys().map(String::as_str)
    }

    /// Render the statement registered under `key`.
    pub fn render(&self, key: &str) -> RelayResult<String> {
        self.get(key)
            .map(Sql::to_sql_text)
            .ok_or_else(|| RelayError::UnknownKey(key.to_string()))
    }

    /// Find the key whose rendered text matches `text`, ignoring case.
    pub fn find_key(&self, text: &str) -> Option<&str> {
        self.statements
            .iter()
            .find(|(_, sql)| sql.to_sql_text().eq_ignore_ascii_case(text))
            .map(|(key, _)| key.as_str())
    }
}

/// The process-wide map of mock definitions, keyed by `SqlMock::key`.
#[derive(Debug, Default)]
pub struct MockRegistry {
    mocks: HashMap<String, SqlMock>,
    tolerate_duplicates: bool,
}

impl MockRegistry {
    /// An empty registry that rejects duplicate keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Let later entries silently replace earlier ones on key collisions.
    pub fn tolerate_duplicates(mut self, tolerate: bool) -> Self {
        self.tolerate_duplicates = tolerate;
        self
    }

    /// Build a registry from in-memory entries.
    pub fn from_entries(
        entries: impl IntoIterator<Item = SqlMock>,
        tolerate_duplicates: bool,
    ) -> RelayResult<Self> {
        let mut registry = Self::new().tolerate_duplicates(tolerate_duplicates);
        for mock in entries {
            registry.insert(mock)?;
        }
        Ok(registry)
    }

    /// Insert one mock, sorting its takes by sequence.
    pub fn insert(&mut self, mut mock: SqlMock) -> RelayResult<()> {
        if self.mocks.contains_key(&mock.key) {
            if !self.tolerate_duplicates {
                return Err(RelayError::DuplicateKey(mock.key));
            }
            warn!(key = %mock.key, "duplicate mock key, later entry wins");
        }
        mock.initialize();
        self.mocks.insert(mock.key.clone(), mock);
        Ok(())
    }

    /// Load a JSON definition file holding an array of mock entries.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> RelayResult<usize> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let entries: Vec<SqlMock> = serde_json::from_str(&content)?;
        let count = entries.len();
        for mock in entries {
            self.insert(mock)?;
        }
        debug!(path = %path.display(), count, "loaded mock definitions");
        Ok(count)
    }

    /// Load every `*.json` definition file in a directory, in name order.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> RelayResult<usize> {
        let mut total = 0;
        for path in json_files(dir.as_ref())? {
            total += self.load_path(path)?;
        }
        Ok(total)
    }

    pub fn get(&self, key: &str) -> Option<&SqlMock> {
        self.mocks.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.mocks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.mocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mocks.is_empty()
    }
}

fn json_files(dir: &Path) -> RelayResult<Vec<std::path::PathBuf>> {
    let mut files: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}
