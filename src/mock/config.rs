use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::RelayResult;
use crate::mock::csv;
use crate::table::Table;

/// One configured substitute-result definition, a "take".
///
/// A take either points at a CSV data file or redirects to another database
/// through `connection_string`. The parsed CSV table is materialized lazily
/// and cached for the life of the take.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Ordering key inside the take playlist. Absent sequences sort first.
    pub sequence: Option<i64>,
    /// How many calls this take serves before the playlist advances.
    /// `0` means sticky: once reached, selected forever.
    pub repeat: u32,
    /// Redirect target when a real database supplies the substitute result.
    pub connection_string: Option<String>,
    /// CSV data file path.
    pub csv_path: Option<String>,
    /// CSV field delimiter.
    pub delimiter: String,
    /// Declared file encoding. Retained from the definition schema; files
    /// are decoded as UTF-8, of which the default ASCII is a subset.
    pub encoding_name: String,
    /// Whether the first CSV line holds column names.
    pub include_header: bool,
    /// Whether a CSV line holds column type names.
    pub include_type: bool,
    #[serde(skip)]
    cache: Mutex<Option<Table>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            sequence: None,
            repeat: 0,
            connection_string: None,
            csv_path: None,
            delimiter: ",".to_string(),
            encoding_name: "ASCII".to_string(),
            include_header: false,
            include_type: false,
            cache: Mutex::new(None),
        }
    }
}

impl MockConfig {
    /// A sticky CSV take.
    pub fn from_csv(path: impl Into<String>) -> Self {
        Self {
            csv_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// A sticky connection-redirect take.
    pub fn from_connection(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: Some(connection_string.into()),
            ..Self::default()
        }
    }

    /// Set the ordering key.
    pub fn sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Set the repeat count (`0` = sticky).
    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set the CSV field delimiter.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Mark the first CSV line as a header line.
    pub fn with_header(mut self) -> Self {
        self.include_header = true;
        self
    }

    /// Mark a CSV line as a column type line.
    pub fn with_types(mut self) -> Self {
        self.include_type = true;
        self
    }

    /// Whether this take has a CSV data source.
    pub fn has_csv(&self) -> bool {
        self.csv_path.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Whether this take carries its own connection redirect.
    pub fn has_connection(&self) -> bool {
        self.connection_string
            .as_deref()
            .is_some_and(|c| !c.is_empty())
    }

    /// The materialized CSV table, parsed on first use and cached.
    ///
    /// A field that fails to parse into its declared column type fails the
    /// whole load; nothing is cached in that case and a later call retries.
    pub fn table(&self) -> RelayResult<Table> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(table) = cache.as_ref() {
            return Ok(table.clone());
        }
        let table = csv::load_table(self)?;
        *cache = Some(table.clone());
        Ok(table)
    }
}
