//! Typed CSV parsing for CSV-backed mock takes.

use std::fs;

use crate::error::{RelayError, RelayResult};
use crate::mock::MockConfig;
use crate::table::{CellValue, ColumnType, Table};

/// Load and type the CSV file a take points at.
pub(crate) fn load_table(config: &MockConfig) -> RelayResult<Table> {
    let path = config
        .csv_path
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| RelayError::definition("mock take has no csv path to load"))?;
    let content = fs::read_to_string(path)?;
    parse_table(
        &content,
        &config.delimiter,
        config.include_header,
        config.include_type,
    )
}

/// Parse CSV content into a typed table.
///
/// Line order: optional header line (column names), optional type line
/// (column types, blank or unrecognized names default to string), then data
/// lines. Type entries beyond the header synthesize `COLUMN{n}` columns. A
/// field that fails to parse into its declared type fails the whole load.
pub(crate) fn parse_table(
    content: &str,
    delimiter: &str,
    include_header: bool,
    include_type: bool,
) -> RelayResult<Table> {
    let mut lines = content.lines();
    let mut table = Table::new();

    let headers: Vec<String> = if include_header {
        lines
            .next()
            .map(|line| split_fields(line, delimiter))
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let types: Vec<ColumnType> = if include_type {
        lines
            .next()
            .map(|line| {
                line.split(delimiter)
                    .map(ColumnType::parse_name)
                    .collect()
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let column_count = headers.len().max(types.len());
    for i in 0..column_count {
        let name = headers
            .get(i)
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("COLUMN{i}"));
        let ty = types.get(i).copied().unwrap_or(ColumnType::String);
        table.add_column(name, ty);
    }

    for line in lines {
        let fields = split_fields(line, delimiter);

        // Without header or type lines, the first data line fixes the shape.
        if table.column_count() == 0 {
            for i in 0..fields.len() {
                table.add_column(format!("COLUMN{i}"), ColumnType::String);
            }
        }

        let mut row = Vec::with_capacity(table.column_count());
        for (i, column) in table.columns().iter().enumerate() {
            match fields.get(i) {
                Some(raw) => {
                    let value = CellValue::parse(column.ty, raw).ok_or_else(|| {
                        RelayError::conversion(&column.name, raw.as_str(), column.ty.name())
                    })?;
                    row.push(value);
                }
                None => row.push(CellValue::Null),
            }
        }
        if fields.len() > table.column_count() {
            return Err(RelayError::definition(format!(
                "data line has {} fields but table has {} columns",
                fields.len(),
                table.column_count()
            )));
        }
        table.push_row(row)?;
    }

    Ok(table)
}

fn split_fields(line: &str, delimiter: &str) -> Vec<String> {
    line.split(delimiter).map(str::to_string).collect()
}
