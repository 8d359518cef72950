//! End-to-end replay scenarios: definition files on disk, loaded into a
//! session, executed through providers.

use std::fs;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use sqlrelay::diagnostic::{BeforeSqlEvent, DiagnosticObserver, DiagnosticProvider};
use sqlrelay::prelude::*;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn names(table: &Table) -> Vec<String> {
    (0..table.row_count())
        .filter_map(|row| table.value(row, 1))
        .map(|cell| cell.to_string())
        .collect()
}

#[test]
fn loaded_definitions_replay_csv_takes_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(&dir, "first.csv", "id,name\nint32,string\n1,ada\n");
    let second = write_file(
        &dir,
        "second.csv",
        "id,name\nint32,string\n2,bob\n3,eve\n",
    );

    write_file(
        &dir,
        "statements.json",
        r#"[ { "key": "USERS", "command": "SELECT * FROM users" } ]"#,
    );
    // Takes are listed out of order on purpose; sequence decides.
    write_file(
        &dir,
        "mocks.json",
        &format!(
            r#"[ {{
                "key": "USERS",
                "takes": [
                    {{ "sequence": 2, "repeat": 0, "csv_path": "{second}",
                       "include_header": true, "include_type": true }},
                    {{ "sequence": 1, "repeat": 2, "csv_path": "{first}",
                       "include_header": true, "include_type": true }}
                ]
            }} ]"#
        ),
    );

    let mut session = SqlSession::new();
    assert_eq!(
        session
            .load_statements(dir.path().join("statements.json"))
            .unwrap(),
        1
    );
    assert_eq!(
        session.load_mocks(dir.path().join("mocks.json")).unwrap(),
        1
    );

    let mut provider = MemoryProvider::new();
    // First take serves two calls, then the sticky second take takes over.
    assert_eq!(names(&session.fill(&mut provider, "USERS", &[]).unwrap()), ["ada"]);
    assert_eq!(names(&session.fill(&mut provider, "USERS", &[]).unwrap()), ["ada"]);
    for _ in 0..3 {
        assert_eq!(
            names(&session.fill(&mut provider, "USERS", &[]).unwrap()),
            ["bob", "eve"]
        );
    }
    assert!(provider.executed().is_empty());
}

#[test]
fn redirect_take_runs_real_statement_on_provider() {
    let mut result = Table::new();
    result.add_column("count", ColumnType::Int64);
    result.push_row(vec![CellValue::Int64(42)]).unwrap();

    let mut session = SqlSession::new();
    session
        .add_statement(Sql::from_command("COUNT", "SELECT COUNT(*) FROM users"))
        .unwrap();
    session
        .add_mock(SqlMock::new("COUNT").take(MockConfig::from_connection("mem://test")))
        .unwrap();

    let mut provider =
        MemoryProvider::new().with_result("SELECT COUNT(*) FROM users", result);
    let value = session.execute_scalar(&mut provider, "COUNT", &[]).unwrap();

    assert_eq!(value, Some(CellValue::Int64(42)));
    assert_eq!(provider.connection_string(), "mem://test");
    assert_eq!(provider.executed(), ["SELECT COUNT(*) FROM users"]);
}

#[test]
fn mock_provider_replays_by_command_text() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_file(&dir, "rows.csv", "id\nint32\n7\n");

    let statements = Arc::new(
        StatementRegistry::from_entries(
            vec![Sql::from_command("ROWS", "SELECT id FROM rows")],
            false,
        )
        .unwrap(),
    );
    let mocks = Arc::new(
        MockRegistry::from_entries(
            vec![SqlMock::new("ROWS").take(
                MockConfig::from_csv(csv).with_header().with_types(),
            )],
            false,
        )
        .unwrap(),
    );

    let mut provider = MockProvider::new(statements, mocks);
    provider.set_command_text("select id from rows".to_string());
    let rows: Vec<_> = provider.execute_reader().unwrap().collect();

    assert_eq!(rows, vec![vec![CellValue::Int32(7)]]);
}

#[test]
fn observer_cancels_and_rewrites_across_the_session() {
    struct Guard {
        seen: Mutex<Vec<String>>,
    }
    impl DiagnosticObserver for Guard {
        fn before_statement(&self, event: &mut BeforeSqlEvent) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(event.command_text.clone());
            }
            if event.command_text.contains("forbidden") {
                event.cancel();
            } else {
                event.command_text = event.command_text.replace("users", "users_v2");
            }
        }
    }

    let guard = Arc::new(Guard {
        seen: Mutex::new(Vec::new()),
    });
    let mut session = SqlSession::new();
    session
        .add_statement(Sql::from_command("PURGE", "DELETE FROM users"))
        .unwrap();
    session
        .add_statement(Sql::from_command("DROP", "DROP forbidden"))
        .unwrap();

    let mut provider = DiagnosticProvider::new(MemoryProvider::new());
    provider.observe(guard.clone());

    assert_eq!(session.execute_non_query(&mut provider, "PURGE", &[]).unwrap(), 0);
    assert_eq!(session.execute_non_query(&mut provider, "DROP", &[]).unwrap(), -1);

    assert_eq!(provider.inner().executed(), ["DELETE FROM users_v2"]);
    assert_eq!(
        *guard.seen.lock().unwrap(),
        vec!["DELETE FROM users", "DROP forbidden"]
    );
}

#[test]
fn duplicate_keys_across_files_honor_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        &dir,
        "a.json",
        r#"[ { "key": "Q", "command": "SELECT 1" } ]"#,
    );
    write_file(
        &dir,
        "b.json",
        r#"[ { "key": "Q", "command": "SELECT 2" } ]"#,
    );

    let mut strict = SqlSession::new();
    assert!(matches!(
        strict.load_statement_dir(dir.path()),
        Err(RelayError::DuplicateKey(key)) if key == "Q"
    ));

    let mut tolerant = SqlSession::new().tolerate_duplicate_keys(true);
    tolerant.load_statement_dir(dir.path()).unwrap();
    // Files load in name order, so the later file wins.
    assert_eq!(tolerant.render("Q").unwrap(), "SELECT 2");
}
