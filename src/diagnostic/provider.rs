use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use crate::diagnostic::events::{AfterEvent, AfterSqlEvent, BeforeEvent, BeforeSqlEvent, CallArg};
use crate::error::RelayResult;
use crate::provider::{
    CommandBehavior, CommandType, DbProvider, IsolationLevel, SqlParameter,
};
use crate::table::{CellValue, RowReader, Table};

/// Observer of instrumented provider calls.
///
/// All methods default to no-ops. `before_*` observers may rewrite event
/// arguments and cancel the call; `after_*` observers are informational.
/// Dispatch follows registration order.
pub trait DiagnosticObserver {
    fn before_call(&self, _event: &mut BeforeEvent) {}
    fn after_call(&self, _event: &AfterEvent) {}
    fn before_statement(&self, _event: &mut BeforeSqlEvent) {}
    fn after_statement(&self, _event: &AfterSqlEvent) {}
}

/// A [`DbProvider`] that wraps another provider and brackets every call with
/// a cancellable, timed before/after event pair.
///
/// Statement-executing operations raise the SQL-aware event pair; connection
/// and transaction operations raise the plain pair. Register observers
/// before concurrent use begins; the list is append-only afterwards.
pub struct DiagnosticProvider<P: DbProvider> {
    inner: P,
    observers: Vec<Arc<dyn DiagnosticObserver>>,
}

impl<P: DbProvider> DiagnosticProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            observers: Vec::new(),
        }
    }

    /// Register an observer. Dispatch order is registration order.
    pub fn observe(&mut self, observer: Arc<dyn DiagnosticObserver>) {
        self.observers.push(observer);
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    fn before_statement(&self, operation: &'static str, args: Vec<CallArg>) -> BeforeSqlEvent {
        let mut event = BeforeSqlEvent::new(
            operation,
            args,
            self.inner.command_text().to_string(),
            self.inner.command_type(),
            self.inner.parameters().to_vec(),
        );
        for observer in &self.observers {
            observer.before_statement(&mut event);
        }
        event
    }

    fn after_statement(&self, event: AfterSqlEvent) {
        trace!(
            operation = event.operation(),
            elapsed_ms = event.elapsed().as_millis() as u64,
            cancelled = event.is_cancelled(),
            "statement call observed"
        );
        for observer in &self.observers {
            observer.after_statement(&event);
        }
    }

    fn before_call(&self, operation: &'static str, args: Vec<CallArg>) -> BeforeEvent {
        let mut event = BeforeEvent::new(operation, args);
        for observer in &self.observers {
            observer.before_call(&mut event);
        }
        event
    }

    fn after_call(&self, event: AfterEvent) {
        for observer in &self.observers {
            observer.after_call(&event);
        }
    }

    /// Push the (possibly rewritten) statement triple into the wrapped
    /// provider before the real call runs.
    fn apply_statement(&mut self, event: &BeforeSqlEvent) {
        self.inner.set_command_text(event.command_text.clone());
        self.inner.set_command_type(event.command_type);
        self.inner.set_parameters(event.parameters.clone());
    }
}

impl<P: DbProvider> DbProvider for DiagnosticProvider<P> {
    fn command_text(&self) -> &str {
        self.inner.command_text()
    }

    fn set_command_text(&mut self, text: String) {
        self.inner.set_command_text(text);
    }

    fn command_type(&self) -> CommandType {
        self.inner.command_type()
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.inner.set_command_type(command_type);
    }

    fn connection_string(&self) -> &str {
        self.inner.connection_string()
    }

    fn parameters(&self) -> &[SqlParameter] {
        self.inner.parameters()
    }

    fn set_parameters(&mut self, parameters: Vec<SqlParameter>) {
        self.inner.set_parameters(parameters);
    }

    fn initialize(&mut self, connection_string: &str) -> RelayResult<()> {
        let before = self.before_call(
            "initialize",
            vec![CallArg::Text(connection_string.to_string())],
        );
        let start = Instant::now();
        if !before.is_cancelled() {
            let used = before
                .args
                .iter()
                .find_map(|arg| match arg {
                    CallArg::Text(text) => Some(text.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| connection_string.to_string());
            self.inner.initialize(&used)?;
        }
        let elapsed = start.elapsed();
        self.after_call(AfterEvent::from_before(before, Vec::new(), elapsed));
        Ok(())
    }

    fn execute_non_query(&mut self) -> RelayResult<i64> {
        let before = self.before_statement("execute_non_query", Vec::new());
        let start = Instant::now();
        let result = if before.is_cancelled() {
            -1
        } else {
            self.apply_statement(&before);
            self.inner.execute_non_query()?
        };
        let elapsed = start.elapsed();
        self.after_statement(AfterSqlEvent::from_before(
            before,
            vec![CallArg::Count(result)],
            elapsed,
        ));
        Ok(result)
    }

    fn execute_scalar(&mut self) -> RelayResult<Option<CellValue>> {
        let before = self.before_statement("execute_scalar", Vec::new());
        let start = Instant::now();
        let result = if before.is_cancelled() {
            None
        } else {
            self.apply_statement(&before);
            self.inner.execute_scalar()?
        };
        let elapsed = start.elapsed();
        let output = result
            .clone()
            .map(CallArg::Value)
            .unwrap_or(CallArg::Null);
        self.after_statement(AfterSqlEvent::from_before(before, vec![output], elapsed));
        Ok(result)
    }

    fn execute_reader(&mut self) -> RelayResult<RowReader> {
        self.wrapped_reader(None)
    }

    fn execute_reader_with(&mut self, behavior: CommandBehavior) -> RelayResult<RowReader> {
        self.wrapped_reader(Some(behavior))
    }

    fn fill(&mut self, table: &mut Table) -> RelayResult<i64> {
        let before = self.before_statement("fill", vec![CallArg::Table(table.clone())]);
        let start = Instant::now();
        let result = if before.is_cancelled() {
            -1
        } else {
            self.apply_statement(&before);
            self.inner.fill(table)?
        };
        let elapsed = start.elapsed();
        self.after_statement(AfterSqlEvent::from_before(
            before,
            vec![CallArg::Count(result), CallArg::Table(table.clone())],
            elapsed,
        ));
        Ok(result)
    }

    fn update(&mut self, table: &Table) -> RelayResult<i64> {
        let before = self.before_statement("update", vec![CallArg::Table(table.clone())]);
        let start = Instant::now();
        let result = if before.is_cancelled() {
            -1
        } else {
            self.apply_statement(&before);
            self.inner.update(table)?
        };
        let elapsed = start.elapsed();
        self.after_statement(AfterSqlEvent::from_before(
            before,
            vec![CallArg::Count(result)],
            elapsed,
        ));
        Ok(result)
    }

    fn begin_transaction(&mut self) -> RelayResult<()> {
        let before = self.before_call("begin_transaction", Vec::new());
        let start = Instant::now();
        if !before.is_cancelled() {
            self.inner.begin_transaction()?;
        }
        let elapsed = start.elapsed();
        self.after_call(AfterEvent::from_before(before, Vec::new(), elapsed));
        Ok(())
    }

    fn begin_transaction_with(&mut self, level: IsolationLevel) -> RelayResult<()> {
        let before = self.before_call("begin_transaction", vec![CallArg::Isolation(level)]);
        let start = Instant::now();
        if !before.is_cancelled() {
            let used = before
                .args
                .iter()
                .find_map(|arg| match arg {
                    CallArg::Isolation(level) => Some(*level),
                    _ => None,
                })
                .unwrap_or(level);
            self.inner.begin_transaction_with(used)?;
        }
        let elapsed = start.elapsed();
        self.after_call(AfterEvent::from_before(before, Vec::new(), elapsed));
        Ok(())
    }

    fn close(&mut self) {
        let before = self.before_call("close", Vec::new());
        let start = Instant::now();
        if !before.is_cancelled() {
            self.inner.close();
        }
        let elapsed = start.elapsed();
        self.after_call(AfterEvent::from_before(before, Vec::new(), elapsed));
    }
}

impl<P: DbProvider> DiagnosticProvider<P> {
    /// Shared body for both reader overloads; they raise the same operation
    /// name.
    fn wrapped_reader(&mut self, behavior: Option<CommandBehavior>) -> RelayResult<RowReader> {
        let args = behavior
            .map(|b| vec![CallArg::Behavior(b)])
            .unwrap_or_default();
        let before = self.before_statement("execute_reader", args);
        let start = Instant::now();
        let reader = if before.is_cancelled() {
            RowReader::empty()
        } else {
            self.apply_statement(&before);
            let used = before
                .args
                .iter()
                .find_map(|arg| match arg {
                    CallArg::Behavior(b) => Some(*b),
                    _ => None,
                })
                .or(behavior);
            match used {
                Some(behavior) => self.inner.execute_reader_with(behavior)?,
                None => self.inner.execute_reader()?,
            }
        };
        let elapsed = start.elapsed();
        self.after_statement(AfterSqlEvent::from_before(
            before,
            vec![CallArg::Count(reader.remaining() as i64)],
            elapsed,
        ));
        Ok(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;
    use std::sync::Mutex;

    /// Records every event it sees; optionally cancels or rewrites.
    #[derive(Default)]
    struct Recorder {
        cancel_all: bool,
        rewrite_to: Option<String>,
        calls: Mutex<Vec<String>>,
        last_after: Mutex<Option<(bool, u128)>>,
    }

    impl Recorder {
        fn log(&self, entry: String) {
            match self.calls.lock() {
                Ok(mut calls) => calls.push(entry),
                Err(poisoned) => poisoned.into_inner().push(entry),
            }
        }

        fn calls(&self) -> Vec<String> {
            match self.calls.lock() {
                Ok(calls) => calls.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            }
        }
    }

    impl DiagnosticObserver for Recorder {
        fn before_call(&self, event: &mut BeforeEvent) {
            self.log(format!("before:{}", event.operation()));
            if self.cancel_all {
                event.cancel();
            }
        }

        fn after_call(&self, event: &AfterEvent) {
            self.log(format!("after:{}", event.operation()));
        }

        fn before_statement(&self, event: &mut BeforeSqlEvent) {
            self.log(format!("before:{}", event.operation()));
            if let Some(text) = &self.rewrite_to {
                event.command_text = text.clone();
            }
            if self.cancel_all {
                event.cancel();
            }
        }

        fn after_statement(&self, event: &AfterSqlEvent) {
            self.log(format!("after:{}", event.operation()));
            if let Ok(mut last) = self.last_after.lock() {
                *last = Some((event.is_cancelled(), event.elapsed().as_nanos()));
            }
        }
    }

    #[test]
    fn test_events_bracket_the_call_in_order() {
        let recorder = Arc::new(Recorder::default());
        let mut provider = DiagnosticProvider::new(MemoryProvider::new());
        provider.observe(recorder.clone());

        provider.set_command_text("DELETE FROM t".to_string());
        provider.execute_non_query().unwrap();

        assert_eq!(
            recorder.calls(),
            vec!["before:execute_non_query", "after:execute_non_query"]
        );
        assert_eq!(provider.inner().executed(), ["DELETE FROM t"]);
    }

    #[test]
    fn test_cancellation_yields_sentinel_and_skips_real_call() {
        let recorder = Arc::new(Recorder {
            cancel_all: true,
            ..Recorder::default()
        });
        let mut provider =
            DiagnosticProvider::new(MemoryProvider::new().with_affected("DELETE FROM t", 5));
        provider.observe(recorder.clone());

        provider.set_command_text("DELETE FROM t".to_string());
        let result = provider.execute_non_query().unwrap();

        assert_eq!(result, -1);
        assert!(provider.inner().executed().is_empty());
        let (cancelled, _elapsed) = match recorder.last_after.lock() {
            Ok(last) => last.expect("after event fired"),
            Err(poisoned) => poisoned.into_inner().expect("after event fired"),
        };
        assert!(cancelled);
    }

    #[test]
    fn test_cancelled_scalar_and_reader_sentinels() {
        let recorder = Arc::new(Recorder {
            cancel_all: true,
            ..Recorder::default()
        });
        let mut provider = DiagnosticProvider::new(MemoryProvider::new());
        provider.observe(recorder);

        assert_eq!(provider.execute_scalar().unwrap(), None);
        assert_eq!(provider.execute_reader().unwrap().remaining(), 0);
    }

    #[test]
    fn test_observer_rewrites_statement_before_execution() {
        let recorder = Arc::new(Recorder {
            rewrite_to: Some("SELECT rewritten".to_string()),
            ..Recorder::default()
        });
        let mut provider = DiagnosticProvider::new(MemoryProvider::new());
        provider.observe(recorder);

        provider.set_command_text("SELECT original".to_string());
        provider.execute_non_query().unwrap();

        assert_eq!(provider.inner().executed(), ["SELECT rewritten"]);
    }

    #[test]
    fn test_dispatch_follows_registration_order() {
        struct Tagger {
            tag: &'static str,
            log: Arc<Mutex<Vec<&'static str>>>,
        }
        impl DiagnosticObserver for Tagger {
            fn before_statement(&self, _event: &mut BeforeSqlEvent) {
                if let Ok(mut log) = self.log.lock() {
                    log.push(self.tag);
                }
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut provider = DiagnosticProvider::new(MemoryProvider::new());
        provider.observe(Arc::new(Tagger {
            tag: "first",
            log: log.clone(),
        }));
        provider.observe(Arc::new(Tagger {
            tag: "second",
            log: log.clone(),
        }));

        provider.execute_non_query().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_initialize_uses_rewritten_connection_string() {
        struct Redirector;
        impl DiagnosticObserver for Redirector {
            fn before_call(&self, event: &mut BeforeEvent) {
                if event.operation() == "initialize" {
                    event.args[0] = CallArg::Text("redirected".to_string());
                }
            }
        }

        let mut provider = DiagnosticProvider::new(MemoryProvider::new());
        provider.observe(Arc::new(Redirector));
        provider.initialize("original").unwrap();
        assert_eq!(provider.connection_string(), "redirected");
    }
}
