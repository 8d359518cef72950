//! Event pairs bracketing one instrumented call.

use std::time::Duration;

use crate::ast::SqlKeyword;
use crate::diagnostic::scan_keywords;
use crate::provider::{CommandBehavior, CommandType, IsolationLevel, SqlParameter};
use crate::table::{CellValue, Table};

/// One argument or output value of an instrumented call.
///
/// A closed variant type: every value that crosses the interception boundary
/// is one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    /// Plain text (connection strings and the like).
    Text(String),
    /// A row count.
    Count(i64),
    /// A single cell value.
    Value(CellValue),
    /// An absent result.
    Null,
    /// A transaction isolation level.
    Isolation(IsolationLevel),
    /// A reader behavior hint.
    Behavior(CommandBehavior),
    /// A tabular argument or result snapshot.
    Table(Table),
    /// A command parameter.
    Parameter(SqlParameter),
}

/// The event raised before a wrapped call runs.
///
/// Observers may rewrite `args` and may cancel the call; cancellation is
/// sticky once set.
#[derive(Debug)]
pub struct BeforeEvent {
    operation: &'static str,
    /// Mutable ordered argument list, used by the call if it runs.
    pub args: Vec<CallArg>,
    cancelled: bool,
}

impl BeforeEvent {
    pub(crate) fn new(operation: &'static str, args: Vec<CallArg>) -> Self {
        Self {
            operation,
            args,
            cancelled: false,
        }
    }

    /// The operation name, stable across overloads of the same operation.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Cancel the wrapped call. Cannot be unset.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// The event raised after a wrapped call finished (or was cancelled).
///
/// Informational only: nothing an observer does here alters the result.
#[derive(Debug)]
pub struct AfterEvent {
    operation: &'static str,
    args: Vec<CallArg>,
    outputs: Vec<CallArg>,
    elapsed: Duration,
    cancelled: bool,
}

impl AfterEvent {
    pub(crate) fn from_before(
        before: BeforeEvent,
        outputs: Vec<CallArg>,
        elapsed: Duration,
    ) -> Self {
        Self {
            operation: before.operation,
            args: before.args,
            outputs,
            elapsed,
            cancelled: before.cancelled,
        }
    }

    /// The operation name, stable across overloads of the same operation.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Snapshot of the arguments the call actually used.
    pub fn args(&self) -> &[CallArg] {
        &self.args
    }

    /// Ordered result values: the primary return value first, then any
    /// output values.
    pub fn outputs(&self) -> &[CallArg] {
        &self.outputs
    }

    /// Wall time spent inside the wrapped call.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether a before-observer cancelled the call.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// The SQL-aware before event.
///
/// Exposes the full mutable statement triple so an observer can rewrite the
/// command before it executes, plus the keyword set detected in the incoming
/// text.
#[derive(Debug)]
pub struct BeforeSqlEvent {
    operation: &'static str,
    /// Mutable ordered argument list, used by the call if it runs.
    pub args: Vec<CallArg>,
    /// Statement text the provider will execute. Observers may rewrite it.
    pub command_text: String,
    /// How the provider will interpret the text. Observers may rewrite it.
    pub command_type: CommandType,
    /// Command parameters. Observers may rewrite them.
    pub parameters: Vec<SqlParameter>,
    keywords: Vec<SqlKeyword>,
    cancelled: bool,
}

impl BeforeSqlEvent {
    pub(crate) fn new(
        operation: &'static str,
        args: Vec<CallArg>,
        command_text: String,
        command_type: CommandType,
        parameters: Vec<SqlParameter>,
    ) -> Self {
        let keywords = scan_keywords(&command_text);
        Self {
            operation,
            args,
            command_text,
            command_type,
            parameters,
            keywords,
            cancelled: false,
        }
    }

    /// The operation name, stable across overloads of the same operation.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Keywords detected in the incoming command text.
    pub fn keywords(&self) -> &[SqlKeyword] {
        &self.keywords
    }

    /// Cancel the wrapped call. Cannot be unset.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// The SQL-aware after event: the statement triple actually executed, the
/// keyword set re-scanned from that (possibly rewritten) text, and the
/// outcome.
#[derive(Debug)]
pub struct AfterSqlEvent {
    operation: &'static str,
    command_text: String,
    command_type: CommandType,
    parameters: Vec<SqlParameter>,
    keywords: Vec<SqlKeyword>,
    args: Vec<CallArg>,
    outputs: Vec<CallArg>,
    elapsed: Duration,
    cancelled: bool,
}

impl AfterSqlEvent {
    pub(crate) fn from_before(
        before: BeforeSqlEvent,
        outputs: Vec<CallArg>,
        elapsed: Duration,
    ) -> Self {
        let keywords = scan_keywords(&before.command_text);
        Self {
            operation: before.operation,
            command_text: before.command_text,
            command_type: before.command_type,
            parameters: before.parameters,
            keywords,
            args: before.args,
            outputs,
            elapsed,
            cancelled: before.cancelled,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The statement text the call actually used.
    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    /// Keywords detected in the executed command text.
    pub fn keywords(&self) -> &[SqlKeyword] {
        &self.keywords
    }

    pub fn args(&self) -> &[CallArg] {
        &self.args
    }

    /// Ordered result values: the primary return value first, then any
    /// output values.
    pub fn outputs(&self) -> &[CallArg] {
        &self.outputs
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
