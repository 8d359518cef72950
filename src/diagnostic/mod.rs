//! Call instrumentation for database providers.
//!
//! [`DiagnosticProvider`] wraps any [`crate::provider::DbProvider`] and
//! raises a before/after event pair around every call. Observers can time
//! calls, inspect the detected SQL keywords, rewrite the statement about to
//! run, or cancel it outright.

pub mod events;
pub mod provider;
mod scan;

pub use events::{AfterEvent, AfterSqlEvent, BeforeEvent, BeforeSqlEvent, CallArg};
pub use provider::{DiagnosticObserver, DiagnosticProvider};
pub use scan::scan_keywords;
