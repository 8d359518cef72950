//! Mock replay engine.
//!
//! Deterministically substitutes fake results for registered statements:
//! each statement key owns an ordered playlist of takes, each take backed by
//! a typed CSV file or a connection redirect to another database.

pub mod config;
mod csv;
pub mod provider;
pub mod replay;

pub use self::config::MockConfig;
pub use self::provider::MockProvider;
pub use self::replay::SqlMock;
