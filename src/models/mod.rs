//! Core data models for queries and search results.

mod query;
mod record;

pub use query::{BuilderState, Condition, QueryBuilder, QueryError, QueryField, QueryToken};
pub use record::{Record, RecordBuilder, RecordId, ResultSet, COLUMNS, MISSING};
