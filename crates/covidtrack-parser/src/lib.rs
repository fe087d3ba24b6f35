pub mod errors;
pub mod model;
mod reader;
pub mod schema;

pub use errors::{ParserError, SourceAttempt};
pub use model::{EntityKey, FillFlags, Record, SourceInfo, Table, AGGREGATE_CODE_PREFIX};
pub use reader::{load_first_available, load_table, parse_bytes, parse_str};
pub use schema::{ColumnMap, ColumnRole};
