pub mod derive;
pub mod types;

pub use derive::{derive_columns, infer_column_type, parse_number};
pub use types::{Column, ColumnType};
