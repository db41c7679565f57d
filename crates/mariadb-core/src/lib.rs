//! Core types for the MariaDB/MySQL client.
//!
//! This crate holds the vocabulary shared between the wire-protocol client
//! and its callers:
//!
//! - `Error` and the normalized `ErrorState` (code, SQLSTATE, message)
//! - `Value` for dynamically typed column values
//! - `Row` and `ColumnInfo` for result rows, with typed access via `FromValue`

pub mod error;
pub mod row;
pub mod value;

pub use error::{Error, ErrorState, Result};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
