//! SQLite row-to-record mapping for the Runar ecosystem.
//!
//! # Intention
//!
//! - Turn SQLite query results into typed records with explicit, fallible
//!   casts out of dynamically typed column values.
//! - Fold the repeated parent rows of a one-to-many join into one record per
//!   key, with the children accumulated on it ([`RecordAggregator`]).
//! - Bind named and positional parameters, one set or a whole sequence of
//!   them (bulk inserts), on a connection or transaction the caller owns.
//!
//! # Architectural Boundaries
//!
//! - Only mapping code belongs here. Opening connections, managing
//!   transactions, parsing SQL or CSV, and installing a logger are the
//!   caller's job.
//! - Diagnostics go through the `log` facade.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod params;
pub mod row;
pub mod sqlite;
pub mod value;

pub use aggregate::{aggregate, RecordAggregator};
pub use config::MapperConfig;
pub use error::{Error, Result, RowShapeError};
pub use params::{Params, SqlQuery, ToParams};
pub use row::{FromRow, Row, RowSet};
pub use sqlite::Mapper;
pub use value::{CastError, FromValue, RowKey, Value};
