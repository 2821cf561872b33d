use thiserror::Error;

/// Boxed error carried by callback failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A row that does not have the shape the caller expects.
///
/// Every variant carries the 0-based index of the offending row within its
/// result, and the column index where one applies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowShapeError {
    #[error("row {row}: expected {expected} columns, found {found}")]
    Arity {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: column {column} is out of range for {arity} columns")]
    MissingColumn {
        row: usize,
        column: usize,
        arity: usize,
    },

    #[error("row {row}: no column named '{name}'")]
    UnknownColumn { row: usize, name: String },

    #[error("row {row}, column {column}: cannot read {found} as {expected}")]
    TypeMismatch {
        row: usize,
        column: usize,
        expected: &'static str,
        found: &'static str,
    },
}

impl RowShapeError {
    pub fn row(&self) -> usize {
        match self {
            Self::Arity { row, .. }
            | Self::MissingColumn { row, .. }
            | Self::UnknownColumn { row, .. }
            | Self::TypeMismatch { row, .. } => *row,
        }
    }

    /// Column index, when the error concerns a single column.
    pub fn column(&self) -> Option<usize> {
        match self {
            Self::MissingColumn { column, .. } | Self::TypeMismatch { column, .. } => Some(*column),
            Self::Arity { .. } | Self::UnknownColumn { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    RowShape(#[from] RowShapeError),

    #[error("key extraction failed at row {row}: {source}")]
    KeyExtraction {
        row: usize,
        #[source]
        source: BoxError,
    },

    #[error("merge failed at row {row}: {source}")]
    Merge {
        row: usize,
        #[source]
        source: BoxError,
    },

    #[error("row source failed before row {row}: {source}")]
    Source {
        row: usize,
        #[source]
        source: BoxError,
    },

    #[error("no value for parameter '{0}'")]
    MissingParameter(String),

    #[error("parameter '{0}' matches several names that differ only by case")]
    AmbiguousParameter(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Classify a callback failure. Shape errors raised inside the callback
    /// (usually by `Row::get`) are returned as they are.
    pub(crate) fn from_callback(err: anyhow::Error, wrap: impl FnOnce(BoxError) -> Error) -> Error {
        match err.downcast::<RowShapeError>() {
            Ok(shape) => Error::RowShape(shape),
            Err(err) => match err.downcast::<Error>() {
                Ok(inner) => inner,
                Err(err) => wrap(err.into()),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
