use crate::error::{Result, RowShapeError};
use crate::value::{FromValue, RowKey, Value};
use std::sync::Arc;

/// A row of data containing values for each column.
///
/// Values are positionally aligned to the column list of the result the row
/// came from. The row remembers its 0-based index in that result so shape
/// errors can point at it.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    index: usize,
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row with no column names attached
    pub fn new(index: usize, values: Vec<Value>) -> Self {
        Self {
            index,
            columns: Arc::from(Vec::new()),
            values,
        }
    }

    pub fn with_columns(index: usize, columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self {
            index,
            columns,
            values,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at `column`
    pub fn value(&self, column: usize) -> std::result::Result<&Value, RowShapeError> {
        self.values
            .get(column)
            .ok_or(RowShapeError::MissingColumn {
                row: self.index,
                column,
                arity: self.values.len(),
            })
    }

    /// Read column `column` as `T`.
    ///
    /// Fails with the row and column index when the column does not exist or
    /// holds a value that does not cast to `T`. Use `Option<T>` for nullable
    /// columns.
    pub fn get<T: FromValue>(&self, column: usize) -> std::result::Result<T, RowShapeError> {
        let value = self.value(column)?;
        T::from_value(value).map_err(|cast| RowShapeError::TypeMismatch {
            row: self.index,
            column,
            expected: cast.expected,
            found: value.kind(),
        })
    }

    /// Read a column by name, ignoring ASCII case.
    pub fn get_by_name<T: FromValue>(&self, name: &str) -> std::result::Result<T, RowShapeError> {
        let column = self.column_index(name)?;
        self.get(column)
    }

    pub fn column_index(&self, name: &str) -> std::result::Result<usize, RowShapeError> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| RowShapeError::UnknownColumn {
                row: self.index,
                name: name.to_string(),
            })
    }

    /// True when `column` holds NULL. A missing column is an error, not NULL.
    pub fn is_null(&self, column: usize) -> std::result::Result<bool, RowShapeError> {
        Ok(self.value(column)?.is_null())
    }

    /// Composite key over the given columns
    pub fn key(&self, columns: &[usize]) -> std::result::Result<RowKey, RowShapeError> {
        columns
            .iter()
            .map(|&c| self.value(c).cloned())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(RowKey)
    }

    pub(crate) fn check_arity(&self, expected: usize) -> std::result::Result<(), RowShapeError> {
        if self.values.len() == expected {
            Ok(())
        } else {
            Err(RowShapeError::Arity {
                row: self.index,
                expected,
                found: self.values.len(),
            })
        }
    }
}

/// Mapping from one result row to a typed record
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}

/// The rows of one query result together with its column names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    /// Build a row set from plain values, numbering rows from 0
    pub fn from_values(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let shared: Arc<[String]> = Arc::from(columns.clone());
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, values)| Row::with_columns(index, shared.clone(), values))
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for RowSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
