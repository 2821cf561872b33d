//! Row-to-object aggregation for one-to-many joins.
//!
//! A `LEFT JOIN` of parents to children repeats the parent columns on every
//! child row. [`RecordAggregator`] folds those rows back into one parent
//! object per key, in first-seen order, using a registry that lives only for
//! the duration of one pass.

use crate::error::{Error, Result};
use crate::row::Row;
use log::{debug, trace};
use std::collections::HashMap;
use std::hash::Hash;

/// Options for an aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordAggregator {
    arity: Option<usize>,
    child_column: Option<usize>,
}

impl RecordAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require every row to have exactly `columns` values.
    pub fn with_arity(mut self, columns: usize) -> Self {
        self.arity = Some(columns);
        self
    }

    /// Column whose NULL marks a parent row with no child. Rows for an
    /// already registered key skip the merge step when it is NULL.
    pub fn with_child_column(mut self, column: usize) -> Self {
        self.child_column = Some(column);
        self
    }

    /// Aggregate an infallible row sequence.
    pub fn aggregate<I, K, P, FK, FE, FN>(
        &self,
        rows: I,
        extract_key: FK,
        on_existing: FE,
        on_new: FN,
    ) -> Result<Vec<P>>
    where
        I: IntoIterator<Item = Row>,
        K: Eq + Hash,
        FK: FnMut(&Row) -> anyhow::Result<K>,
        FE: FnMut(&mut P, &Row) -> anyhow::Result<()>,
        FN: FnMut(&Row) -> anyhow::Result<P>,
    {
        self.try_aggregate(rows.into_iter().map(Ok), extract_key, on_existing, on_new)
    }

    /// Aggregate a fallible row sequence. The first source error ends the
    /// pass and nothing collected so far is returned.
    pub fn try_aggregate<I, K, P, FK, FE, FN>(
        &self,
        rows: I,
        mut extract_key: FK,
        mut on_existing: FE,
        mut on_new: FN,
    ) -> Result<Vec<P>>
    where
        I: IntoIterator<Item = Result<Row>>,
        K: Eq + Hash,
        FK: FnMut(&Row) -> anyhow::Result<K>,
        FE: FnMut(&mut P, &Row) -> anyhow::Result<()>,
        FN: FnMut(&Row) -> anyhow::Result<P>,
    {
        let mut registry: HashMap<K, usize> = HashMap::new();
        let mut records: Vec<P> = Vec::new();
        let mut consumed = 0usize;

        for row in rows {
            let row = row?;
            let position = row.index();
            consumed += 1;

            if let Some(arity) = self.arity {
                row.check_arity(arity)?;
            }

            let key = extract_key(&row).map_err(|err| {
                Error::from_callback(err, |source| Error::KeyExtraction {
                    row: position,
                    source,
                })
            })?;

            match registry.get(&key) {
                Some(&slot) => {
                    if let Some(column) = self.child_column {
                        if row.is_null(column)? {
                            trace!("row {position}: null child column {column}, merge skipped");
                            continue;
                        }
                    }
                    trace!("row {position}: merging into record {slot}");
                    on_existing(&mut records[slot], &row).map_err(|err| {
                        Error::from_callback(err, |source| Error::Merge {
                            row: position,
                            source,
                        })
                    })?;
                }
                None => {
                    let record = on_new(&row).map_err(|err| {
                        Error::from_callback(err, |source| Error::Merge {
                            row: position,
                            source,
                        })
                    })?;
                    registry.insert(key, records.len());
                    records.push(record);
                }
            }
        }

        debug!("aggregated {consumed} rows into {} records", records.len());
        Ok(records)
    }
}

/// Aggregate `rows` with default options.
pub fn aggregate<I, K, P, FK, FE, FN>(
    rows: I,
    extract_key: FK,
    on_existing: FE,
    on_new: FN,
) -> Result<Vec<P>>
where
    I: IntoIterator<Item = Row>,
    K: Eq + Hash,
    FK: FnMut(&Row) -> anyhow::Result<K>,
    FE: FnMut(&mut P, &Row) -> anyhow::Result<()>,
    FN: FnMut(&Row) -> anyhow::Result<P>,
{
    RecordAggregator::new().aggregate(rows, extract_key, on_existing, on_new)
}
