use crate::aggregate::RecordAggregator;
use crate::config::MapperConfig;
use crate::error::{Error, Result};
use crate::params::{Params, SqlQuery, ToParams};
use crate::row::{FromRow, Row, RowSet};
use crate::value::{FromValue, Value};
use log::{debug, trace};
use rusqlite::types::Null;
use rusqlite::{Connection, Statement};
use std::{collections::HashMap, hash::Hash, sync::Arc};

/// Runs queries on a borrowed SQLite connection and maps their rows.
///
/// The mapper never opens, closes or commits anything. Pass a
/// `rusqlite::Transaction` (it derefs to `Connection`) to run inside one.
#[derive(Debug, Clone)]
pub struct Mapper<'c> {
    conn: &'c Connection,
    config: MapperConfig,
}

impl<'c> Mapper<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            config: MapperConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Full result with column names
    pub fn query_rows(&self, query: &SqlQuery) -> Result<RowSet> {
        self.query_rows_each(&query.statement, [&query.params])
    }

    /// Run one statement once per parameter set and concatenate the results.
    /// Row indices keep counting across parameter sets.
    pub fn query_rows_each<P, I>(&self, statement: &str, params: I) -> Result<RowSet>
    where
        P: ToParams,
        I: IntoIterator<Item = P>,
    {
        let mut stmt = self.prepare(statement)?;
        let columns = column_names(&stmt);
        let mut rows = Vec::new();
        for set in params {
            self.bind(&mut stmt, &set.to_params())?;
            let mut next = stmt.raw_query();
            while let Some(row) = next.next()? {
                rows.push(read_row(row, rows.len(), &columns)?);
            }
        }
        debug!("query returned {} rows", rows.len());
        Ok(RowSet {
            columns: columns.to_vec(),
            rows,
        })
    }

    /// One map of column name to value per row
    pub fn query_maps(&self, query: &SqlQuery) -> Result<Vec<HashMap<String, Value>>> {
        let set = self.query_rows(query)?;
        Ok(set
            .rows
            .into_iter()
            .map(|row| {
                set.columns
                    .iter()
                    .cloned()
                    .zip(row.into_values())
                    .collect()
            })
            .collect())
    }

    /// Plain value arrays, one per row
    pub fn query_arrays(&self, query: &SqlQuery) -> Result<Vec<Vec<Value>>> {
        Ok(self
            .query_rows(query)?
            .into_iter()
            .map(Row::into_values)
            .collect())
    }

    /// First column of every row, cast to `T`
    pub fn query_values<T: FromValue>(&self, query: &SqlQuery) -> Result<Vec<T>> {
        self.query_rows(query)?
            .iter()
            .map(|row| row.get(0).map_err(Error::from))
            .collect()
    }

    pub fn query_records<T: FromRow>(&self, query: &SqlQuery) -> Result<Vec<T>> {
        self.query_rows(query)?.iter().map(T::from_row).collect()
    }

    pub fn query_records_each<T, P, I>(&self, statement: &str, params: I) -> Result<Vec<T>>
    where
        T: FromRow,
        P: ToParams,
        I: IntoIterator<Item = P>,
    {
        self.query_rows_each(statement, params)?
            .iter()
            .map(T::from_row)
            .collect()
    }

    /// Stream the rows of `query` through `aggregator`.
    ///
    /// The query should order rows by the parent key so each parent's rows
    /// arrive together.
    pub fn query_aggregate<K, P, FK, FE, FN>(
        &self,
        query: &SqlQuery,
        aggregator: &RecordAggregator,
        extract_key: FK,
        on_existing: FE,
        on_new: FN,
    ) -> Result<Vec<P>>
    where
        K: Eq + Hash,
        FK: FnMut(&Row) -> anyhow::Result<K>,
        FE: FnMut(&mut P, &Row) -> anyhow::Result<()>,
        FN: FnMut(&Row) -> anyhow::Result<P>,
    {
        let mut stmt = self.prepare(&query.statement)?;
        self.bind(&mut stmt, &query.params)?;
        let columns = column_names(&stmt);
        let mut index = 0;
        let rows = stmt.raw_query().mapped(|row| {
            let row = read_row(row, index, &columns);
            index += 1;
            row
        });
        aggregator.try_aggregate(
            rows.map(|row| row.map_err(Error::from)),
            extract_key,
            on_existing,
            on_new,
        )
    }

    /// Execute a statement that returns no rows; returns rows affected
    pub fn execute(&self, query: &SqlQuery) -> Result<usize> {
        self.execute_each(&query.statement, [&query.params])
    }

    /// Execute one prepared statement per parameter set, summing rows
    /// affected. Stops at the first failure; wrap the call in a transaction
    /// to make the whole batch atomic.
    pub fn execute_each<P, I>(&self, statement: &str, params: I) -> Result<usize>
    where
        P: ToParams,
        I: IntoIterator<Item = P>,
    {
        let mut stmt = self.prepare(statement)?;
        let mut affected = 0;
        let mut runs = 0;
        for set in params {
            self.bind(&mut stmt, &set.to_params())?;
            affected += stmt.raw_execute()?;
            runs += 1;
        }
        debug!("executed {runs} times, {affected} rows affected");
        Ok(affected)
    }

    fn prepare(&self, statement: &str) -> Result<Statement<'c>> {
        debug!("preparing statement: {}", statement.trim());
        Ok(self.conn.prepare(statement)?)
    }

    /// Bind every parameter of `stmt`. Bare `?` and `?N` take positional
    /// values; `@name`, `:name` and `$name` take named ones.
    fn bind(&self, stmt: &mut Statement<'_>, params: &Params) -> Result<()> {
        for index in 1..=stmt.parameter_count() {
            let name = stmt.parameter_name(index).map(str::to_owned);
            let value = match name.as_deref() {
                None => params.get_positional(index),
                Some(name) if name.starts_with('?') => params.get_positional(index),
                Some(name) => {
                    let bare = &name[1..];
                    if self.config.ignore_case {
                        params.get_ignore_case(bare)?
                    } else {
                        params.get(bare)
                    }
                }
            };
            match value {
                Some(value) => stmt.raw_bind_parameter(index, value)?,
                None if self.config.strict_params => {
                    return Err(Error::MissingParameter(
                        name.unwrap_or_else(|| format!("?{index}")),
                    ));
                }
                None => {
                    trace!("parameter {index} has no value, binding NULL");
                    stmt.raw_bind_parameter(index, Null)?;
                }
            }
        }
        Ok(())
    }
}

fn column_names(stmt: &Statement<'_>) -> Arc<[String]> {
    stmt.column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()
        .into()
}

fn read_row(
    row: &rusqlite::Row<'_>,
    index: usize,
    columns: &Arc<[String]>,
) -> rusqlite::Result<Row> {
    let values = (0..columns.len())
        .map(|column| Value::from_sql_ref(column, row.get_ref(column)?))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Row::with_columns(index, Arc::clone(columns), values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RowShapeError;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE items (
                id INTEGER PRIMARY KEY,
                label TEXT NOT NULL,
                price REAL
            );
            INSERT INTO items (id, label, price) VALUES (1, 'one', 1.5), (2, 'two', NULL);
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn binds_named_parameters_with_any_prefix() {
        let conn = create_test_db();
        let mapper = Mapper::new(&conn);
        for statement in [
            "SELECT label FROM items WHERE id = @Id",
            "SELECT label FROM items WHERE id = :Id",
            "SELECT label FROM items WHERE id = $Id",
        ] {
            let query = SqlQuery::new(statement).with_params(Params::new().with_value("Id", 2));
            assert_eq!(mapper.query_values::<String>(&query).unwrap(), vec!["two"]);
        }
    }

    #[test]
    fn binds_positional_parameters() {
        let conn = create_test_db();
        let query = SqlQuery::new("SELECT id FROM items WHERE id >= ?1 AND label <> ?2")
            .with_params(Params::new().with_positional(1).with_positional("two"));
        let ids: Vec<i64> = Mapper::new(&conn).query_values(&query).unwrap();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn case_insensitive_names_follow_config() {
        let conn = create_test_db();
        let query = SqlQuery::new("SELECT label FROM items WHERE id = @id")
            .with_params(Params::new().with_value("ID", 1));

        let relaxed = Mapper::new(&conn);
        assert_eq!(relaxed.query_values::<String>(&query).unwrap(), vec!["one"]);

        let exact = Mapper::new(&conn).with_config(MapperConfig::new().with_ignore_case(false));
        assert!(matches!(
            exact.query_values::<String>(&query),
            Err(Error::MissingParameter(name)) if name == "@id"
        ));
    }

    #[test]
    fn case_clashing_names_fail_every_time() {
        let conn = create_test_db();
        let query = SqlQuery::new("SELECT @Id")
            .with_params(Params::new().with_value("id", 1).with_value("ID", 2));
        let lenient =
            Mapper::new(&conn).with_config(MapperConfig::new().with_strict_params(false));
        for mapper in [Mapper::new(&conn), lenient] {
            for _ in 0..50 {
                assert!(matches!(
                    mapper.query_arrays(&query),
                    Err(Error::AmbiguousParameter(name)) if name == "Id"
                ));
            }
        }

        // An exact match still wins over the case-insensitive ones
        let exact = SqlQuery::new("SELECT @id")
            .with_params(Params::new().with_value("id", 1).with_value("ID", 2));
        let values: Vec<i64> = Mapper::new(&conn).query_values(&exact).unwrap();
        assert_eq!(values, vec![1]);
    }

    #[test]
    fn invalid_utf8_text_fails_the_query() {
        let conn = create_test_db();
        let err = Mapper::new(&conn)
            .query_arrays(&SqlQuery::new("SELECT CAST(x'ff41' AS TEXT)"))
            .unwrap_err();
        assert!(matches!(err, Error::Sqlite(rusqlite::Error::FromSqlConversionFailure(0, _, _))));
    }

    #[test]
    fn lenient_binding_uses_null() {
        let conn = create_test_db();
        let mapper =
            Mapper::new(&conn).with_config(MapperConfig::new().with_strict_params(false));
        let query = SqlQuery::new("SELECT COUNT(*) FROM items WHERE price IS @price");
        assert_eq!(mapper.query_values::<i64>(&query).unwrap(), vec![1]);
    }

    #[test]
    fn rows_carry_columns_and_indices() {
        let conn = create_test_db();
        let set = Mapper::new(&conn)
            .query_rows(&SqlQuery::new("SELECT id, label, price FROM items ORDER BY id"))
            .unwrap();
        assert_eq!(set.columns, vec!["id", "label", "price"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.rows[1].index(), 1);
        assert_eq!(set.rows[0].get_by_name::<f64>("PRICE"), Ok(1.5));
        assert_eq!(set.rows[1].get::<Option<f64>>(2), Ok(None));
    }

    #[test]
    fn value_shapes() {
        let conn = create_test_db();
        let mapper = Mapper::new(&conn);
        let query = SqlQuery::new("SELECT id, label FROM items ORDER BY id");

        let arrays = mapper.query_arrays(&query).unwrap();
        assert_eq!(arrays[0], vec![Value::Integer(1), Value::Text("one".into())]);

        let maps = mapper.query_maps(&query).unwrap();
        assert_eq!(maps[1].get("label"), Some(&Value::Text("two".into())));
    }

    #[test]
    fn scalar_cast_failure_is_a_shape_error() {
        let conn = create_test_db();
        let err = Mapper::new(&conn)
            .query_values::<i64>(&SqlQuery::new("SELECT label FROM items ORDER BY id"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RowShape(RowShapeError::TypeMismatch { row: 0, column: 0, .. })
        ));
    }

    #[test]
    fn execute_reports_rows_affected() {
        let conn = create_test_db();
        let mapper = Mapper::new(&conn);
        let changed = mapper
            .execute(
                &SqlQuery::new("UPDATE items SET price = @price WHERE price IS NULL")
                    .with_params(Params::new().with_value("price", 9.0)),
            )
            .unwrap();
        assert_eq!(changed, 1);

        let inserted = mapper
            .execute_each(
                "INSERT INTO items (label) VALUES (@label)",
                ["three", "four"].map(|label| Params::new().with_value("label", label)),
            )
            .unwrap();
        assert_eq!(inserted, 2);
    }

    #[test]
    fn booleans_bind_as_integers() {
        let conn = create_test_db();
        let query =
            SqlQuery::new("SELECT @flag").with_params(Params::new().with_value("flag", true));
        let flags: Vec<bool> = Mapper::new(&conn).query_values(&query).unwrap();
        assert_eq!(flags, vec![true]);
    }
}
