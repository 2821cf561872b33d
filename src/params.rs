use crate::error::{Error, Result};
use crate::value::Value;
use std::collections::HashMap;

/// Parameter bindings for SQL queries
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    /// Named values, keyed without the `@`, `:` or `$` prefix
    pub values: HashMap<String, Value>,
    /// Values for `?` and `?N` placeholders, in order
    pub positional: Vec<Value>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Append the next positional value
    pub fn with_positional(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Exact match first, then the single name equal to `name` ignoring
    /// ASCII case. Several such names are an error.
    pub fn get_ignore_case(&self, name: &str) -> Result<Option<&Value>> {
        if let Some(value) = self.get(name) {
            return Ok(Some(value));
        }
        let mut found = self
            .values
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name));
        match (found.next(), found.next()) {
            (None, _) => Ok(None),
            (Some((_, value)), None) => Ok(Some(value)),
            (Some(_), Some(_)) => Err(Error::AmbiguousParameter(name.to_string())),
        }
    }

    /// Positional value for the 1-based placeholder index
    pub fn get_positional(&self, index: usize) -> Option<&Value> {
        index.checked_sub(1).and_then(|i| self.positional.get(i))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.positional.is_empty()
    }
}

/// Conversion from a caller's record into statement parameters.
///
/// This is how a bulk source (for example, the lines of a CSV file) is fed to
/// [`Mapper::execute_each`](crate::Mapper::execute_each).
pub trait ToParams {
    fn to_params(&self) -> Params;
}

impl ToParams for Params {
    fn to_params(&self) -> Params {
        self.clone()
    }
}

impl<T: ToParams + ?Sized> ToParams for &T {
    fn to_params(&self) -> Params {
        (**self).to_params()
    }
}

/// SQL Query with typed parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Params,
}

impl SqlQuery {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            params: Params::new(),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}
