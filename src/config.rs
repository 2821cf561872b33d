use serde::{Deserialize, Serialize};

/// Parameter binding policy for a [`Mapper`](crate::Mapper)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Match named parameters against `Params` ignoring ASCII case when no
    /// exact match exists
    pub ignore_case: bool,
    /// Fail on a parameter with no value instead of binding NULL
    pub strict_params: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            ignore_case: true,
            strict_params: true,
        }
    }
}

impl MapperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_strict_params(mut self, strict_params: bool) -> Self {
        self.strict_params = strict_params;
        self
    }
}
