use crate::errors::{Error, Result};
use crate::math::matrix::Matrix;
use hashbrown::HashMap;
use tracing::warn;

/// A named scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    value: f64,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Lifecycle state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolAccess {
    /// Values and membership are frozen.
    ReadOnly,
    /// Values may change; membership is frozen.
    ReadWrite,
    /// Values and membership may change.
    ReadWriteAdd,
}

/// An ordered, named set of variables.
///
/// Insertion order is part of the pool's identity: matrix rows and columns
/// throughout the toolbox are indexed by pool order. Names are unique
/// within a pool.
#[derive(Debug, Clone, PartialEq)]
pub struct VariablePool {
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    access: PoolAccess,
}

impl Default for VariablePool {
    fn default() -> Self {
        Self::new()
    }
}

impl VariablePool {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            index: HashMap::new(),
            access: PoolAccess::ReadWriteAdd,
        }
    }

    /// Parses a comma-separated list of `name` or `name : value` entries.
    pub fn by_parsing_string(input: &str) -> Result<Self> {
        let mut pool = Self::new();
        for raw in input.split(',') {
            let entry = raw.trim();
            if entry.is_empty() {
                continue;
            }
            let (name, value) = match entry.split_once(':') {
                Some((name, value)) => {
                    let parsed = value.trim().parse::<f64>().map_err(|_| {
                        Error::ParseFail(format!("bad value in pool entry `{entry}`"))
                    })?;
                    (name.trim(), parsed)
                }
                None => (entry, 0.0),
            };
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(Error::ParseFail(format!(
                    "bad name in pool entry `{entry}`"
                )));
            }
            pool.add(name, value)?;
        }
        Ok(pool)
    }

    pub fn set_read_only(&mut self) {
        self.access = PoolAccess::ReadOnly;
    }

    pub fn set_read_write(&mut self) {
        self.access = PoolAccess::ReadWrite;
    }

    pub fn set_read_write_add(&mut self) {
        self.access = PoolAccess::ReadWriteAdd;
    }

    pub fn access(&self) -> PoolAccess {
        self.access
    }

    pub fn number_of_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Adds a variable. Membership must be open; re-adding an existing name
    /// keeps the first entry and warns.
    pub fn add(&mut self, name: &str, value: f64) -> Result<()> {
        if self.access != PoolAccess::ReadWriteAdd {
            return Err(Error::WrongShapeOrDomain(format!(
                "pool membership is frozen; cannot add `{name}`"
            )));
        }
        if self.index.contains_key(name) {
            warn!(name, "variable already in pool; first value wins");
            return Ok(());
        }
        self.index.insert(name.to_string(), self.variables.len());
        self.variables.push(Variable::new(name, value));
        Ok(())
    }

    pub fn has_variable_with_name(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn index_of_variable_with_name(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn variable_at_index(&self, index: usize) -> Option<&Variable> {
        self.variables.get(index)
    }

    pub fn value_for_variable_with_name(&self, name: &str) -> Option<f64> {
        self.index.get(name).map(|&i| self.variables[i].value)
    }

    /// Sets the value of an existing variable. The pool must be writable.
    pub fn set_value_for_variable_with_name(&mut self, name: &str, value: f64) -> Result<()> {
        if self.access == PoolAccess::ReadOnly {
            return Err(Error::WrongShapeOrDomain(format!(
                "pool is read-only; cannot set `{name}`"
            )));
        }
        match self.index.get(name) {
            Some(&i) => {
                self.variables[i].value = value;
                Ok(())
            }
            None => Err(Error::NotFound(format!("variable `{name}`"))),
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn all_variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Adds every variable of `source` not already present.
    pub fn copy_variables_from(&mut self, source: &VariablePool) -> Result<()> {
        for variable in &source.variables {
            if !self.has_variable_with_name(&variable.name) {
                self.add(&variable.name, variable.value)?;
            }
        }
        Ok(())
    }

    /// Current values in pool order, as a column or row vector.
    pub fn values_as_vector(&self, row_vector: bool) -> Matrix {
        let values: Vec<f64> = self.variables.iter().map(|v| v.value).collect();
        if row_vector {
            Matrix::from_values(1, values.len(), values).expect("shape")
        } else {
            Matrix::column(&values)
        }
    }

    /// For each variable of `sub`, its index within this pool.
    pub fn indices_of_sub_pool(&self, sub: &VariablePool) -> Result<Vec<usize>> {
        sub.variables
            .iter()
            .map(|v| {
                self.index_of_variable_with_name(&v.name)
                    .ok_or_else(|| Error::NotFound(format!("variable `{}`", v.name)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut pool = VariablePool::new();
        pool.add("b", 2.0).unwrap();
        pool.add("a", 1.0).unwrap();
        pool.add("c", 3.0).unwrap();
        assert_eq!(pool.all_variable_names(), vec!["b", "a", "c"]);
        assert_eq!(pool.index_of_variable_with_name("a"), Some(1));
    }

    #[test]
    fn first_add_wins() {
        let mut pool = VariablePool::new();
        pool.add("x", 1.0).unwrap();
        pool.add("x", 9.0).unwrap();
        assert_eq!(pool.number_of_variables(), 1);
        assert_eq!(pool.value_for_variable_with_name("x"), Some(1.0));
    }

    #[test]
    fn lifecycle_states_gate_mutation() {
        let mut pool = VariablePool::new();
        pool.add("x", 1.0).unwrap();
        pool.set_read_write();
        assert!(pool.add("y", 2.0).is_err());
        pool.set_value_for_variable_with_name("x", 5.0).unwrap();
        pool.set_read_only();
        assert!(pool.set_value_for_variable_with_name("x", 7.0).is_err());
        assert_eq!(pool.value_for_variable_with_name("x"), Some(5.0));
    }

    #[test]
    fn parses_name_value_lists() {
        let pool = VariablePool::by_parsing_string("a : 2, b, c : 0.5").unwrap();
        assert_eq!(pool.number_of_variables(), 3);
        assert_eq!(pool.value_for_variable_with_name("a"), Some(2.0));
        assert_eq!(pool.value_for_variable_with_name("b"), Some(0.0));
        assert_eq!(pool.value_for_variable_with_name("c"), Some(0.5));
        assert!(VariablePool::by_parsing_string("3x : 1").is_err());
    }

    #[test]
    fn values_vector_follows_pool_order() {
        let pool = VariablePool::by_parsing_string("a : 1, b : 2").unwrap();
        let v = pool.values_as_vector(false);
        assert_eq!(v.rows(), 2);
        assert_eq!(v.value(0, 0), 1.0);
        assert_eq!(v.value(1, 0), 2.0);
    }
}
