//! Parameter declarations and value stores.
//!
//! A parameter is a named, typed value: scalar, or indexed over one or more
//! sets. External parameters are declared with `= ...` and filled by the
//! data-file binder, which is the sole writer of value stores.

use crate::value::{IndexKey, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Shape of a parameter: scalar or indexed over a list of sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamShape {
    Scalar,
    /// Indexed over the named sets, one per dimension.
    Indexed(Vec<String>),
}

impl ParamShape {
    pub fn dimensions(&self) -> usize {
        match self {
            ParamShape::Scalar => 0,
            ParamShape::Indexed(sets) => sets.len(),
        }
    }
}

/// A named, typed parameter. The type is immutable post-creation.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub vtype: ValueType,
    pub shape: ParamShape,
    /// Declared with `= ...`, awaiting a data-file binding.
    pub external: bool,
    /// Scalar slot, empty until bound.
    scalar: Option<Value>,
    /// Indexed store: index tuple -> value.
    values: HashMap<Vec<IndexKey>, Value>,
}

impl Parameter {
    pub fn scalar_param(name: impl Into<String>, vtype: ValueType, external: bool) -> Self {
        Parameter {
            name: name.into(),
            vtype,
            shape: ParamShape::Scalar,
            external,
            scalar: None,
            values: HashMap::new(),
        }
    }

    pub fn indexed_param(
        name: impl Into<String>,
        vtype: ValueType,
        index_sets: Vec<String>,
        external: bool,
    ) -> Self {
        Parameter {
            name: name.into(),
            vtype,
            shape: ParamShape::Indexed(index_sets),
            external,
            scalar: None,
            values: HashMap::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.shape.dimensions()
    }

    /// Bind the scalar slot. Rejects indexed parameters and type mismatches.
    pub fn set_scalar(&mut self, value: Value) -> Result<(), String> {
        if self.dimensions() != 0 {
            return Err(format!(
                "parameter '{}' is indexed; a scalar value cannot be assigned",
                self.name
            ));
        }
        let value = self.coerce(value)?;
        self.scalar = Some(value);
        Ok(())
    }

    /// Bind one indexed slot.
    pub fn set_at(&mut self, key: Vec<IndexKey>, value: Value) -> Result<(), String> {
        if key.len() != self.dimensions() {
            return Err(format!(
                "parameter '{}' has {} dimension(s), got {} index value(s)",
                self.name,
                self.dimensions(),
                key.len()
            ));
        }
        let value = self.coerce(value)?;
        self.values.insert(key, value);
        Ok(())
    }

    fn coerce(&self, value: Value) -> Result<Value, String> {
        if !value.conforms_to(self.vtype) {
            return Err(format!(
                "type mismatch for parameter '{}': declared {}, got {}",
                self.name,
                self.vtype,
                value.value_type()
            ));
        }
        // Widen ints into float slots so reads are uniform.
        if self.vtype == ValueType::Float {
            if let Value::Int(v) = value {
                return Ok(Value::Float(v as f64));
            }
        }
        Ok(value)
    }

    pub fn scalar(&self) -> Option<&Value> {
        self.scalar.as_ref()
    }

    pub fn at(&self, key: &[IndexKey]) -> Option<&Value> {
        self.values.get(key)
    }

    /// A scalar parameter is bound once its slot holds a value; an indexed
    /// parameter once at least one slot is filled.
    pub fn is_bound(&self) -> bool {
        match self.shape {
            ParamShape::Scalar => self.scalar.is_some(),
            ParamShape::Indexed(_) => !self.values.is_empty(),
        }
    }

    pub fn bound_count(&self) -> usize {
        match self.shape {
            ParamShape::Scalar => usize::from(self.scalar.is_some()),
            ParamShape::Indexed(_) => self.values.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_binding_type_checked() {
        let mut p = Parameter::scalar_param("n", ValueType::Int, true);
        assert!(!p.is_bound());
        assert!(p.set_scalar(Value::Str("x".into())).is_err());
        p.set_scalar(Value::Int(3)).unwrap();
        assert_eq!(p.scalar(), Some(&Value::Int(3)));
    }

    #[test]
    fn test_int_widens_into_float_slot() {
        let mut p = Parameter::scalar_param("c", ValueType::Float, true);
        p.set_scalar(Value::Int(4)).unwrap();
        assert_eq!(p.scalar(), Some(&Value::Float(4.0)));
    }

    #[test]
    fn test_indexed_binding_arity_checked() {
        let mut p = Parameter::indexed_param("cap", ValueType::Float, vec!["I".into()], true);
        assert!(p.set_at(vec![], Value::Int(1)).is_err());
        p.set_at(vec![IndexKey::Int(1)], Value::Int(5)).unwrap();
        assert_eq!(p.at(&[IndexKey::Int(1)]), Some(&Value::Float(5.0)));
        assert_eq!(p.at(&[IndexKey::Int(2)]), None);
    }
}
