//! # Value Type System
//!
//! Scalar values flowing through the model front-end: parameter values,
//! set elements, tuple fields, and evaluated expression results.
//!
//! The primitive type set is fixed: `int`, `float`, `string`, `bool`.
//! Integers coerce to floats on assignment; no other implicit conversions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a parameter, tuple field, or decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int,
    Float,
    String,
    Bool,
}

impl ValueType {
    /// Parse a type keyword from model source.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "int" => Some(ValueType::Int),
            "float" => Some(ValueType::Float),
            "string" => Some(ValueType::String),
            "bool" => Some(ValueType::Bool),
            _ => None,
        }
    }

    /// Get the keyword form used in model source.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Bool => "bool",
        }
    }

    /// Whether this type holds numeric values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    /// The type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::String,
            Value::Bool(_) => ValueType::Bool,
        }
    }

    /// Numeric view of this value. Booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(_) => None,
        }
    }

    /// Integer view, exact. Floats with a fractional part are rejected.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Truthiness: nonzero numbers and `true` are truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
        }
    }

    /// Whether this value can be stored in a slot of the given declared type.
    /// Ints are accepted into float slots; nothing else coerces.
    pub fn conforms_to(&self, declared: ValueType) -> bool {
        match (self, declared) {
            (Value::Int(_), ValueType::Int | ValueType::Float) => true,
            (Value::Float(_), ValueType::Float) => true,
            (Value::Str(_), ValueType::String) => true,
            (Value::Bool(_), ValueType::Bool) => true,
            _ => false,
        }
    }

    /// Parse a literal token: quoted string, bool keyword, integer, or float.
    /// Numeric parsing always uses a period as the decimal point.
    pub fn parse_literal(token: &str) -> Option<Value> {
        let token = token.trim();
        if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
            return Some(Value::Str(token[1..token.len() - 1].to_string()));
        }
        match token {
            "true" => return Some(Value::Bool(true)),
            "false" => return Some(Value::Bool(false)),
            _ => {}
        }
        if let Ok(v) = token.parse::<i64>() {
            return Some(Value::Int(v));
        }
        if let Ok(v) = token.parse::<f64>() {
            return Some(Value::Float(v));
        }
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A hashable index key for indexed parameter storage. Index tuples are
/// integers per dimension, or strings when the dimension is a primitive
/// string set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKey {
    Int(i64),
    Str(String),
}

impl IndexKey {
    /// Convert an evaluated value into an index key.
    pub fn from_value(value: &Value) -> Option<IndexKey> {
        match value {
            Value::Int(v) => Some(IndexKey::Int(*v)),
            Value::Float(v) if v.fract() == 0.0 => Some(IndexKey::Int(*v as i64)),
            Value::Str(s) => Some(IndexKey::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Int(v) => write!(f, "{v}"),
            IndexKey::Str(s) => write!(f, "{s}"),
        }
    }
}
