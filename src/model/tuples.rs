//! Tuple schemas, instances, and tuple sets.
//!
//! A tuple schema is an immutable record type whose fields may be flagged
//! `key`; the combination of key-field values must be unique within a tuple
//! set, which is what `item(set, <key>)` resolves against.

use crate::value::{IndexKey, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One field of a tuple schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleField {
    pub name: String,
    pub ftype: ValueType,
    pub is_key: bool,
}

/// Named record type: ordered fields, immutable once declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleSchema {
    pub name: String,
    pub fields: Vec<TupleField>,
}

impl TupleSchema {
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }

    /// Positions of the fields flagged `key`, in declaration order.
    pub fn key_indices(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_key)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

/// A record conforming to some schema. Field names are resolved through the
/// schema, looked up by name in the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleInstance {
    pub schema: String,
    pub values: Vec<Value>,
}

impl TupleInstance {
    pub fn field<'a>(&'a self, schema: &TupleSchema, name: &str) -> Option<&'a Value> {
        schema.field_index(name).and_then(|i| self.values.get(i))
    }

    /// Key of this instance under the given schema.
    pub fn key(&self, schema: &TupleSchema) -> Vec<IndexKey> {
        schema
            .key_indices()
            .into_iter()
            .filter_map(|i| self.values.get(i).and_then(IndexKey::from_value))
            .collect()
    }
}

/// A set of tuple instances: a flat set, or a family indexed over an index
/// set. Insertion order is preserved so positional access `S[i]` is stable.
#[derive(Debug, Clone)]
pub struct TupleSet {
    pub name: String,
    pub schema: String,
    pub external: bool,
    /// When set, the tuple set is a family of sets over this index set.
    pub index_set: Option<String>,
    instances: Vec<TupleInstance>,
    /// Family groups: index value -> positions in `instances`.
    groups: HashMap<i64, Vec<usize>>,
}

impl TupleSet {
    pub fn new(
        name: impl Into<String>,
        schema: impl Into<String>,
        external: bool,
        index_set: Option<String>,
    ) -> Self {
        TupleSet {
            name: name.into(),
            schema: schema.into(),
            external,
            index_set,
            instances: Vec::new(),
            groups: HashMap::new(),
        }
    }

    /// Append an instance, enforcing key uniqueness under the schema.
    pub fn add_instance(
        &mut self,
        instance: TupleInstance,
        schema: &TupleSchema,
    ) -> Result<(), String> {
        let key = instance.key(schema);
        if !key.is_empty() {
            for existing in &self.instances {
                if existing.key(schema) == key {
                    let rendered: Vec<String> = key.iter().map(ToString::to_string).collect();
                    return Err(format!(
                        "duplicate key <{}> in tuple set '{}'",
                        rendered.join(","),
                        self.name
                    ));
                }
            }
        }
        self.instances.push(instance);
        Ok(())
    }

    /// Append an instance into one group of an indexed family.
    pub fn add_instance_at(
        &mut self,
        index: i64,
        instance: TupleInstance,
        schema: &TupleSchema,
    ) -> Result<(), String> {
        self.add_instance(instance, schema)?;
        let pos = self.instances.len() - 1;
        self.groups.entry(index).or_default().push(pos);
        Ok(())
    }

    pub fn instances(&self) -> &[TupleInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Positional access, 1-based, matching `S[i]` in model source.
    pub fn instance_at(&self, position: i64) -> Option<&TupleInstance> {
        if position < 1 {
            return None;
        }
        self.instances.get(position as usize - 1)
    }

    /// Instances of one group of an indexed family.
    pub fn group(&self, index: i64) -> Vec<&TupleInstance> {
        self.groups
            .get(&index)
            .map(|positions| positions.iter().filter_map(|&p| self.instances.get(p)).collect())
            .unwrap_or_default()
    }

    /// Keyed lookup: the unique instance whose key-field values match.
    pub fn find_by_key(&self, key: &[IndexKey], schema: &TupleSchema) -> Option<&TupleInstance> {
        self.instances.iter().find(|inst| inst.key(schema) == key)
    }

    pub fn clear_instances(&mut self) {
        self.instances.clear();
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc_schema() -> TupleSchema {
        TupleSchema {
            name: "Arc".to_string(),
            fields: vec![
                TupleField {
                    name: "id".to_string(),
                    ftype: ValueType::String,
                    is_key: true,
                },
                TupleField {
                    name: "from".to_string(),
                    ftype: ValueType::String,
                    is_key: false,
                },
            ],
        }
    }

    fn arc(id: &str, from: &str) -> TupleInstance {
        TupleInstance {
            schema: "Arc".to_string(),
            values: vec![Value::Str(id.to_string()), Value::Str(from.to_string())],
        }
    }

    #[test]
    fn test_key_uniqueness_enforced() {
        let schema = arc_schema();
        let mut set = TupleSet::new("arcs", "Arc", false, None);
        set.add_instance(arc("a", "N1"), &schema).unwrap();
        set.add_instance(arc("b", "N2"), &schema).unwrap();
        let err = set.add_instance(arc("a", "N3"), &schema).unwrap_err();
        assert!(err.contains("duplicate key"));
    }

    #[test]
    fn test_item_lookup_by_key() {
        let schema = arc_schema();
        let mut set = TupleSet::new("arcs", "Arc", false, None);
        set.add_instance(arc("a", "N1"), &schema).unwrap();
        set.add_instance(arc("b", "N2"), &schema).unwrap();
        let found = set
            .find_by_key(&[IndexKey::Str("b".to_string())], &schema)
            .unwrap();
        assert_eq!(found.field(&schema, "from"), Some(&Value::Str("N2".into())));
    }

    #[test]
    fn test_positional_access_is_one_based() {
        let schema = arc_schema();
        let mut set = TupleSet::new("arcs", "Arc", false, None);
        set.add_instance(arc("a", "N1"), &schema).unwrap();
        assert!(set.instance_at(0).is_none());
        assert_eq!(set.instance_at(1).unwrap().values[0], Value::Str("a".into()));
    }
}
