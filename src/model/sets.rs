//! Index sets, primitive sets, and computed sets.

use crate::expr::{Binding, EvalContext, EvalError, Expr, IteratorSpec};
use crate::model::tuples::TupleInstance;
use crate::model::ModelRepository;
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};

/// Named inclusive integer range `[start..end]`, `start <= end`.
/// Iteration is the deterministic ascending sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSet {
    pub name: String,
    pub start: i64,
    pub end: i64,
}

impl IndexSet {
    pub fn new(name: impl Into<String>, start: i64, end: i64) -> Result<Self, String> {
        if start > end {
            return Err(format!("invalid range {start}..{end}: start exceeds end"));
        }
        Ok(IndexSet {
            name: name.into(),
            start,
            end,
        })
    }

    pub fn elements(&self) -> impl Iterator<Item = i64> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.start && value <= self.end
    }
}

/// Unordered, deduplicated collection of scalar values. Insertion order is
/// kept for deterministic iteration; duplicates are dropped on insert.
#[derive(Debug, Clone)]
pub struct PrimitiveSet {
    pub name: String,
    pub element_type: ValueType,
    pub external: bool,
    elements: Vec<Value>,
}

impl PrimitiveSet {
    pub fn new(name: impl Into<String>, element_type: ValueType, external: bool) -> Self {
        PrimitiveSet {
            name: name.into(),
            element_type,
            external,
            elements: Vec::new(),
        }
    }

    /// Insert, dropping duplicates and rejecting type mismatches.
    pub fn add_element(&mut self, value: Value) -> Result<(), String> {
        if !value.conforms_to(self.element_type) {
            return Err(format!(
                "type mismatch in set '{}': declared {}, got {}",
                self.name,
                self.element_type,
                value.value_type()
            ));
        }
        if !self.elements.contains(&value) {
            self.elements.push(value);
        }
        Ok(())
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.elements.contains(value)
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear_elements(&mut self) {
        self.elements.clear();
    }
}

/// A set produced by a comprehension `{ body | iter1, iter2, ... : filter }`.
/// Lazy: content is materialized against the current repository on use, so a
/// later data binding is picked up by the next materialization.
#[derive(Debug, Clone)]
pub struct ComputedSet {
    pub name: String,
    /// Schema of the produced instances.
    pub schema: String,
    pub body: Expr,
    pub iterators: Vec<IteratorSpec>,
}

impl ComputedSet {
    /// Walk the cartesian product of the iterator sets, apply per-iterator
    /// filters, and collect the body's tuple for each surviving binding.
    pub fn materialize(&self, repo: &ModelRepository) -> Result<Vec<TupleInstance>, EvalError> {
        let mut out = Vec::new();
        let ctx = EvalContext::new();
        self.walk(repo, &ctx, 0, &mut out)?;
        Ok(out)
    }

    fn walk(
        &self,
        repo: &ModelRepository,
        ctx: &EvalContext,
        depth: usize,
        out: &mut Vec<TupleInstance>,
    ) -> Result<(), EvalError> {
        if depth == self.iterators.len() {
            out.push(self.produce(repo, ctx)?);
            return Ok(());
        }
        let spec = &self.iterators[depth];
        for binding in repo.iterate_set(&spec.set)? {
            let inner = ctx.bind(&spec.var, binding);
            if let Some(filter) = &spec.filter {
                if !filter.evaluate(&inner, repo)?.is_truthy() {
                    continue;
                }
            }
            self.walk(repo, &inner, depth + 1, out)?;
        }
        Ok(())
    }

    fn produce(&self, repo: &ModelRepository, ctx: &EvalContext) -> Result<TupleInstance, EvalError> {
        match &self.body {
            // `{ a | a in arcs : ... }` passes the bound instance through.
            Expr::Iter(var) => match ctx.get(var) {
                Some(Binding::Tuple(instance)) => Ok(instance.clone()),
                Some(_) => Err(EvalError::TypeMismatch(format!(
                    "comprehension body '{var}' is not bound to a tuple"
                ))),
                None => Err(EvalError::UnboundIterator(var.clone())),
            },
            // `{ <e1,e2> | ... }` constructs new instances field by field.
            Expr::TupleKey(parts) => {
                let mut values = Vec::with_capacity(parts.len());
                for part in parts {
                    values.push(part.evaluate(ctx, repo)?);
                }
                Ok(TupleInstance {
                    schema: self.schema.clone(),
                    values,
                })
            }
            other => Err(EvalError::TypeMismatch(format!(
                "comprehension body '{other}' does not produce a tuple"
            ))),
        }
    }
}
