//! # Model Repository
//!
//! In-memory catalog of every declared entity in one parse session:
//! parameters, index sets, primitive sets, tuple schemas and sets, computed
//! sets, decision variables, decision expressions, constraint templates,
//! expanded equations, and the objective.
//!
//! Name lookups are case-sensitive across all kinds. Insertion replaces by
//! name: later declarations shadow earlier ones. Constraint templates are
//! deleted after expansion so a re-expansion cannot double-count.

pub mod constraints;
pub mod parameter;
pub mod sets;
pub mod tuples;
pub mod variables;

pub use constraints::{
    DecisionExpression, Equation, ForallStatement, IndexedEquationTemplate, LabelTemplate,
    LinearForm, Objective, ObjectiveSense, RelOp,
};
pub use parameter::{ParamShape, Parameter};
pub use sets::{ComputedSet, IndexSet, PrimitiveSet};
pub use tuples::{TupleField, TupleInstance, TupleSchema, TupleSet};
pub use variables::{canonical_name, DecisionVariable, VarShape};

use crate::expr::{Binding, EvalError};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt::Write as _;

/// The repository owning all entities of a parse session. Not thread-safe;
/// one instance per session.
#[derive(Debug, Default)]
pub struct ModelRepository {
    parameters: HashMap<String, Parameter>,
    index_sets: HashMap<String, IndexSet>,
    primitive_sets: HashMap<String, PrimitiveSet>,
    tuple_schemas: HashMap<String, TupleSchema>,
    tuple_sets: HashMap<String, TupleSet>,
    computed_sets: HashMap<String, ComputedSet>,
    variables: HashMap<String, DecisionVariable>,
    dexprs: HashMap<String, DecisionExpression>,
    foralls: Vec<ForallStatement>,
    indexed_templates: Vec<IndexedEquationTemplate>,
    equations: Vec<Equation>,
    objective: Option<Objective>,
}

impl ModelRepository {
    pub fn new() -> Self {
        ModelRepository::default()
    }

    // ========================================================================
    // Insertion (insert-or-replace by name)
    // ========================================================================

    pub fn add_parameter(&mut self, p: Parameter) {
        self.parameters.insert(p.name.clone(), p);
    }

    pub fn add_index_set(&mut self, s: IndexSet) {
        self.index_sets.insert(s.name.clone(), s);
    }

    pub fn add_primitive_set(&mut self, s: PrimitiveSet) {
        self.primitive_sets.insert(s.name.clone(), s);
    }

    pub fn add_tuple_schema(&mut self, s: TupleSchema) {
        self.tuple_schemas.insert(s.name.clone(), s);
    }

    pub fn add_tuple_set(&mut self, s: TupleSet) {
        self.tuple_sets.insert(s.name.clone(), s);
    }

    pub fn add_computed_set(&mut self, s: ComputedSet) {
        self.computed_sets.insert(s.name.clone(), s);
    }

    pub fn add_indexed_variable(&mut self, v: DecisionVariable) {
        self.variables.insert(v.name.clone(), v);
    }

    pub fn add_dexpr(&mut self, d: DecisionExpression) {
        self.dexprs.insert(d.name.clone(), d);
    }

    pub fn add_forall_statement(&mut self, f: ForallStatement) {
        self.foralls.push(f);
    }

    pub fn add_indexed_equation_template(&mut self, t: IndexedEquationTemplate) {
        self.indexed_templates.push(t);
    }

    pub fn add_equation(&mut self, e: Equation) {
        self.equations.push(e);
    }

    pub fn set_objective(&mut self, o: Objective) {
        self.objective = Some(o);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.get_mut(name)
    }

    pub fn index_set(&self, name: &str) -> Option<&IndexSet> {
        self.index_sets.get(name)
    }

    pub fn primitive_set(&self, name: &str) -> Option<&PrimitiveSet> {
        self.primitive_sets.get(name)
    }

    pub fn primitive_set_mut(&mut self, name: &str) -> Option<&mut PrimitiveSet> {
        self.primitive_sets.get_mut(name)
    }

    pub fn tuple_schema(&self, name: &str) -> Option<&TupleSchema> {
        self.tuple_schemas.get(name)
    }

    pub fn tuple_set(&self, name: &str) -> Option<&TupleSet> {
        self.tuple_sets.get(name)
    }

    pub fn tuple_set_mut(&mut self, name: &str) -> Option<&mut TupleSet> {
        self.tuple_sets.get_mut(name)
    }

    pub fn computed_set(&self, name: &str) -> Option<&ComputedSet> {
        self.computed_sets.get(name)
    }

    pub fn variable(&self, name: &str) -> Option<&DecisionVariable> {
        self.variables.get(name)
    }

    pub fn dexpr(&self, name: &str) -> Option<&DecisionExpression> {
        self.dexprs.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &DecisionVariable> {
        self.variables.values()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn index_sets(&self) -> impl Iterator<Item = &IndexSet> {
        self.index_sets.values()
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    pub fn forall_statements(&self) -> &[ForallStatement] {
        &self.foralls
    }

    pub fn indexed_equation_templates(&self) -> &[IndexedEquationTemplate] {
        &self.indexed_templates
    }

    // ========================================================================
    // Classification
    // ========================================================================

    pub fn is_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn is_decision_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn is_dexpr(&self, name: &str) -> bool {
        self.dexprs.contains_key(name)
    }

    /// Whether `name` refers to any kind of set.
    pub fn is_set(&self, name: &str) -> bool {
        self.index_sets.contains_key(name)
            || self.primitive_sets.contains_key(name)
            || self.tuple_sets.contains_key(name)
            || self.computed_sets.contains_key(name)
    }

    pub fn is_tuple_set(&self, name: &str) -> bool {
        self.tuple_sets.contains_key(name) || self.computed_sets.contains_key(name)
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Elements of a named set as iterator bindings, in deterministic order.
    /// Computed sets are materialized against the current repository state.
    pub fn iterate_set(&self, name: &str) -> Result<Vec<Binding>, EvalError> {
        if let Some(index) = self.index_sets.get(name) {
            return Ok(index.elements().map(Binding::Num).collect());
        }
        if let Some(prim) = self.primitive_sets.get(name) {
            let mut out = Vec::with_capacity(prim.len());
            for value in prim.elements() {
                match value {
                    Value::Int(v) => out.push(Binding::Num(*v)),
                    Value::Str(s) => out.push(Binding::Str(s.clone())),
                    other => {
                        return Err(EvalError::TypeMismatch(format!(
                            "cannot iterate set '{name}' over element {other}"
                        )))
                    }
                }
            }
            return Ok(out);
        }
        if let Some(tuples) = self.tuple_sets.get(name) {
            return Ok(tuples
                .instances()
                .iter()
                .cloned()
                .map(Binding::Tuple)
                .collect());
        }
        if let Some(computed) = self.computed_sets.get(name) {
            return Ok(computed
                .materialize(self)?
                .into_iter()
                .map(Binding::Tuple)
                .collect());
        }
        Err(EvalError::UnknownSet(name.to_string()))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn take_forall_statements(&mut self) -> Vec<ForallStatement> {
        std::mem::take(&mut self.foralls)
    }

    pub fn take_indexed_equation_templates(&mut self) -> Vec<IndexedEquationTemplate> {
        std::mem::take(&mut self.indexed_templates)
    }

    pub fn clear_forall_statements(&mut self) {
        self.foralls.clear();
    }

    pub fn clear_indexed_equation_templates(&mut self) {
        self.indexed_templates.clear();
    }

    /// Reset everything.
    pub fn clear(&mut self) {
        self.parameters.clear();
        self.index_sets.clear();
        self.primitive_sets.clear();
        self.tuple_schemas.clear();
        self.tuple_sets.clear();
        self.computed_sets.clear();
        self.variables.clear();
        self.dexprs.clear();
        self.foralls.clear();
        self.indexed_templates.clear();
        self.equations.clear();
        self.objective = None;
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Serialize the repository as human-readable text.
    pub fn generate_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Model repository");
        let _ = writeln!(out, "================");

        let mut names: Vec<&String> = self.index_sets.keys().collect();
        names.sort();
        let _ = writeln!(out, "\nIndex sets ({}):", names.len());
        for name in names {
            let set = &self.index_sets[name];
            let _ = writeln!(out, "  range {} = {}..{}", set.name, set.start, set.end);
        }

        let mut names: Vec<&String> = self.primitive_sets.keys().collect();
        names.sort();
        let _ = writeln!(out, "\nPrimitive sets ({}):", names.len());
        for name in names {
            let set = &self.primitive_sets[name];
            let elems: Vec<String> = set.elements().iter().map(ToString::to_string).collect();
            let _ = writeln!(
                out,
                "  {{{}}} {} = {{{}}}",
                set.element_type,
                set.name,
                elems.join(", ")
            );
        }

        let mut names: Vec<&String> = self.tuple_schemas.keys().collect();
        names.sort();
        let _ = writeln!(out, "\nTuple schemas ({}):", names.len());
        for name in names {
            let schema = &self.tuple_schemas[name];
            let fields: Vec<String> = schema
                .fields
                .iter()
                .map(|f| {
                    if f.is_key {
                        format!("key {} {}", f.ftype, f.name)
                    } else {
                        format!("{} {}", f.ftype, f.name)
                    }
                })
                .collect();
            let _ = writeln!(out, "  tuple {} {{ {} }}", schema.name, fields.join("; "));
        }

        let mut names: Vec<&String> = self.tuple_sets.keys().collect();
        names.sort();
        let _ = writeln!(out, "\nTuple sets ({}):", names.len());
        for name in names {
            let set = &self.tuple_sets[name];
            let _ = writeln!(
                out,
                "  {{{}}} {} ({} instance(s))",
                set.schema,
                set.name,
                set.len()
            );
        }

        let mut names: Vec<&String> = self.computed_sets.keys().collect();
        names.sort();
        let _ = writeln!(out, "\nComputed sets ({}):", names.len());
        for name in names {
            let set = &self.computed_sets[name];
            let count = set
                .materialize(self)
                .map(|v| v.len().to_string())
                .unwrap_or_else(|_| "?".to_string());
            let _ = writeln!(out, "  {{{}}} {} ({count} instance(s))", set.schema, set.name);
        }

        let mut names: Vec<&String> = self.parameters.keys().collect();
        names.sort();
        let _ = writeln!(out, "\nParameters ({}):", names.len());
        for name in names {
            let p = &self.parameters[name];
            let shape = match &p.shape {
                ParamShape::Scalar => String::new(),
                ParamShape::Indexed(sets) => format!("[{}]", sets.join(",")),
            };
            let binding = if p.is_bound() {
                format!("{} value(s)", p.bound_count())
            } else if p.external {
                "external, unbound".to_string()
            } else {
                "unbound".to_string()
            };
            let _ = writeln!(out, "  {} {}{} ({})", p.vtype, p.name, shape, binding);
        }

        let mut names: Vec<&String> = self.variables.keys().collect();
        names.sort();
        let _ = writeln!(out, "\nDecision variables ({}):", names.len());
        for name in names {
            let v = &self.variables[name];
            let shape = match &v.shape {
                VarShape::Scalar => String::new(),
                VarShape::OneDim(s) => format!("[{s}]"),
                VarShape::TwoDim(a, b) => format!("[{a},{b}]"),
            };
            let _ = writeln!(out, "  dvar {} {}{}", v.vtype, v.name, shape);
        }

        let mut names: Vec<&String> = self.dexprs.keys().collect();
        names.sort();
        let _ = writeln!(out, "\nDecision expressions ({}):", names.len());
        for name in names {
            let d = &self.dexprs[name];
            let _ = writeln!(out, "  dexpr {} {} = {}", d.vtype, d.name, d.body);
        }

        let _ = writeln!(out, "\nConstraints ({}):", self.equations.len());
        for eq in &self.equations {
            let _ = writeln!(out, "  {}", eq.render(self));
        }

        match &self.objective {
            Some(obj) => {
                let terms: Vec<String> = obj
                    .form
                    .terms()
                    .iter()
                    .map(|(name, coeff)| match coeff.simplify() {
                        crate::expr::Expr::Number(v) => format!("{v}*{name}"),
                        other => format!("({other})*{name}"),
                    })
                    .collect();
                let label = obj
                    .name
                    .as_ref()
                    .map(|n| format!("{n}: "))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "\nObjective: {} {}{}",
                    obj.sense.as_str(),
                    label,
                    terms.join(" + ")
                );
            }
            None => {
                let _ = writeln!(out, "\nObjective: (none)");
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    #[test]
    fn test_insert_replaces_by_name() {
        let mut repo = ModelRepository::new();
        repo.add_parameter(Parameter::scalar_param("n", ValueType::Int, false));
        repo.add_parameter(Parameter::scalar_param("n", ValueType::Float, false));
        assert_eq!(repo.parameter("n").unwrap().vtype, ValueType::Float);
    }

    #[test]
    fn test_lookups_are_case_sensitive() {
        let mut repo = ModelRepository::new();
        repo.add_index_set(IndexSet::new("I", 1, 3).unwrap());
        assert!(repo.index_set("I").is_some());
        assert!(repo.index_set("i").is_none());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut repo = ModelRepository::new();
        repo.add_index_set(IndexSet::new("I", 1, 3).unwrap());
        repo.add_parameter(Parameter::scalar_param("n", ValueType::Int, false));
        repo.clear();
        assert!(repo.index_set("I").is_none());
        assert!(repo.parameter("n").is_none());
    }

    #[test]
    fn test_iterate_index_set() {
        let mut repo = ModelRepository::new();
        repo.add_index_set(IndexSet::new("I", 2, 4).unwrap());
        let bindings = repo.iterate_set("I").unwrap();
        assert_eq!(bindings.len(), 3);
        assert!(matches!(bindings[0], Binding::Num(2)));
        assert!(matches!(bindings[2], Binding::Num(4)));
    }

    #[test]
    fn test_iterate_unknown_set_fails() {
        let repo = ModelRepository::new();
        assert!(repo.iterate_set("nope").is_err());
    }
}
