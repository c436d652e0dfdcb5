//! Decision variables and canonical scalar naming.

use crate::expr::Expr;
use crate::model::ModelRepository;
use crate::value::ValueType;

/// Shape of a decision variable: scalar, or indexed over one or two sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarShape {
    Scalar,
    OneDim(String),
    TwoDim(String, String),
}

/// A declared decision variable. Its expansion is the finite family of
/// scalar variables named by `canonical_name`.
#[derive(Debug, Clone)]
pub struct DecisionVariable {
    pub name: String,
    /// Value type the solver assigns: float, int, or bool.
    pub vtype: ValueType,
    pub shape: VarShape,
    /// Optional bounds: constants or references to numeric parameters.
    pub lower: Option<Expr>,
    pub upper: Option<Expr>,
}

impl DecisionVariable {
    pub fn dimensions(&self) -> usize {
        match self.shape {
            VarShape::Scalar => 0,
            VarShape::OneDim(_) => 1,
            VarShape::TwoDim(_, _) => 2,
        }
    }

    /// All scalar variable names this declaration expands to, in index order.
    pub fn expanded_names(&self, repo: &ModelRepository) -> Result<Vec<String>, String> {
        match &self.shape {
            VarShape::Scalar => Ok(vec![self.name.clone()]),
            VarShape::OneDim(set) => {
                let index = repo
                    .index_set(set)
                    .ok_or_else(|| format!("unknown index set '{set}'"))?;
                Ok(index
                    .elements()
                    .map(|i| canonical_name(&self.name, &[i]))
                    .collect())
            }
            VarShape::TwoDim(first, second) => {
                let outer = repo
                    .index_set(first)
                    .ok_or_else(|| format!("unknown index set '{first}'"))?;
                let inner = repo
                    .index_set(second)
                    .ok_or_else(|| format!("unknown index set '{second}'"))?;
                let mut names = Vec::with_capacity(outer.len() * inner.len());
                for i in outer.elements() {
                    for j in inner.elements() {
                        names.push(canonical_name(&self.name, &[i, j]));
                    }
                }
                Ok(names)
            }
        }
    }
}

/// Canonical scalar variable name after index substitution:
/// `x[3]` becomes `x3`, `x[3,5]` becomes `x3_5`. This is the name seen by
/// coefficient maps and MPS output.
pub fn canonical_name(base: &str, indices: &[i64]) -> String {
    if indices.is_empty() {
        return base.to_string();
    }
    let parts: Vec<String> = indices.iter().map(ToString::to_string).collect();
    format!("{}{}", base, parts.join("_"))
}
