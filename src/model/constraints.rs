//! Constraints, templates, decision expressions, and the objective.
//!
//! A scalar linear constraint is the canonical `sum(c_j * x_j) OP k` form
//! produced by linearization. Coefficients stay as expression trees so that
//! parameters bound later by a data file resolve when the coefficient is
//! read, not when the constraint is parsed.

use crate::expr::{EvalContext, EvalError, Expr, IteratorSpec};
use crate::model::ModelRepository;
use crate::value::ValueType;

/// Relational operator of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Le,
    Ge,
    Lt,
    Gt,
}

impl RelOp {
    /// Parse a relational operator token. Unicode `≤`/`≥` are accepted as
    /// aliases of `<=`/`>=`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(RelOp::Eq),
            "<=" | "≤" => Some(RelOp::Le),
            ">=" | "≥" => Some(RelOp::Ge),
            "<" => Some(RelOp::Lt),
            ">" => Some(RelOp::Gt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Le => "<=",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Gt => ">",
        }
    }
}

/// Coefficient map plus constant term: the linear skeleton shared by
/// equations and the objective.
#[derive(Debug, Clone)]
pub struct LinearForm {
    /// Canonical variable name -> coefficient tree, insertion order.
    terms: Vec<(String, Expr)>,
    /// The constant `k` on the comparison side.
    pub constant: Expr,
}

impl LinearForm {
    pub fn new() -> Self {
        LinearForm {
            terms: Vec::new(),
            constant: Expr::Number(0.0),
        }
    }

    /// Add a coefficient contribution for a variable, aggregating with any
    /// existing coefficient (so `x + 2*x + 3*x` collapses to one entry).
    pub fn add_term(&mut self, variable: &str, coefficient: Expr) {
        if let Some((_, existing)) = self.terms.iter_mut().find(|(name, _)| name == variable) {
            let combined = Expr::binary_add(existing.clone(), coefficient);
            *existing = combined.simplify();
        } else {
            self.terms.push((variable.to_string(), coefficient.simplify()));
        }
    }

    pub fn terms(&self) -> &[(String, Expr)] {
        &self.terms
    }

    pub fn variables(&self) -> Vec<&str> {
        self.terms.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn coefficient(&self, variable: &str) -> Option<&Expr> {
        self.terms
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, c)| c)
    }

    /// Numeric coefficient, folding the tree against the repository.
    pub fn coefficient_value(
        &self,
        variable: &str,
        repo: &ModelRepository,
    ) -> Result<f64, EvalError> {
        match self.coefficient(variable) {
            Some(expr) => expr.evaluate_numeric(&EvalContext::new(), repo),
            None => Ok(0.0),
        }
    }

    pub fn constant_value(&self, repo: &ModelRepository) -> Result<f64, EvalError> {
        self.constant.evaluate_numeric(&EvalContext::new(), repo)
    }

    /// True when every coefficient folds to zero without repository lookups.
    /// Returns `None` when a coefficient is deferred (not foldable).
    pub fn all_zero(&self) -> Option<bool> {
        let mut all = true;
        for (_, coeff) in &self.terms {
            match coeff.simplify() {
                Expr::Number(v) => {
                    if v != 0.0 {
                        all = false;
                    }
                }
                _ => return None,
            }
        }
        Some(all)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// An expanded scalar linear constraint.
#[derive(Debug, Clone)]
pub struct Equation {
    /// Full label, e.g. `lim[2]`.
    pub label: Option<String>,
    /// Template name before index substitution, for diagnostics and MPS naming.
    pub base_name: Option<String>,
    /// Expanded index values, outer first.
    pub indices: Vec<i64>,
    pub op: RelOp,
    pub form: LinearForm,
}

impl Equation {
    pub fn render(&self, repo: &ModelRepository) -> String {
        let mut out = String::new();
        if let Some(label) = &self.label {
            out.push_str(label);
            out.push_str(": ");
        }
        let mut first = true;
        for (name, coeff) in self.form.terms() {
            let rendered = match coeff.simplify() {
                Expr::Number(v) => format!("{v}"),
                other => match other.evaluate_numeric(&EvalContext::new(), repo) {
                    Ok(v) => format!("{v}"),
                    Err(_) => format!("({other})"),
                },
            };
            if !first {
                out.push_str(" + ");
            }
            out.push_str(&format!("{rendered}*{name}"));
            first = false;
        }
        if first {
            out.push('0');
        }
        let k = match self.form.constant_value(repo) {
            Ok(v) => format!("{v}"),
            Err(_) => format!("({})", self.form.constant),
        };
        out.push_str(&format!(" {} {}", self.op.as_str(), k));
        out
    }
}

/// Objective sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

impl ObjectiveSense {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minimize" => Some(ObjectiveSense::Minimize),
            "maximize" => Some(ObjectiveSense::Maximize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveSense::Minimize => "minimize",
            ObjectiveSense::Maximize => "maximize",
        }
    }
}

/// The model's objective function.
#[derive(Debug, Clone)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub name: Option<String>,
    pub form: LinearForm,
}

/// A named symbolic shorthand for a linear combination, substitutable
/// wherever a variable or numeric expression is allowed.
#[derive(Debug, Clone)]
pub struct DecisionExpression {
    pub name: String,
    pub vtype: ValueType,
    /// Declared iterators for an indexed dexpr, empty for a scalar one.
    pub iterators: Vec<IteratorSpec>,
    pub body: Expr,
}

/// Label of a quantified constraint before expansion, e.g. `lim[i]`.
#[derive(Debug, Clone)]
pub struct LabelTemplate {
    pub base: String,
    /// Iterator variables appearing in the label's brackets.
    pub index_vars: Vec<String>,
}

impl LabelTemplate {
    /// Render the concrete label for one iterator binding, `lim[i]` with
    /// `i = 2` giving `lim[2]`.
    pub fn render(&self, ctx: &EvalContext) -> Result<String, EvalError> {
        if self.index_vars.is_empty() {
            return Ok(self.base.clone());
        }
        let mut parts = Vec::with_capacity(self.index_vars.len());
        for var in &self.index_vars {
            let value = ctx
                .get_int(var)
                .ok_or_else(|| EvalError::UnboundIterator(var.clone()))?;
            parts.push(value.to_string());
        }
        Ok(format!("{}[{}]", self.base, parts.join(",")))
    }
}

/// A parsed `forall` statement held as an expression tree with symbolic
/// iterator leaves, re-walked per binding during expansion.
#[derive(Debug, Clone)]
pub struct ForallStatement {
    pub label: Option<LabelTemplate>,
    pub iterators: Vec<IteratorSpec>,
    pub lhs: Expr,
    pub op: RelOp,
    pub rhs: Expr,
    /// Source line, carried into per-instance diagnostics.
    pub line: usize,
}

/// A bracket-indexed constraint template kept as raw text; expansion
/// substitutes iterator values textually and re-parses each instance.
#[derive(Debug, Clone)]
pub struct IndexedEquationTemplate {
    pub base: String,
    pub iterators: Vec<IteratorSpec>,
    /// The `expr OP expr` body before substitution.
    pub body_text: String,
    pub line: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relop_parse_aliases() {
        assert_eq!(RelOp::parse("<="), Some(RelOp::Le));
        assert_eq!(RelOp::parse("≤"), Some(RelOp::Le));
        assert_eq!(RelOp::parse("≥"), Some(RelOp::Ge));
        assert_eq!(RelOp::parse("="), None);
    }

    #[test]
    fn test_linear_form_aggregates_terms() {
        let mut form = LinearForm::new();
        form.add_term("x", Expr::Number(1.0));
        form.add_term("x", Expr::Number(2.0));
        form.add_term("x", Expr::Number(3.0));
        assert_eq!(form.terms().len(), 1);
        assert!(matches!(form.coefficient("x"), Some(Expr::Number(v)) if *v == 6.0));
    }

    #[test]
    fn test_all_zero_detection() {
        let mut form = LinearForm::new();
        form.add_term("x", Expr::Number(0.0));
        assert_eq!(form.all_zero(), Some(true));
        form.add_term("y", Expr::Number(2.0));
        assert_eq!(form.all_zero(), Some(false));
        form.add_term("z", Expr::Param("a".to_string()));
        assert_eq!(form.all_zero(), None);
    }
}
