//! Constraint recognizers: `forall` statements, bracket-indexed templates,
//! scalar linear constraints, and the objective.

use crate::config::LimitsConfig;
use crate::expr::{EvalContext, Expr};
use crate::model::{
    Equation, ForallStatement, IndexedEquationTemplate, LabelTemplate, ModelRepository, Objective,
    ObjectiveSense, RelOp,
};
use crate::parser::expression::{parse_expression, parse_iterator_specs};
use crate::parser::linearize::{linearize_constraint, linearize_expression};
use crate::parser::preprocess::{distribute_parentheses, expand_summations};
use crate::parser::{split_relational, Recognition};
use regex::Regex;

/// `forall(iters) [label:] expr OP expr;` or `label[iters]: expr OP expr;`
pub fn recognize_template(
    text: &str,
    line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    if text.starts_with("forall") {
        return recognize_forall(text, line, repo);
    }
    recognize_bracket_template(text, line, repo)
}

fn recognize_forall(text: &str, line: usize, repo: &mut ModelRepository) -> Recognition {
    let chars: Vec<char> = text.chars().collect();
    let Some(open) = chars.iter().position(|&c| c == '(') else {
        return Recognition::Rejected("forall requires an iterator list in parentheses".to_string());
    };
    let Some(close) = matching_paren(&chars, open) else {
        return Recognition::Rejected("unbalanced parentheses in forall".to_string());
    };
    let header: String = chars[open + 1..close].iter().collect();
    let iterators = match parse_iterator_specs(&header, repo, &[]) {
        Ok(specs) => specs,
        Err(e) => return Recognition::Rejected(e),
    };
    let scope: Vec<String> = iterators.iter().map(|s| s.var.clone()).collect();

    let remainder: String = chars[close + 1..].iter().collect();
    let remainder = remainder.trim();

    // Optional `label:` or `label[i,j]:` prefix before the constraint body.
    let label_re =
        Regex::new(r"^([A-Za-z][A-Za-z0-9_]*)\s*(?:\[([^\[\]]*)\])?\s*:\s*(.+)$").expect("valid regex");
    let (label, body) = match label_re.captures(remainder) {
        Some(caps) => {
            let base = caps[1].to_string();
            let index_vars: Vec<String> = match caps.get(2) {
                Some(group) => group
                    .as_str()
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => Vec::new(),
            };
            for var in &index_vars {
                if !scope.contains(var) {
                    return Recognition::Rejected(format!(
                        "label index '{var}' is not an iterator of this forall"
                    ));
                }
            }
            (
                Some(LabelTemplate { base, index_vars }),
                caps[3].to_string(),
            )
        }
        None => (None, remainder.to_string()),
    };

    let (lhs_text, op_token, rhs_text) = match split_relational(&body) {
        Ok(Some(parts)) => parts,
        Ok(None) => {
            return Recognition::Rejected(
                "forall body must be a constraint with a relational operator".to_string(),
            )
        }
        Err(e) => return Recognition::Rejected(e),
    };
    let Some(op) = RelOp::parse(&op_token) else {
        return Recognition::Rejected(format!("unsupported operator '{op_token}'"));
    };
    let lhs = match parse_expression(&lhs_text, repo, &scope) {
        Ok(e) => e,
        Err(e) => return Recognition::Rejected(e),
    };
    let rhs = match parse_expression(&rhs_text, repo, &scope) {
        Ok(e) => e,
        Err(e) => return Recognition::Rejected(e),
    };
    repo.add_forall_statement(ForallStatement {
        label,
        iterators,
        lhs,
        op,
        rhs,
        line,
    });
    Recognition::Accepted
}

fn recognize_bracket_template(
    text: &str,
    line: usize,
    repo: &mut ModelRepository,
) -> Recognition {
    let re = Regex::new(r"^([A-Za-z][A-Za-z0-9_]*)\s*\[([^\[\]]+)\]\s*:\s*(.+)$")
        .expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::NotMine;
    };
    let header = caps[2].trim().to_string();
    // `c[i in I]: ...` declares iterators; `c[1]: ...` does not and is not a
    // template.
    let in_re = Regex::new(r"\bin\b").expect("valid regex");
    if !in_re.is_match(&header) {
        return Recognition::NotMine;
    }
    let iterators = match parse_iterator_specs(&header, repo, &[]) {
        Ok(specs) => specs,
        Err(e) => return Recognition::Rejected(e),
    };
    repo.add_indexed_equation_template(IndexedEquationTemplate {
        base: caps[1].to_string(),
        iterators,
        body_text: caps[3].trim().to_string(),
        line,
    });
    Recognition::Accepted
}

/// Anything with a top-level relational operator: a scalar linear
/// constraint, possibly labeled.
pub fn recognize_scalar_constraint(
    text: &str,
    line: usize,
    repo: &mut ModelRepository,
    limits: &LimitsConfig,
) -> Recognition {
    let (label, body) = strip_label(text);

    let (lhs_text, op_token, rhs_text) = match split_relational(&body) {
        Ok(Some(parts)) => parts,
        Ok(None) => return Recognition::NotMine,
        Err(e) => return Recognition::Rejected(e),
    };
    let Some(op) = RelOp::parse(&op_token) else {
        return Recognition::Rejected(format!("unsupported operator '{op_token}'"));
    };

    // Structural parse first: it decides whether the statement can be
    // materialized now or must wait for external data.
    let lhs = match parse_expression(&lhs_text, repo, &[]) {
        Ok(e) => e,
        Err(e) => return Recognition::Rejected(e),
    };
    let rhs = match parse_expression(&rhs_text, repo, &[]) {
        Ok(e) => e,
        Err(e) => return Recognition::Rejected(e),
    };

    if needs_deferral(&lhs, repo) || needs_deferral(&rhs, repo) {
        return defer_scalar(label, lhs, op, rhs, line, repo);
    }

    // Textual pipeline: summation expansion, then distribution, then
    // linearization of the rewritten sides.
    match materialize_scalar(&label, &body, repo, limits) {
        Ok(equation) => {
            repo.add_equation(equation);
            Recognition::Accepted
        }
        Err(e) => {
            // An unbound external parameter in a structural position means
            // the statement is fine and the data has not arrived yet.
            if references_unbound_external(&lhs, repo) || references_unbound_external(&rhs, repo)
            {
                return defer_scalar(label, lhs, op, rhs, line, repo);
            }
            Recognition::Rejected(e)
        }
    }
}

fn defer_scalar(
    label: Option<String>,
    lhs: Expr,
    op: RelOp,
    rhs: Expr,
    line: usize,
    repo: &mut ModelRepository,
) -> Recognition {
    repo.add_forall_statement(ForallStatement {
        label: label.map(|base| LabelTemplate {
            base,
            index_vars: Vec::new(),
        }),
        iterators: Vec::new(),
        lhs,
        op,
        rhs,
        line,
    });
    Recognition::Accepted
}

fn materialize_scalar(
    label: &Option<String>,
    body: &str,
    repo: &ModelRepository,
    limits: &LimitsConfig,
) -> Result<Equation, String> {
    let expanded = expand_summations(body, repo, limits.max_sum_nesting)?;
    let distributed = distribute_parentheses(&expanded);
    let (lhs_text, op_token, rhs_text) = split_relational(&distributed)?
        .ok_or_else(|| "constraint lost its relational operator".to_string())?;
    let op = RelOp::parse(&op_token)
        .ok_or_else(|| format!("unsupported operator '{op_token}'"))?;
    let lhs = parse_expression(&lhs_text, repo, &[])?;
    let rhs = parse_expression(&rhs_text, repo, &[])?;
    let form = linearize_constraint(&lhs, &rhs, &EvalContext::new(), repo)?;
    Ok(Equation {
        label: label.clone(),
        base_name: label.clone(),
        indices: Vec::new(),
        op,
        form,
    })
}

/// `minimize expr;` / `maximize expr;` with an optional `name:` label.
pub fn recognize_objective(
    text: &str,
    _line: usize,
    repo: &mut ModelRepository,
    _limits: &LimitsConfig,
) -> Recognition {
    let re = Regex::new(r"^(minimize|maximize)\s+(.+)$").expect("valid regex");
    let Some(caps) = re.captures(text) else {
        return Recognition::NotMine;
    };
    let sense = ObjectiveSense::parse(&caps[1]).expect("matched sense keyword");
    let (name, body) = strip_label(caps[2].trim());

    let expr = match parse_expression(&body, repo, &[]) {
        Ok(e) => e,
        Err(e) => return Recognition::Rejected(e),
    };
    let form = match linearize_expression(&expr, &EvalContext::new(), repo) {
        Ok(f) => f,
        Err(e) => return Recognition::Rejected(e),
    };
    repo.set_objective(Objective { sense, name, form });
    Recognition::Accepted
}

/// Split an optional `label:` prefix off a statement body. The colon of a
/// ternary never matches because the label must be a lone identifier.
fn strip_label(text: &str) -> (Option<String>, String) {
    let re = Regex::new(r"^([A-Za-z][A-Za-z0-9_]*)\s*:\s*(.+)$").expect("valid regex");
    match re.captures(text) {
        Some(caps) => (Some(caps[1].to_string()), caps[2].to_string()),
        None => (None, text.to_string()),
    }
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        if c == '"' {
            in_string = !in_string;
        } else if !in_string {
            if c == '(' {
                depth += 1;
            } else if c == ')' {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
    }
    None
}

/// A sum over an external set that is still empty cannot be expanded yet;
/// the constraint is stored as a template and materialized after binding.
fn needs_deferral(expr: &Expr, repo: &ModelRepository) -> bool {
    match expr {
        Expr::Sum { iterators, body } => {
            for spec in iterators {
                if let Some(set) = repo.primitive_set(&spec.set) {
                    if set.external && set.is_empty() {
                        return true;
                    }
                }
                if let Some(set) = repo.tuple_set(&spec.set) {
                    if set.external && set.is_empty() {
                        return true;
                    }
                }
            }
            needs_deferral(body, repo)
        }
        Expr::Binary { left, right, .. } => {
            needs_deferral(left, repo) || needs_deferral(right, repo)
        }
        Expr::Unary { operand, .. } => needs_deferral(operand, repo),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            needs_deferral(cond, repo)
                || needs_deferral(then_expr, repo)
                || needs_deferral(else_expr, repo)
        }
        _ => false,
    }
}

fn references_unbound_external(expr: &Expr, repo: &ModelRepository) -> bool {
    let unbound = |name: &str| {
        repo.parameter(name)
            .map_or(false, |p| p.external && !p.is_bound())
    };
    match expr {
        Expr::Param(name) => unbound(name),
        Expr::IndexedParam { name, indices } => {
            unbound(name) || indices.iter().any(|e| references_unbound_external(e, repo))
        }
        Expr::Binary { left, right, .. } => {
            references_unbound_external(left, repo) || references_unbound_external(right, repo)
        }
        Expr::Unary { operand, .. } => references_unbound_external(operand, repo),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            references_unbound_external(cond, repo)
                || references_unbound_external(then_expr, repo)
                || references_unbound_external(else_expr, repo)
        }
        Expr::Sum { iterators, body } => {
            iterators
                .iter()
                .any(|s| s.filter.as_ref().map_or(false, |f| references_unbound_external(f, repo)))
                || references_unbound_external(body, repo)
        }
        Expr::IndexedVar { indices, .. } => {
            indices.iter().any(|e| references_unbound_external(e, repo))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::dispatch_statement;

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    fn dispatch(text: &str, repo: &mut ModelRepository) -> Recognition {
        dispatch_statement(text, 1, repo, &limits())
    }

    fn setup() -> ModelRepository {
        let mut repo = ModelRepository::new();
        dispatch("range I = 1..3", &mut repo);
        dispatch("dvar float+ x[I]", &mut repo);
        dispatch("dvar float+ y", &mut repo);
        dispatch("float cap[I] = [5, 7, 9]", &mut repo);
        repo
    }

    #[test]
    fn test_scalar_constraint_with_label() {
        let mut repo = setup();
        assert_eq!(dispatch("c1: y + x[1] <= 10", &mut repo), Recognition::Accepted);
        let eq = &repo.equations()[0];
        assert_eq!(eq.label.as_deref(), Some("c1"));
        assert_eq!(eq.op, RelOp::Le);
        assert_eq!(eq.form.coefficient_value("y", &repo).unwrap(), 1.0);
        assert_eq!(eq.form.constant_value(&repo).unwrap(), 10.0);
    }

    #[test]
    fn test_scalar_constraint_with_summation() {
        let mut repo = setup();
        assert_eq!(
            dispatch("total: sum(i in I) x[i] == 10", &mut repo),
            Recognition::Accepted
        );
        let eq = &repo.equations()[0];
        assert_eq!(eq.form.terms().len(), 3);
        assert_eq!(eq.form.coefficient_value("x2", &repo).unwrap(), 1.0);
        assert_eq!(eq.form.constant_value(&repo).unwrap(), 10.0);
    }

    #[test]
    fn test_forall_stored_as_template() {
        let mut repo = setup();
        assert_eq!(
            dispatch("forall(i in I) lim[i]: x[i] <= cap[i]", &mut repo),
            Recognition::Accepted
        );
        assert_eq!(repo.forall_statements().len(), 1);
        let f = &repo.forall_statements()[0];
        assert_eq!(f.iterators.len(), 1);
        assert_eq!(f.label.as_ref().unwrap().base, "lim");
    }

    #[test]
    fn test_forall_label_must_use_iterators() {
        let mut repo = setup();
        let outcome = dispatch("forall(i in I) lim[z]: x[i] <= 1", &mut repo);
        assert!(matches!(outcome, Recognition::Rejected(ref m) if m.contains("label index")));
    }

    #[test]
    fn test_bracket_template_stored() {
        let mut repo = setup();
        assert_eq!(
            dispatch("lim[i in I]: x[i] <= cap[i]", &mut repo),
            Recognition::Accepted
        );
        assert_eq!(repo.indexed_equation_templates().len(), 1);
        assert_eq!(repo.indexed_equation_templates()[0].base, "lim");
    }

    #[test]
    fn test_objective_round_trip() {
        let mut repo = setup();
        assert_eq!(
            dispatch("minimize c: y + 2*x[1]", &mut repo),
            Recognition::Accepted
        );
        let obj = repo.objective().unwrap();
        assert_eq!(obj.sense, ObjectiveSense::Minimize);
        assert_eq!(obj.name.as_deref(), Some("c"));
        assert_eq!(obj.form.coefficient_value("y", &repo).unwrap(), 1.0);
        assert_eq!(obj.form.coefficient_value("x1", &repo).unwrap(), 2.0);
        assert_eq!(obj.form.constant_value(&repo).unwrap(), 0.0);
    }

    #[test]
    fn test_objective_implicit_multiplication_rejected() {
        let mut repo = setup();
        let outcome = dispatch("minimize x y", &mut repo);
        assert!(
            matches!(outcome, Recognition::Rejected(ref m) if m.contains("consecutive identifiers"))
        );
        assert!(repo.objective().is_none());
    }

    #[test]
    fn test_assignment_operator_rejected() {
        let mut repo = setup();
        let outcome = dispatch("c1: y = 10", &mut repo);
        assert!(matches!(outcome, Recognition::Rejected(ref m) if m.contains("assignment")));
    }

    #[test]
    fn test_scalar_constraint_deferred_on_external_set() {
        let mut repo = setup();
        dispatch("{int} S = ...", &mut repo);
        assert_eq!(
            dispatch("total: sum(s in S) x[s] <= 10", &mut repo),
            Recognition::Accepted
        );
        // Stored as a zero-iterator template, not an equation.
        assert!(repo.equations().is_empty());
        assert_eq!(repo.forall_statements().len(), 1);
        assert!(repo.forall_statements()[0].iterators.is_empty());
    }

    #[test]
    fn test_tautology_rejected() {
        let mut repo = setup();
        let outcome = dispatch("c: y - y == 0", &mut repo);
        assert!(matches!(outcome, Recognition::Rejected(ref m) if m.contains("tautology")));
    }
}
