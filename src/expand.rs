//! # Expansion Engine
//!
//! Materializes quantified constraint templates into scalar linear
//! constraints after data binding. Two phases:
//!
//! 1. **Indexed equation templates** (bracket notation): iterator values
//!    are substituted into the template text, and each instance is parsed
//!    as a scalar constraint.
//! 2. **`forall` statements**: the parsed tree is re-linearized under each
//!    iterator binding, outer iterator varying slowest; per-iterator
//!    filters prune subtrees.
//!
//! Per-instance errors accumulate without halting; the template lists are
//! cleared afterwards, so a re-expansion requires re-parsing.

use crate::config::LimitsConfig;
use crate::diagnostics::Diagnostics;
use crate::expr::{Binding, EvalContext};
use crate::model::{
    Equation, ForallStatement, IndexedEquationTemplate, ModelRepository, RelOp,
};
use crate::parser::expression::parse_expression;
use crate::parser::linearize::linearize_constraint;
use crate::parser::preprocess::{
    distribute_parentheses, expand_summations, substitute_iterator,
};
use crate::parser::split_relational;

/// Run both expansion phases and clear the template lists.
pub fn expand_all(repo: &mut ModelRepository, diags: &mut Diagnostics, limits: &LimitsConfig) {
    let templates = repo.take_indexed_equation_templates();
    let template_count = templates.len();
    for template in templates {
        expand_indexed_template(&template, repo, diags, limits);
    }

    let foralls = repo.take_forall_statements();
    let forall_count = foralls.len();
    for forall in foralls {
        expand_forall(&forall, repo, diags);
    }

    repo.clear_indexed_equation_templates();
    repo.clear_forall_statements();
    tracing::debug!(
        indexed_templates = template_count,
        forall_statements = forall_count,
        equations = repo.equations().len(),
        "expansion finished"
    );
}

// ============================================================================
// Phase 1: text-substitution templates
// ============================================================================

fn expand_indexed_template(
    template: &IndexedEquationTemplate,
    repo: &mut ModelRepository,
    diags: &mut Diagnostics,
    limits: &LimitsConfig,
) {
    let mut bindings = Vec::new();
    walk_template(template, repo, diags, limits, &EvalContext::new(), 0, &mut bindings);
}

fn walk_template(
    template: &IndexedEquationTemplate,
    repo: &mut ModelRepository,
    diags: &mut Diagnostics,
    limits: &LimitsConfig,
    ctx: &EvalContext,
    depth: usize,
    bindings: &mut Vec<Binding>,
) {
    if depth == template.iterators.len() {
        if let Err(e) = materialize_template_instance(template, repo, limits, bindings) {
            diags.error(template.line, e, template.body_text.clone());
        }
        return;
    }
    let spec = &template.iterators[depth];
    let elements = match repo.iterate_set(&spec.set) {
        Ok(elements) => elements,
        Err(e) => {
            diags.error(template.line, e.to_string(), template.body_text.clone());
            return;
        }
    };
    for binding in elements {
        if matches!(binding, Binding::Tuple(_)) {
            diags.error(
                template.line,
                format!(
                    "indexed template '{}' cannot iterate tuple set '{}'",
                    template.base, spec.set
                ),
                template.body_text.clone(),
            );
            return;
        }
        let inner = ctx.bind(&spec.var, binding.clone());
        if let Some(filter) = &spec.filter {
            match filter.evaluate(&inner, repo) {
                Ok(v) if !v.is_truthy() => continue,
                Ok(_) => {}
                Err(e) => {
                    diags.error(template.line, e.to_string(), template.body_text.clone());
                    continue;
                }
            }
        }
        bindings.push(binding);
        walk_template(template, repo, diags, limits, &inner, depth + 1, bindings);
        bindings.pop();
    }
}

fn materialize_template_instance(
    template: &IndexedEquationTemplate,
    repo: &mut ModelRepository,
    limits: &LimitsConfig,
    bindings: &[Binding],
) -> Result<(), String> {
    let mut text = template.body_text.clone();
    for (spec, binding) in template.iterators.iter().zip(bindings) {
        text = substitute_iterator(&text, &spec.var, binding, repo);
    }

    let expanded = expand_summations(&text, repo, limits.max_sum_nesting)?;
    let distributed = distribute_parentheses(&expanded);
    let (lhs_text, op_token, rhs_text) = split_relational(&distributed)?
        .ok_or_else(|| "template instance has no relational operator".to_string())?;
    let op = RelOp::parse(&op_token)
        .ok_or_else(|| format!("unsupported operator '{op_token}'"))?;
    let lhs = parse_expression(&lhs_text, repo, &[])?;
    let rhs = parse_expression(&rhs_text, repo, &[])?;
    let form = linearize_constraint(&lhs, &rhs, &EvalContext::new(), repo)?;
    validate_resolvable(&form, repo)?;

    let rendered: Vec<String> = bindings
        .iter()
        .map(|b| match b {
            Binding::Num(v) => v.to_string(),
            Binding::Str(s) => s.clone(),
            Binding::Tuple(_) => String::new(),
        })
        .collect();
    let indices: Vec<i64> = bindings
        .iter()
        .filter_map(|b| match b {
            Binding::Num(v) => Some(*v),
            _ => None,
        })
        .collect();
    repo.add_equation(Equation {
        label: Some(format!("{}[{}]", template.base, rendered.join(","))),
        base_name: Some(template.base.clone()),
        indices,
        op,
        form,
    });
    Ok(())
}

/// Expansion runs after binding, so every coefficient and the constant must
/// fold to a number; a slot still missing data is a per-instance error.
fn validate_resolvable(
    form: &crate::model::LinearForm,
    repo: &ModelRepository,
) -> Result<(), String> {
    for (name, _) in form.terms() {
        form.coefficient_value(name, repo).map_err(|e| e.to_string())?;
    }
    form.constant_value(repo).map_err(|e| e.to_string())?;
    Ok(())
}

// ============================================================================
// Phase 2: forall statements
// ============================================================================

fn expand_forall(forall: &ForallStatement, repo: &mut ModelRepository, diags: &mut Diagnostics) {
    let mut values = Vec::new();
    walk_forall(forall, repo, diags, &EvalContext::new(), 0, &mut values);
}

fn walk_forall(
    forall: &ForallStatement,
    repo: &mut ModelRepository,
    diags: &mut Diagnostics,
    ctx: &EvalContext,
    depth: usize,
    values: &mut Vec<i64>,
) {
    if depth == forall.iterators.len() {
        if let Err(e) = materialize_forall_instance(forall, repo, ctx, values) {
            diags.error(forall.line, e, String::new());
        }
        return;
    }
    let spec = &forall.iterators[depth];
    let elements = match repo.iterate_set(&spec.set) {
        Ok(elements) => elements,
        Err(e) => {
            diags.error(forall.line, e.to_string(), String::new());
            return;
        }
    };
    for binding in elements {
        let value = match &binding {
            Binding::Num(v) => Some(*v),
            _ => None,
        };
        let inner = ctx.bind(&spec.var, binding);
        if let Some(filter) = &spec.filter {
            match filter.evaluate(&inner, repo) {
                Ok(v) if !v.is_truthy() => continue,
                Ok(_) => {}
                Err(e) => {
                    diags.error(forall.line, e.to_string(), String::new());
                    continue;
                }
            }
        }
        if let Some(v) = value {
            values.push(v);
        }
        walk_forall(forall, repo, diags, &inner, depth + 1, values);
        if value.is_some() {
            values.pop();
        }
    }
}

fn materialize_forall_instance(
    forall: &ForallStatement,
    repo: &mut ModelRepository,
    ctx: &EvalContext,
    values: &[i64],
) -> Result<(), String> {
    let form = linearize_constraint(&forall.lhs, &forall.rhs, ctx, repo)?;
    validate_resolvable(&form, repo)?;
    let label = match &forall.label {
        Some(template) => Some(template.render(ctx).map_err(|e| e.to_string())?),
        None => None,
    };
    repo.add_equation(Equation {
        label,
        base_name: forall.label.as_ref().map(|t| t.base.clone()),
        indices: values.to_vec(),
        op: forall.op,
        form,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::dispatch_statement;

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    fn dispatch(text: &str, repo: &mut ModelRepository) {
        let outcome = dispatch_statement(text, 1, repo, &limits());
        assert_eq!(outcome, crate::parser::Recognition::Accepted, "statement: {text}");
    }

    #[test]
    fn test_forall_expansion_counts() {
        let mut repo = ModelRepository::new();
        let mut diags = Diagnostics::new();
        dispatch("range I = 1..3", &mut repo);
        dispatch("dvar float+ x[I]", &mut repo);
        dispatch("float cap[I] = [5, 7, 9]", &mut repo);
        dispatch("forall(i in I) lim[i]: x[i] <= cap[i]", &mut repo);

        expand_all(&mut repo, &mut diags, &limits());
        assert!(!diags.has_errors(), "{}", diags.render());
        assert_eq!(repo.equations().len(), 3);
        let labels: Vec<_> = repo
            .equations()
            .iter()
            .map(|e| e.label.clone().unwrap())
            .collect();
        assert_eq!(labels, vec!["lim[1]", "lim[2]", "lim[3]"]);
        assert_eq!(
            repo.equations()[1].form.coefficient_value("x2", &repo).unwrap(),
            1.0
        );
        assert_eq!(repo.equations()[1].form.constant_value(&repo).unwrap(), 7.0);
    }

    #[test]
    fn test_templates_cleared_after_expansion() {
        let mut repo = ModelRepository::new();
        let mut diags = Diagnostics::new();
        dispatch("range I = 1..2", &mut repo);
        dispatch("dvar float+ x[I]", &mut repo);
        dispatch("forall(i in I) x[i] <= 1", &mut repo);
        dispatch("lim[i in I]: x[i] <= 2", &mut repo);

        expand_all(&mut repo, &mut diags, &limits());
        assert!(repo.forall_statements().is_empty());
        assert!(repo.indexed_equation_templates().is_empty());
        // Re-expansion adds nothing.
        let count = repo.equations().len();
        expand_all(&mut repo, &mut diags, &limits());
        assert_eq!(repo.equations().len(), count);
    }

    #[test]
    fn test_two_dimensional_filtered_forall() {
        let mut repo = ModelRepository::new();
        let mut diags = Diagnostics::new();
        dispatch("range I = 1..2", &mut repo);
        dispatch("range J = 1..2", &mut repo);
        dispatch("dvar float+ f[I,J]", &mut repo);
        dispatch("forall(i in I, j in J : i != j) c[i,j]: f[i,j] <= 1", &mut repo);

        expand_all(&mut repo, &mut diags, &limits());
        assert!(!diags.has_errors(), "{}", diags.render());
        assert_eq!(repo.equations().len(), 2);
        let labels: Vec<_> = repo
            .equations()
            .iter()
            .map(|e| e.label.clone().unwrap())
            .collect();
        assert_eq!(labels, vec!["c[1,2]", "c[2,1]"]);
        assert_eq!(
            repo.equations()[0].form.coefficient_value("f1_2", &repo).unwrap(),
            1.0
        );
    }

    #[test]
    fn test_indexed_template_expansion() {
        let mut repo = ModelRepository::new();
        let mut diags = Diagnostics::new();
        dispatch("range I = 1..3", &mut repo);
        dispatch("dvar float+ x[I]", &mut repo);
        dispatch("float cap[I] = [5, 7, 9]", &mut repo);
        dispatch("lim[i in I]: x[i] <= cap[i]", &mut repo);

        expand_all(&mut repo, &mut diags, &limits());
        assert!(!diags.has_errors(), "{}", diags.render());
        assert_eq!(repo.equations().len(), 3);
        assert_eq!(repo.equations()[0].label.as_deref(), Some("lim[1]"));
        assert_eq!(repo.equations()[2].form.constant_value(&repo).unwrap(), 9.0);
    }

    #[test]
    fn test_per_instance_errors_do_not_halt() {
        let mut repo = ModelRepository::new();
        let mut diags = Diagnostics::new();
        dispatch("range I = 1..3", &mut repo);
        dispatch("dvar float+ x[I]", &mut repo);
        // cap bound for only one index; other instances fail individually.
        dispatch("float cap[I] = ...", &mut repo);
        crate::data::bind_data_statement("cap[2] = 7", &mut repo).unwrap();
        dispatch("forall(i in I) x[i] <= cap[i]", &mut repo);

        expand_all(&mut repo, &mut diags, &limits());
        assert_eq!(repo.equations().len(), 1);
        assert_eq!(diags.errors().len(), 2);
    }

    #[test]
    fn test_deferred_scalar_expands_after_binding() {
        let mut repo = ModelRepository::new();
        let mut diags = Diagnostics::new();
        dispatch("range I = 1..9", &mut repo);
        dispatch("dvar float+ x[I]", &mut repo);
        dispatch("{int} S = ...", &mut repo);
        dispatch("total: sum(s in S) x[s] <= 10", &mut repo);
        crate::data::bind_data_statement("S = {1, 3, 5}", &mut repo).unwrap();

        expand_all(&mut repo, &mut diags, &limits());
        assert!(!diags.has_errors(), "{}", diags.render());
        assert_eq!(repo.equations().len(), 1);
        let eq = &repo.equations()[0];
        assert_eq!(eq.form.terms().len(), 3);
        assert_eq!(eq.form.coefficient_value("x3", &repo).unwrap(), 1.0);
    }
}
