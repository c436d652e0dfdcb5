//! Integration tests for template expansion: instance counts, filters,
//! labels, canonical variable names, and template lifecycle.

use optmodel::{Config, ModelSession};

fn compile(model: &str) -> ModelSession {
    let mut session = ModelSession::new(Config::default());
    session.compile(model, None);
    session
}

#[test]
fn test_expansion_count_matches_range_size() {
    let s = compile(
        "range I = 4..9;\n\
         dvar float+ x[I];\n\
         forall(i in I) x[i] <= 100;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    // |4..9| = 6 instances, one per element, absent filters.
    assert_eq!(s.repository.equations().len(), 6);
}

#[test]
fn test_two_dimensional_expansion_is_product() {
    let s = compile(
        "range I = 1..3;\n\
         range J = 1..4;\n\
         dvar float+ f[I,J];\n\
         forall(i in I, j in J) f[i,j] <= 1;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    assert_eq!(s.repository.equations().len(), 12);
}

#[test]
fn test_expanded_variables_are_declared() {
    let s = compile(
        "range I = 1..3;\n\
         dvar float+ x[I];\n\
         forall(i in I) x[i] <= 5;\n\
         total: sum(i in I) x[i] == 10;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    let declared = s
        .repository
        .variable("x")
        .unwrap()
        .expanded_names(&s.repository)
        .unwrap();
    for eq in s.repository.equations() {
        for name in eq.form.variables() {
            assert!(
                declared.iter().any(|d| d == name),
                "undeclared variable '{name}'"
            );
        }
    }
}

#[test]
fn test_templates_cleared_after_expansion() {
    let s = compile(
        "range I = 1..2;\n\
         dvar float+ x[I];\n\
         forall(i in I) x[i] <= 1;\n\
         lim[i in I]: x[i] <= 2;",
    );
    assert!(s.repository.forall_statements().is_empty());
    assert!(s.repository.indexed_equation_templates().is_empty());
}

#[test]
fn test_forall_with_parameter_rhs() {
    let mut session = ModelSession::new(Config::default());
    session.compile(
        "int n = 3;\n\
         range I = 1..n;\n\
         dvar float+ x[I];\n\
         float cap[I] = ...;\n\
         forall(i in I) lim[i]: x[i] <= cap[i];",
        Some("cap = [5, 7, 9];"),
    );
    assert!(!session.has_errors(), "{}", session.diagnostics.render());
    let repo = &session.repository;
    assert_eq!(repo.equations().len(), 3);
    for (idx, (label, var, cap)) in [
        ("lim[1]", "x1", 5.0),
        ("lim[2]", "x2", 7.0),
        ("lim[3]", "x3", 9.0),
    ]
    .iter()
    .enumerate()
    {
        let eq = &repo.equations()[idx];
        assert_eq!(eq.label.as_deref(), Some(*label));
        assert_eq!(eq.form.coefficient_value(var, repo).unwrap(), 1.0);
        assert_eq!(eq.form.constant_value(repo).unwrap(), *cap);
        assert_eq!(eq.base_name.as_deref(), Some("lim"));
    }
}

#[test]
fn test_nested_forall_iterator_order() {
    let s = compile(
        "range I = 1..2;\n\
         range J = 1..2;\n\
         dvar float+ f[I,J];\n\
         forall(i in I, j in J) c[i,j]: f[i,j] <= 1;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    // Outer iterator varies slowest.
    let labels: Vec<_> = s
        .repository
        .equations()
        .iter()
        .map(|e| e.label.clone().unwrap())
        .collect();
    assert_eq!(labels, vec!["c[1,1]", "c[1,2]", "c[2,1]", "c[2,2]"]);
    assert_eq!(s.repository.equations()[1].indices, vec![1, 2]);
}

#[test]
fn test_filters_prune_instances() {
    let s = compile(
        "range I = 1..4;\n\
         dvar float+ x[I];\n\
         forall(i in I : i != 2) x[i] <= 1;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    assert_eq!(s.repository.equations().len(), 3);
}

#[test]
fn test_dexpr_substitution_in_constraint() {
    let s = compile(
        "dvar float+ x;\n\
         dvar float+ y;\n\
         dexpr float profit = 3*x + 5*y;\n\
         cap: profit <= 100;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    let eq = &s.repository.equations()[0];
    assert_eq!(eq.form.coefficient_value("x", &s.repository).unwrap(), 3.0);
    assert_eq!(eq.form.coefficient_value("y", &s.repository).unwrap(), 5.0);
    assert_eq!(eq.form.constant_value(&s.repository).unwrap(), 100.0);
}

#[test]
fn test_indexed_dexpr_in_forall() {
    let s = compile(
        "range I = 1..3;\n\
         dvar float+ x[I];\n\
         dexpr float load[i in I] = 2*x[i];\n\
         forall(i in I) cap[i]: load[i] <= 10;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    assert_eq!(s.repository.equations().len(), 3);
    assert_eq!(
        s.repository.equations()[1]
            .form
            .coefficient_value("x2", &s.repository)
            .unwrap(),
        2.0
    );
}

#[test]
fn test_summation_inside_forall() {
    let s = compile(
        "range I = 1..2;\n\
         range J = 1..3;\n\
         dvar float+ f[I,J];\n\
         forall(i in I) rowcap[i]: sum(j in J) f[i,j] <= 10;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    assert_eq!(s.repository.equations().len(), 2);
    let eq = &s.repository.equations()[0];
    assert_eq!(eq.form.terms().len(), 3);
    assert_eq!(eq.form.coefficient_value("f1_3", &s.repository).unwrap(), 1.0);
}

#[test]
fn test_expansion_errors_accumulate_per_instance() {
    let mut session = ModelSession::new(Config::default());
    session.compile(
        "range I = 1..3;\n\
         dvar float+ x[I];\n\
         float cap[I] = ...;\n\
         forall(i in I) x[i] <= cap[i];",
        Some("cap[2] = 7;"),
    );
    assert!(session.has_errors());
    // Two missing slots fail individually, one instance lands.
    assert_eq!(session.repository.equations().len(), 1);
}
