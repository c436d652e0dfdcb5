//! End-to-end scenarios: complete models through parse, bind, and expand,
//! plus the CLI driver surface.

use optmodel::model::{ObjectiveSense, RelOp};
use optmodel::{Config, ModelSession};
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn compile(model: &str) -> ModelSession {
    let mut session = ModelSession::new(Config::default());
    session.compile(model, None);
    session
}

#[test]
fn test_scalar_lp() {
    let s = compile(
        "dvar float+ x; dvar float+ y;\n\
         maximize 3*x + 5*y;\n\
         c1: x + y <= 10;\n\
         c2: 2*x + y <= 15;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    let repo = &s.repository;

    let obj = repo.objective().unwrap();
    assert_eq!(obj.sense, ObjectiveSense::Maximize);
    assert_eq!(obj.form.coefficient_value("x", repo).unwrap(), 3.0);
    assert_eq!(obj.form.coefficient_value("y", repo).unwrap(), 5.0);

    assert_eq!(repo.equations().len(), 2);
    let c1 = &repo.equations()[0];
    assert_eq!(c1.label.as_deref(), Some("c1"));
    assert_eq!(c1.op, RelOp::Le);
    assert_eq!(c1.form.coefficient_value("x", repo).unwrap(), 1.0);
    assert_eq!(c1.form.coefficient_value("y", repo).unwrap(), 1.0);
    assert_eq!(c1.form.constant_value(repo).unwrap(), 10.0);

    let c2 = &repo.equations()[1];
    assert_eq!(c2.label.as_deref(), Some("c2"));
    assert_eq!(c2.form.coefficient_value("x", repo).unwrap(), 2.0);
    assert_eq!(c2.form.constant_value(repo).unwrap(), 15.0);
}

#[test]
fn test_one_dimensional_forall() {
    let s = compile(
        "int n = 3;\n\
         range I = 1..n;\n\
         dvar float+ x[I];\n\
         float cap[I] = [5, 7, 9];\n\
         forall(i in I) lim[i]: x[i] <= cap[i];",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    let repo = &s.repository;
    assert_eq!(repo.equations().len(), 3);
    for (i, (var, cap)) in [("x1", 5.0), ("x2", 7.0), ("x3", 9.0)].iter().enumerate() {
        let eq = &repo.equations()[i];
        assert_eq!(eq.label.as_deref(), Some(format!("lim[{}]", i + 1).as_str()));
        assert_eq!(eq.op, RelOp::Le);
        assert_eq!(eq.form.coefficient_value(var, repo).unwrap(), 1.0);
        assert_eq!(eq.form.constant_value(repo).unwrap(), *cap);
    }
}

#[test]
fn test_summation_constraint() {
    let s = compile(
        "range I = 1..3;\n\
         dvar float+ x[I];\n\
         total: sum(i in I) x[i] == 10;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    let repo = &s.repository;
    assert_eq!(repo.equations().len(), 1);
    let eq = &repo.equations()[0];
    assert_eq!(eq.op, RelOp::Eq);
    assert_eq!(eq.form.terms().len(), 3);
    for var in ["x1", "x2", "x3"] {
        assert_eq!(eq.form.coefficient_value(var, repo).unwrap(), 1.0);
    }
    assert_eq!(eq.form.constant_value(repo).unwrap(), 10.0);
}

#[test]
fn test_tuple_field_access_in_comprehension() {
    let s = compile(
        "tuple Arc { key string id; string from; }\n\
         {Arc} arcs = {<\"a\",\"N1\">, <\"b\",\"N2\">, <\"c\",\"N1\">};\n\
         {Arc} fromN1 = { a | a in arcs : a.from == \"N1\" };",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    let repo = &s.repository;
    let materialized = repo.computed_set("fromN1").unwrap().materialize(repo).unwrap();
    assert_eq!(materialized.len(), 2);
    let schema = repo.tuple_schema("Arc").unwrap();
    let ids: Vec<String> = materialized
        .iter()
        .map(|t| match t.field(schema, "id").unwrap() {
            optmodel::Value::Str(s) => s.clone(),
            other => panic!("unexpected id {other}"),
        })
        .collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[test]
fn test_two_dimensional_filtered_forall() {
    let s = compile(
        "range I = 1..2; range J = 1..2;\n\
         dvar float+ f[I,J];\n\
         forall(i in I, j in J: i != j) c[i,j]: f[i,j] <= 1;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    let repo = &s.repository;
    assert_eq!(repo.equations().len(), 2);
    assert_eq!(repo.equations()[0].form.coefficient_value("f1_2", repo).unwrap(), 1.0);
    assert_eq!(repo.equations()[1].form.coefficient_value("f2_1", repo).unwrap(), 1.0);
}

#[test]
fn test_implicit_multiplication_rejected() {
    let s = compile("dvar float+ x; dvar float+ y;\nminimize x y;");
    assert!(s.has_errors());
    let rendered = s.diagnostics.render();
    assert!(rendered.contains("consecutive identifiers"));
    assert!(rendered.contains("without operator"));
    assert!(s.repository.objective().is_none());
}

#[test]
fn test_item_lookup_in_constraint() {
    let s = compile(
        "tuple Limit { key string id; float cap; }\n\
         {Limit} limits = {<\"a\", 4.0>, <\"b\", 9.0>};\n\
         dvar float+ x;\n\
         c: x <= item(limits, <\"b\">).cap;",
    );
    assert!(!s.has_errors(), "{}", s.diagnostics.render());
    let repo = &s.repository;
    assert_eq!(repo.equations()[0].form.constant_value(repo).unwrap(), 9.0);
}

#[test]
fn test_report_lists_entities() {
    let s = compile(
        "range I = 1..3;\n\
         dvar float+ x[I];\n\
         maximize sum(i in I) x[i];\n\
         forall(i in I) x[i] <= 1;",
    );
    let report = s.report();
    assert!(report.contains("range I = 1..3"));
    assert!(report.contains("dvar float x[I]"));
    assert!(report.contains("Constraints (3)"));
    assert!(report.contains("maximize"));
}

#[test]
fn test_cli_reports_and_exits_nonzero_on_errors() {
    let mut model = NamedTempFile::new().unwrap();
    writeln!(model, "dvar float+ x;\nbad statement here;\nc: x <= 1;").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_optmodel"))
        .arg(model.path())
        .output()
        .expect("binary runs");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Line 2"), "stderr: {stderr}");
}

#[test]
fn test_cli_clean_model_exits_zero() {
    let mut model = NamedTempFile::new().unwrap();
    writeln!(
        model,
        "range I = 1..3;\ndvar float+ x[I];\nfloat cap[I] = ...;\nforall(i in I) x[i] <= cap[i];"
    )
    .unwrap();
    let mut data = NamedTempFile::new().unwrap();
    writeln!(data, "cap = [5, 7, 9];").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_optmodel"))
        .arg(model.path())
        .arg(data.path())
        .output()
        .expect("binary runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Constraints (3)"), "stdout: {stdout}");
}
